use crate::engine::assets::region_intensity::RegionIntensity;
use crate::engine::snapshot::import::PendingImport;
use crate::error::LaunchError;
use bevy::prelude::*;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Pain map viewer. In the browser both inputs arrive over RPC instead.
#[derive(Parser, Debug, Default)]
#[command(name = "pain-map", version, about, long_about = None)]
pub struct LaunchOptions {
    /// Flat `{"Neck": 40, "left_Shoulder": 100}` ratings file
    #[arg(long)]
    pub ratings: Option<PathBuf>,

    /// Previously exported `scene.json` to review
    #[arg(long)]
    pub import: Option<PathBuf>,
}

impl LaunchOptions {
    pub fn from_env() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::parse()
        }

        #[cfg(target_arch = "wasm32")]
        {
            Self::default()
        }
    }

    /// Seed the app from the command line. A bad file is logged and skipped;
    /// the viewer then starts as if it had not been given.
    pub fn apply(&self, app: &mut App) {
        if let Some(path) = &self.ratings {
            match read_ratings(path) {
                Ok(intensity) => {
                    info!("✓ Ratings loaded from {}", path.display());
                    app.insert_resource(intensity);
                }
                Err(e) => warn!("{}", e),
            }
        }

        if let Some(path) = &self.import {
            let mut pending = PendingImport::default();
            match pending.queue_file(path).map_err(LaunchError::from) {
                Ok(()) => {
                    info!("Snapshot {} queued for import", path.display());
                    app.insert_resource(pending);
                }
                Err(e) => warn!("{}", e),
            }
        }
    }
}

pub fn read_ratings(path: &Path) -> Result<RegionIntensity, LaunchError> {
    let json = std::fs::read_to_string(path).map_err(|source| LaunchError::Read {
        path: path.display().to_string(),
        source,
    })?;
    RegionIntensity::from_json_str(&json).map_err(|source| LaunchError::Ratings {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::region::RegionKey;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pain-map-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_both_flags() {
        let options =
            LaunchOptions::parse_from(["pain-map", "--ratings", "r.json", "--import", "scene.json"]);
        assert_eq!(options.ratings, Some(PathBuf::from("r.json")));
        assert_eq!(options.import, Some(PathBuf::from("scene.json")));
    }

    #[test]
    fn ratings_file_seeds_the_store() {
        let path = temp_file("ratings.json", r#"{"Neck": 30, "left_Neck": 250}"#);
        let intensity = read_ratings(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(intensity.get(RegionKey::parse("Neck").unwrap()), 30);
        assert_eq!(intensity.get(RegionKey::parse("left_Neck").unwrap()), 100);
    }

    #[test]
    fn unreadable_inputs_are_skipped() {
        let missing = std::env::temp_dir().join("pain-map-does-not-exist.json");
        let broken = temp_file("broken.json", "{ nope");

        let mut app = App::new();
        LaunchOptions {
            ratings: Some(missing),
            import: Some(broken.clone()),
        }
        .apply(&mut app);
        std::fs::remove_file(&broken).ok();

        assert!(!app.world().contains_resource::<RegionIntensity>());
        assert!(!app.world().contains_resource::<PendingImport>());
    }
}
