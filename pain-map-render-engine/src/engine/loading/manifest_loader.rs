use crate::constants::path::REGION_MANIFEST_PATH;
use crate::engine::assets::region_manifest::RegionManifest;
use crate::engine::assets::texture_bank::TextureBank;
use crate::engine::loading::progress::LoadingProgress;
use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;

#[derive(Resource, Default)]
pub struct ManifestLoader {
    handle: Option<Handle<RegionManifest>>,
}

/// Handle of the glTF file holding the body mesh.
#[derive(Resource)]
pub struct BaseModelSource {
    pub gltf: Handle<Gltf>,
    pub target_mesh: String,
}

// Start the loading process
pub fn start_loading(mut manifest_loader: ResMut<ManifestLoader>, asset_server: Res<AssetServer>) {
    info!("Loading region manifest from {}", REGION_MANIFEST_PATH);
    manifest_loader.handle = Some(asset_server.load(REGION_MANIFEST_PATH));
}

// Once the manifest is in, request the model, the base mask and every region mask
pub fn load_manifest_system(
    mut loading_progress: ResMut<LoadingProgress>,
    manifest_loader: Res<ManifestLoader>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    manifests: Res<Assets<RegionManifest>>,
) {
    if loading_progress.manifest_loaded {
        return;
    }
    let Some(ref handle) = manifest_loader.handle else {
        return;
    };

    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle) {
        loading_progress.block(format!("region manifest failed to load: {err}"));
        return;
    }

    if let Some(manifest) = manifests.get(handle) {
        info!(
            "✓ Manifest loaded: {} sides, {} region masks",
            manifest.sides.len(),
            manifest.masks.len()
        );
        commands.insert_resource(TextureBank::request(manifest, &asset_server));
        commands.insert_resource(BaseModelSource {
            gltf: asset_server.load(manifest.model.clone()),
            target_mesh: manifest.target_mesh.clone(),
        });
        commands.insert_resource(manifest.clone());
        loading_progress.manifest_loaded = true;
    }
}
