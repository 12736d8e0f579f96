use crate::engine::assets::region::{RegionKey, Side};
use bevy::prelude::*;
use constants::render_settings::OVERLAY_DEPTH_BIAS;
use constants::texture::{DEFAULT_MEMBERSHIP_CHANNEL, ERASE_CHANNEL, MAX_REGION_SLOTS};
use serde::{Deserialize, Serialize};

/// Overlay configuration for one body side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideConfig {
    pub side: Side,
    /// Clone the base mesh with a negative X scale instead of using it as-is.
    #[serde(default)]
    pub mirrored: bool,
    /// Whether pointer strokes on this side's mesh reach the erase mask.
    #[serde(default)]
    pub erasable: bool,
    #[serde(default = "default_depth_bias")]
    pub depth_bias: f32,
}

/// One (region, side, file) triple from the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskEntry {
    pub region: String,
    pub side: Side,
    pub path: String,
    #[serde(default = "default_membership_channel")]
    pub channel: usize,
}

/// Runtime asset configuration, loaded from `regions.manifest.json`.
#[derive(Asset, Debug, Clone, Serialize, Deserialize, TypePath, Resource)]
pub struct RegionManifest {
    pub model: String,
    pub target_mesh: String,
    pub base_mask: String,
    #[serde(default = "default_erase_channel")]
    pub erase_channel: usize,
    pub sides: Vec<SideConfig>,
    pub masks: Vec<MaskEntry>,
}

fn default_depth_bias() -> f32 {
    OVERLAY_DEPTH_BIAS
}

fn default_membership_channel() -> usize {
    DEFAULT_MEMBERSHIP_CHANNEL
}

fn default_erase_channel() -> usize {
    ERASE_CHANNEL
}

impl RegionManifest {
    /// Mask entries for one side with their parsed keys, in manifest order.
    ///
    /// Entries naming an unknown region, or beyond the slot limit, are dropped
    /// with a warning so a bad line never blocks the rest of the set.
    pub fn slots_for(&self, side: Side) -> Vec<(RegionKey, &MaskEntry)> {
        let mut slots = Vec::new();
        for entry in self.masks.iter().filter(|entry| entry.side == side) {
            let Some(key) = RegionKey::new(&entry.region, side) else {
                warn!(
                    "Manifest names unknown region '{}' ({})",
                    entry.region, entry.path
                );
                continue;
            };
            if slots.len() == MAX_REGION_SLOTS {
                warn!(
                    "More than {} masks for the {} side, skipping '{}'",
                    MAX_REGION_SLOTS,
                    side.as_str(),
                    entry.path
                );
                continue;
            }
            slots.push((key, entry));
        }
        slots
    }

    pub fn side_config(&self, side: Side) -> Option<&SideConfig> {
        self.sides.iter().find(|config| config.side == side)
    }
}
