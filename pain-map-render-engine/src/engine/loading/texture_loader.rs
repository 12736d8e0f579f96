use crate::engine::assets::editable_mask::EditableMask;
use crate::engine::assets::texture_bank::{
    SlotStatus, TextureBank, extract_membership_layer, write_layer,
};
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::shaders::{CompositeMaterial, rebind_overlays};
use crate::error::MaskError;
use bevy::asset::LoadState;
use bevy::prelude::*;

/// What the asset server reports for one mask handle.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskArrival {
    Pending,
    Loaded,
    Failed(String),
}

impl MaskArrival {
    pub fn of(asset_server: &AssetServer, handle: &Handle<Image>) -> Self {
        match asset_server.get_load_state(handle) {
            Some(LoadState::Loaded) => Self::Loaded,
            Some(LoadState::Failed(err)) => Self::Failed(err.to_string()),
            _ => Self::Pending,
        }
    }
}

// Check the base mask, which every overlay needs before anything renders
pub fn check_base_mask_loading(
    mut loading_progress: ResMut<LoadingProgress>,
    bank: Option<Res<TextureBank>>,
    asset_server: Res<AssetServer>,
) {
    if loading_progress.base_mask_loaded {
        return;
    }
    let Some(bank) = bank else {
        return;
    };

    let arrival = MaskArrival::of(&asset_server, &bank.base_mask);
    note_base_mask(&mut loading_progress, &bank, arrival);
}

/// A failed base mask blocks loading for good; nothing is drawn without it.
pub fn note_base_mask(progress: &mut LoadingProgress, bank: &TextureBank, arrival: MaskArrival) {
    match arrival {
        MaskArrival::Loaded => {
            info!("✓ Base mask loaded: {}", bank.base_mask_path);
            progress.base_mask_loaded = true;
        }
        MaskArrival::Failed(err) => {
            progress.block(format!(
                "base mask '{}' failed to load: {err}",
                bank.base_mask_path
            ));
        }
        MaskArrival::Pending => {}
    }
}

/// Settle region masks as they arrive, in any order.
///
/// Runs for the whole session since the viewer never waits for region masks.
pub fn track_region_masks(
    mut loading_progress: ResMut<LoadingProgress>,
    bank: Option<ResMut<TextureBank>>,
    mask: Option<Res<EditableMask>>,
    asset_server: Res<AssetServer>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<CompositeMaterial>>,
) {
    let (Some(mut bank), Some(mask)) = (bank, mask) else {
        return;
    };
    if bank.is_settled() {
        return;
    }

    let layers_written = settle_region_masks(&mut bank, mask.dimensions(), &mut images, |handle| {
        MaskArrival::of(&asset_server, handle)
    });
    if layers_written {
        rebind_overlays(&mut materials);
    }

    let progress = bank.progress();
    if loading_progress.region_masks != progress {
        loading_progress.region_masks = progress;
    }
    if bank.is_settled() {
        let (settled, total) = loading_progress.region_masks;
        info!("✓ Region masks settled ({}/{})", settled, total);
    }
}

/// One pass over the pending slots. A loaded mask is copied into its layer; a
/// failed or mismatched one is marked absent and keeps its zeroed layer.
/// Returns whether any layer bytes changed.
pub fn settle_region_masks(
    bank: &mut TextureBank,
    size: UVec2,
    images: &mut Assets<Image>,
    arrival: impl Fn(&Handle<Image>) -> MaskArrival,
) -> bool {
    let mut layers_written = false;

    for set in bank.sets.iter_mut() {
        let Some(layers) = set.layers.clone() else {
            continue;
        };
        for (layer, slot) in set.slots.iter_mut().enumerate() {
            if slot.status != SlotStatus::Pending {
                continue;
            }
            match arrival(&slot.handle) {
                MaskArrival::Loaded => {
                    let extracted = images
                        .get(&slot.handle)
                        .ok_or(MaskError::NotDecoded)
                        .and_then(|image| extract_membership_layer(image, size, slot.channel));
                    match extracted {
                        Ok(data) => {
                            let written = images
                                .get_mut(&layers)
                                .is_some_and(|array| write_layer(array, layer, &data));
                            slot.status = if written {
                                SlotStatus::Ready
                            } else {
                                SlotStatus::Absent
                            };
                            layers_written |= written;
                        }
                        Err(err) => {
                            warn!("Region mask '{}' unusable: {}", slot.path, err);
                            slot.status = SlotStatus::Absent;
                        }
                    }
                }
                MaskArrival::Failed(err) => {
                    warn!(
                        "Region mask '{}' failed to load, {} renders at zero: {}",
                        slot.path, slot.key, err
                    );
                    slot.status = SlotStatus::Absent;
                }
                MaskArrival::Pending => {}
            }
        }
    }

    layers_written
}
