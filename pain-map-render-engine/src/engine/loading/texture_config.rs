use crate::engine::assets::editable_mask::EditableMask;
use crate::engine::assets::region_manifest::RegionManifest;
use crate::engine::assets::texture_bank::{TextureBank, create_layer_array};
use crate::engine::loading::progress::LoadingProgress;
use bevy::prelude::*;

// Seed the erase mask from the base mask and allocate one layer array per side
pub fn configure_mask_textures(
    mut loading_progress: ResMut<LoadingProgress>,
    manifest: Option<Res<RegionManifest>>,
    bank: Option<ResMut<TextureBank>>,
    mut images: ResMut<Assets<Image>>,
    mut commands: Commands,
) {
    if loading_progress.masks_configured || !loading_progress.base_mask_loaded {
        return;
    }
    let (Some(manifest), Some(mut bank)) = (manifest, bank) else {
        return;
    };
    let Some(base) = images.get(&bank.base_mask) else {
        return;
    };

    let mut mask = match EditableMask::from_image(base, manifest.erase_channel) {
        Ok(mask) => mask,
        Err(err) => {
            loading_progress.block(format!(
                "base mask '{}' cannot seed the erase mask: {err}",
                bank.base_mask_path
            ));
            return;
        }
    };
    let size = mask.dimensions();
    mask.set_handle(images.add(mask.to_image()));

    for set in bank.sets.iter_mut() {
        let layers = create_layer_array(size, set.slots.len() as u32);
        set.layers = Some(images.add(layers));
        info!(
            "✓ {} region layers allocated for the {} side ({}x{})",
            set.slots.len(),
            set.side.as_str(),
            size.x,
            size.y
        );
    }

    commands.insert_resource(mask);
    loading_progress.masks_configured = true;
}
