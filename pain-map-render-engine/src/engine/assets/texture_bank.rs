use crate::engine::assets::editable_mask::source_channel;
use crate::engine::assets::region::{RegionKey, Side};
use crate::engine::assets::region_manifest::RegionManifest;
use crate::error::MaskError;
use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageFilterMode, ImageLoaderSettings, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;
use bevy::render::render_resource::{
    Extent3d, TextureDimension, TextureFormat, TextureViewDescriptor, TextureViewDimension,
};

/// Load outcome of one region mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    /// Copied into its layer of the side's mask array.
    Ready,
    /// Failed to load or did not match the base mask; contributes nothing.
    Absent,
}

#[derive(Debug, Clone)]
pub struct MaskSlot {
    pub key: RegionKey,
    pub path: String,
    pub channel: usize,
    pub handle: Handle<Image>,
    pub status: SlotStatus,
}

/// Region masks of one side, packed as layers of a single array texture so one
/// material binding covers any number of regions. Layer `i` holds `slots[i]`.
#[derive(Debug, Clone)]
pub struct RegionMaskSet {
    pub side: Side,
    pub slots: Vec<MaskSlot>,
    pub layers: Option<Handle<Image>>,
}

impl RegionMaskSet {
    pub fn slot_keys(&self) -> impl Iterator<Item = RegionKey> + '_ {
        self.slots.iter().map(|slot| slot.key)
    }
}

/// Owner of every mask image the overlays sample.
#[derive(Resource, Default)]
pub struct TextureBank {
    pub base_mask: Handle<Image>,
    pub base_mask_path: String,
    pub sets: Vec<RegionMaskSet>,
}

impl TextureBank {
    /// Start loading the base mask and every region mask named by the manifest.
    pub fn request(manifest: &RegionManifest, asset_server: &AssetServer) -> Self {
        let sets = manifest
            .sides
            .iter()
            .map(|config| RegionMaskSet {
                side: config.side,
                slots: manifest
                    .slots_for(config.side)
                    .into_iter()
                    .map(|(key, entry)| MaskSlot {
                        key,
                        path: entry.path.clone(),
                        channel: entry.channel,
                        handle: load_raw_mask(asset_server, &entry.path),
                        status: SlotStatus::Pending,
                    })
                    .collect(),
                layers: None,
            })
            .collect();

        Self {
            base_mask: load_raw_mask(asset_server, &manifest.base_mask),
            base_mask_path: manifest.base_mask.clone(),
            sets,
        }
    }

    pub fn mask_set(&self, side: Side) -> Option<&RegionMaskSet> {
        self.sets.iter().find(|set| set.side == side)
    }

    /// (settled, total) slot counts across all sides.
    pub fn progress(&self) -> (usize, usize) {
        let slots = self.sets.iter().flat_map(|set| set.slots.iter());
        slots.fold((0, 0), |(settled, total), slot| {
            let done = usize::from(slot.status != SlotStatus::Pending);
            (settled + done, total + 1)
        })
    }

    pub fn is_settled(&self) -> bool {
        let (settled, total) = self.progress();
        settled == total
    }
}

/// Masks are data, not colour: keep the bytes untouched and CPU-readable.
fn load_raw_mask(asset_server: &AssetServer, path: &str) -> Handle<Image> {
    asset_server.load_with_settings(path.to_string(), |settings: &mut ImageLoaderSettings| {
        settings.is_srgb = false;
        settings.asset_usage = RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD;
    })
}

/// Pull the membership channel of a decoded mask out as one byte per pixel.
pub fn extract_membership_layer(
    image: &Image,
    expected: UVec2,
    channel: usize,
) -> Result<Vec<u8>, MaskError> {
    let bytes = image.data.as_ref().ok_or(MaskError::NotDecoded)?;
    let (width, height) = (image.width(), image.height());
    if UVec2::new(width, height) != expected {
        return Err(MaskError::DimensionMismatch {
            width: expected.x,
            height: expected.y,
            actual_width: width,
            actual_height: height,
        });
    }
    let pixel_count = width as usize * height as usize;
    if pixel_count == 0 {
        return Err(MaskError::Empty);
    }
    let bytes_per_pixel = bytes.len() / pixel_count;
    if !matches!(bytes_per_pixel, 1 | 2 | 4) {
        return Err(MaskError::UnsupportedLayout { bytes_per_pixel });
    }

    let layer = bytes
        .chunks_exact(bytes_per_pixel)
        .map(|pixel| match source_channel(channel, bytes_per_pixel) {
            Some(index) => pixel[index],
            None => u8::MAX,
        })
        .collect();
    Ok(layer)
}

/// Zeroed single-channel array texture with one layer per region slot.
///
/// The view is forced to `D2Array` so a set with a single region still binds
/// as an array.
pub fn create_layer_array(size: UVec2, layer_count: u32) -> Image {
    let layer_count = layer_count.max(1);
    let mut image = Image::new_fill(
        Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: layer_count,
        },
        TextureDimension::D2,
        &[0],
        TextureFormat::R8Unorm,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    image.texture_view_descriptor = Some(TextureViewDescriptor {
        dimension: Some(TextureViewDimension::D2Array),
        ..default()
    });
    image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
        mag_filter: ImageFilterMode::Nearest,
        min_filter: ImageFilterMode::Nearest,
        ..default()
    });
    image
}

/// Copy one membership layer into the array texture.
pub fn write_layer(array: &mut Image, layer: usize, data: &[u8]) -> bool {
    let Some(bytes) = array.data.as_mut() else {
        return false;
    };
    let start = layer * data.len();
    let Some(target) = bytes.get_mut(start..start + data.len()) else {
        return false;
    };
    target.copy_from_slice(data);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(width: u32, height: u32, pixels: &[[u8; 4]]) -> Image {
        Image::new(
            Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            pixels.iter().flatten().copied().collect(),
            TextureFormat::Rgba8Unorm,
            RenderAssetUsages::MAIN_WORLD,
        )
    }

    #[test]
    fn extracts_requested_channel() {
        let image = rgba(2, 1, &[[1, 200, 3, 255], [4, 0, 6, 255]]);

        let green = extract_membership_layer(&image, UVec2::new(2, 1), 1).unwrap();
        let red = extract_membership_layer(&image, UVec2::new(2, 1), 0).unwrap();

        assert_eq!(green, vec![200, 0]);
        assert_eq!(red, vec![1, 4]);
    }

    #[test]
    fn rejects_masks_of_another_size() {
        let image = rgba(2, 1, &[[0; 4], [0; 4]]);
        let result = extract_membership_layer(&image, UVec2::new(4, 4), 1);

        assert!(matches!(result, Err(MaskError::DimensionMismatch { .. })));
    }

    #[test]
    fn layers_land_in_their_own_slice() {
        let mut array = create_layer_array(UVec2::new(2, 2), 3);

        assert!(write_layer(&mut array, 1, &[9, 9, 9, 9]));
        assert!(!write_layer(&mut array, 3, &[9, 9, 9, 9]));

        let bytes = array.data.as_ref().unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[9, 9, 9, 9]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn empty_set_still_gets_one_layer() {
        let array = create_layer_array(UVec2::new(4, 4), 0);
        assert_eq!(array.texture_descriptor.size.depth_or_array_layers, 1);
    }
}
