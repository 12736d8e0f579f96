use crate::engine::shaders::{CompositeMaterial, rebind_overlays};
use crate::error::MaskError;
use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageFilterMode, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

const CHANNELS: usize = 4;

/// Mutable erase mask shared by every overlay material.
///
/// The CPU buffer is the source of truth. Writes set a dirty flag and
/// [`refresh_editable_mask`] copies the buffer into the bound GPU image at most
/// once per frame. Values only ever move toward 1.0 within a session.
#[derive(Resource)]
pub struct EditableMask {
    width: u32,
    height: u32,
    erase_channel: usize,
    pixels: Vec<f32>,
    dirty: bool,
    handle: Handle<Image>,
}

impl EditableMask {
    /// Seed from a decoded base mask, normalising each 8-bit channel to [0, 1].
    pub fn from_image(base: &Image, erase_channel: usize) -> Result<Self, MaskError> {
        let bytes = base.data.as_ref().ok_or(MaskError::NotDecoded)?;
        let (width, height) = (base.width(), base.height());
        if width == 0 || height == 0 {
            return Err(MaskError::Empty);
        }
        let bytes_per_pixel = bytes.len() / (width as usize * height as usize);
        Self::from_bytes(width, height, bytes, bytes_per_pixel, erase_channel)
    }

    pub fn from_bytes(
        width: u32,
        height: u32,
        bytes: &[u8],
        bytes_per_pixel: usize,
        erase_channel: usize,
    ) -> Result<Self, MaskError> {
        if width == 0 || height == 0 {
            return Err(MaskError::Empty);
        }
        if !matches!(bytes_per_pixel, 1 | 2 | 4) {
            return Err(MaskError::UnsupportedLayout { bytes_per_pixel });
        }
        let pixel_count = width as usize * height as usize;
        if bytes.len() < pixel_count * bytes_per_pixel {
            return Err(MaskError::NotDecoded);
        }

        let mut pixels = vec![0.0; pixel_count * CHANNELS];
        for (source, target) in bytes
            .chunks_exact(bytes_per_pixel)
            .zip(pixels.chunks_exact_mut(CHANNELS))
        {
            for (channel, value) in target.iter_mut().enumerate() {
                *value = match source_channel(channel, bytes_per_pixel) {
                    Some(index) => f32::from(source[index]) / 255.0,
                    None => 1.0,
                };
            }
        }

        Ok(Self {
            width,
            height,
            erase_channel: erase_channel.min(CHANNELS - 1),
            pixels,
            dirty: false,
            handle: Handle::default(),
        })
    }

    /// GPU image wrapping a copy of the current buffer, sampled without filtering.
    pub fn to_image(&self) -> Image {
        let mut image = Image::new(
            Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            self.as_bytes().to_vec(),
            TextureFormat::Rgba32Float,
            RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
        );
        image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
            mag_filter: ImageFilterMode::Nearest,
            min_filter: ImageFilterMode::Nearest,
            ..default()
        });
        image
    }

    pub fn set_handle(&mut self, handle: Handle<Image>) {
        self.handle = handle;
    }

    pub fn handle(&self) -> &Handle<Image> {
        &self.handle
    }

    pub fn dimensions(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn erase_value(&self, x: u32, y: u32) -> Option<f32> {
        self.index(i64::from(x), i64::from(y))
            .map(|index| self.pixels[index])
    }

    /// Raise the erase channel at (x, y) to `value`. Out-of-range coordinates
    /// and values at or below the current one are ignored.
    pub fn write(&mut self, x: i64, y: i64, value: f32) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        let value = value.clamp(0.0, 1.0);
        if value <= self.pixels[index] {
            return false;
        }
        self.pixels[index] = value;
        self.mark_dirty();
        true
    }

    /// Fill a disc of `radius` pixels around `center` with full erase.
    /// Returns how many pixels changed.
    pub fn stamp_disc(&mut self, center: UVec2, radius: u32) -> usize {
        let (cx, cy) = (i64::from(center.x), i64::from(center.y));
        let r = i64::from(radius);
        let mut changed = 0;
        for i in -r..=r {
            for j in -r..=r {
                if i * i + j * j <= r * r && self.write(cx + i, cy + j, 1.0) {
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, reporting whether it was set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS + self.erase_channel)
    }
}

/// Byte within an 8-bit pixel that holds RGBA `channel`. Luminance layouts
/// repeat their single value across red, green and blue; `None` means the
/// layout has no alpha and the channel reads as opaque.
pub fn source_channel(channel: usize, bytes_per_pixel: usize) -> Option<usize> {
    match (bytes_per_pixel, channel) {
        (4, channel) => Some(channel.min(3)),
        (2, 3) => Some(1),
        (1, 3) => None,
        _ => Some(0),
    }
}

/// Map a surface UV to the mask pixel it falls in. Coordinates outside [0, 1]
/// map to nothing; exactly 1.0 maps to the last row or column.
pub fn uv_to_pixel(uv: Vec2, width: u32, height: u32) -> Option<UVec2> {
    if width == 0 || height == 0 {
        return None;
    }
    if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
        return None;
    }
    let x = ((uv.x * width as f32).floor() as u32).min(width - 1);
    let y = ((uv.y * height as f32).floor() as u32).min(height - 1);
    Some(UVec2::new(x, y))
}

/// Push the CPU buffer to the GPU image when a write happened since the last frame.
pub fn refresh_editable_mask(
    mask: Option<ResMut<EditableMask>>,
    mut images: ResMut<Assets<Image>>,
    materials: Option<ResMut<Assets<CompositeMaterial>>>,
) {
    let Some(mut mask) = mask else {
        return;
    };
    if !mask.is_dirty() {
        return;
    }

    let Some(image) = images.get_mut(mask.handle()) else {
        warn!("Erase mask image missing, dropping pending refresh");
        mask.take_dirty();
        return;
    };
    match image.data.as_mut() {
        Some(bytes) if bytes.len() == mask.as_bytes().len() => {
            bytes.copy_from_slice(mask.as_bytes());
        }
        _ => image.data = Some(mask.as_bytes().to_vec()),
    }
    mask.take_dirty();

    if let Some(mut materials) = materials {
        rebind_overlays(&mut materials);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(size: u32) -> EditableMask {
        let bytes = vec![0u8; (size * size * 4) as usize];
        EditableMask::from_bytes(size, size, &bytes, 4, 1).unwrap()
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn seeds_from_base_green_channel() {
        let bytes = [0, 255, 0, 255, 10, 0, 0, 255];
        let mask = EditableMask::from_bytes(2, 1, &bytes, 4, 1).unwrap();

        assert_eq!(mask.erase_value(0, 0), Some(1.0));
        assert_eq!(mask.erase_value(1, 0), Some(0.0));
        assert!(!mask.is_dirty());
    }

    #[test]
    fn expands_narrow_layouts() {
        let mask = EditableMask::from_bytes(2, 1, &[51, 255, 0, 0], 2, 1).unwrap();
        assert_eq!(mask.erase_value(0, 0), Some(0.2));
        assert_eq!(mask.erase_value(1, 0), Some(0.0));

        let grey = EditableMask::from_bytes(1, 1, &[255], 1, 1).unwrap();
        assert_eq!(grey.erase_value(0, 0), Some(1.0));

        let err = EditableMask::from_bytes(1, 1, &[0, 0, 0], 3, 1);
        assert!(matches!(
            err,
            Err(MaskError::UnsupportedLayout { bytes_per_pixel: 3 })
        ));
    }

    #[test]
    fn uv_corners_map_to_edge_pixels() {
        assert_eq!(uv_to_pixel(Vec2::ZERO, 1024, 512), Some(UVec2::ZERO));
        assert_eq!(
            uv_to_pixel(Vec2::ONE, 1024, 512),
            Some(UVec2::new(1023, 511))
        );
        assert_eq!(
            uv_to_pixel(Vec2::splat(0.5), 1024, 1024),
            Some(UVec2::splat(512))
        );
        assert_eq!(uv_to_pixel(Vec2::new(1.01, 0.5), 1024, 1024), None);
        assert_eq!(uv_to_pixel(Vec2::new(0.5, -0.1), 1024, 1024), None);
        assert_eq!(uv_to_pixel(Vec2::new(f32::NAN, 0.5), 1024, 1024), None);
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut mask = blank(4);

        assert!(!mask.write(-1, 0, 1.0));
        assert!(!mask.write(0, 4, 1.0));
        assert!(!mask.is_dirty());
        assert!(mask.write(3, 3, 1.0));
        assert!(mask.is_dirty());
    }

    #[test]
    fn erase_never_moves_backwards() {
        let mut mask = blank(2);

        assert!(mask.write(0, 0, 1.0));
        assert!(!mask.write(0, 0, 0.3));
        assert_eq!(mask.erase_value(0, 0), Some(1.0));
    }

    #[test]
    fn disc_stamp_hits_centre_not_beyond_radius() {
        let mut mask = blank(1024);
        let centre = uv_to_pixel(Vec2::splat(0.5), 1024, 1024).unwrap();

        let changed = mask.stamp_disc(centre, 10);

        assert!(changed > 300);
        assert_eq!(mask.erase_value(512, 512), Some(1.0));
        assert_eq!(mask.erase_value(522, 512), Some(1.0));
        assert_eq!(mask.erase_value(512, 540), Some(0.0));
        assert_eq!(mask.erase_value(520, 520), Some(0.0));
    }

    #[test]
    fn repeated_stamp_is_idempotent() {
        let mut mask = blank(64);
        mask.stamp_disc(UVec2::new(10, 10), 6);
        let once = mask.as_bytes().to_vec();
        mask.take_dirty();

        let changed = mask.stamp_disc(UVec2::new(10, 10), 6);

        assert_eq!(changed, 0);
        assert!(!mask.is_dirty());
        assert_eq!(mask.as_bytes(), once.as_slice());
    }

    #[test]
    fn disc_clips_at_mask_edge() {
        let mut mask = blank(16);
        let changed = mask.stamp_disc(UVec2::new(0, 0), 3);
        // Quarter disc of radius 3: rows of 4, 3, 3, 1 pixels.
        assert_eq!(changed, 11);
    }

    #[test]
    fn refresh_uploads_once_and_clears_flag() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()));
        app.init_asset::<Image>();
        app.add_systems(Update, refresh_editable_mask);

        let mut mask = blank(4);
        let handle = app
            .world_mut()
            .resource_mut::<Assets<Image>>()
            .add(mask.to_image());
        mask.set_handle(handle.clone());
        mask.stamp_disc(UVec2::new(1, 1), 0);
        app.insert_resource(mask);

        app.update();

        assert!(!app.world().resource::<EditableMask>().is_dirty());
        let images = app.world().resource::<Assets<Image>>();
        let uploaded = floats(images.get(&handle).unwrap().data.as_ref().unwrap());
        assert_eq!(uploaded[(4 + 1) * 4 + 1], 1.0);
        assert_eq!(uploaded[1], 0.0);
    }
}
