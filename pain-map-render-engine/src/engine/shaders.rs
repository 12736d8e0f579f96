/// Region overlay material: sums weighted region masks into one translucent tint
use crate::constants::path::COMPOSITE_SHADER_PATH;
use crate::engine::assets::region::{RegionKey, Side};
use crate::engine::assets::region_intensity::RegionIntensity;
use bevy::pbr::{MaterialPipeline, MaterialPipelineKey};
use bevy::render::mesh::MeshVertexBufferLayoutRef;
use bevy::render::render_resource::{
    DepthStencilState, RenderPipelineDescriptor, ShaderType, SpecializedMeshPipelineError,
};
use bevy::{
    prelude::*,
    reflect::TypePath,
    render::render_resource::{AsBindGroup, ShaderRef},
};
use constants::render_settings::{OVERLAY_BASE_COLOUR, OVERLAY_EMISSIVE};
use constants::texture::MAX_REGION_SLOTS;

const PACKED_SLOTS: usize = MAX_REGION_SLOTS / 4;

#[derive(Debug, Clone, Copy, ShaderType)]
#[repr(C)]
pub struct CompositeUniform {
    pub base_colour: Vec4,
    pub emissive: Vec4,
    pub region_count: u32,
    /// Slot `i` lives in `opacities[i / 4][i % 4]`.
    pub opacities: [Vec4; PACKED_SLOTS],
}

impl Default for CompositeUniform {
    fn default() -> Self {
        Self {
            base_colour: OVERLAY_BASE_COLOUR.to_linear().to_vec4(),
            emissive: OVERLAY_EMISSIVE.to_linear().to_vec4(),
            region_count: 0,
            opacities: [Vec4::ZERO; PACKED_SLOTS],
        }
    }
}

impl CompositeUniform {
    pub fn with_opacities(opacities: &[f32]) -> Self {
        let mut uniform = Self::default();
        let count = opacities.len().min(MAX_REGION_SLOTS);
        for (slot, opacity) in opacities.iter().take(count).enumerate() {
            uniform.opacities[slot / 4][slot % 4] = *opacity;
        }
        uniform.region_count = count as u32;
        uniform
    }

    pub fn opacity(&self, slot: usize) -> f32 {
        if slot >= self.region_count as usize {
            return 0.0;
        }
        self.opacities[slot / 4][slot % 4]
    }
}

/// Overlay material for one side of the body.
///
/// The erase mask and the region layers are shared handles; only the uniform
/// differs between sides.
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
#[bind_group_data(CompositeMaterialKey)]
pub struct CompositeMaterial {
    #[texture(0, sample_type = "float", filterable = false)]
    #[sampler(1, sampler_type = "non_filtering")]
    pub erase_mask: Handle<Image>,

    #[texture(2, dimension = "2d_array")]
    #[sampler(3)]
    pub region_layers: Option<Handle<Image>>,

    #[uniform(4)]
    pub settings: CompositeUniform,

    pub side: Side,
    pub slots: Vec<RegionKey>,
    pub depth_bias: f32,
}

impl CompositeMaterial {
    /// Bind `slots` to their ratings. Without a layer texture no region is
    /// sampled, so the placeholder binding never reads as membership.
    pub fn new(
        side: Side,
        erase_mask: Handle<Image>,
        region_layers: Option<Handle<Image>>,
        slots: Vec<RegionKey>,
        intensity: &RegionIntensity,
        depth_bias: f32,
    ) -> Self {
        let opacities: Vec<f32> = slots.iter().map(|key| intensity.opacity(*key)).collect();
        let mut settings = CompositeUniform::with_opacities(&opacities);
        if region_layers.is_none() {
            settings.region_count = 0;
        }
        Self {
            erase_mask,
            region_layers,
            settings,
            side,
            slots,
            depth_bias,
        }
    }

    pub fn refresh_opacities(&mut self, intensity: &RegionIntensity) {
        let opacities: Vec<f32> = self
            .slots
            .iter()
            .map(|key| intensity.opacity(*key))
            .collect();
        self.settings = CompositeUniform {
            base_colour: self.settings.base_colour,
            emissive: self.settings.emissive,
            ..CompositeUniform::with_opacities(&opacities)
        };
        if self.region_layers.is_none() {
            self.settings.region_count = 0;
        }
    }
}

/// Pipeline key: overlays with different biases need different pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeMaterialKey {
    pub depth_bias: i32,
}

impl From<&CompositeMaterial> for CompositeMaterialKey {
    fn from(material: &CompositeMaterial) -> Self {
        Self {
            depth_bias: material.depth_bias.round() as i32,
        }
    }
}

/// Offset the overlay towards the camera so it wins the depth test against the
/// coincident base mesh. Depth is reversed, so a positive bias pulls closer.
pub fn apply_depth_bias(depth_stencil: Option<&mut DepthStencilState>, key: CompositeMaterialKey) {
    if let Some(depth_stencil) = depth_stencil {
        depth_stencil.bias.constant = key.depth_bias;
        depth_stencil.bias.slope_scale = key.depth_bias as f32;
    }
}

impl Material for CompositeMaterial {
    fn fragment_shader() -> ShaderRef {
        COMPOSITE_SHADER_PATH.into()
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Blend
    }

    // Sort order among transparent draws; the GPU offset is set in `specialize`.
    fn depth_bias(&self) -> f32 {
        self.depth_bias
    }

    // Mirrored clones flip winding, so draw both faces.
    fn specialize(
        _pipeline: &MaterialPipeline<Self>,
        descriptor: &mut RenderPipelineDescriptor,
        _layout: &MeshVertexBufferLayoutRef,
        key: MaterialPipelineKey<Self>,
    ) -> Result<(), SpecializedMeshPipelineError> {
        descriptor.primitive.cull_mode = None;
        apply_depth_bias(descriptor.depth_stencil.as_mut(), key.bind_group_data);
        Ok(())
    }
}

/// Bind groups hold the texture views they were built with, so overlays are
/// re-prepared after a mask image is re-uploaded.
pub fn rebind_overlays(materials: &mut Assets<CompositeMaterial>) {
    let ids: Vec<_> = materials.ids().collect();
    for id in ids {
        materials.get_mut(id);
    }
}

/// CPU mirror of `region_composite.wgsl` for one texel.
///
/// `None` is a discarded fragment. Otherwise the summed alpha, left unclamped
/// exactly as the shader outputs it.
pub fn composite_alpha(
    erase_value: f32,
    memberships: &[f32],
    uniform: &CompositeUniform,
) -> Option<f32> {
    if erase_value > 0.0 {
        return None;
    }
    let alpha = memberships
        .iter()
        .take(uniform.region_count as usize)
        .enumerate()
        .map(|(slot, membership)| membership * uniform.opacity(slot))
        .sum();
    Some(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> RegionKey {
        RegionKey::parse(name).unwrap()
    }

    fn material(intensity: &RegionIntensity) -> CompositeMaterial {
        CompositeMaterial::new(
            Side::Right,
            Handle::default(),
            Some(Handle::default()),
            vec![key("Neck"), key("Shoulder"), key("HeadInner")],
            intensity,
            1.0,
        )
    }

    #[test]
    fn single_region_alpha_tracks_rating() {
        for rating in 0..=100u8 {
            let mut intensity = RegionIntensity::default();
            intensity.set(key("Neck"), rating).unwrap();
            let overlay = material(&intensity);

            let alpha = composite_alpha(0.0, &[0.8, 0.0, 0.0], &overlay.settings).unwrap();

            let expected = 0.8 * f32::from(rating) / 100.0;
            assert!((alpha - expected).abs() < 1e-6, "rating {rating}");
        }
    }

    #[test]
    fn neck_at_half_outside_is_clear() {
        let mut intensity = RegionIntensity::default();
        intensity.set(key("Neck"), 50).unwrap();
        let overlay = material(&intensity);

        let inside = composite_alpha(0.0, &[1.0, 0.0, 0.0], &overlay.settings).unwrap();
        let outside = composite_alpha(0.0, &[0.0, 1.0, 1.0], &overlay.settings).unwrap();

        assert!((inside - 0.5).abs() < 1e-6);
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn erased_texel_is_discarded_whatever_the_ratings() {
        let mut intensity = RegionIntensity::default();
        intensity.set(key("Neck"), 100).unwrap();
        let before = material(&intensity);
        intensity.set(key("Shoulder"), 90).unwrap();
        let mut after = before.clone();
        after.refresh_opacities(&intensity);

        assert_eq!(composite_alpha(1.0, &[1.0, 1.0, 0.0], &before.settings), None);
        assert_eq!(composite_alpha(1.0, &[1.0, 1.0, 0.0], &after.settings), None);
        assert_eq!(composite_alpha(0.01, &[1.0, 1.0, 0.0], &after.settings), None);
    }

    #[test]
    fn overlapping_regions_stack_past_one() {
        let mut intensity = RegionIntensity::default();
        intensity.set(key("Neck"), 80).unwrap();
        intensity.set(key("Shoulder"), 70).unwrap();
        let overlay = material(&intensity);

        let alpha = composite_alpha(0.0, &[1.0, 1.0, 0.0], &overlay.settings).unwrap();

        assert!((alpha - 1.5).abs() < 1e-6);
    }

    #[test]
    fn missing_layers_contribute_nothing() {
        let mut intensity = RegionIntensity::default();
        intensity.set(key("Neck"), 100).unwrap();
        let overlay = CompositeMaterial::new(
            Side::Right,
            Handle::default(),
            None,
            vec![key("Neck")],
            &intensity,
            1.0,
        );

        assert_eq!(composite_alpha(0.0, &[1.0], &overlay.settings), Some(0.0));
    }

    #[test]
    fn slots_pack_four_per_vector() {
        let opacities: Vec<f32> = (0..6).map(|i| i as f32 / 10.0).collect();
        let uniform = CompositeUniform::with_opacities(&opacities);

        assert_eq!(uniform.region_count, 6);
        assert_eq!(uniform.opacities[1][1], 0.5);
        assert_eq!(uniform.opacity(5), 0.5);
        assert_eq!(uniform.opacity(6), 0.0);
    }

    #[test]
    fn rating_refresh_keeps_custom_colours() {
        let mut intensity = RegionIntensity::default();
        let mut overlay = material(&intensity);
        overlay.settings.base_colour = Vec4::new(0.0, 0.0, 1.0, 1.0);

        intensity.set(key("Shoulder"), 50).unwrap();
        overlay.refresh_opacities(&intensity);

        assert_eq!(overlay.settings.base_colour, Vec4::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(overlay.settings.opacity(1), 0.5);
    }

    #[test]
    fn depth_bias_reaches_the_depth_state() {
        use bevy::render::render_resource::{
            CompareFunction, DepthBiasState, StencilState, TextureFormat,
        };

        let mut overlay = material(&RegionIntensity::default());
        overlay.depth_bias = 2.0;
        let key = CompositeMaterialKey::from(&overlay);
        assert_eq!(key.depth_bias, 2);

        let mut depth_stencil = DepthStencilState {
            format: TextureFormat::Depth32Float,
            depth_write_enabled: false,
            depth_compare: CompareFunction::GreaterEqual,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        };
        apply_depth_bias(Some(&mut depth_stencil), key);

        assert_eq!(depth_stencil.bias.constant, 2);
        assert_eq!(depth_stencil.bias.slope_scale, 2.0);
        apply_depth_bias(None, key);
    }
}
