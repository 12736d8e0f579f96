use bevy::color::Color;

/// Overlay colour (#ff3333) and the emissive tint added on top (#550000).
pub const OVERLAY_BASE_COLOUR: Color = Color::srgb(1.0, 0.2, 0.2);
pub const OVERLAY_EMISSIVE: Color = Color::srgb(0.333, 0.0, 0.0);

/// Depth bias pulling overlays in front of the coincident base mesh.
pub const OVERLAY_DEPTH_BIAS: f32 = 1.0;

/// Extra vertical shift applied after centring the model on its bounding box.
pub const MODEL_VERTICAL_OFFSET: f32 = -5.0;

pub const CAMERA_START: [f32; 3] = [-3.0, 2.0, -7.0];
pub const CAMERA_MIN_DISTANCE: f32 = 2.0;
pub const CAMERA_MAX_DISTANCE: f32 = 40.0;

pub const AMBIENT_BRIGHTNESS: f32 = 200.0;
pub const DIRECTIONAL_ILLUMINANCE: f32 = 4_000.0;

/// Offset of the key light from the camera, so it follows the viewer.
pub const LIGHT_OFFSET: [f32; 3] = [0.0, 1.0, 0.0];
