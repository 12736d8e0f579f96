/// Brush radius in mask pixels when a session starts.
pub const DEFAULT_RADIUS: u32 = 10;
pub const MIN_RADIUS: u32 = 5;
pub const MAX_RADIUS: u32 = 50;

/// Radius change per modifier-wheel notch.
pub const RADIUS_STEP: u32 = 5;

/// World-space cursor sphere radius is the pixel radius divided by this.
pub const CURSOR_RADIUS_DIVISOR: f32 = 60.0;

pub const CURSOR_COLOUR: [u8; 3] = [0x33, 0x66, 0x66];
pub const CURSOR_ALPHA: f32 = 0.5;
