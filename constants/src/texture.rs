/// Channel of the base mask that carries the erase flag (green).
pub const ERASE_CHANNEL: usize = 1;

/// Channel of a region mask that carries membership unless the manifest overrides it.
pub const DEFAULT_MEMBERSHIP_CHANNEL: usize = 1;

/// Region layers bound to one overlay material. Opacities are packed four per vec4.
pub const MAX_REGION_SLOTS: usize = 32;
