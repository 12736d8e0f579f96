pub const REGION_MANIFEST_PATH: &str = "regions.manifest.json";

pub const COMPOSITE_SHADER_PATH: &str = "shaders/region_composite.wgsl";

/// Default file name for exported snapshots.
pub const SNAPSHOT_FILE_NAME: &str = "scene.json";
