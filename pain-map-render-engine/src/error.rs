//! Error types for fallible engine operations.
//!
//! None of these are fatal. Systems log them and degrade: a region renders at
//! zero opacity, an import is rejected with the previous scene intact, an
//! eraser stroke does nothing.

#[derive(thiserror::Error, Debug)]
pub enum MaskError {
    #[error("image has no CPU-side pixel data")]
    NotDecoded,
    #[error("unsupported pixel layout: {bytes_per_pixel} bytes per pixel")]
    UnsupportedLayout { bytes_per_pixel: usize },
    #[error("mask is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("mask has zero width or height")]
    Empty,
}

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("snapshot has no `state` field")]
    MissingState,
    #[error("geometry `{id}` is malformed: {reason}")]
    Geometry { id: String, reason: &'static str },
    #[error("node references unknown {kind} `{id}`")]
    UnknownReference { kind: &'static str, id: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum IntensityError {
    #[error("intensity for `{key}` must be a whole number, got {value}")]
    NotAnInteger { key: String, value: String },
    #[error("intensity {value} for `{key}` is outside 0..=100")]
    OutOfRange { key: String, value: i64 },
}

#[derive(thiserror::Error, Debug)]
pub enum LaunchError {
    #[error("cannot read ratings file `{path}`: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("`{path}` is not a ratings map: {source}")]
    Ratings {
        path: String,
        source: serde_json::Error,
    },
    #[error("cannot open snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}
