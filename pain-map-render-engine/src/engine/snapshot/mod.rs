//! Scene snapshots: the `scene.json` export and its import.
//!
//! A snapshot carries the scene graph (geometry, materials, transforms) plus
//! the ratings under `state`. Erased strokes are not part of it.

/// Scene capture and delivery to a file or the frontend.
pub mod export;

/// Serialisable snapshot document and its validation.
pub mod format;

/// Deferred scene replacement from a parsed snapshot.
pub mod import;
