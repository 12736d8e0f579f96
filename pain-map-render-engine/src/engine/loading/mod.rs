//! Asset loading and initialisation systems for the pain map viewer.
//!
//! Manages the pipeline from manifest parsing through model resolution and
//! mask configuration, with progress tracking for the frontend.

/// Region manifest loading, which kicks off every other asset request.
pub mod manifest_loader;

/// Base model resolution from the loaded glTF.
pub mod model_loader;

/// Loading progress tracking resource for state transitions.
pub mod progress;

/// Erase mask seeding and region layer allocation once the base mask decodes.
pub mod texture_config;

/// Base mask and region mask load monitoring.
///
/// Region masks settle independently and never block rendering.
pub mod texture_loader;
