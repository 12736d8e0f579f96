//! Compile-time constants shared across the pain map workspace.

/// Eraser brush limits and cursor appearance.
pub mod eraser;

/// Canonical body regions and their overview labels.
pub mod region;

/// Overlay colours, scene placement, camera and lighting defaults.
pub mod render_settings;

/// Mask texture channels and slot limits.
pub mod texture;
