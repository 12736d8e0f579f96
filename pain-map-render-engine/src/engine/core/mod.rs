//! Core application setup and state management.
//!
//! Handles application lifecycle, window configuration, state transitions,
//! command line input and plugin initialisation for native and WASM targets.

/// Application setup and plugin configuration for the Bevy engine.
///
/// Creates the main app with the overlay material, asset loading systems,
/// and platform-specific configurations.
pub mod app_setup;

/// Application state machine and loading progress transitions.
///
/// Moves from loading to either the empty state or the viewer depending on
/// whether ratings have arrived.
pub mod app_state;

/// Native command line flags for ratings and snapshot files.
pub mod launch_options;

/// Platform-specific window configuration for native and WASM builds.
///
/// Configures canvas integration for web targets and vsync settings.
pub mod window_config;
