//! Orbit camera for inspecting the body model.
//!
//! Orbits around a focus point at the model centre and yields the pointer to
//! the active tool.

/// Orbit camera resource and controller system.
pub mod orbit_camera;
