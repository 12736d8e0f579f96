//! Scene assembly for the pain map viewer.
//!
//! Builds the centred body group with its overlays, lights it, and shows the
//! empty state when no ratings are available.

/// Base mesh and per-side overlay composition.
///
/// Centres the model on its bounding box and keeps overlay uniforms in step with ratings.
pub mod composer;

/// Placeholder view pointing the user back to the assessment.
pub mod empty_state;

/// Ambient light plus a key light that follows the camera.
pub mod lighting;
