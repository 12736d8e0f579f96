//! Runtime data behind the pain map: regions, ratings, masks.
//!
//! Holds the region key space, the rating store, the region manifest, the
//! CPU-side erase mask and the per-side mask texture sets.

/// CPU copy of the erase channel with dirty-flag upload to the GPU.
pub mod editable_mask;

/// Region and side identifiers with the flat key encoding.
pub mod region;

/// Pain rating store, 0 to 100 per region and side.
pub mod region_intensity;

/// JSON manifest naming the base model, masks and per-side overlay settings.
pub mod region_manifest;

/// Per-side region mask sets and their packed layer textures.
pub mod texture_bank;
