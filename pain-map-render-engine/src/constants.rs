/// Asset locations relative to the `assets/` directory.
pub mod path;
