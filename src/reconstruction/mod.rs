// src/reconstruction/mod.rs

pub mod alpha_shape;
pub mod dedup;

pub use alpha_shape::{AlphaShapeMesh, build_alpha_shape};
pub use dedup::{DedupResult, collapse_duplicates, weld_mesh};
