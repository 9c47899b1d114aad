// src/spatial/mod.rs

pub mod distance_grid;
pub mod kd_tree;

pub use distance_grid::DistanceGrid;
pub use kd_tree::{KdPoint, KdTree, Neighbor};
