// src/types/mod.rs
pub mod bounds;
pub mod triangle;

pub use bounds::*;
pub use triangle::*;

// Re-export häufig verwendete externe Typen
pub use bevy::math::{Vec2, Vec3};

// Einheitliche Typen für das gesamte Crate
pub type Point2D = Vec2;
pub type Point3D = Vec3;
