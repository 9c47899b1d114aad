// src/lib.rs

pub mod error;
pub mod mesh;
pub mod reconstruction;
pub mod sampling;
pub mod spatial;
pub mod types;
pub mod utils;

// Re-exports für einfache Verwendung
pub use error::{ScatterError, ScatterResult};
pub use types::*;

// Öffentliche API
pub mod prelude {
    pub use super::{
        error::{ScatterError, ScatterResult},
        mesh::{IndexedMesh, SurfaceMesh, collect_triangles},
        reconstruction::{AlphaShapeMesh, build_alpha_shape, collapse_duplicates, weld_mesh},
        sampling::{
            DistributionTarget, PlanarConfig, RadiusMode, SurfaceConfig, SurfaceDistribution,
            SurfaceSample, distribute_on_surface, distribute_poisson_2d,
        },
        spatial::{DistanceGrid, KdPoint, KdTree, Neighbor},
        types::*,
    };
}
