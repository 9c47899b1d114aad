// src/sampling/mod.rs

pub mod bridson;
pub mod fragment;
pub mod surface;

pub use bridson::{PlanarConfig, distribute_poisson_2d};
pub use fragment::FragmentPool;
pub use surface::{
    DistributionTarget, RadiusMode, SurfaceConfig, SurfaceDistribution, SurfaceSample,
    distribute_on_surface,
};
