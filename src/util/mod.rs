pub use nalgebra::{matrix, vector};
pub use num_traits::{One, Zero};

mod aabb;
pub mod indexing;
pub use aabb::*;

/// Integer grid index, one entry per axis.
pub type Coord<const GRID_DIMENSION: usize> =
    nalgebra::SVector<i32, { GRID_DIMENSION }>;

/// Physical position, one entry per axis, same units as grid spacing.
pub type Point<const GRID_DIMENSION: usize> =
    nalgebra::SVector<f64, { GRID_DIMENSION }>;

/// Column 0 holds the inclusive min, column 1 the inclusive max.
pub type Bounds<const GRID_DIMENSION: usize> =
    nalgebra::SMatrix<i32, { GRID_DIMENSION }, 2>;

/// Tolerance used when snapping physical coordinates onto grid indices.
pub const SNAP_EPSILON: f64 = 1e-6;
