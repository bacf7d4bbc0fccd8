use crate::error::*;
use crate::util::*;

/// Regular grid: `shape` points per axis, `spacing` between them,
/// first point at `origin`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Grid<const GRID_DIMENSION: usize> {
    shape: Coord<GRID_DIMENSION>,
    spacing: Point<GRID_DIMENSION>,
    origin: Point<GRID_DIMENSION>,
}

impl<const GRID_DIMENSION: usize> Grid<GRID_DIMENSION> {
    pub fn new(
        shape: Coord<GRID_DIMENSION>,
        spacing: Point<GRID_DIMENSION>,
        origin: Point<GRID_DIMENSION>,
    ) -> Result<Self> {
        if shape.iter().any(|n| *n < 1) {
            return Err(SeisError::dimension(
                "grid shape",
                "at least one point per axis",
                shape.as_slice(),
            ));
        }
        if spacing.iter().any(|h| !(*h > 0.0) || !h.is_finite()) {
            return Err(SeisError::dimension(
                "grid spacing",
                "positive and finite",
                spacing.as_slice(),
            ));
        }
        Ok(Grid {
            shape,
            spacing,
            origin,
        })
    }

    pub fn shape(&self) -> &Coord<GRID_DIMENSION> {
        &self.shape
    }

    pub fn spacing(&self) -> &Point<GRID_DIMENSION> {
        &self.spacing
    }

    pub fn origin(&self) -> &Point<GRID_DIMENSION> {
        &self.origin
    }

    /// Index box covering the whole grid.
    pub fn aabb(&self) -> AABB<GRID_DIMENSION> {
        AABB::from_shape(&self.shape)
    }

    pub fn n_points(&self) -> usize {
        self.aabb().buffer_size()
    }

    /// Physical position of the last grid point.
    pub fn max_extent(&self) -> Point<GRID_DIMENSION> {
        self.position(&self.shape.add_scalar(-1))
    }

    /// Physical position of a grid index.
    pub fn position(&self, coord: &Coord<GRID_DIMENSION>) -> Point<GRID_DIMENSION> {
        self.origin + coord.cast::<f64>().component_mul(&self.spacing)
    }

    /// Fractional grid index of a physical position.
    pub fn fractional_index(
        &self,
        point: &Point<GRID_DIMENSION>,
    ) -> Point<GRID_DIMENSION> {
        (point - self.origin).component_div(&self.spacing)
    }

    /// Largest grid index at or below `point`, snapping values within
    /// `SNAP_EPSILON` of a grid line onto it.
    pub fn floor_index(&self, point: &Point<GRID_DIMENSION>) -> Coord<GRID_DIMENSION> {
        self.fractional_index(point)
            .map(|v| (v + SNAP_EPSILON).floor() as i32)
    }

    /// Smallest grid index at or above `point`.
    pub fn ceil_index(&self, point: &Point<GRID_DIMENSION>) -> Coord<GRID_DIMENSION> {
        self.fractional_index(point)
            .map(|v| (v - SNAP_EPSILON).ceil() as i32)
    }

    /// Whether `point` lies inside the grid's physical extent.
    pub fn contains_point(&self, point: &Point<GRID_DIMENSION>) -> bool {
        let f = self.fractional_index(point);
        (0..GRID_DIMENSION).all(|d| {
            f[d] >= -SNAP_EPSILON
                && f[d] <= (self.shape[d] - 1) as f64 + SNAP_EPSILON
        })
    }

    /// Grid restricted to an index box of this grid.
    /// Positions keep their absolute coordinates.
    pub fn sub_grid(&self, aabb: &AABB<GRID_DIMENSION>) -> Self {
        debug_assert!(self.aabb().contains_aabb(aabb));
        Grid {
            shape: aabb.exclusive_bounds(),
            spacing: self.spacing,
            origin: self.position(&aabb.min()),
        }
    }

    /// Grid extended by `padsizes[d] = (before, after)` points on each axis.
    pub fn padded(&self, padsizes: &[(usize, usize); GRID_DIMENSION]) -> Self {
        let mut shape = self.shape;
        let mut origin = self.origin;
        for d in 0..GRID_DIMENSION {
            shape[d] += (padsizes[d].0 + padsizes[d].1) as i32;
            origin[d] -= padsizes[d].0 as f64 * self.spacing[d];
        }
        Grid {
            shape,
            spacing: self.spacing,
            origin,
        }
    }

    /// Smallest spacing over all axes.
    pub fn min_spacing(&self) -> f64 {
        self.spacing.min()
    }
}
