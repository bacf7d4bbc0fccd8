use crate::util::indexing::*;
use crate::util::*;

/// Axis Aligned Bounding Box (AABB) over grid indices.
/// Each instance is inclusive of both corners.
/// Used for windowing models and for mapping between
/// linear field buffers and grid coordinates.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct AABB<const DIMENSION: usize> {
    pub bounds: Bounds<DIMENSION>,
}

impl<const GRID_DIMENSION: usize> std::fmt::Display for AABB<GRID_DIMENSION> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> Result<(), std::fmt::Error> {
        write!(f, "[")?;
        for d in 0..GRID_DIMENSION {
            if d > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}..={}", self.bounds[(d, 0)], self.bounds[(d, 1)])?;
        }
        write!(f, "]")
    }
}

impl<const DIMENSION: usize> AABB<DIMENSION> {
    /// Create AABB from raw bounds.
    #[inline]
    pub fn new(bounds: Bounds<DIMENSION>) -> Self {
        AABB { bounds }
    }

    /// Create AABB from corners.
    pub fn from_mm(min: Coord<DIMENSION>, max: Coord<DIMENSION>) -> Self {
        let result = AABB {
            bounds: Bounds::from_columns(&[min, max]),
        };
        debug_assert!(result.check_validity());
        result
    }

    /// Box covering `[0, shape - 1]` on every axis.
    pub fn from_shape(shape: &Coord<DIMENSION>) -> Self {
        Self::from_mm(Coord::zero(), shape.add_scalar(-1))
    }

    /// Moving min to the origin, returns the exclusive size in each direction
    /// i.e. [0, 9]  would have exclusive size of 10.
    pub fn exclusive_bounds(&self) -> Coord<DIMENSION> {
        (self.bounds.column(1) - self.bounds.column(0)).add_scalar(1)
    }

    /// Return the number of coordinates contained in the instance.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        real_buffer_size(&self.exclusive_bounds())
    }

    /// Return the linear index for a coord in the instance
    pub fn coord_to_linear(&self, coord: &Coord<DIMENSION>) -> usize {
        coord_to_linear(&(coord - self.min()), &self.exclusive_bounds())
    }

    /// Return the coordinate in the instance for a given linear index.
    pub fn linear_to_coord(&self, index: usize) -> Coord<DIMENSION> {
        linear_to_coord(index, &self.exclusive_bounds()) + self.min()
    }

    /// Check whether the instance contains a coordinate.
    pub fn contains(&self, coord: &Coord<DIMENSION>) -> bool {
        (0..DIMENSION).all(|d| {
            coord[d] >= self.bounds[(d, 0)] && coord[d] <= self.bounds[(d, 1)]
        })
    }

    /// Check whether another AABB is contained in the instance.
    pub fn contains_aabb(&self, other: &Self) -> bool {
        (0..DIMENSION).all(|d| {
            other.bounds[(d, 0)] >= self.bounds[(d, 0)]
                && other.bounds[(d, 1)] <= self.bounds[(d, 1)]
        })
    }

    /// Overlap of both boxes, `None` if they are disjoint on any axis.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let mut result = *self;
        for d in 0..DIMENSION {
            result.bounds[(d, 0)] = self.bounds[(d, 0)].max(other.bounds[(d, 0)]);
            result.bounds[(d, 1)] = self.bounds[(d, 1)].min(other.bounds[(d, 1)]);
        }
        result.check_validity().then_some(result)
    }

    /// Return min corner.
    pub fn min(&self) -> Coord<DIMENSION> {
        self.bounds.column(0).into()
    }

    /// Return max corner
    pub fn max(&self) -> Coord<DIMENSION> {
        self.bounds.column(1).into()
    }

    /// Check that max >= min
    pub fn check_validity(&self) -> bool {
        (0..DIMENSION).all(|d| self.bounds[(d, 0)] <= self.bounds[(d, 1)])
    }

    /// Return iterator over contained coords
    /// in linear ordering.
    pub fn coord_iter(&self) -> impl Iterator<Item = Coord<DIMENSION>> + '_ {
        (0..self.buffer_size()).map(|i| self.linear_to_coord(i))
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn buffer_size_test() {
        {
            let a = AABB::new(matrix![0, 5]);
            assert_eq!(a.buffer_size(), 6);
        }

        {
            let a = AABB::new(matrix![10, 110; 0, 50]);
            assert_eq!(a.buffer_size(), 101 * 51);
        }

        {
            let a = AABB::from_shape(&vector![6, 8, 10]);
            assert_eq!(a, AABB::new(matrix![0, 5; 0, 7; 0, 9]));
            assert_eq!(a.buffer_size(), 6 * 8 * 10);
        }
    }

    #[test]
    fn linear_to_coord_test() {
        {
            let bb = AABB::new(matrix![2, 8]);
            assert_eq!(bb.linear_to_coord(5), vector![7]);
        }

        {
            let bb = AABB::new(matrix![3, 6; 10, 12]);
            let c = vector![5, 11];
            let li = bb.coord_to_linear(&c);
            assert_eq!(li, 2 * 3 + 1);
            assert_eq!(bb.linear_to_coord(li), c);
        }
    }

    #[test]
    fn intersection_test() {
        {
            let a = AABB::new(matrix![0, 100; 0, 50]);
            let b = AABB::new(matrix![-20, 30; 10, 80]);
            assert_eq!(
                a.intersection(&b),
                Some(AABB::new(matrix![0, 30; 10, 50]))
            );
        }

        {
            let a = AABB::new(matrix![0, 10]);
            let b = AABB::new(matrix![11, 20]);
            assert_eq!(a.intersection(&b), None);
        }
    }

    #[test]
    fn check_validity_test() {
        assert!(AABB::new(matrix![0, 9]).check_validity());
        assert!(!AABB::new(matrix![9, 0]).check_validity());
        assert!(AABB::new(matrix![0, 0]).check_validity());
    }

    #[test]
    fn coord_iter_test() {
        let bb = AABB::new(matrix![1, 2; 4, 6]);
        let coords: Vec<_> = bb.coord_iter().collect();
        assert_eq!(coords.len(), 6);
        assert_eq!(coords[0], vector![1, 4]);
        assert_eq!(coords[1], vector![1, 5]);
        assert_eq!(coords[5], vector![2, 6]);
        assert!(coords.iter().all(|c| bb.contains(c)));
    }

    #[test]
    fn display_test() {
        let bb = AABB::new(matrix![0, 9; -2, 4]);
        assert_eq!(format!("{bb}"), "[0..=9, -2..=4]");
    }
}
