//! Row-major index maths for grid buffers.
//! The last axis varies fastest, which is also how the engines lay out
//! padded fields.

use crate::util::*;

/// Number of grid points described by an exclusive shape.
pub fn real_buffer_size<const GRID_DIMENSION: usize>(
    exclusive_bounds: &Coord<GRID_DIMENSION>,
) -> usize {
    exclusive_bounds
        .iter()
        .map(|n| {
            debug_assert!(*n >= 0);
            *n as usize
        })
        .product()
}

/// Per-axis strides for a row-major buffer of the given shape.
pub fn strides<const GRID_DIMENSION: usize>(
    exclusive_bounds: &Coord<GRID_DIMENSION>,
) -> [usize; GRID_DIMENSION] {
    let mut result = [1; GRID_DIMENSION];
    for d in (0..GRID_DIMENSION.saturating_sub(1)).rev() {
        result[d] = result[d + 1] * exclusive_bounds[d + 1] as usize;
    }
    result
}

pub fn coord_to_linear<const GRID_DIMENSION: usize>(
    coord: &Coord<GRID_DIMENSION>,
    exclusive_bounds: &Coord<GRID_DIMENSION>,
) -> usize {
    let strides = strides(exclusive_bounds);
    let mut result = 0;
    for d in 0..GRID_DIMENSION {
        debug_assert!(coord[d] >= 0 && coord[d] < exclusive_bounds[d]);
        result += coord[d] as usize * strides[d];
    }
    result
}

pub fn linear_to_coord<const GRID_DIMENSION: usize>(
    linear_index: usize,
    exclusive_bounds: &Coord<GRID_DIMENSION>,
) -> Coord<GRID_DIMENSION> {
    let strides = strides(exclusive_bounds);
    let mut result = Coord::zero();
    let mut remainder = linear_index;
    for d in 0..GRID_DIMENSION {
        result[d] = (remainder / strides[d]) as i32;
        remainder %= strides[d];
    }
    result
}
