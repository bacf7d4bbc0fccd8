//! Fields are linear `f64` buffers laid over a grid index box.
//! Views translate between grid coordinates and buffer positions,
//! and hand out chunks of the buffer for parallel work.

use crate::par_slice;
use crate::util::*;
use rayon::prelude::*;

/// A mutable piece of a field buffer that knows which coordinates it holds.
pub struct FieldChunk<'a, const GRID_DIMENSION: usize> {
    offset: usize,
    aabb: &'a AABB<GRID_DIMENSION>,
    buffer: &'a mut [f64],
}

impl<'a, const GRID_DIMENSION: usize> FieldChunk<'a, GRID_DIMENSION> {
    pub fn new(
        offset: usize,
        aabb: &'a AABB<GRID_DIMENSION>,
        buffer: &'a mut [f64],
    ) -> Self {
        FieldChunk {
            offset,
            aabb,
            buffer,
        }
    }

    pub fn coord_iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (Coord<GRID_DIMENSION>, &mut f64)> {
        let offset = self.offset;
        let aabb = self.aabb;
        self.buffer
            .iter_mut()
            .enumerate()
            .map(move |(i, v): (usize, &mut f64)| {
                (aabb.linear_to_coord(offset + i), v)
            })
    }
}

pub trait FieldView<const GRID_DIMENSION: usize>: Sync {
    fn aabb(&self) -> &AABB<GRID_DIMENSION>;

    fn buffer(&self) -> &[f64];

    fn buffer_mut(&mut self) -> &mut [f64];

    fn aabb_buffer_mut(&mut self) -> (&AABB<GRID_DIMENSION>, &mut [f64]);

    #[track_caller]
    fn view(&self, coord: &Coord<GRID_DIMENSION>) -> f64 {
        debug_assert!(
            self.aabb().contains(coord),
            "{} does not contain {:?}",
            self.aabb(),
            coord
        );
        self.buffer()[self.aabb().coord_to_linear(coord)]
    }

    #[track_caller]
    fn set(&mut self, coord: &Coord<GRID_DIMENSION>, value: f64) {
        debug_assert!(self.aabb().contains(coord));
        let index = self.aabb().coord_to_linear(coord);
        self.buffer_mut()[index] = value;
    }

    fn par_modify_access<'a>(
        &'a mut self,
        chunk_size: usize,
    ) -> impl ParallelIterator<Item = FieldChunk<'a, GRID_DIMENSION>> {
        let (aabb, buffer) = self.aabb_buffer_mut();
        par_modify_access_impl(buffer, aabb, chunk_size)
    }

    fn par_set_values<
        F: Fn(Coord<GRID_DIMENSION>) -> f64 + Send + Sync + Copy,
    >(
        &mut self,
        f: F,
        chunk_size: usize,
    ) {
        self.par_modify_access(chunk_size).for_each(
            |mut c: FieldChunk<'_, GRID_DIMENSION>| {
                c.coord_iter_mut().for_each(|(coord, value_mut)| {
                    *value_mut = f(coord);
                })
            },
        );
    }

    /// Copy self coords from other into self,
    /// other must contain every coordinate of self.
    fn par_from_superset<FieldType: FieldView<GRID_DIMENSION>>(
        &mut self,
        other: &FieldType,
        chunk_size: usize,
    ) {
        debug_assert!(other.aabb().contains_aabb(self.aabb()));
        self.par_set_values(|coord| other.view(&coord), chunk_size);
    }

    /// Copy other into the matching coords of self,
    /// self must contain every coordinate of other.
    fn set_subfield<FieldType: FieldView<GRID_DIMENSION>>(
        &mut self,
        other: &FieldType,
    ) {
        debug_assert!(self.aabb().contains_aabb(other.aabb()));
        for (i, coord) in other.aabb().coord_iter().enumerate() {
            self.set(&coord, other.buffer()[i]);
        }
    }

    fn l2_norm(&self, chunk_size: usize) -> f64 {
        par_slice::norm_squared(self.buffer(), chunk_size).sqrt()
    }
}

/// Rust can't borrow aabb and buffer separately through `&mut self`
/// inside the trait, so both borrows are split first and passed here.
fn par_modify_access_impl<'a, const GRID_DIMENSION: usize>(
    buffer: &'a mut [f64],
    aabb: &'a AABB<GRID_DIMENSION>,
    chunk_size: usize,
) -> impl ParallelIterator<Item = FieldChunk<'a, GRID_DIMENSION>> + 'a {
    let chunk_size = chunk_size.max(1);
    buffer[0..aabb.buffer_size()]
        .par_chunks_mut(chunk_size)
        .enumerate()
        .map(move |(i, buffer_chunk): (usize, &mut [f64])| {
            FieldChunk::new(i * chunk_size, aabb, buffer_chunk)
        })
}
