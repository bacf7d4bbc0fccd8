use crate::error::*;
use crate::model::*;
use crate::par_slice;
use crate::util::*;

/// A scalar field tied to a grid.
/// Used for model parameters, perturbations and gradients.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalParameter<const GRID_DIMENSION: usize> {
    grid: Grid<GRID_DIMENSION>,
    aabb: AABB<GRID_DIMENSION>,
    data: Vec<f64>,
}

impl<const GRID_DIMENSION: usize> PhysicalParameter<GRID_DIMENSION> {
    pub fn zeros(grid: Grid<GRID_DIMENSION>) -> Self {
        PhysicalParameter {
            aabb: grid.aabb(),
            data: vec![0.0; grid.n_points()],
            grid,
        }
    }

    pub fn constant(grid: Grid<GRID_DIMENSION>, value: f64) -> Self {
        PhysicalParameter {
            aabb: grid.aabb(),
            data: vec![value; grid.n_points()],
            grid,
        }
    }

    /// Wrap an existing row-major buffer, last axis fastest.
    pub fn from_vec(grid: Grid<GRID_DIMENSION>, data: Vec<f64>) -> Result<Self> {
        if data.len() != grid.n_points() {
            return Err(SeisError::dimension(
                "physical parameter buffer",
                grid.n_points(),
                data.len(),
            ));
        }
        Ok(PhysicalParameter {
            aabb: grid.aabb(),
            data,
            grid,
        })
    }

    /// Build from a function of grid index.
    pub fn from_fn<F>(grid: Grid<GRID_DIMENSION>, f: F, chunk_size: usize) -> Self
    where
        F: Fn(Coord<GRID_DIMENSION>) -> f64 + Send + Sync + Copy,
    {
        let mut result = Self::zeros(grid);
        result.par_set_values(f, chunk_size);
        result
    }

    pub fn grid(&self) -> &Grid<GRID_DIMENSION> {
        &self.grid
    }

    pub fn shape(&self) -> &Coord<GRID_DIMENSION> {
        self.grid.shape()
    }

    pub fn spacing(&self) -> &Point<GRID_DIMENSION> {
        self.grid.spacing()
    }

    pub fn origin(&self) -> &Point<GRID_DIMENSION> {
        self.grid.origin()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn norm(&self) -> f64 {
        self.l2_norm(DEFAULT_CHUNK_SIZE)
    }

    pub fn max_abs(&self) -> f64 {
        par_slice::max_abs(&self.data, DEFAULT_CHUNK_SIZE)
    }

    pub fn min_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Fail unless this field lives on a grid of the given shape.
    pub fn check_shape(&self, what: &str, shape: &Coord<GRID_DIMENSION>) -> Result<()> {
        if self.shape() != shape {
            return Err(SeisError::dimension(
                what,
                shape.as_slice(),
                self.shape().as_slice(),
            ));
        }
        Ok(())
    }

    /// Independent copy restricted to an index box of this field's grid.
    pub fn crop(&self, aabb: &AABB<GRID_DIMENSION>) -> Self {
        profiling::scope!("physical_parameter::crop");
        let sub_grid = self.grid.sub_grid(aabb);
        let mut result = Self::zeros(sub_grid);
        // Work in this field's index space, then re-anchor at zero.
        result.aabb = *aabb;
        result.par_from_superset(self, DEFAULT_CHUNK_SIZE);
        result.aabb = sub_grid.aabb();
        result
    }

    /// Embed this field, which covers `aabb` of `full_grid`,
    /// into a zero field on `full_grid`.
    pub fn extend_to(
        &self,
        full_grid: Grid<GRID_DIMENSION>,
        aabb: &AABB<GRID_DIMENSION>,
    ) -> Result<Self> {
        self.check_shape("windowed field", &aabb.exclusive_bounds())?;
        let mut result = Self::zeros(full_grid);
        let mut placed = self.clone();
        placed.aabb = *aabb;
        result.set_subfield(&placed);
        Ok(result)
    }

    pub fn scale(&mut self, factor: f64) {
        par_slice::scale(&mut self.data, factor, DEFAULT_CHUNK_SIZE);
    }

    pub fn accumulate(&mut self, other: &Self) -> Result<()> {
        other.check_shape("accumulated field", self.shape())?;
        par_slice::accumulate(&mut self.data, &other.data, DEFAULT_CHUNK_SIZE);
        Ok(())
    }
}

impl<const GRID_DIMENSION: usize> FieldView<GRID_DIMENSION>
    for PhysicalParameter<GRID_DIMENSION>
{
    fn aabb(&self) -> &AABB<GRID_DIMENSION> {
        &self.aabb
    }

    fn buffer(&self) -> &[f64] {
        &self.data
    }

    fn buffer_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    fn aabb_buffer_mut(&mut self) -> (&AABB<GRID_DIMENSION>, &mut [f64]) {
        (&self.aabb, &mut self.data)
    }
}
