use crate::error::*;
use crate::model::*;
use crate::options::Options;
use crate::util::*;
use tracing::debug;

/// Engine-ready view of a model: absorbing padding, time step and the
/// validated perturbation.
#[derive(Debug, Clone)]
pub struct PreparedModel<'a, const GRID_DIMENSION: usize> {
    model: &'a Model<GRID_DIMENSION>,
    perturbation: Option<&'a PhysicalParameter<GRID_DIMENSION>>,
    padsizes: [(usize, usize); GRID_DIMENSION],
    padded_grid: Grid<GRID_DIMENSION>,
    dt: f64,
    space_order: usize,
}

impl<'a, const GRID_DIMENSION: usize> PreparedModel<'a, GRID_DIMENSION> {
    pub fn new(
        model: &'a Model<GRID_DIMENSION>,
        options: &Options,
        perturbation: Option<&'a PhysicalParameter<GRID_DIMENSION>>,
    ) -> Result<Self> {
        if let Some(dm) = perturbation {
            dm.check_shape("perturbation", model.grid().shape())?;
        }

        let nb = model.nb();
        let mut padsizes = [(nb, nb); GRID_DIMENSION];
        if options.free_surface && GRID_DIMENSION > 0 {
            // No absorbing layer above the free surface.
            padsizes[GRID_DIMENSION - 1].0 = 0;
        }
        let padded_grid = model.grid().padded(&padsizes);
        let dt = options.dt_comp.unwrap_or_else(|| model.critical_dt());
        debug!(
            "prepared {:?} model: padded shape {:?}, dt {dt} ms",
            model.kind(),
            padded_grid.shape().as_slice()
        );

        Ok(PreparedModel {
            model,
            perturbation,
            padsizes,
            padded_grid,
            dt,
            space_order: options.space_order,
        })
    }

    pub fn model(&self) -> &'a Model<GRID_DIMENSION> {
        self.model
    }

    pub fn perturbation(&self) -> Option<&'a PhysicalParameter<GRID_DIMENSION>> {
        self.perturbation
    }

    /// Physical (unpadded) grid.
    pub fn grid(&self) -> &Grid<GRID_DIMENSION> {
        self.model.grid()
    }

    pub fn padded_grid(&self) -> &Grid<GRID_DIMENSION> {
        &self.padded_grid
    }

    pub fn spacing(&self) -> &Point<GRID_DIMENSION> {
        self.model.grid().spacing()
    }

    pub fn origin(&self) -> &Point<GRID_DIMENSION> {
        self.model.grid().origin()
    }

    /// `(before, after)` padding per axis, in grid points.
    pub fn padsizes(&self) -> &[(usize, usize); GRID_DIMENSION] {
        &self.padsizes
    }

    /// Index box of the physical grid inside the padded grid.
    pub fn physical_aabb(&self) -> AABB<GRID_DIMENSION> {
        let offset = Coord::<GRID_DIMENSION>::from_fn(|d, _| self.padsizes[d].0 as i32);
        let shape = self.grid().shape();
        AABB::from_mm(offset, offset + shape.add_scalar(-1))
    }

    pub fn is_elastic(&self) -> bool {
        self.model.is_elastic()
    }

    pub fn kind(&self) -> MediumKind {
        self.model.kind()
    }

    pub fn dim(&self) -> usize {
        GRID_DIMENSION
    }

    /// Engine time step in ms.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn space_order(&self) -> usize {
        self.space_order
    }

    /// Whether `point` lies inside the physical domain.
    pub fn contains_point(&self, point: &Point<GRID_DIMENSION>) -> bool {
        self.model.grid().contains_point(point)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn model() -> Model<2> {
        let grid = Grid::new(vector![21, 11], vector![10.0, 5.0], vector![0.0, 0.0])
            .unwrap();
        Model::acoustic_from_velocity(&PhysicalParameter::constant(grid, 2.0), 4).unwrap()
    }

    #[test]
    fn padding_test() {
        let model = model();
        let p = PreparedModel::new(&model, &Options::default(), None).unwrap();
        assert_eq!(p.padsizes(), &[(4, 4), (4, 4)]);
        assert_eq!(*p.padded_grid().shape(), vector![29, 19]);
        assert_eq!(p.physical_aabb(), AABB::new(matrix![4, 24; 4, 14]));
        assert_eq!(p.dim(), 2);
        assert!(!p.is_elastic());

        let options = Options {
            free_surface: true,
            ..Options::default()
        };
        let p = PreparedModel::new(&model, &options, None).unwrap();
        assert_eq!(p.padsizes(), &[(4, 4), (0, 4)]);
        assert_eq!(p.physical_aabb(), AABB::new(matrix![4, 24; 0, 10]));
    }

    #[test]
    fn time_step_test() {
        let model = model();
        let p = PreparedModel::new(&model, &Options::default(), None).unwrap();
        assert_approx_eq!(f64, p.dt(), 0.38 * 5.0 / 2.0);
        let options = Options {
            dt_comp: Some(0.25),
            ..Options::default()
        };
        let p = PreparedModel::new(&model, &options, None).unwrap();
        assert_eq!(p.dt(), 0.25);
    }

    #[test]
    fn perturbation_shape_test() {
        let model = model();
        let other = Grid::new(vector![20, 11], vector![10.0, 5.0], vector![0.0, 0.0])
            .unwrap();
        let dm = PhysicalParameter::zeros(other);
        assert!(matches!(
            PreparedModel::new(&model, &Options::default(), Some(&dm)),
            Err(SeisError::Dimension { .. })
        ));
    }
}
