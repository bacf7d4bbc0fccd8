//! Restrict a model to the lateral area covered by one shot.
//!
//! Only lateral axes are cropped, the depth axis (last) is kept whole
//! so the window still covers every source/receiver position.

use crate::error::*;
use crate::geometry::ShotGeometry;
use crate::model::*;
use crate::util::*;
use tracing::debug;

/// Windowed copy of a model and its perturbation.
#[derive(Debug, Clone)]
pub struct WindowedModel<const GRID_DIMENSION: usize> {
    pub model: Model<GRID_DIMENSION>,
    pub perturbation: Option<PhysicalParameter<GRID_DIMENSION>>,
    /// Window in the index space of the original grid.
    pub window: AABB<GRID_DIMENSION>,
}

/// Index box of `grid` covering all positions plus `buffer` laterally,
/// clipped to the grid.
pub fn receiver_area<'a, const GRID_DIMENSION: usize, I>(
    grid: &Grid<GRID_DIMENSION>,
    positions: I,
    buffer: f64,
) -> Result<AABB<GRID_DIMENSION>>
where
    I: IntoIterator<Item = &'a Point<GRID_DIMENSION>>,
{
    let mut iter = positions.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| SeisError::geometry("no source or receiver positions to window around"))?;
    let (mut lo, mut hi) = (*first, *first);
    for p in iter {
        lo = lo.inf(p);
        hi = hi.sup(p);
    }

    let full = grid.aabb();
    let mut window = full;
    for d in 0..GRID_DIMENSION.saturating_sub(1) {
        let mut min_p = lo;
        let mut max_p = hi;
        min_p[d] -= buffer;
        max_p[d] += buffer;
        window.bounds[(d, 0)] = grid.floor_index(&min_p)[d];
        window.bounds[(d, 1)] = grid.ceil_index(&max_p)[d];
    }

    window.intersection(&full).ok_or_else(|| {
        SeisError::domain(format!(
            "source/receiver area {window} lies outside the model grid {full}"
        ))
    })
}

/// Crop `model` (and `perturbation`) to the area spanned by the shot.
/// Inputs are never modified.
pub fn limit_model_to_receiver_area<const GRID_DIMENSION: usize>(
    sources: Option<&ShotGeometry<GRID_DIMENSION>>,
    receivers: &[&ShotGeometry<GRID_DIMENSION>],
    model: &Model<GRID_DIMENSION>,
    buffer: f64,
    perturbation: Option<&PhysicalParameter<GRID_DIMENSION>>,
) -> Result<WindowedModel<GRID_DIMENSION>> {
    profiling::scope!("window::limit_model_to_receiver_area");
    if let Some(dm) = perturbation {
        dm.check_shape("perturbation", model.grid().shape())?;
    }

    let positions = sources
        .into_iter()
        .chain(receivers.iter().copied())
        .flat_map(|g| g.coordinates().iter());
    let window = receiver_area(model.grid(), positions, buffer)?;
    debug!(
        "windowing model {} -> {} (buffer {buffer})",
        model.grid().aabb(),
        window
    );

    Ok(WindowedModel {
        model: model.crop(&window),
        perturbation: perturbation.map(|dm| dm.crop(&window)),
        window,
    })
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn model() -> Model<2> {
        let grid =
            Grid::new(vector![201, 101], vector![10.0, 10.0], vector![0.0, 0.0])
                .unwrap();
        let vp = PhysicalParameter::from_fn(grid, |c: Coord<2>| 1.5 + c[1] as f64 * 0.01, 64);
        Model::acoustic_from_velocity(&vp, 40).unwrap()
    }

    fn line(x0: f64, x1: f64, n: usize, z: f64) -> ShotGeometry<2> {
        let coords = (0..n)
            .map(|i| {
                let x = x0 + (x1 - x0) * i as f64 / (n.max(2) - 1) as f64;
                vector![x, z]
            })
            .collect();
        ShotGeometry::new(coords, 2.0, 501).unwrap()
    }

    #[test]
    fn window_bounds_test() {
        let model = model();
        let src = line(500.0, 500.0, 1, 20.0);
        let rec = line(400.0, 800.0, 10, 30.0);
        let w = limit_model_to_receiver_area(Some(&src), &[&rec], &model, 50.0, None)
            .unwrap();
        assert_eq!(w.window, AABB::new(matrix![35, 85; 0, 100]));
        assert_eq!(*w.model.grid().shape(), vector![51, 101]);
        assert_approx_eq!(f64, w.model.grid().origin()[0], 350.0);
        // Absolute coordinates still valid in the cropped frame.
        for p in src.coordinates().iter().chain(rec.coordinates()) {
            assert!(w.model.grid().contains_point(p));
        }
    }

    #[test]
    fn window_clips_to_domain_test() {
        let model = model();
        let rec = line(0.0, 100.0, 5, 0.0);
        let w = limit_model_to_receiver_area(None, &[&rec], &model, 5000.0, None)
            .unwrap();
        assert_eq!(w.window, model.grid().aabb());
    }

    #[test]
    fn window_is_idempotent_test() {
        let model = model();
        let src = line(1234.5, 1234.5, 1, 10.0);
        let rec = line(1010.0, 1537.3, 17, 10.0);
        let first =
            limit_model_to_receiver_area(Some(&src), &[&rec], &model, 75.0, None)
                .unwrap();
        let second = limit_model_to_receiver_area(
            Some(&src),
            &[&rec],
            &first.model,
            75.0,
            None,
        )
        .unwrap();
        assert_eq!(second.window, first.model.grid().aabb());
        assert_eq!(second.model.grid(), first.model.grid());
    }

    #[test]
    fn perturbation_cropped_and_checked_test() {
        let model = model();
        let rec = line(400.0, 600.0, 3, 0.0);
        let dm = PhysicalParameter::from_fn(*model.grid(), |c: Coord<2>| c[0] as f64, 64);
        let w = limit_model_to_receiver_area(None, &[&rec], &model, 0.0, Some(&dm))
            .unwrap();
        let cropped = w.perturbation.unwrap();
        assert_eq!(cropped.shape(), w.model.grid().shape());
        assert_eq!(cropped.view(&vector![0, 0]), 40.0);

        let wrong = PhysicalParameter::zeros(*w.model.grid());
        assert!(matches!(
            limit_model_to_receiver_area(None, &[&rec], &model, 0.0, Some(&wrong)),
            Err(SeisError::Dimension { .. })
        ));
    }

    #[test]
    fn window_union_of_streams_test() {
        let model = model();
        let pressure = line(300.0, 400.0, 3, 0.0);
        let velocity = line(900.0, 1000.0, 3, 0.0);
        let w = limit_model_to_receiver_area(
            None,
            &[&pressure, &velocity],
            &model,
            0.0,
            None,
        )
        .unwrap();
        assert_eq!(w.window, AABB::new(matrix![30, 100; 0, 100]));
    }

    #[test]
    fn outside_domain_test() {
        let model = model();
        let rec = line(5000.0, 6000.0, 3, 0.0);
        assert!(matches!(
            limit_model_to_receiver_area(None, &[&rec], &model, 10.0, None),
            Err(SeisError::Domain { .. })
        ));
    }
}
