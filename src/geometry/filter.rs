use crate::engine::PreparedModel;
use crate::error::*;
use crate::geometry::*;
use tracing::debug;

/// Drop receivers outside the physical domain of `model`.
/// Survivors keep their relative order, data columns follow them.
pub fn filter_receivers<const GRID_DIMENSION: usize>(
    stream: &NormalizedStream<GRID_DIMENSION>,
    model: &PreparedModel<'_, GRID_DIMENSION>,
) -> Result<NormalizedStream<GRID_DIMENSION>> {
    let keep: Vec<usize> = stream
        .geometry
        .coordinates()
        .iter()
        .enumerate()
        .filter(|(_, p)| model.contains_point(p))
        .map(|(i, _)| i)
        .collect();

    let n = stream.geometry.n_traces();
    if keep.len() == n {
        return Ok(stream.clone());
    }
    if keep.is_empty() {
        return Err(SeisError::domain(format!(
            "all {n} receivers lie outside the model domain"
        )));
    }
    debug!("filtered receivers: kept {} of {n}", keep.len());

    let geometry = stream.geometry.select(&keep)?;
    let data = stream.data.as_ref().map(|d| d.select_columns(keep.iter()));
    NormalizedStream::new(geometry, data)
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::model::*;
    use crate::options::Options;
    use crate::records::TraceData;
    use crate::util::*;

    fn model() -> Model<2> {
        let grid = Grid::new(vector![11, 11], vector![10.0, 10.0], vector![0.0, 0.0])
            .unwrap();
        Model::acoustic_from_velocity(&PhysicalParameter::constant(grid, 1.5), 5).unwrap()
    }

    #[test]
    fn keeps_order_and_columns_test() {
        let xs = [-10.0, 0.0, 50.0, 120.0, 100.0, 30.0];
        let coords = xs.iter().map(|x| vector![*x, 5.0]).collect();
        let geometry = ShotGeometry::new(coords, 1.0, 4).unwrap();
        let data = TraceData::from_fn(4, 6, |_, j| j as f64);
        let stream = NormalizedStream::new(geometry, Some(data)).unwrap();

        let model = model();
        let prepared = PreparedModel::new(&model, &Options::default(), None).unwrap();
        let filtered = filter_receivers(&stream, &prepared).unwrap();
        assert_eq!(filtered.geometry.n_traces(), 4);
        let kept_x: Vec<f64> = filtered.geometry.coordinates().iter().map(|p| p[0]).collect();
        assert_eq!(kept_x, vec![0.0, 50.0, 100.0, 30.0]);
        let data = filtered.data.unwrap();
        assert_eq!(data.shape(), (4, 4));
        assert_eq!(data.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn all_outside_test() {
        let geometry = ShotGeometry::new(vec![vector![500.0, 5.0]], 1.0, 4).unwrap();
        let stream = NormalizedStream::new(geometry, None).unwrap();
        let model = model();
        let prepared = PreparedModel::new(&model, &Options::default(), None).unwrap();
        assert!(matches!(
            filter_receivers(&stream, &prepared),
            Err(SeisError::Domain { .. })
        ));
    }
}
