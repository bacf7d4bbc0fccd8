//! Sequence one modeling call: normalise geometry, window the model,
//! prepare it, filter receivers, run the engine, post-process and
//! persist.

use crate::engine::*;
use crate::error::*;
use crate::geometry::adapter::{normalize_receivers, normalize_source};
use crate::geometry::*;
use crate::model::*;
use crate::options::Options;
use crate::persistence::save_to_disk;
use crate::postprocess::post_process;
use crate::records::*;
use crate::source::SourceTerm;
use crate::util::*;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Inputs of one propagation call.
#[derive(Debug, Clone)]
pub struct PropagationRequest<'a, const GRID_DIMENSION: usize> {
    pub model: &'a Model<GRID_DIMENSION>,
    pub operator: Operator,
    pub source: Option<GeometryInput<GRID_DIMENSION>>,
    pub source_term: Option<SourceTerm<GRID_DIMENSION>>,
    pub receivers: Option<GeometryInput<GRID_DIMENSION>>,
    pub receiver_data: Option<TraceData>,
    pub perturbation: Option<&'a PhysicalParameter<GRID_DIMENSION>>,
    pub options: &'a Options,
    /// Propagation direction, only forward results are persisted.
    pub forward: bool,
}

impl<'a, const GRID_DIMENSION: usize> PropagationRequest<'a, GRID_DIMENSION> {
    pub fn new(
        model: &'a Model<GRID_DIMENSION>,
        operator: Operator,
        options: &'a Options,
    ) -> Self {
        PropagationRequest {
            model,
            operator,
            source: None,
            source_term: None,
            receivers: None,
            receiver_data: None,
            perturbation: None,
            options,
            forward: matches!(operator, Operator::Forward | Operator::Born),
        }
    }

    pub fn with_source(mut self, source: impl Into<GeometryInput<GRID_DIMENSION>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_source_term(mut self, term: SourceTerm<GRID_DIMENSION>) -> Self {
        self.source_term = Some(term);
        self
    }

    pub fn with_receivers(mut self, receivers: impl Into<GeometryInput<GRID_DIMENSION>>) -> Self {
        self.receivers = Some(receivers.into());
        self
    }

    pub fn with_receiver_data(mut self, data: TraceData) -> Self {
        self.receiver_data = Some(data);
        self
    }

    pub fn with_perturbation(mut self, dm: &'a PhysicalParameter<GRID_DIMENSION>) -> Self {
        self.perturbation = Some(dm);
        self
    }

    pub fn with_direction(mut self, forward: bool) -> Self {
        self.forward = forward;
        self
    }
}

/// Embed windowed spatial results back into the caller's full grid.
fn extend_spatial<const GRID_DIMENSION: usize>(
    result: Propagated<GRID_DIMENSION>,
    grid: &Grid<GRID_DIMENSION>,
    window: &AABB<GRID_DIMENSION>,
) -> Result<Propagated<GRID_DIMENSION>> {
    Ok(match result {
        Propagated::Gradient(g) => Propagated::Gradient(g.extend_to(*grid, window)?),
        Propagated::Weights(Weights(w)) => Propagated::Weights(Weights(w.extend_to(*grid, window)?)),
        Propagated::Tuple(items) => Propagated::Tuple(
            items
                .into_iter()
                .map(|item| extend_spatial(item, grid, window))
                .collect::<Result<Vec<_>>>()?,
        ),
        other => other,
    })
}

/// Runs propagation requests against one engine.
/// The engine is borrowed, so one instance serves every worker.
pub struct Propagator<'e, E> {
    engine: &'e E,
}

impl<'e, E> Propagator<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Propagator { engine }
    }

    pub fn engine(&self) -> &'e E {
        self.engine
    }

    pub fn propagate<const GRID_DIMENSION: usize>(
        &self,
        request: &PropagationRequest<'_, GRID_DIMENSION>,
    ) -> Result<Propagated<GRID_DIMENSION>>
    where
        E: PropagationEngine<GRID_DIMENSION>,
    {
        profiling::scope!("orchestrator::propagate");
        let options = request.options;
        let operator = request.operator;
        options.validate()?;

        // Point-source traces travel with the source geometry.
        let (source_traces, source_term) = match &request.source_term {
            Some(SourceTerm::Traces(traces)) => (Some(traces), None),
            other => (None, other.as_ref()),
        };
        let source = normalize_source(request.source.as_ref(), source_traces)?;
        let receivers = normalize_receivers(
            request.receivers.as_ref(),
            request.receiver_data.as_ref(),
            options.mc,
        )?;
        debug!(
            "{operator}: {} source position(s), receivers {:?}",
            source.as_ref().map_or(0, |s| s.geometry.n_traces()),
            receivers
                .as_ref()
                .map(|r| r.geometries().iter().map(|g| g.n_traces()).collect::<Vec<_>>())
        );

        if operator == Operator::Born {
            let dm = request.perturbation.ok_or_else(|| {
                SeisError::dimension("born perturbation", "a field on the model grid", "none")
            })?;
            if dm.norm() == 0.0 {
                let geometry = &receivers
                    .as_ref()
                    .ok_or_else(|| SeisError::geometry("born modeling needs receivers"))?
                    .primary()
                    .geometry;
                info!("zero perturbation, skipping the engine");
                return Ok(if options.return_array {
                    Propagated::Array(TraceData::zeros(geometry.nt(), geometry.n_traces()))
                } else {
                    Propagated::ShotRecord(ShotRecord::zeros(geometry.clone()))
                });
            }
        }

        let illumination = self.engine.illumination(request.model, operator);

        let windowed = if options.limit_m {
            if source_term.is_some_and(|t| t.is_wavefield()) {
                warn!("wavefield sources span the whole grid, model is not windowed");
                None
            } else {
                let receiver_geometries = receivers
                    .as_ref()
                    .map(|r| r.geometries())
                    .unwrap_or_default();
                Some(limit_model_to_receiver_area(
                    source.as_ref().map(|s| &s.geometry),
                    &receiver_geometries,
                    request.model,
                    options.buffer_size,
                    request.perturbation,
                )?)
            }
        } else {
            None
        };
        let cropped_term = match (&windowed, source_term) {
            (Some(w), Some(term)) => Some(term.crop(&w.window)),
            _ => None,
        };
        let source_term = cropped_term.as_ref().or(source_term);
        let (model, perturbation) = match &windowed {
            Some(w) => (&w.model, w.perturbation.as_ref()),
            None => (request.model, request.perturbation),
        };

        let prepared = self.engine.prepare_model(model, options, perturbation)?;

        let receivers = receivers
            .map(|r| r.try_map(|s| filter_receivers(s, &prepared)))
            .transpose()?;

        let call = SolverCall {
            operator,
            model: &prepared,
            source: source.as_ref(),
            source_term,
            receivers: receivers.as_ref(),
            options,
            illumination,
            forward: request.forward,
        };
        let entries = {
            profiling::scope!("orchestrator::engine");
            self.engine.propagate(&call)?.drop_empty()
        };
        debug!("engine returned {} entries", entries.len());

        let mut result = post_process(
            entries,
            operator,
            &prepared,
            source.as_ref().map(|s| &s.geometry),
            receivers.as_ref(),
            options,
        )?;
        if let Some(w) = &windowed {
            result = extend_spatial(result, request.model.grid(), &w.window)?;
        }

        save_to_disk(result, source.as_ref(), options, request.forward)
    }

    /// Run independent requests on the rayon pool, results in request order.
    pub fn propagate_batch<const GRID_DIMENSION: usize>(
        &self,
        requests: &[PropagationRequest<'_, GRID_DIMENSION>],
    ) -> Vec<Result<Propagated<GRID_DIMENSION>>>
    where
        E: PropagationEngine<GRID_DIMENSION>,
    {
        requests.par_iter().map(|r| self.propagate(r)).collect()
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Fails the test if the engine is reached.
    struct Unreachable;

    impl PropagationEngine<2> for Unreachable {
        fn propagate(&self, _call: &SolverCall<'_, 2>) -> Result<RawOutput> {
            panic!("engine must not be called");
        }
    }

    fn model() -> Model<2> {
        let grid = Grid::new(vector![21, 11], vector![10.0, 10.0], vector![0.0, 0.0]).unwrap();
        Model::acoustic_from_velocity(&PhysicalParameter::constant(grid, 1.5), 5).unwrap()
    }

    fn receivers() -> ShotGeometry<2> {
        let coords = (0..4).map(|i| vector![20.0 * i as f64, 0.0]).collect();
        ShotGeometry::new(coords, 2.0, 51).unwrap()
    }

    #[test]
    fn born_zero_perturbation_test() {
        let model = model();
        let options = Options::default();
        let dm = PhysicalParameter::zeros(*model.grid());
        let request = PropagationRequest::new(&model, Operator::Born, &options)
            .with_source(ShotGeometry::new(vec![vector![100.0, 0.0]], 2.0, 51).unwrap())
            .with_receivers(receivers())
            .with_perturbation(&dm);
        let result = Propagator::new(&Unreachable).propagate(&request).unwrap();
        let record = result.into_shot_record().unwrap();
        assert_eq!(record.geometry(), &receivers());
        let data = record.data().unwrap();
        assert_eq!(data.shape(), (51, 4));
        assert!(data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn born_needs_perturbation_test() {
        let model = model();
        let options = Options::default();
        let request = PropagationRequest::new(&model, Operator::Born, &options)
            .with_receivers(receivers());
        assert!(matches!(
            Propagator::new(&Unreachable).propagate(&request),
            Err(SeisError::Dimension { .. })
        ));
    }

    #[test]
    fn default_direction_test() {
        let model = model();
        let options = Options::default();
        assert!(PropagationRequest::new(&model, Operator::Forward, &options).forward);
        assert!(!PropagationRequest::new(&model, Operator::Adjoint, &options).forward);
        assert!(!PropagationRequest::new(&model, Operator::AdjointBorn, &options).forward);
    }

    #[test]
    fn extend_spatial_test() {
        let model = model();
        let window = AABB::new(matrix![5, 9; 0, 10]);
        let g = PhysicalParameter::constant(model.grid().sub_grid(&window), 1.0);
        let result = extend_spatial(
            Propagated::Tuple(vec![Propagated::Gradient(g)]),
            model.grid(),
            &window,
        )
        .unwrap();
        let full = result.into_tuple().unwrap().remove(0).into_gradient().unwrap();
        assert_eq!(full.grid(), model.grid());
        assert_eq!(full.view(&vector![5, 3]), 1.0);
        assert_eq!(full.view(&vector![4, 3]), 0.0);
    }
}
