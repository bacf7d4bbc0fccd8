//! Contract between the orchestration layer and a wave-equation engine.
//!
//! An engine receives a prepared model and normalised geometries and
//! returns raw arrays. It knows nothing about shot records, windowing or
//! persistence, those are handled around it.

mod homogeneous;
mod prepared;

pub use homogeneous::*;
pub use prepared::*;

use crate::error::*;
use crate::geometry::*;
use crate::model::*;
use crate::options::Options;
use crate::records::TraceData;
use crate::source::SourceTerm;
use clap::ValueEnum;

/// Modeling operator requested by the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Operator {
    /// Nonlinear forward modeling.
    Forward,

    /// Adjoint modeling, receivers act as sources.
    Adjoint,

    /// Linearized (single scattering) modeling from a model perturbation.
    Born,

    /// Adjoint of born modeling, produces a gradient.
    AdjointBorn,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operator::Forward => "forward",
            Operator::Adjoint => "adjoint",
            Operator::Born => "born",
            Operator::AdjointBorn => "adjoint_born",
        };
        write!(f, "{name}")
    }
}

/// Dense row-major array, last axis fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl RawArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(SeisError::dimension(
                format!("raw array of shape {shape:?}"),
                expected,
                data.len(),
            ));
        }
        Ok(RawArray { shape, data })
    }

    /// `(nt, n_traces)` array from trace columns.
    pub fn from_traces(traces: &TraceData) -> Self {
        RawArray {
            shape: vec![traces.nrows(), traces.ncols()],
            data: traces.transpose().as_slice().to_vec(),
        }
    }

    /// Array shaped like `field`'s grid.
    pub fn from_field<const GRID_DIMENSION: usize>(
        field: &PhysicalParameter<GRID_DIMENSION>,
    ) -> Self {
        RawArray {
            shape: field.shape().iter().map(|n| *n as usize).collect(),
            data: field.data().to_vec(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Interpret a rank 2 array as `(nt, n_traces)` traces.
    pub fn to_traces(&self) -> Result<TraceData> {
        match self.shape.as_slice() {
            [nt, n] => Ok(TraceData::from_row_slice(*nt, *n, &self.data)),
            other => Err(SeisError::dimension("trace array rank", 2, other.len())),
        }
    }
}

/// Everything the engine produced for one call. Slots an operator does
/// not fill are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawOutput {
    pub entries: Vec<Option<RawArray>>,
}

impl RawOutput {
    pub fn single(array: RawArray) -> Self {
        RawOutput {
            entries: vec![Some(array)],
        }
    }

    pub fn tuple(entries: Vec<Option<RawArray>>) -> Self {
        RawOutput { entries }
    }

    /// Entries with content, in order.
    pub fn drop_empty(self) -> Vec<RawArray> {
        self.entries
            .into_iter()
            .flatten()
            .filter(|a| !a.is_empty())
            .collect()
    }
}

/// One engine invocation.
#[derive(Debug, Clone, Copy)]
pub struct SolverCall<'a, const GRID_DIMENSION: usize> {
    pub operator: Operator,
    pub model: &'a PreparedModel<'a, GRID_DIMENSION>,
    pub source: Option<&'a NormalizedStream<GRID_DIMENSION>>,
    /// Extended or wavefield source replacing point-source traces.
    pub source_term: Option<&'a SourceTerm<GRID_DIMENSION>>,
    pub receivers: Option<&'a ReceiverStreams<GRID_DIMENSION>>,
    pub options: &'a Options,
    /// Accumulate an illumination map while propagating.
    pub illumination: bool,
    /// Propagate forward in time.
    pub forward: bool,
}

impl<const GRID_DIMENSION: usize> SolverCall<'_, GRID_DIMENSION> {
    pub fn perturbation(&self) -> Option<&PhysicalParameter<GRID_DIMENSION>> {
        self.model.perturbation()
    }
}

/// A wave-equation engine. Implementations are stateless as far as the
/// orchestrator is concerned and may be shared between workers.
pub trait PropagationEngine<const GRID_DIMENSION: usize>: Sync {
    fn prepare_model<'a>(
        &self,
        model: &'a Model<GRID_DIMENSION>,
        options: &Options,
        perturbation: Option<&'a PhysicalParameter<GRID_DIMENSION>>,
    ) -> Result<PreparedModel<'a, GRID_DIMENSION>> {
        PreparedModel::new(model, options, perturbation)
    }

    /// Whether the engine should accumulate an illumination map.
    fn illumination(&self, model: &Model<GRID_DIMENSION>, operator: Operator) -> bool {
        model
            .illumination()
            .is_some_and(|side| side.covers(operator))
    }

    fn propagate(&self, call: &SolverCall<'_, GRID_DIMENSION>) -> Result<RawOutput>;
}
