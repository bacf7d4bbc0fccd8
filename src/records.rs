//! Typed results handed back to callers.

use crate::error::*;
use crate::geometry::ShotGeometry;
use crate::model::*;
use crate::persistence::TraceContainer;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Traces as a `(nt, n_traces)` matrix, one column per trace.
pub type TraceData = nalgebra::DMatrix<f64>;

/// Fail unless `data` is shaped `(geometry.nt, geometry.n_traces)`.
pub fn check_trace_shape<const GRID_DIMENSION: usize>(
    what: &str,
    geometry: &ShotGeometry<GRID_DIMENSION>,
    data: &TraceData,
) -> Result<()> {
    let expected = (geometry.nt(), geometry.n_traces());
    if data.shape() != expected {
        return Err(SeisError::dimension(what, expected, data.shape()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum TraceStorage {
    InMemory(TraceData),
    /// Traces live in a trace container written by the persistence gate.
    Container(PathBuf),
}

/// Time series per receiver tied to the geometry that recorded them.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotRecord<const GRID_DIMENSION: usize> {
    geometry: ShotGeometry<GRID_DIMENSION>,
    storage: TraceStorage,
}

impl<const GRID_DIMENSION: usize> ShotRecord<GRID_DIMENSION> {
    pub fn new(geometry: ShotGeometry<GRID_DIMENSION>, data: TraceData) -> Result<Self> {
        check_trace_shape("shot record", &geometry, &data)?;
        Ok(ShotRecord {
            geometry,
            storage: TraceStorage::InMemory(data),
        })
    }

    pub fn zeros(geometry: ShotGeometry<GRID_DIMENSION>) -> Self {
        let data = TraceData::zeros(geometry.nt(), geometry.n_traces());
        ShotRecord {
            geometry,
            storage: TraceStorage::InMemory(data),
        }
    }

    /// Lightweight record whose traces stay on disk.
    pub fn from_container(geometry: ShotGeometry<GRID_DIMENSION>, path: PathBuf) -> Self {
        ShotRecord {
            geometry,
            storage: TraceStorage::Container(path),
        }
    }

    /// Reconstruct a record from a container, reading only its header.
    pub fn open<P: AsRef<Path>>(path: &P) -> Result<Self> {
        let header = TraceContainer::<GRID_DIMENSION>::read_header(path)?;
        Ok(Self::from_container(
            header.receivers,
            path.as_ref().to_path_buf(),
        ))
    }

    pub fn geometry(&self) -> &ShotGeometry<GRID_DIMENSION> {
        &self.geometry
    }

    pub fn is_on_disk(&self) -> bool {
        matches!(self.storage, TraceStorage::Container(_))
    }

    pub fn container_path(&self) -> Option<&Path> {
        match &self.storage {
            TraceStorage::Container(path) => Some(path),
            TraceStorage::InMemory(_) => None,
        }
    }

    /// Trace data, loaded from disk for container-backed records.
    pub fn data(&self) -> Result<Cow<'_, TraceData>> {
        match &self.storage {
            TraceStorage::InMemory(data) => Ok(Cow::Borrowed(data)),
            TraceStorage::Container(path) => {
                let container = TraceContainer::<GRID_DIMENSION>::read(path)?;
                check_trace_shape("stored shot record", &self.geometry, &container.traces)?;
                Ok(Cow::Owned(container.traces))
            }
        }
    }

    pub fn into_parts(self) -> Result<(ShotGeometry<GRID_DIMENSION>, TraceData)> {
        let data = self.data()?.into_owned();
        Ok((self.geometry, data))
    }
}

/// Full-domain time snapshots on the physical grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavefield<const GRID_DIMENSION: usize> {
    /// Time step between snapshots in ms, the engine's internal step.
    dt: f64,
    snapshots: Vec<PhysicalParameter<GRID_DIMENSION>>,
}

impl<const GRID_DIMENSION: usize> Wavefield<GRID_DIMENSION> {
    pub fn new(dt: f64, snapshots: Vec<PhysicalParameter<GRID_DIMENSION>>) -> Result<Self> {
        if let Some(first) = snapshots.first() {
            for s in &snapshots[1..] {
                s.check_shape("wavefield snapshot", first.shape())?;
            }
        }
        Ok(Wavefield { dt, snapshots })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn nt(&self) -> usize {
        self.snapshots.len()
    }

    pub fn snapshots(&self) -> &[PhysicalParameter<GRID_DIMENSION>] {
        &self.snapshots
    }

    pub fn grid(&self) -> Option<&Grid<GRID_DIMENSION>> {
        self.snapshots.first().map(|s| s.grid())
    }
}

/// One value per grid cell, e.g. an extended-source distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights<const GRID_DIMENSION: usize>(pub PhysicalParameter<GRID_DIMENSION>);

/// Result of one propagation call.
#[derive(Debug, Clone, PartialEq)]
pub enum Propagated<const GRID_DIMENSION: usize> {
    ShotRecord(ShotRecord<GRID_DIMENSION>),
    /// Resampled traces without a geometry, when `return_array` is set.
    Array(TraceData),
    Wavefield(Wavefield<GRID_DIMENSION>),
    Weights(Weights<GRID_DIMENSION>),
    Gradient(PhysicalParameter<GRID_DIMENSION>),
    /// Multi-output calls: primary result first, then any gradients.
    Tuple(Vec<Propagated<GRID_DIMENSION>>),
}

impl<const GRID_DIMENSION: usize> Propagated<GRID_DIMENSION> {
    pub fn as_shot_record(&self) -> Option<&ShotRecord<GRID_DIMENSION>> {
        match self {
            Propagated::ShotRecord(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_shot_record(self) -> Option<ShotRecord<GRID_DIMENSION>> {
        match self {
            Propagated::ShotRecord(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_gradient(self) -> Option<PhysicalParameter<GRID_DIMENSION>> {
        match self {
            Propagated::Gradient(g) => Some(g),
            _ => None,
        }
    }

    pub fn into_tuple(self) -> Option<Vec<Propagated<GRID_DIMENSION>>> {
        match self {
            Propagated::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Propagated::ShotRecord(_) => "shot record",
            Propagated::Array(_) => "array",
            Propagated::Wavefield(_) => "wavefield",
            Propagated::Weights(_) => "weights",
            Propagated::Gradient(_) => "gradient",
            Propagated::Tuple(_) => "tuple",
        }
    }
}
