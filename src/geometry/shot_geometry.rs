use crate::error::*;
use crate::persistence::TraceContainer;
use crate::util::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Positions and time sampling of one stream (sources or receivers)
/// of one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotGeometry<const GRID_DIMENSION: usize> {
    coordinates: Vec<Point<GRID_DIMENSION>>,
    /// Sampling interval in ms.
    dt: f64,
    /// Number of time samples per trace.
    nt: usize,
}

impl<const GRID_DIMENSION: usize> ShotGeometry<GRID_DIMENSION> {
    pub fn new(
        coordinates: Vec<Point<GRID_DIMENSION>>,
        dt: f64,
        nt: usize,
    ) -> Result<Self> {
        let result = ShotGeometry {
            coordinates,
            dt,
            nt,
        };
        result.validate()?;
        Ok(result)
    }

    /// Build from a recording length `t` in ms, `nt = floor(t / dt) + 1`.
    pub fn from_recording_time(
        coordinates: Vec<Point<GRID_DIMENSION>>,
        dt: f64,
        t: f64,
    ) -> Result<Self> {
        if !(dt > 0.0) || !(t >= 0.0) {
            return Err(SeisError::geometry(format!(
                "invalid sampling: dt = {dt}, t = {t}"
            )));
        }
        let nt = (t / dt + SNAP_EPSILON).floor() as usize + 1;
        Self::new(coordinates, dt, nt)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.coordinates.is_empty() {
            return Err(SeisError::geometry("geometry has no coordinates"));
        }
        if let Some(p) = self
            .coordinates
            .iter()
            .find(|p| p.iter().any(|v| !v.is_finite()))
        {
            return Err(SeisError::geometry(format!(
                "non-finite coordinate {:?}",
                p.as_slice()
            )));
        }
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(SeisError::geometry(format!(
                "sampling interval must be positive, got {}",
                self.dt
            )));
        }
        if self.nt == 0 {
            return Err(SeisError::geometry("geometry has zero time samples"));
        }
        Ok(())
    }

    pub fn coordinates(&self) -> &[Point<GRID_DIMENSION>] {
        &self.coordinates
    }

    pub fn n_traces(&self) -> usize {
        self.coordinates.len()
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Recording length in ms.
    pub fn t(&self) -> f64 {
        (self.nt - 1) as f64 * self.dt
    }

    /// Keep only the listed traces, in the given order.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let coordinates = indices
            .iter()
            .map(|i| {
                self.coordinates.get(*i).copied().ok_or_else(|| {
                    SeisError::geometry(format!(
                        "trace index {i} out of range for {} traces",
                        self.n_traces()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(coordinates, self.dt, self.nt)
    }
}

/// Which stream of a stored shot an out-of-core geometry refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stream {
    Source,
    Receiver,
}

/// One shot whose geometry lives in a trace container on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct OutOfCoreShot {
    pub path: PathBuf,
    pub stream: Stream,
}

impl OutOfCoreShot {
    pub fn load<const GRID_DIMENSION: usize>(
        &self,
    ) -> Result<ShotGeometry<GRID_DIMENSION>> {
        let header = TraceContainer::<GRID_DIMENSION>::read_header(&self.path)?;
        match self.stream {
            Stream::Receiver => Ok(header.receivers),
            Stream::Source => header.source.ok_or_else(|| {
                SeisError::geometry(format!(
                    "container {:?} holds no source geometry",
                    self.path
                ))
            }),
        }
    }
}

/// Ordered per-shot geometry records.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry<const GRID_DIMENSION: usize> {
    InMemory(Vec<ShotGeometry<GRID_DIMENSION>>),
    /// Geometry is read from disk only when a shot is requested.
    OutOfCore(Vec<OutOfCoreShot>),
}

impl<const GRID_DIMENSION: usize> From<ShotGeometry<GRID_DIMENSION>>
    for Geometry<GRID_DIMENSION>
{
    fn from(shot: ShotGeometry<GRID_DIMENSION>) -> Self {
        Geometry::InMemory(vec![shot])
    }
}

impl<const GRID_DIMENSION: usize> Geometry<GRID_DIMENSION> {
    pub fn n_shots(&self) -> usize {
        match self {
            Geometry::InMemory(shots) => shots.len(),
            Geometry::OutOfCore(shots) => shots.len(),
        }
    }

    pub fn is_out_of_core(&self) -> bool {
        matches!(self, Geometry::OutOfCore(_))
    }

    /// Geometry of shot `i`, loading it from disk if needed.
    pub fn shot(&self, i: usize) -> Result<ShotGeometry<GRID_DIMENSION>> {
        let out_of_range = || {
            SeisError::geometry(format!(
                "shot {i} out of range for {} shots",
                self.n_shots()
            ))
        };
        match self {
            Geometry::InMemory(shots) => shots.get(i).cloned().ok_or_else(out_of_range),
            Geometry::OutOfCore(shots) => shots.get(i).ok_or_else(out_of_range)?.load(),
        }
    }

    /// Single-shot geometry for shot `i`, same storage kind.
    pub fn subset(&self, i: usize) -> Result<Self> {
        match self {
            Geometry::InMemory(_) => Ok(Geometry::InMemory(vec![self.shot(i)?])),
            Geometry::OutOfCore(shots) => shots
                .get(i)
                .map(|s| Geometry::OutOfCore(vec![s.clone()]))
                .ok_or_else(|| SeisError::geometry(format!("shot {i} out of range"))),
        }
    }

    /// The only shot of a single-shot geometry.
    pub fn single_shot(&self) -> Result<ShotGeometry<GRID_DIMENSION>> {
        if self.n_shots() != 1 {
            return Err(SeisError::geometry(format!(
                "expected a single-shot geometry, found {} shots",
                self.n_shots()
            )));
        }
        self.shot(0)
    }
}
