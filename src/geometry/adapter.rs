//! Normalise the ways callers describe a geometry into one shape:
//! a single-shot `ShotGeometry` plus optional traces.

use crate::error::*;
use crate::geometry::*;
use crate::persistence::TraceContainer;
use crate::records::*;
use crate::util::*;
use std::path::PathBuf;
use tracing::debug;

/// Anything a caller may pass where a geometry is expected.
#[derive(Debug, Clone)]
pub enum GeometryInput<const GRID_DIMENSION: usize> {
    /// Canonical geometry, must hold exactly one shot.
    Geometry(Geometry<GRID_DIMENSION>),
    /// Raw descriptor, recording length `t` and interval `dt` in ms.
    Coordinates {
        coordinates: Vec<Point<GRID_DIMENSION>>,
        dt: f64,
        t: f64,
    },
    /// Data that carries its own geometry.
    Record(ShotRecord<GRID_DIMENSION>),
    /// Trace container on disk, read lazily.
    Container(PathBuf),
    /// Pressure and particle-velocity receivers, only valid with `mc`.
    MultiComponent {
        pressure: Box<GeometryInput<GRID_DIMENSION>>,
        velocity: Box<GeometryInput<GRID_DIMENSION>>,
    },
}

impl<const GRID_DIMENSION: usize> From<ShotGeometry<GRID_DIMENSION>>
    for GeometryInput<GRID_DIMENSION>
{
    fn from(geometry: ShotGeometry<GRID_DIMENSION>) -> Self {
        GeometryInput::Geometry(geometry.into())
    }
}

impl<const GRID_DIMENSION: usize> From<ShotRecord<GRID_DIMENSION>>
    for GeometryInput<GRID_DIMENSION>
{
    fn from(record: ShotRecord<GRID_DIMENSION>) -> Self {
        GeometryInput::Record(record)
    }
}

/// One stream of one shot, ready for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStream<const GRID_DIMENSION: usize> {
    pub geometry: ShotGeometry<GRID_DIMENSION>,
    pub data: Option<TraceData>,
}

impl<const GRID_DIMENSION: usize> NormalizedStream<GRID_DIMENSION> {
    pub fn new(
        geometry: ShotGeometry<GRID_DIMENSION>,
        data: Option<TraceData>,
    ) -> Result<Self> {
        if let Some(d) = &data {
            check_trace_shape("stream data", &geometry, d)?;
        }
        Ok(NormalizedStream { geometry, data })
    }
}

/// Receiver side of a call: one stream, or pressure and velocity
/// streams when multi-component.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverStreams<const GRID_DIMENSION: usize> {
    Single(NormalizedStream<GRID_DIMENSION>),
    Paired {
        pressure: NormalizedStream<GRID_DIMENSION>,
        velocity: NormalizedStream<GRID_DIMENSION>,
    },
}

impl<const GRID_DIMENSION: usize> ReceiverStreams<GRID_DIMENSION> {
    /// The single stream, or the pressure stream.
    pub fn primary(&self) -> &NormalizedStream<GRID_DIMENSION> {
        match self {
            ReceiverStreams::Single(s) => s,
            ReceiverStreams::Paired { pressure, .. } => pressure,
        }
    }

    pub fn is_paired(&self) -> bool {
        matches!(self, ReceiverStreams::Paired { .. })
    }

    pub fn geometries(&self) -> Vec<&ShotGeometry<GRID_DIMENSION>> {
        match self {
            ReceiverStreams::Single(s) => vec![&s.geometry],
            ReceiverStreams::Paired { pressure, velocity } => {
                vec![&pressure.geometry, &velocity.geometry]
            }
        }
    }

    /// Apply `f` to every stream, keeping the pairing.
    pub fn try_map<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&NormalizedStream<GRID_DIMENSION>) -> Result<NormalizedStream<GRID_DIMENSION>>,
    {
        Ok(match self {
            ReceiverStreams::Single(s) => ReceiverStreams::Single(f(s)?),
            ReceiverStreams::Paired { pressure, velocity } => ReceiverStreams::Paired {
                pressure: f(pressure)?,
                velocity: f(velocity)?,
            },
        })
    }
}

/// Resolve one input into a geometry and its traces.
/// Explicit `data` wins over traces embedded in the input.
pub fn normalize_stream<const GRID_DIMENSION: usize>(
    input: &GeometryInput<GRID_DIMENSION>,
    data: Option<&TraceData>,
    stream: Stream,
) -> Result<NormalizedStream<GRID_DIMENSION>> {
    let explicit = data.cloned();
    match input {
        GeometryInput::Geometry(geometry) => {
            NormalizedStream::new(geometry.single_shot()?, explicit)
        }
        GeometryInput::Coordinates { coordinates, dt, t } => NormalizedStream::new(
            ShotGeometry::from_recording_time(coordinates.clone(), *dt, *t)?,
            explicit,
        ),
        GeometryInput::Record(record) => {
            let data = match explicit {
                Some(d) => d,
                None => record.data()?.into_owned(),
            };
            NormalizedStream::new(record.geometry().clone(), Some(data))
        }
        GeometryInput::Container(path) => {
            let header = TraceContainer::<GRID_DIMENSION>::read_header(path)?;
            match stream {
                Stream::Receiver => {
                    let data = match explicit {
                        Some(d) => Some(d),
                        None => Some(TraceContainer::<GRID_DIMENSION>::read(path)?.traces),
                    };
                    NormalizedStream::new(header.receivers, data)
                }
                Stream::Source => {
                    let geometry = header.source.ok_or_else(|| {
                        SeisError::geometry(format!(
                            "container {path:?} holds no source geometry"
                        ))
                    })?;
                    let data = match explicit {
                        Some(d) => Some(d),
                        None => TraceContainer::<GRID_DIMENSION>::read(path)?.source_data,
                    };
                    NormalizedStream::new(geometry, data)
                }
            }
        }
        GeometryInput::MultiComponent { .. } => Err(SeisError::geometry(
            "multi-component geometry is only valid for receivers",
        )),
    }
}

/// Normalise the source side of a call.
pub fn normalize_source<const GRID_DIMENSION: usize>(
    input: Option<&GeometryInput<GRID_DIMENSION>>,
    data: Option<&TraceData>,
) -> Result<Option<NormalizedStream<GRID_DIMENSION>>> {
    match input {
        Some(input) => Ok(Some(normalize_stream(input, data, Stream::Source)?)),
        None if data.is_some() => Err(SeisError::geometry(
            "source data supplied without a source geometry",
        )),
        None => Ok(None),
    }
}

/// Normalise the receiver side of a call.
/// With `mc` a single input feeds both pressure and velocity streams,
/// explicit data always goes to the pressure stream.
pub fn normalize_receivers<const GRID_DIMENSION: usize>(
    input: Option<&GeometryInput<GRID_DIMENSION>>,
    data: Option<&TraceData>,
    mc: bool,
) -> Result<Option<ReceiverStreams<GRID_DIMENSION>>> {
    let Some(input) = input else {
        if data.is_some() {
            return Err(SeisError::geometry(
                "receiver data supplied without a receiver geometry",
            ));
        }
        return Ok(None);
    };

    let streams = match (input, mc) {
        (GeometryInput::MultiComponent { .. }, false) => {
            return Err(SeisError::geometry(
                "multi-component receivers require the mc option",
            ));
        }
        (GeometryInput::MultiComponent { pressure, velocity }, true) => {
            ReceiverStreams::Paired {
                pressure: normalize_stream(pressure, data, Stream::Receiver)?,
                velocity: normalize_stream(velocity, None, Stream::Receiver)?,
            }
        }
        (single, true) => {
            let pressure = normalize_stream(single, data, Stream::Receiver)?;
            let velocity = NormalizedStream::new(pressure.geometry.clone(), None)?;
            ReceiverStreams::Paired { pressure, velocity }
        }
        (single, false) => {
            ReceiverStreams::Single(normalize_stream(single, data, Stream::Receiver)?)
        }
    };
    debug!(
        "receivers normalised: {} stream(s), {:?} traces",
        streams.geometries().len(),
        streams
            .geometries()
            .iter()
            .map(|g| g.n_traces())
            .collect::<Vec<_>>()
    );
    Ok(Some(streams))
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn line(n: usize, z: f64) -> ShotGeometry<2> {
        let coords = (0..n).map(|i| vector![i as f64 * 10.0, z]).collect();
        ShotGeometry::new(coords, 2.0, 11).unwrap()
    }

    #[test]
    fn coordinates_input_test() {
        let input = GeometryInput::Coordinates {
            coordinates: vec![vector![0.0, 10.0]],
            dt: 2.0,
            t: 20.0,
        };
        let s = normalize_source(Some(&input), None).unwrap().unwrap();
        assert_eq!(s.geometry.nt(), 11);
        assert!(s.data.is_none());

        let bad = GeometryInput::<2>::Coordinates {
            coordinates: vec![],
            dt: 2.0,
            t: 20.0,
        };
        assert!(matches!(
            normalize_source(Some(&bad), None),
            Err(SeisError::Geometry { .. })
        ));
    }

    #[test]
    fn explicit_data_wins_test() {
        let g = line(3, 0.0);
        let embedded = TraceData::from_element(11, 3, 1.0);
        let explicit = TraceData::from_element(11, 3, 2.0);
        let input = GeometryInput::Record(ShotRecord::new(g, embedded).unwrap());

        let r = normalize_receivers(Some(&input), None, false).unwrap().unwrap();
        assert_eq!(r.primary().data.as_ref().unwrap()[(0, 0)], 1.0);
        let r = normalize_receivers(Some(&input), Some(&explicit), false)
            .unwrap()
            .unwrap();
        assert_eq!(r.primary().data.as_ref().unwrap()[(0, 0)], 2.0);
    }

    #[test]
    fn data_shape_checked_test() {
        let input: GeometryInput<2> = line(3, 0.0).into();
        let wrong = TraceData::zeros(11, 4);
        assert!(matches!(
            normalize_receivers(Some(&input), Some(&wrong), false),
            Err(SeisError::Dimension { .. })
        ));
        assert!(matches!(
            normalize_receivers::<2>(None, Some(&wrong), false),
            Err(SeisError::Geometry { .. })
        ));
    }

    #[test]
    fn multi_component_test() {
        let mc_input = GeometryInput::MultiComponent {
            pressure: Box::new(line(3, 0.0).into()),
            velocity: Box::new(line(5, 10.0).into()),
        };
        assert!(matches!(
            normalize_receivers(Some(&mc_input), None, false),
            Err(SeisError::Geometry { .. })
        ));

        let r = normalize_receivers(Some(&mc_input), None, true).unwrap().unwrap();
        match &r {
            ReceiverStreams::Paired { pressure, velocity } => {
                assert_eq!(pressure.geometry.n_traces(), 3);
                assert_eq!(velocity.geometry.n_traces(), 5);
            }
            _ => panic!("expected paired streams"),
        }

        // A single input feeds both streams.
        let single: GeometryInput<2> = line(4, 0.0).into();
        let data = TraceData::zeros(11, 4);
        let r = normalize_receivers(Some(&single), Some(&data), true)
            .unwrap()
            .unwrap();
        assert!(r.is_paired());
        let g = r.geometries();
        assert_eq!(g[0], g[1]);
        assert!(r.primary().data.is_some());
    }

    #[test]
    fn multi_shot_geometry_rejected_test() {
        let input = GeometryInput::Geometry(Geometry::InMemory(vec![line(2, 0.0), line(3, 0.0)]));
        assert!(normalize_receivers(Some(&input), None, false).is_err());
    }
}
