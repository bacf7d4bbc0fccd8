//! Turn raw engine arrays into typed results.
//!
//! One dispatch table keyed by operator, array layout and whether a
//! geometry is bound decides what every entry becomes. Elastic outputs
//! bind their entries to pressure or velocity receivers first.

use crate::engine::*;
use crate::error::*;
use crate::geometry::*;
use crate::model::*;
use crate::options::Options;
use crate::records::*;
use crate::resample::time_resample;
use crate::util::*;
use tracing::debug;

/// How a raw array is laid out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Layout {
    /// `(nt, n_traces)`
    Traces,
    /// `(nt, grid shape..)`, padded or physical.
    SpaceTime,
    /// Grid shaped, padded or physical, no time axis.
    Spatial,
}

fn grid_shape<const GRID_DIMENSION: usize>(grid: &Grid<GRID_DIMENSION>) -> Vec<usize> {
    grid.shape().iter().map(|n| *n as usize).collect()
}

fn is_grid_shaped<const GRID_DIMENSION: usize>(
    shape: &[usize],
    model: &PreparedModel<'_, GRID_DIMENSION>,
) -> bool {
    shape == grid_shape(model.padded_grid()) || shape == grid_shape(model.grid())
}

/// Classify `raw` for the dispatch table.
pub fn detect_layout<const GRID_DIMENSION: usize>(
    raw: &RawArray,
    model: &PreparedModel<'_, GRID_DIMENSION>,
    geometry: Option<&ShotGeometry<GRID_DIMENSION>>,
) -> Result<Layout> {
    let shape = raw.shape();
    // A grid-shaped array stays spatial even when its last axis happens
    // to match the trace count.
    if raw.rank() == GRID_DIMENSION && is_grid_shaped(shape, model) {
        return Ok(Layout::Spatial);
    }
    if let (Some(g), [_, n]) = (geometry, shape) {
        if *n == g.n_traces() {
            return Ok(Layout::Traces);
        }
    }
    if raw.rank() == GRID_DIMENSION + 1 && is_grid_shaped(&shape[1..], model) {
        return Ok(Layout::SpaceTime);
    }
    if raw.rank() == 2 {
        return Ok(Layout::Traces);
    }
    Err(SeisError::dimension(
        "engine output",
        format!(
            "(nt, n_traces) or a grid of shape {:?}",
            model.padded_grid().shape().as_slice()
        ),
        shape,
    ))
}

/// Strip absorbing padding from a grid-shaped buffer.
/// With `sum_padding` every padding cell is folded onto the nearest
/// physical cell instead of being dropped.
pub fn remove_padding<const GRID_DIMENSION: usize>(
    data: Vec<f64>,
    model: &PreparedModel<'_, GRID_DIMENSION>,
    sum_padding: bool,
) -> Result<PhysicalParameter<GRID_DIMENSION>> {
    profiling::scope!("postprocess::remove_padding");
    let physical = *model.grid();
    if data.len() == physical.n_points() && model.padded_grid().n_points() != physical.n_points() {
        return PhysicalParameter::from_vec(physical, data);
    }
    let padded = PhysicalParameter::from_vec(*model.padded_grid(), data)?;
    let inner = model.physical_aabb();

    if !sum_padding {
        return PhysicalParameter::from_vec(physical, padded.crop(&inner).into_vec());
    }

    let mut result = PhysicalParameter::zeros(physical);
    let offset = inner.min();
    for (coord, value) in padded.aabb().coord_iter().zip(padded.data()) {
        let clamped = coord.sup(&inner.min()).inf(&inner.max());
        let target = clamped - offset;
        let current = result.view(&target);
        result.set(&target, current + value);
    }
    Ok(result)
}

/// Traces resampled onto `geometry`'s sampling.
/// Going to a finer interval than the engine step is refused.
fn traces_for<const GRID_DIMENSION: usize>(
    raw: &RawArray,
    model: &PreparedModel<'_, GRID_DIMENSION>,
    geometry: &ShotGeometry<GRID_DIMENSION>,
) -> Result<TraceData> {
    let traces = raw.to_traces()?;
    if traces.ncols() != geometry.n_traces() {
        return Err(SeisError::dimension(
            "engine traces",
            geometry.n_traces(),
            traces.ncols(),
        ));
    }
    if geometry.dt() < model.dt() * (1.0 - SNAP_EPSILON) {
        return Err(SeisError::geometry(format!(
            "requested sampling {} ms is finer than the engine step {} ms",
            geometry.dt(),
            model.dt()
        )));
    }
    time_resample(&traces, model.dt(), geometry.dt(), geometry.nt())
}

/// Apply the dispatch table to one raw array.
pub fn process_entry<const GRID_DIMENSION: usize>(
    raw: RawArray,
    operator: Operator,
    model: &PreparedModel<'_, GRID_DIMENSION>,
    geometry: Option<&ShotGeometry<GRID_DIMENSION>>,
    options: &Options,
) -> Result<Propagated<GRID_DIMENSION>> {
    let layout = detect_layout(&raw, model, geometry)?;
    debug!("post-processing {operator} entry {:?} as {layout:?}", raw.shape());

    use Operator::*;
    match (operator, layout, geometry) {
        (Forward | Adjoint | Born, Layout::Traces, Some(g)) => {
            let data = traces_for(&raw, model, g)?;
            if options.return_array {
                Ok(Propagated::Array(data))
            } else {
                Ok(Propagated::ShotRecord(ShotRecord::new(g.clone(), data)?))
            }
        }
        (Forward | Adjoint, Layout::SpaceTime, None) => {
            let nt = raw.shape()[0];
            let data = raw.into_data();
            let chunk = data.len() / nt.max(1);
            let snapshots = data
                .chunks(chunk.max(1))
                .map(|s| remove_padding(s.to_vec(), model, false))
                .collect::<Result<Vec<_>>>()?;
            Ok(Propagated::Wavefield(Wavefield::new(model.dt(), snapshots)?))
        }
        (Adjoint, Layout::Spatial, _) => Ok(Propagated::Weights(Weights(remove_padding(
            raw.into_data(),
            model,
            false,
        )?))),
        (AdjointBorn, Layout::Spatial, _) => Ok(Propagated::Gradient(remove_padding(
            raw.into_data(),
            model,
            options.sum_padding,
        )?)),
        (operator, layout, geometry) => Err(SeisError::dimension(
            format!("{operator} output"),
            "a layout with a post-processing rule",
            format!(
                "{layout:?} {}",
                if geometry.is_some() {
                    "with geometry"
                } else {
                    "without geometry"
                }
            ),
        )),
    }
}

/// Gradients appended after the primary result.
fn trailing_gradients<const GRID_DIMENSION: usize>(
    entries: impl Iterator<Item = RawArray>,
    model: &PreparedModel<'_, GRID_DIMENSION>,
    options: &Options,
) -> Result<Vec<Propagated<GRID_DIMENSION>>> {
    let options = options.without_sum_padding();
    entries
        .map(|raw| process_entry(raw, Operator::AdjointBorn, model, None, &options))
        .collect()
}

/// Convert everything the engine returned for one call.
///
/// `source` and `receivers` are the geometries the engine saw. Adjoint
/// traces live at the sources, everything else at the receivers.
pub fn post_process<const GRID_DIMENSION: usize>(
    entries: Vec<RawArray>,
    operator: Operator,
    model: &PreparedModel<'_, GRID_DIMENSION>,
    source: Option<&ShotGeometry<GRID_DIMENSION>>,
    receivers: Option<&ReceiverStreams<GRID_DIMENSION>>,
    options: &Options,
) -> Result<Propagated<GRID_DIMENSION>> {
    profiling::scope!("postprocess::post_process");
    if entries.is_empty() {
        return Err(SeisError::solver(format!("engine returned no output for {operator}")));
    }

    if model.is_elastic() {
        return post_process_elastic(entries, operator, model, source, receivers, options);
    }

    let geometry = match operator {
        Operator::Adjoint => source,
        Operator::AdjointBorn => None,
        _ => receivers.map(|r| &r.primary().geometry),
    };
    let mut entries = entries.into_iter();
    let Some(head) = entries.next() else {
        return Err(SeisError::solver("engine returned no output"));
    };
    let head = process_entry(head, operator, model, geometry, options)?;
    let tail = trailing_gradients(entries, model, options)?;
    if tail.is_empty() {
        Ok(head)
    } else {
        let mut all = vec![head];
        all.extend(tail);
        Ok(Propagated::Tuple(all))
    }
}

/// Elastic engines return one stress entry then one entry per
/// particle-velocity component.
fn post_process_elastic<const GRID_DIMENSION: usize>(
    entries: Vec<RawArray>,
    operator: Operator,
    model: &PreparedModel<'_, GRID_DIMENSION>,
    source: Option<&ShotGeometry<GRID_DIMENSION>>,
    receivers: Option<&ReceiverStreams<GRID_DIMENSION>>,
    options: &Options,
) -> Result<Propagated<GRID_DIMENSION>> {
    let components = model.dim() + 1;
    if entries.len() < components {
        return Err(SeisError::dimension(
            "elastic engine output entries",
            format!(">= {components}"),
            entries.len(),
        ));
    }

    let (pressure, velocity) = match (operator, receivers) {
        (Operator::Adjoint, _) => (source, source),
        (Operator::AdjointBorn, _) => (None, None),
        (_, Some(ReceiverStreams::Paired { pressure, velocity })) => {
            (Some(&pressure.geometry), Some(&velocity.geometry))
        }
        (_, Some(ReceiverStreams::Single(s))) => (Some(&s.geometry), Some(&s.geometry)),
        (_, None) => (None, None),
    };

    let mut entries = entries.into_iter();
    let mut results = Vec::with_capacity(components);
    for (i, raw) in entries.by_ref().take(components).enumerate() {
        let geometry = if i == 0 { pressure } else { velocity };
        results.push(process_entry(raw, operator, model, geometry, options)?);
    }
    results.extend(trailing_gradients(entries, model, options)?);
    Ok(Propagated::Tuple(results))
}
