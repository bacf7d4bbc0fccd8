//! Analytic constant-velocity acoustic engine.
//!
//! Waves travel along straight rays at the model's mean velocity with
//! geometric spreading, there is no discretised wave equation involved.
//! Forward and adjoint use the same linear-interpolated delays, so each
//! adjoint operator is the exact transpose of its forward counterpart.

use crate::engine::*;
use crate::error::*;
use crate::geometry::*;
use crate::model::*;
use crate::options::{GradientMode, ImagingCondition, Options};
use crate::records::TraceData;
use crate::resample::{sample_linear, time_resample};
use crate::source::SourceTerm;
use crate::util::*;
use rayon::prelude::*;
use tracing::{debug, trace};

/// Reference engine for demos and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct HomogeneousEngine;

/// Number of engine steps covering `t` ms.
fn engine_nt(t: f64, dt: f64) -> usize {
    (t / dt + SNAP_EPSILON).floor() as usize + 1
}

fn unsupported(what: &str) -> SeisError {
    SeisError::solver(format!("homogeneous engine: {what}"))
}

/// Travel-time kernel for one constant velocity.
#[derive(Debug, Clone, Copy)]
struct Kernel {
    /// km/s, equivalently m/ms.
    velocity: f64,
    dt: f64,
    /// Distances are clamped to this to avoid the singularity at zero offset.
    min_distance: f64,
}

impl Kernel {
    fn amplitude<const GRID_DIMENSION: usize>(&self, r: f64) -> f64 {
        let r = r.max(self.min_distance);
        match GRID_DIMENSION {
            1 => 1.0,
            2 => 1.0 / r.sqrt(),
            _ => 1.0 / (4.0 * std::f64::consts::PI * r),
        }
    }

    /// Amplitude and delay in engine samples between two points.
    fn ray<const GRID_DIMENSION: usize>(
        &self,
        a: &Point<GRID_DIMENSION>,
        b: &Point<GRID_DIMENSION>,
    ) -> (f64, f64) {
        let r = (a - b).norm();
        (
            self.amplitude::<GRID_DIMENSION>(r),
            r / self.velocity / self.dt,
        )
    }

    /// Traces at `positions` from delayed emitters.
    /// `direction` is `1.0` to delay (causal), `-1.0` to advance (adjoint).
    fn record<const GRID_DIMENSION: usize>(
        &self,
        emitters: &[(Point<GRID_DIMENSION>, f64, &[f64])],
        positions: &[Point<GRID_DIMENSION>],
        nt: usize,
        direction: f64,
    ) -> TraceData {
        let mut result = TraceData::zeros(nt, positions.len());
        result
            .as_mut_slice()
            .par_chunks_mut(nt.max(1))
            .zip(positions.par_iter())
            .for_each(|(column, p)| {
                for (e, weight, wavelet) in emitters {
                    let (amplitude, delay) = self.ray(e, p);
                    let scale = weight * amplitude;
                    for (t, v) in column.iter_mut().enumerate() {
                        *v += scale * sample_linear(wavelet, t as f64 - direction * delay);
                    }
                }
            });
        result
    }

    /// `sum_k a[k] * b(k + shift)`, the transpose partner of `record`.
    fn correlate(a: &[f64], b: &[f64], shift: f64) -> f64 {
        a.iter()
            .enumerate()
            .map(|(k, v)| v * sample_linear(b, k as f64 + shift))
            .sum()
    }
}

/// Second time derivative, zero outside the trace.
fn second_derivative(trace: &[f64], dt: f64) -> Vec<f64> {
    let at = |i: isize| {
        if i >= 0 && (i as usize) < trace.len() {
            trace[i as usize]
        } else {
            0.0
        }
    };
    (0..trace.len() as isize)
        .map(|i| (at(i + 1) - 2.0 * at(i) + at(i - 1)) / (dt * dt))
        .collect()
}

/// Columns of `data` resampled onto the engine step.
fn engine_traces(data: &TraceData, dt_in: f64, dt: f64, nt: usize) -> Result<Vec<Vec<f64>>> {
    let resampled = time_resample(data, dt_in, dt, nt)?;
    Ok(resampled
        .column_iter()
        .map(|c| c.iter().copied().collect())
        .collect())
}

fn stream_data<'a, const GRID_DIMENSION: usize>(
    stream: &'a NormalizedStream<GRID_DIMENSION>,
    what: &str,
) -> Result<&'a TraceData> {
    stream
        .data
        .as_ref()
        .ok_or_else(|| unsupported(&format!("{what} traces are required")))
}

/// All points of the padded grid, in buffer order.
fn padded_positions<const GRID_DIMENSION: usize>(
    model: &PreparedModel<'_, GRID_DIMENSION>,
) -> Vec<Point<GRID_DIMENSION>> {
    let grid = model.padded_grid();
    grid.aabb().coord_iter().map(|c| grid.position(&c)).collect()
}

/// Reshape `(nt, n_points)` traces into an `(nt, padded shape..)` array.
fn wavefield_array<const GRID_DIMENSION: usize>(
    traces: &TraceData,
    model: &PreparedModel<'_, GRID_DIMENSION>,
) -> Result<RawArray> {
    let mut shape = vec![traces.nrows()];
    shape.extend(model.padded_grid().shape().iter().map(|n| *n as usize));
    RawArray::new(shape, RawArray::from_traces(traces).into_data())
}

/// Only zero-lag cross-correlation gradients and full-rate wavefields
/// have an analytic counterpart.
fn check_options(operator: Operator, options: &Options, wavefield: bool) -> Result<()> {
    if operator == Operator::AdjointBorn {
        match options.gradient_mode() {
            GradientMode::Standard => {}
            GradientMode::Frequency => {
                return Err(unsupported("frequency-domain gradients are not supported"))
            }
            GradientMode::Checkpointing => {
                return Err(unsupported("optimal checkpointing is not supported"))
            }
        }
        if options.imaging_condition != ImagingCondition::As {
            return Err(unsupported(&format!(
                "imaging condition {:?} is not supported",
                options.imaging_condition
            )));
        }
    }
    if wavefield && options.subsampling_factor != 1 {
        return Err(unsupported("subsampled wavefields are not supported"));
    }
    Ok(())
}

impl HomogeneousEngine {
    fn kernel<const GRID_DIMENSION: usize>(
        model: &PreparedModel<'_, GRID_DIMENSION>,
    ) -> Result<Kernel> {
        let m = match model.model().medium() {
            Medium::Acoustic { m, .. } => m,
            Medium::Elastic { .. } => return Err(unsupported("elastic media are not supported")),
        };
        let mean_m = m.data().iter().sum::<f64>() / m.data().len() as f64;
        Ok(Kernel {
            velocity: 1.0 / mean_m.sqrt(),
            dt: model.dt(),
            min_distance: 0.5 * model.grid().min_spacing(),
        })
    }

    fn forward<const GRID_DIMENSION: usize>(
        &self,
        call: &SolverCall<'_, GRID_DIMENSION>,
        kernel: &Kernel,
    ) -> Result<RawOutput> {
        let receivers = call.receivers.map(|r| &r.primary().geometry);

        if let Some(SourceTerm::Extended { weights, wavelet }) = call.source_term {
            let rec = receivers.ok_or_else(|| unsupported("extended sources need receivers"))?;
            let nt = engine_nt(rec.t(), kernel.dt);
            let wavelet = TraceData::from_column_slice(wavelet.len(), 1, wavelet);
            let wavelet = engine_traces(&wavelet, rec.dt(), kernel.dt, nt)?.remove(0);
            let emitters: Vec<_> = weights
                .aabb()
                .coord_iter()
                .zip(weights.data())
                .filter(|(_, w)| **w != 0.0)
                .map(|(c, w)| (weights.grid().position(&c), *w, wavelet.as_slice()))
                .collect();
            let traces = kernel.record(&emitters, rec.coordinates(), nt, 1.0);
            return Ok(RawOutput::single(RawArray::from_traces(&traces)));
        }

        let src = call
            .source
            .ok_or_else(|| unsupported("forward modeling needs a source"))?;
        let t = receivers.map_or(src.geometry.t(), |r| r.t().max(src.geometry.t()));
        let nt = engine_nt(t, kernel.dt);
        let wavelets = engine_traces(stream_data(src, "source")?, src.geometry.dt(), kernel.dt, nt)?;
        let emitters: Vec<_> = src
            .geometry
            .coordinates()
            .iter()
            .zip(&wavelets)
            .map(|(p, w)| (*p, 1.0, w.as_slice()))
            .collect();

        match receivers {
            Some(rec) => {
                let traces = kernel.record(&emitters, rec.coordinates(), nt, 1.0);
                Ok(RawOutput::single(RawArray::from_traces(&traces)))
            }
            None => {
                let traces = kernel.record(&emitters, &padded_positions(call.model), nt, 1.0);
                Ok(RawOutput::single(wavefield_array(&traces, call.model)?))
            }
        }
    }

    fn adjoint<const GRID_DIMENSION: usize>(
        &self,
        call: &SolverCall<'_, GRID_DIMENSION>,
        kernel: &Kernel,
    ) -> Result<RawOutput> {
        let rec = call
            .receivers
            .map(|r| r.primary())
            .ok_or_else(|| unsupported("adjoint modeling needs receiver data"))?;
        let t = call
            .source
            .map_or(rec.geometry.t(), |s| s.geometry.t().max(rec.geometry.t()));
        let nt = engine_nt(t, kernel.dt);
        let data = engine_traces(stream_data(rec, "receiver")?, rec.geometry.dt(), kernel.dt, nt)?;
        let emitters: Vec<_> = rec
            .geometry
            .coordinates()
            .iter()
            .zip(&data)
            .map(|(p, d)| (*p, 1.0, d.as_slice()))
            .collect();

        if let Some(src) = call.source {
            let traces = kernel.record(&emitters, src.geometry.coordinates(), nt, -1.0);
            return Ok(RawOutput::single(RawArray::from_traces(&traces)));
        }

        if let Some(SourceTerm::Extended { wavelet, .. }) = call.source_term {
            let wavelet = TraceData::from_column_slice(wavelet.len(), 1, wavelet);
            let wavelet = engine_traces(&wavelet, rec.geometry.dt(), kernel.dt, nt)?.remove(0);
            let padded = *call.model.padded_grid();
            let emitters = &emitters;
            let wavelet = &wavelet;
            let weights = PhysicalParameter::from_fn(
                padded,
                move |c: Coord<GRID_DIMENSION>| {
                    let x = padded.position(&c);
                    emitters
                        .iter()
                        .map(|(p, _, d)| {
                            let (amplitude, delay) = kernel.ray(&x, p);
                            amplitude * Kernel::correlate(wavelet, d, delay)
                        })
                        .sum::<f64>()
                },
                DEFAULT_CHUNK_SIZE,
            );
            return Ok(RawOutput::single(RawArray::from_field(&weights)));
        }

        let traces = kernel.record(&emitters, &padded_positions(call.model), nt, -1.0);
        Ok(RawOutput::single(wavefield_array(&traces, call.model)?))
    }

    /// Point scatterers of the perturbation with their positions.
    fn scatterers<const GRID_DIMENSION: usize>(
        dm: &PhysicalParameter<GRID_DIMENSION>,
    ) -> Vec<(Point<GRID_DIMENSION>, f64)> {
        dm.aabb()
            .coord_iter()
            .zip(dm.data())
            .filter(|(_, v)| **v != 0.0)
            .map(|(c, v)| (dm.grid().position(&c), *v))
            .collect()
    }

    fn born<const GRID_DIMENSION: usize>(
        &self,
        call: &SolverCall<'_, GRID_DIMENSION>,
        kernel: &Kernel,
    ) -> Result<RawOutput> {
        let src = call.source.ok_or_else(|| unsupported("born modeling needs a source"))?;
        let rec = call
            .receivers
            .map(|r| &r.primary().geometry)
            .ok_or_else(|| unsupported("born modeling needs receivers"))?;
        let dm = call
            .perturbation()
            .ok_or_else(|| unsupported("born modeling needs a perturbation"))?;
        let nt = engine_nt(rec.t().max(src.geometry.t()), kernel.dt);
        let wavelets: Vec<Vec<f64>> =
            engine_traces(stream_data(src, "source")?, src.geometry.dt(), kernel.dt, nt)?
                .iter()
                .map(|w| second_derivative(w, kernel.dt))
                .collect();

        // Each scatterer re-emits every source wavelet with the incident delay.
        let mut emitters = Vec::new();
        for (x, v) in Self::scatterers(dm) {
            for (s, w) in src.geometry.coordinates().iter().zip(&wavelets) {
                let (amplitude, delay) = kernel.ray(s, &x);
                emitters.push((x, -v * amplitude, delay, w.as_slice()));
            }
        }

        let mut traces = TraceData::zeros(nt, rec.n_traces());
        traces
            .as_mut_slice()
            .par_chunks_mut(nt.max(1))
            .zip(rec.coordinates().par_iter())
            .for_each(|(column, r)| {
                for (x, weight, incident, w) in &emitters {
                    let (amplitude, delay) = kernel.ray(x, r);
                    let total = incident + delay;
                    for (t, out) in column.iter_mut().enumerate() {
                        *out += weight * amplitude * sample_linear(w, t as f64 - total);
                    }
                }
            });
        Ok(RawOutput::single(RawArray::from_traces(&traces)))
    }

    fn adjoint_born<const GRID_DIMENSION: usize>(
        &self,
        call: &SolverCall<'_, GRID_DIMENSION>,
        kernel: &Kernel,
    ) -> Result<RawOutput> {
        let src = call
            .source
            .ok_or_else(|| unsupported("adjoint born modeling needs a source"))?;
        let rec = call
            .receivers
            .map(|r| r.primary())
            .ok_or_else(|| unsupported("adjoint born modeling needs receiver data"))?;
        let nt = engine_nt(rec.geometry.t().max(src.geometry.t()), kernel.dt);
        let wavelets: Vec<Vec<f64>> =
            engine_traces(stream_data(src, "source")?, src.geometry.dt(), kernel.dt, nt)?
                .iter()
                .map(|w| second_derivative(w, kernel.dt))
                .collect();
        let residual = engine_traces(stream_data(rec, "receiver")?, rec.geometry.dt(), kernel.dt, nt)?;

        let sources: Vec<_> = src.geometry.coordinates().iter().zip(&wavelets).collect();
        let receivers: Vec<_> = rec.geometry.coordinates().iter().zip(&residual).collect();
        let (sources, receivers) = (&sources, &receivers);
        let padded = *call.model.padded_grid();
        let gradient = PhysicalParameter::from_fn(
            padded,
            move |c: Coord<GRID_DIMENSION>| {
                let x = padded.position(&c);
                let mut g = 0.0;
                for (s, w) in sources {
                    let (a_s, tau_s) = kernel.ray(*s, &x);
                    for (r, d) in receivers {
                        let (a_r, tau_r) = kernel.ray(&x, *r);
                        g -= a_s * a_r * Kernel::correlate(w, d, tau_s + tau_r);
                    }
                }
                g
            },
            DEFAULT_CHUNK_SIZE,
        );
        Ok(RawOutput::single(RawArray::from_field(&gradient)))
    }
}

impl<const GRID_DIMENSION: usize> PropagationEngine<GRID_DIMENSION> for HomogeneousEngine {
    fn propagate(&self, call: &SolverCall<'_, GRID_DIMENSION>) -> Result<RawOutput> {
        profiling::scope!("homogeneous::propagate");
        let kernel = Self::kernel(call.model)?;
        let wavefield = matches!(call.operator, Operator::Forward | Operator::Adjoint)
            && call.receivers.is_none();
        check_options(call.operator, call.options, wavefield)?;
        if let Some(SourceTerm::Wavefield(_)) = call.source_term {
            return Err(unsupported("wavefield sources are not supported"));
        }
        if call.illumination {
            trace!("illumination is not tracked by the analytic engine");
        }
        debug!(
            "homogeneous {} at {:.4} km/s, dt {} ms",
            call.operator, kernel.velocity, kernel.dt
        );
        match call.operator {
            Operator::Forward => self.forward(call, &kernel),
            Operator::Adjoint => self.adjoint(call, &kernel),
            Operator::Born => self.born(call, &kernel),
            Operator::AdjointBorn => self.adjoint_born(call, &kernel),
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::options::Options;
    use crate::source::ricker_wavelet;
    use float_cmp::assert_approx_eq;

    const DT: f64 = 1.0;
    const NT: usize = 201;

    fn model() -> Model<2> {
        let grid = Grid::new(vector![31, 21], vector![10.0, 10.0], vector![0.0, 0.0])
            .unwrap();
        Model::acoustic_from_velocity(&PhysicalParameter::constant(grid, 2.0), 3).unwrap()
    }

    fn options() -> Options {
        Options {
            dt_comp: Some(DT),
            ..Options::default()
        }
    }

    fn source() -> NormalizedStream<2> {
        let g = ShotGeometry::new(vec![vector![150.0, 20.0]], DT, NT).unwrap();
        let w = ricker_wavelet(0.015, DT, NT);
        NormalizedStream::new(g, Some(TraceData::from_column_slice(NT, 1, &w))).unwrap()
    }

    fn receivers(data: Option<TraceData>) -> ReceiverStreams<2> {
        let coords = (0..7).map(|i| vector![30.0 + 40.0 * i as f64, 40.0]).collect();
        let g = ShotGeometry::new(coords, DT, NT).unwrap();
        ReceiverStreams::Single(NormalizedStream::new(g, data).unwrap())
    }

    fn pseudo_random(nrows: usize, ncols: usize) -> TraceData {
        TraceData::from_fn(nrows, ncols, |i, j| ((i * 31 + j * 17) % 13) as f64 / 13.0 - 0.5)
    }

    fn call<'a>(
        operator: Operator,
        model: &'a PreparedModel<'a, 2>,
        source: Option<&'a NormalizedStream<2>>,
        receivers: Option<&'a ReceiverStreams<2>>,
        options: &'a Options,
    ) -> SolverCall<'a, 2> {
        SolverCall {
            operator,
            model,
            source,
            source_term: None,
            receivers,
            options,
            illumination: false,
            forward: operator != Operator::Adjoint,
        }
    }

    #[test]
    fn forward_arrival_test() {
        let model = model();
        let options = options();
        let prepared = PreparedModel::new(&model, &options, None).unwrap();
        let src = source();
        let rec = receivers(None);
        let out = HomogeneousEngine
            .propagate(&call(Operator::Forward, &prepared, Some(&src), Some(&rec), &options))
            .unwrap()
            .drop_empty();
        assert_eq!(out.len(), 1);
        let traces = out[0].to_traces().unwrap();
        assert_eq!(traces.shape(), (NT, 7));
        // Receiver 3 sits 20 m from the source: peak at 1/f0 + 20 m / 2 m/ms.
        let column = traces.column(3);
        let peak = column.iamax();
        assert_eq!(peak, (1.0 / 0.015 + 10.0_f64).round() as usize);
    }

    #[test]
    fn adjoint_is_transpose_test() {
        let model = model();
        let options = options();
        let prepared = PreparedModel::new(&model, &options, None).unwrap();
        let src = source();
        let rec = receivers(None);
        let forward = HomogeneousEngine
            .propagate(&call(Operator::Forward, &prepared, Some(&src), Some(&rec), &options))
            .unwrap()
            .drop_empty()
            .remove(0)
            .to_traces()
            .unwrap();

        let d = pseudo_random(NT, 7);
        let rec_data = receivers(Some(d.clone()));
        let src_geometry = NormalizedStream::new(src.geometry.clone(), None).unwrap();
        let adjoint = HomogeneousEngine
            .propagate(&call(
                Operator::Adjoint,
                &prepared,
                Some(&src_geometry),
                Some(&rec_data),
                &options,
            ))
            .unwrap()
            .drop_empty()
            .remove(0)
            .to_traces()
            .unwrap();

        let lhs = forward.dot(&d);
        let rhs = src.data.as_ref().unwrap().dot(&adjoint);
        assert_approx_eq!(f64, lhs, rhs, epsilon = 1e-9 * lhs.abs().max(1.0));
    }

    #[test]
    fn born_adjoint_is_transpose_test() {
        let model = model();
        let options = options();
        let dm = PhysicalParameter::from_fn(
            *model.grid(),
            |c: Coord<2>| if c[1] == 12 && c[0] % 5 == 0 { 0.1 } else { 0.0 },
            64,
        );
        let prepared = PreparedModel::new(&model, &options, Some(&dm)).unwrap();
        let src = source();
        let rec = receivers(None);
        let born = HomogeneousEngine
            .propagate(&call(Operator::Born, &prepared, Some(&src), Some(&rec), &options))
            .unwrap()
            .drop_empty()
            .remove(0)
            .to_traces()
            .unwrap();
        assert!(born.amax() > 0.0);

        let d = pseudo_random(NT, 7);
        let rec_data = receivers(Some(d.clone()));
        let raw = HomogeneousEngine
            .propagate(&call(
                Operator::AdjointBorn,
                &prepared,
                Some(&src),
                Some(&rec_data),
                &options,
            ))
            .unwrap()
            .drop_empty()
            .remove(0);
        let padded = PhysicalParameter::from_vec(*prepared.padded_grid(), raw.into_data()).unwrap();
        let gradient = padded.crop(&prepared.physical_aabb());

        let lhs = born.dot(&d);
        let rhs: f64 = gradient.data().iter().zip(dm.data()).map(|(g, m)| g * m).sum();
        assert_approx_eq!(f64, lhs, rhs, epsilon = 1e-9 * lhs.abs().max(1.0));
    }

    #[test]
    fn wavefield_shape_test() {
        let model = model();
        let options = options();
        let prepared = PreparedModel::new(&model, &options, None).unwrap();
        let g = ShotGeometry::new(vec![vector![150.0, 20.0]], DT, 11).unwrap();
        let src = NormalizedStream::new(g, Some(TraceData::from_element(11, 1, 1.0))).unwrap();
        let out = HomogeneousEngine
            .propagate(&call(Operator::Forward, &prepared, Some(&src), None, &options))
            .unwrap()
            .drop_empty();
        assert_eq!(out[0].shape(), &[11, 37, 27]);
    }

    #[test]
    fn unsupported_gradient_options_test() {
        let model = model();
        let src = source();
        let rec = receivers(Some(pseudo_random(NT, 7)));
        let rejected = [
            Options {
                optimal_checkpointing: true,
                ..options()
            },
            Options {
                frequencies: vec![5.0, 10.0],
                dft_subsampling: Some(4),
                ..options()
            },
            Options {
                imaging_condition: ImagingCondition::Isic,
                ..options()
            },
            Options {
                imaging_condition: ImagingCondition::Fwi,
                ..options()
            },
        ];
        for options in &rejected {
            let prepared = PreparedModel::new(&model, options, None).unwrap();
            let result = HomogeneousEngine.propagate(&call(
                Operator::AdjointBorn,
                &prepared,
                Some(&src),
                Some(&rec),
                options,
            ));
            assert!(matches!(result, Err(SeisError::Solver(_))), "{options:?}");
        }

        // Gradient options do not affect forward modelling.
        let options = &rejected[0];
        let prepared = PreparedModel::new(&model, options, None).unwrap();
        assert!(HomogeneousEngine
            .propagate(&call(Operator::Forward, &prepared, Some(&src), Some(&rec), options))
            .is_ok());

        let options = Options {
            subsampling_factor: 2,
            ..self::options()
        };
        let prepared = PreparedModel::new(&model, &options, None).unwrap();
        assert!(matches!(
            HomogeneousEngine.propagate(&call(Operator::Forward, &prepared, Some(&src), None, &options)),
            Err(SeisError::Solver(_))
        ));
    }

    #[test]
    fn elastic_rejected_test() {
        let grid = Grid::new(vector![5, 5], vector![10.0, 10.0], vector![0.0, 0.0]).unwrap();
        let model = Model::elastic(
            PhysicalParameter::constant(grid, 2.0),
            PhysicalParameter::constant(grid, 1.0),
            PhysicalParameter::constant(grid, 1.0),
            2,
        )
        .unwrap();
        let options = options();
        let prepared = PreparedModel::new(&model, &options, None).unwrap();
        let src = source();
        assert!(matches!(
            HomogeneousEngine.propagate(&call(Operator::Forward, &prepared, Some(&src), None, &options)),
            Err(SeisError::Solver(_))
        ));
    }
}
