//! Source terms other than point sources with traces.

use crate::model::*;
use crate::records::{TraceData, Wavefield};

/// What drives the wavefield when a source geometry alone is not enough.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceTerm<const GRID_DIMENSION: usize> {
    /// Point-source time series, one column per source position.
    Traces(TraceData),
    /// Spatially distributed source: `weights` on the model grid share one
    /// `wavelet`, sampled on the receiver geometry's interval.
    Extended {
        weights: PhysicalParameter<GRID_DIMENSION>,
        wavelet: Vec<f64>,
    },
    /// Full wavefield injected everywhere.
    Wavefield(Wavefield<GRID_DIMENSION>),
}

impl<const GRID_DIMENSION: usize> SourceTerm<GRID_DIMENSION> {
    pub fn is_wavefield(&self) -> bool {
        matches!(self, SourceTerm::Wavefield(_))
    }

    /// Same source restricted to an index box of the model grid.
    /// Only extended-source weights live on the grid, so only they change.
    pub fn crop(&self, aabb: &crate::util::AABB<GRID_DIMENSION>) -> Self {
        match self {
            SourceTerm::Extended { weights, wavelet } => SourceTerm::Extended {
                weights: weights.crop(aabb),
                wavelet: wavelet.clone(),
            },
            other => other.clone(),
        }
    }
}

/// Ricker wavelet with peak frequency `f0` in kHz, `nt` samples at `dt` ms.
/// The peak is delayed by `1 / f0`.
pub fn ricker_wavelet(f0: f64, dt: f64, nt: usize) -> Vec<f64> {
    let t0 = 1.0 / f0;
    let a = (std::f64::consts::PI * f0).powi(2);
    (0..nt)
        .map(|i| {
            let tau = i as f64 * dt - t0;
            (1.0 - 2.0 * a * tau * tau) * (-a * tau * tau).exp()
        })
        .collect()
}
