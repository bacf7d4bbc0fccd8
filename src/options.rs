//! Options bag shared by every propagation call.
//!
//! Read-only once built; callers share one instance across shots.

use crate::error::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Imaging condition forwarded to the engine for adjoint-born calls.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagingCondition {
    /// Standard zero-lag cross-correlation.
    #[default]
    As,
    /// Inverse scattering imaging condition.
    Isic,
    /// FWI-style gradient.
    Fwi,
}

/// How the engine should build adjoint-born gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientMode {
    Standard,
    Frequency,
    Checkpointing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Multi-component receivers: pressure and particle velocity streams.
    pub mc: bool,
    /// Crop the model to the source/receiver area before propagating.
    pub limit_m: bool,
    /// Lateral distance kept around sources/receivers when `limit_m` is set.
    pub buffer_size: f64,
    pub save_data_to_disk: bool,
    pub file_path: PathBuf,
    pub file_name: String,
    /// Fold padding cells into the boundary when stripping gradients.
    pub sum_padding: bool,
    /// Engine time step override.
    pub dt_comp: Option<f64>,
    pub space_order: usize,
    pub free_surface: bool,
    pub subsampling_factor: usize,
    pub imaging_condition: ImagingCondition,
    pub optimal_checkpointing: bool,
    /// On-the-fly DFT frequencies for frequency-domain gradients.
    pub frequencies: Vec<f64>,
    pub dft_subsampling: Option<usize>,
    /// Return resampled trace arrays instead of shot records.
    pub return_array: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            mc: false,
            limit_m: false,
            buffer_size: 1000.0,
            save_data_to_disk: false,
            file_path: PathBuf::from("."),
            file_name: "shot".to_string(),
            sum_padding: false,
            dt_comp: None,
            space_order: 8,
            free_surface: false,
            subsampling_factor: 1,
            imaging_condition: ImagingCondition::As,
            optimal_checkpointing: false,
            frequencies: Vec::new(),
            dft_subsampling: None,
            return_array: false,
        }
    }
}

impl Options {
    /// Load options from a JSON file, missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: &P) -> Result<Self> {
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        let options: Options = serde_json::from_reader(reader)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.buffer_size >= 0.0) {
            return Err(SeisError::config(format!(
                "buffer_size must be >= 0, got {}",
                self.buffer_size
            )));
        }
        if self.subsampling_factor == 0 {
            return Err(SeisError::config("subsampling_factor must be >= 1"));
        }
        if self.dft_subsampling == Some(0) {
            return Err(SeisError::config("dft_subsampling must be >= 1"));
        }
        if let Some(dt) = self.dt_comp {
            if !(dt > 0.0) {
                return Err(SeisError::config(format!("dt_comp must be > 0, got {dt}")));
            }
        }
        if let Some(f) = self.frequencies.iter().find(|f| !(**f > 0.0)) {
            return Err(SeisError::config(format!("frequencies must be > 0, got {f}")));
        }
        Ok(())
    }

    /// Checkpointing wins over frequency compression,
    /// which wins over the standard cross-correlation.
    pub fn gradient_mode(&self) -> GradientMode {
        if self.optimal_checkpointing {
            GradientMode::Checkpointing
        } else if !self.frequencies.is_empty() {
            GradientMode::Frequency
        } else {
            GradientMode::Standard
        }
    }

    /// Copy of these options with padding-sum disabled,
    /// used for trailing gradient entries.
    pub fn without_sum_padding(&self) -> Self {
        Options {
            sum_padding: false,
            ..self.clone()
        }
    }
}
