//! Command-line plumbing shared by the demo binaries.

use crate::build_info;
use crate::error::*;
use crate::geometry::ShotGeometry;
use crate::model::*;
use crate::options::Options;
use crate::util::*;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// seisorch 2D shot modeling
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON options file, missing keys take their defaults.
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Directory for output files, will be created.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Grid points along x.
    #[arg(long, default_value = "201")]
    pub nx: usize,

    /// Grid points along depth.
    #[arg(long, default_value = "101")]
    pub nz: usize,

    /// Grid spacing in m, same on both axes.
    #[arg(long, default_value = "10.0")]
    pub spacing: f64,

    /// Background velocity in km/s.
    #[arg(long, default_value = "1.5")]
    pub velocity: f64,

    /// Absorbing layer width in grid points.
    #[arg(long, default_value = "40")]
    pub nb: usize,

    /// Shot x position in m, defaults to the middle of the grid.
    #[arg(long)]
    pub shot_x: Option<f64>,

    /// Shot depth in m.
    #[arg(long, default_value = "20.0")]
    pub shot_z: f64,

    /// Number of receivers, spread over the full grid width.
    #[arg(short, long, default_value = "101")]
    pub receivers: usize,

    /// Receiver depth in m.
    #[arg(long, default_value = "20.0")]
    pub receiver_z: f64,

    /// Recording length in ms.
    #[arg(short = 'T', long, default_value = "1000.0")]
    pub t: f64,

    /// Recording interval in ms.
    #[arg(long, default_value = "2.0")]
    pub dt: f64,

    /// Ricker peak frequency in kHz.
    #[arg(long, default_value = "0.015")]
    pub f0: f64,

    /// Also model a born shot from a random perturbation.
    #[arg(long)]
    pub born: bool,

    /// The number of threads to use.
    #[arg(long, default_value = "8")]
    pub threads: usize,

    /// Debug level logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print build information and quit
    #[arg(long)]
    pub build_info: bool,
}

impl Args {
    pub fn cli_setup(name: &str) -> Result<Self> {
        let args = Args::parse();

        if args.build_info {
            build_info::print_report(name);
            std::process::exit(0);
        }

        let filter = if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();

        if let Some(output_dir) = &args.output_dir {
            std::fs::create_dir_all(output_dir)?;
        }

        #[cfg(feature = "profile-with-puffin")]
        profiling::puffin::set_scopes_on(true);

        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .thread_name(|i| format!("rayon_thread_{}", i))
            .build_global()
        {
            warn!("keeping existing rayon pool: {e}");
        }

        Ok(args)
    }

    pub fn load_options(&self) -> Result<Options> {
        match &self.options {
            Some(path) => Options::from_json_file(path),
            None => Ok(Options::default()),
        }
    }

    pub fn grid(&self) -> Result<Grid<2>> {
        Grid::new(
            vector![self.nx as i32, self.nz as i32],
            vector![self.spacing, self.spacing],
            vector![0.0, 0.0],
        )
    }

    pub fn model(&self) -> Result<Model<2>> {
        let v = PhysicalParameter::constant(self.grid()?, self.velocity);
        Model::acoustic_from_velocity(&v, self.nb)
    }

    pub fn source_geometry(&self) -> Result<ShotGeometry<2>> {
        let width = (self.nx.saturating_sub(1)) as f64 * self.spacing;
        let x = self.shot_x.unwrap_or(0.5 * width);
        ShotGeometry::from_recording_time(vec![vector![x, self.shot_z]], self.dt, self.t)
    }

    pub fn receiver_geometry(&self) -> Result<ShotGeometry<2>> {
        let width = (self.nx.saturating_sub(1)) as f64 * self.spacing;
        let step = if self.receivers > 1 {
            width / (self.receivers - 1) as f64
        } else {
            0.0
        };
        let coordinates = (0..self.receivers)
            .map(|i| vector![i as f64 * step, self.receiver_z])
            .collect();
        ShotGeometry::from_recording_time(coordinates, self.dt, self.t)
    }

    pub fn output_path(&self, file: &str) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|d| d.join(file))
    }
}
