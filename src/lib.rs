pub mod build_info;
pub mod cli;
pub mod csv;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod image;
pub mod model;
pub mod options;
pub mod orchestrator;
pub mod par_slice;
pub mod persistence;
pub mod postprocess;
pub mod records;
pub mod resample;
pub mod source;
pub mod util;
