//! Physical models and the fields they are built from.
//!
//! Everything here is indexed on a regular grid with the last axis as
//! depth. Fields own their buffers; cropping always allocates.
#![allow(clippy::module_inception)]

mod field;
mod grid;
mod model;
mod physical_parameter;
pub mod window;

pub use field::*;
pub use grid::*;
pub use model::*;
pub use physical_parameter::*;
pub use window::{limit_model_to_receiver_area, WindowedModel};

/// Default task size for parallel work over field buffers.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
