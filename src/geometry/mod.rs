//! Source/receiver geometry, its normalisation and receiver filtering.

pub mod adapter;
pub mod filter;
mod shot_geometry;

pub use adapter::{GeometryInput, NormalizedStream, ReceiverStreams};
pub use filter::filter_receivers;
pub use shot_geometry::*;
