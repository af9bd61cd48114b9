//! Location values produced by the platform source.

mod sample;

pub use sample::{Coordinate, LocationSample};
