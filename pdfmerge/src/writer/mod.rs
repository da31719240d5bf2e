//! Output side: object serialization and the page accumulator.

mod accumulator;
pub mod serialize;

pub use accumulator::OutputAccumulator;
