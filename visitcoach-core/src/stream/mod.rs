//! Stream accumulation and snapshots

pub mod accumulator;

pub use accumulator::{StreamAccumulator, StreamPhase, StreamSnapshot, split_paragraphs};
