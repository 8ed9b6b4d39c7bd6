//! The evaluator that answers `can` and performs `apply`.
//!
//! A [`Machine`] is assembled by [`crate::builder::MachineBuilder`] and is
//! immutable afterwards; it can be shared freely between tasks.

pub(crate) mod evaluator;
mod pipeline;

pub use evaluator::{Machine, Verdict};
