//! Core types of the transition engine.
//!
//! This module contains the building blocks every machine is made of:
//! - State tokens via the `State` trait
//! - Transition definitions and the source-state check
//! - Guards and the scoped guard map
//! - `MaybeDeferred`, the value that is either ready now or later

mod deferred;
mod guard;
mod state;
mod transition;

pub use deferred::MaybeDeferred;
pub use guard::{Guard, GuardContext, GuardMap, GuardOutcome, GuardVerdict};
pub use state::State;
pub use transition::{ExpectedSources, Sources, Transition, TransitionError, TransitionName};

/// Error type accepted from caller-supplied accessors, mutators and guards.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
