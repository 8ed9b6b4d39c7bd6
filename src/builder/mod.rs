//! Builder API for ergonomic machine construction.
//!
//! This module provides the fluent [`MachineBuilder`], the configuration
//! checks it runs, and the [`state_enum!`](crate::state_enum) macro for
//! declaring state types with minimal boilerplate.

pub mod error;
pub mod machine;
pub mod macros;
mod validation;

pub use error::{BuildError, ConfigIssue};
pub use machine::MachineBuilder;
