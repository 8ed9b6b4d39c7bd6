//! Build errors for machine construction.

use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No states specified. Call .states(..) before .build()")]
    MissingStates,

    #[error("No transitions defined. Add at least one transition")]
    NoTransitions,

    #[error("State accessor not specified. Call .get_state(..) or .get_state_deferred(..)")]
    MissingStateAccessor,

    #[error("State mutator not specified. Call .set_state(..) or .set_state_deferred(..)")]
    MissingStateMutator,

    #[error("Transition {0} is defined more than once")]
    DuplicateTransition(String),

    #[error("Invalid machine configuration: {}", join_issues(.0))]
    InvalidConfiguration(Vec<ConfigIssue>),
}

/// A single problem found while validating the configuration.
///
/// Validation reports every issue it finds, not just the first.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigIssue {
    #[error("transition {transition} lists unknown source state {state}")]
    UnknownSourceState { transition: String, state: String },

    #[error("transition {transition} targets unknown state {state}")]
    UnknownTargetState { transition: String, state: String },

    #[error("transition {transition} has an empty source state list")]
    EmptySources { transition: String },

    #[error("guards are registered for unknown state {state}")]
    UnknownGuardState { state: String },

    #[error("guards are registered for unknown transition {transition}")]
    UnknownGuardTransition { transition: String },
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
