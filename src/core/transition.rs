//! Transition definitions and the source-state check.

use super::state::{join_names, State};
use super::BoxError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Bound satisfied by anything usable as a transition name.
pub trait TransitionName: Eq + Hash + Clone + Display + Debug + Send + Sync {}

impl<T> TransitionName for T where T: Eq + Hash + Clone + Display + Debug + Send + Sync {}

/// The states a transition may be applied from.
///
/// Deserializes from either a single state or a list of states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sources<S> {
    /// Exactly one permitted source state.
    One(S),
    /// Any of the listed states.
    Any(Vec<S>),
}

impl<S: State> Sources<S> {
    pub fn contains(&self, state: &S) -> bool {
        self.as_slice().contains(state)
    }

    pub fn as_slice(&self) -> &[S] {
        match self {
            Self::One(state) => std::slice::from_ref(state),
            Self::Any(states) => states,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.as_slice().iter()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    fn expected(&self) -> ExpectedSources {
        match self {
            Self::One(state) => ExpectedSources::State(state.name().to_string()),
            Self::Any(states) => ExpectedSources::OneOf(join_names(states)),
        }
    }
}

impl<S> From<S> for Sources<S> {
    fn from(state: S) -> Self {
        Self::One(state)
    }
}

impl<S> From<Vec<S>> for Sources<S> {
    fn from(states: Vec<S>) -> Self {
        Self::Any(states)
    }
}

impl<S, const N: usize> From<[S; N]> for Sources<S> {
    fn from(states: [S; N]) -> Self {
        Self::Any(states.into())
    }
}

/// A named edge: where it may be applied from, and where it leads.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<S> {
    sources: Sources<S>,
    target: S,
}

impl<S: State> Transition<S> {
    pub fn new(from: impl Into<Sources<S>>, to: S) -> Self {
        Self {
            sources: from.into(),
            target: to,
        }
    }

    pub fn sources(&self) -> &Sources<S> {
        &self.sources
    }

    pub fn target(&self) -> &S {
        &self.target
    }

    /// Check whether `current` is an allowed source state for this transition.
    ///
    /// The error carries the exact diagnostic shown to callers of `apply`.
    pub fn allows_from<K: Display>(&self, name: &K, current: &S) -> Result<(), TransitionError> {
        if self.sources.contains(current) {
            return Ok(());
        }

        Err(TransitionError::InvalidSourceState {
            transition: name.to_string(),
            expected: self.sources.expected(),
            current: current.name().to_string(),
        })
    }
}

/// Source states as rendered in diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpectedSources {
    State(String),
    OneOf(String),
}

impl Display for ExpectedSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(name) => write!(f, "state {name}"),
            Self::OneOf(names) => write!(f, "one of states [{names}]"),
        }
    }
}

/// Errors produced while evaluating a transition.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("Unknown transition {name}; allowed transitions are [{}]", .allowed.join(", "))]
    UnknownTransition { name: String, allowed: Vec<String> },

    #[error("Transition {transition} can only be applied from {expected}; current state is {current}")]
    InvalidSourceState {
        transition: String,
        expected: ExpectedSources,
        current: String,
    },

    /// A guard denied the transition; the message is the guard's own.
    #[error("{0}")]
    GuardDenied(String),

    /// A guard failed while running.
    #[error(transparent)]
    GuardFault(BoxError),

    #[error("Failed to read entity state: {0}")]
    StateRead(BoxError),

    #[error("Failed to write entity state: {0}")]
    StateWrite(BoxError),
}

impl TransitionError {
    /// Whether this is an expected refusal rather than a failure.
    ///
    /// `can` reports denials as `false`; everything else is an error there too.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::InvalidSourceState { .. } | Self::GuardDenied(_)
        )
    }
}
