//! State tokens.
//!
//! A state is an opaque, comparable token drawn from a fixed set supplied by
//! the caller. The engine only ever compares states and prints their names.

use std::fmt::Debug;

/// Trait for state machine states.
///
/// States are compared by value and carry a display name used in every
/// diagnostic the engine produces. No ordering is implied.
///
/// # Required Traits
///
/// - `Clone`: the target state is handed to the mutator by value
/// - `PartialEq`: source states are matched by equality
/// - `Debug`: states must be debuggable for diagnostics
/// - `Send` + `Sync`: states are held across deferred evaluation
///
/// # Example
///
/// ```rust
/// use turnstile::core::State;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum AccountState {
///     Inactive,
///     Active,
///     Banned,
/// }
///
/// impl State for AccountState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Inactive => "inactive",
///             Self::Active => "active",
///             Self::Banned => "banned",
///         }
///     }
/// }
///
/// assert_eq!(AccountState::Banned.name(), "banned");
/// ```
pub trait State: Clone + PartialEq + Debug + Send + Sync {
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;
}

impl State for String {
    fn name(&self) -> &str {
        self
    }
}

impl State for &'static str {
    fn name(&self) -> &str {
        self
    }
}

/// Join state names the way diagnostics list them: `a, b, c`.
pub(crate) fn join_names<'a, S, I>(states: I) -> String
where
    S: State + 'a,
    I: IntoIterator<Item = &'a S>,
{
    states
        .into_iter()
        .map(State::name)
        .collect::<Vec<_>>()
        .join(", ")
}
