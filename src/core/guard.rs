//! Guards that can veto a transition.
//!
//! A guard receives the entity, the transition name and both endpoint
//! states, and answers with a [`GuardVerdict`]. Guards may answer
//! immediately or defer; an `Err` means the guard itself failed and is
//! never confused with a denial.

use super::deferred::MaybeDeferred;
use super::state::State;
use super::transition::TransitionName;
use super::BoxError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a guard gets to look at.
pub struct GuardContext<'a, S, E: ?Sized, K = String> {
    pub entity: &'a E,
    pub transition: &'a K,
    pub from: &'a S,
    pub to: &'a S,
}

impl<S, E: ?Sized, K> Clone for GuardContext<'_, S, E, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, E: ?Sized, K> Copy for GuardContext<'_, S, E, K> {}

impl<S: fmt::Debug, E: ?Sized, K: fmt::Debug> fmt::Debug for GuardContext<'_, S, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardContext")
            .field("transition", self.transition)
            .field("from", self.from)
            .field("to", self.to)
            .finish_non_exhaustive()
    }
}

/// Answer given by a guard that ran to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardVerdict {
    /// The guard has no objection.
    Allow,
    /// The transition is blocked for the given reason.
    Deny(String),
}

impl GuardVerdict {
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny(reason.into())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// `None` allows, `Some(reason)` denies.
impl From<Option<String>> for GuardVerdict {
    fn from(reason: Option<String>) -> Self {
        reason.map_or(Self::Allow, Self::Deny)
    }
}

/// What a guard produces: a verdict, or its own failure.
pub type GuardOutcome = Result<GuardVerdict, BoxError>;

type GuardFn<S, E, K> =
    dyn for<'a> Fn(GuardContext<'a, S, E, K>) -> MaybeDeferred<'a, GuardOutcome> + Send + Sync;

/// A validation step run before a transition is allowed.
///
/// Guard closures only see their context's types once the guard's own type
/// is fixed, so name it up front (`Guard::<S, E>::require`, or a type alias)
/// when the closure reads `ctx.entity`. Inside a typed builder the
/// `require_*` and `guard_all_fn` helpers do this for you.
///
/// # Example
///
/// ```rust
/// use turnstile::core::{Guard, GuardVerdict, MaybeDeferred};
///
/// struct Account {
///     verified: bool,
/// }
///
/// // Answers immediately.
/// let verified =
///     Guard::<&'static str, Account>::require(|ctx| ctx.entity.verified, "Account is not verified");
///
/// // Answers later.
/// let remote = Guard::<&'static str, Account>::new(|ctx| {
///     MaybeDeferred::defer(async move {
///         if ctx.to.len() > 3 {
///             Ok(GuardVerdict::Allow)
///         } else {
///             Ok(GuardVerdict::deny("target state name too short"))
///         }
///     })
/// });
/// # let _ = (verified, remote);
/// ```
pub struct Guard<S, E: ?Sized, K = String> {
    check: Arc<GuardFn<S, E, K>>,
}

impl<S, E: ?Sized, K> Guard<S, E, K> {
    /// Create a guard that may answer immediately or defer.
    pub fn new<F>(check: F) -> Self
    where
        F: for<'a> Fn(GuardContext<'a, S, E, K>) -> MaybeDeferred<'a, GuardOutcome>
            + Send
            + Sync
            + 'static,
    {
        Self {
            check: Arc::new(check),
        }
    }

    /// Create a guard that always answers immediately.
    pub fn from_fn<F>(check: F) -> Self
    where
        F: for<'a> Fn(GuardContext<'a, S, E, K>) -> GuardOutcome + Send + Sync + 'static,
    {
        Self::new(move |ctx| MaybeDeferred::Ready(check(ctx)))
    }

    /// Create a guard from a predicate, denying with `reason` when it is false.
    pub fn require<P>(predicate: P, reason: impl Into<String>) -> Self
    where
        P: for<'a> Fn(GuardContext<'a, S, E, K>) -> bool + Send + Sync + 'static,
    {
        let reason = reason.into();
        Self::from_fn(move |ctx| {
            if predicate(ctx) {
                Ok(GuardVerdict::Allow)
            } else {
                Ok(GuardVerdict::Deny(reason.clone()))
            }
        })
    }

    /// Run the guard against one context.
    pub fn check<'a>(&self, ctx: GuardContext<'a, S, E, K>) -> MaybeDeferred<'a, GuardOutcome> {
        (self.check)(ctx)
    }
}

impl<S, E: ?Sized, K> Clone for Guard<S, E, K> {
    fn clone(&self) -> Self {
        Self {
            check: Arc::clone(&self.check),
        }
    }
}

impl<S, E: ?Sized, K> fmt::Debug for Guard<S, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

/// Guards grouped by the scope they apply to.
///
/// For a given call the applicable guards run in this order: `all`, then
/// the ones registered for the transition name, then the ones for the
/// state being left, then the ones for the state being entered. Order
/// within a scope is registration order.
pub struct GuardMap<S, E: ?Sized, K = String> {
    all: Vec<Guard<S, E, K>>,
    transitions: HashMap<K, Vec<Guard<S, E, K>>>,
    from_state: Vec<(S, Vec<Guard<S, E, K>>)>,
    to_state: Vec<(S, Vec<Guard<S, E, K>>)>,
}

impl<S: State, E: ?Sized, K: TransitionName> GuardMap<S, E, K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guard that runs for every transition.
    pub fn all(mut self, guard: Guard<S, E, K>) -> Self {
        self.all.push(guard);
        self
    }

    /// Add a guard that runs only for the named transition.
    pub fn transition(mut self, name: impl Into<K>, guard: Guard<S, E, K>) -> Self {
        self.transitions.entry(name.into()).or_default().push(guard);
        self
    }

    /// Add a guard that runs when leaving `state`.
    pub fn from_state(mut self, state: S, guard: Guard<S, E, K>) -> Self {
        push_scoped(&mut self.from_state, state, guard);
        self
    }

    /// Add a guard that runs when entering `state`.
    pub fn to_state(mut self, state: S, guard: Guard<S, E, K>) -> Self {
        push_scoped(&mut self.to_state, state, guard);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
            && self.transitions.values().all(Vec::is_empty)
            && self.from_state.iter().all(|(_, guards)| guards.is_empty())
            && self.to_state.iter().all(|(_, guards)| guards.is_empty())
    }

    /// The guards that apply to one transition, flattened in run order.
    pub fn applicable(&self, transition: &K, from: &S, to: &S) -> Vec<&Guard<S, E, K>> {
        let named = self
            .transitions
            .get(transition)
            .map(Vec::as_slice)
            .unwrap_or_default();

        self.all
            .iter()
            .chain(named)
            .chain(scoped(&self.from_state, from))
            .chain(scoped(&self.to_state, to))
            .collect()
    }

    /// Transition names that have guards registered.
    pub(crate) fn scoped_transitions(&self) -> impl Iterator<Item = &K> {
        self.transitions.keys()
    }

    /// States that have guards registered, on either side.
    pub(crate) fn scoped_states(&self) -> impl Iterator<Item = &S> {
        self.from_state
            .iter()
            .chain(self.to_state.iter())
            .map(|(state, _)| state)
    }
}

impl<S, E: ?Sized, K> Default for GuardMap<S, E, K> {
    fn default() -> Self {
        Self {
            all: Vec::new(),
            transitions: HashMap::new(),
            from_state: Vec::new(),
            to_state: Vec::new(),
        }
    }
}

impl<S, E: ?Sized, K> fmt::Debug for GuardMap<S, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardMap")
            .field("all", &self.all.len())
            .field("transitions", &self.transitions.len())
            .field("from_state", &self.from_state.len())
            .field("to_state", &self.to_state.len())
            .finish()
    }
}

fn push_scoped<S: PartialEq, G>(scopes: &mut Vec<(S, Vec<G>)>, state: S, guard: G) {
    match scopes.iter_mut().find(|(existing, _)| *existing == state) {
        Some((_, guards)) => guards.push(guard),
        None => scopes.push((state, vec![guard])),
    }
}

fn scoped<'m, S: PartialEq, G>(scopes: &'m [(S, Vec<G>)], state: &S) -> &'m [G] {
    scopes
        .iter()
        .find(|(existing, _)| existing == state)
        .map(|(_, guards)| guards.as_slice())
        .unwrap_or_default()
}
