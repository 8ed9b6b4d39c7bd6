//! The transition evaluator: `can` and `apply`.

use crate::builder::MachineBuilder;
use crate::core::{
    BoxError, GuardMap, MaybeDeferred, State, Transition, TransitionError, TransitionName,
};
use crate::machine::pipeline::run_guards;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::hash::Hash;
use tracing::{debug, warn};

/// Reads the current state of an entity.
pub(crate) type StateReader<S, E> =
    dyn for<'a> Fn(&'a E) -> MaybeDeferred<'a, Result<S, BoxError>> + Send + Sync;

/// Moves an entity to a new state.
pub(crate) type StateWriter<S, E> =
    dyn for<'a> Fn(&'a E, S) -> MaybeDeferred<'a, Result<(), BoxError>> + Send + Sync;

/// Result of a `can`/`apply` call once the transition name is known.
///
/// Ready when nothing involved deferred; otherwise it must be awaited.
pub type Verdict<'a, T> = MaybeDeferred<'a, Result<T, TransitionError>>;

/// Whether the checks passed, or why not.
enum Evaluation {
    Allowed,
    Denied(TransitionError),
}

/// Evaluates transitions for entities whose state lives elsewhere.
///
/// The machine owns the transition table, the state accessor and mutator,
/// and the optional guard map. It keeps nothing about entities between
/// calls; each `can`/`apply` is an independent evaluation.
///
/// # Example
///
/// ```rust
/// use std::sync::Mutex;
/// use turnstile::builder::MachineBuilder;
///
/// struct User {
///     state: Mutex<&'static str>,
/// }
///
/// let machine = MachineBuilder::<&'static str, User>::new()
///     .states(["inactive", "active", "banned"])
///     .transition("activate", "inactive", "active")
///     .transition("ban", ["inactive", "active"], "banned")
///     .get_state(|user: &User| *user.state.lock().unwrap())
///     .set_state(|user: &User, state| *user.state.lock().unwrap() = state)
///     .build()
///     .unwrap();
///
/// let user = User { state: Mutex::new("active") };
///
/// // Nothing defers, so the answer is available right away.
/// let allowed = machine.can("ban", &user).unwrap().into_ready().unwrap();
/// assert!(allowed.unwrap());
///
/// machine.apply("ban", &user).unwrap().into_ready().unwrap().unwrap();
/// assert_eq!(*user.state.lock().unwrap(), "banned");
/// ```
pub struct Machine<S, E: ?Sized, K = String> {
    states: Vec<S>,
    transitions: Vec<(K, Transition<S>)>,
    index: HashMap<K, usize>,
    get_state: Box<StateReader<S, E>>,
    set_state: Box<StateWriter<S, E>>,
    guards: Option<GuardMap<S, E, K>>,
}

impl<S: State, E: ?Sized + Sync, K: TransitionName> Machine<S, E, K> {
    /// Start building a machine.
    pub fn builder() -> MachineBuilder<S, E, K> {
        MachineBuilder::new()
    }

    /// Assemble a machine from parts the builder has already validated.
    pub(crate) fn from_parts(
        states: Vec<S>,
        transitions: Vec<(K, Transition<S>)>,
        get_state: Box<StateReader<S, E>>,
        set_state: Box<StateWriter<S, E>>,
        guards: Option<GuardMap<S, E, K>>,
    ) -> Self {
        let index = transitions
            .iter()
            .enumerate()
            .map(|(position, (name, _))| (name.clone(), position))
            .collect();

        Self {
            states,
            transitions,
            index,
            get_state,
            set_state,
            guards,
        }
    }

    /// Test whether `transition` may be applied to `entity` right now.
    ///
    /// An unknown transition name is reported immediately through the outer
    /// `Result`. Otherwise the verdict is `Ok(false)` when the entity is in
    /// the wrong state or a guard denies, `Ok(true)` when everything passes,
    /// and `Err` only when a guard or the state accessor itself fails.
    ///
    /// The verdict is deferred whenever a guard map is configured or the
    /// state accessor deferred; otherwise it is ready.
    pub fn can<'a, Q>(&'a self, transition: &Q, entity: &'a E) -> Result<Verdict<'a, bool>, TransitionError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + Display,
    {
        let (name, definition) = self.lookup(transition)?;

        Ok(self
            .evaluate(name, definition, entity)
            .map(|evaluation| evaluation.map(|outcome| matches!(outcome, Evaluation::Allowed))))
    }

    /// Test `transition` against `entity` and, if it passes, move the entity
    /// to the transition's target state.
    ///
    /// Unlike [`Machine::can`], a wrong source state or a guard denial is an
    /// error here. The verdict resolves only after the mutator has finished;
    /// it is deferred when a guard map is configured or when the accessor or
    /// the mutator deferred.
    pub fn apply<'a, Q>(&'a self, transition: &Q, entity: &'a E) -> Result<Verdict<'a, ()>, TransitionError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + Display,
    {
        let (name, definition) = self.lookup(transition)?;

        Ok(self
            .evaluate(name, definition, entity)
            .and_then(move |evaluation| match evaluation {
                Err(fault) => MaybeDeferred::ready(Err(fault)),
                Ok(Evaluation::Denied(denial)) => MaybeDeferred::ready(Err(denial)),
                Ok(Evaluation::Allowed) => {
                    let target = definition.target();
                    (self.set_state)(entity, target.clone()).map(
                        move |written| -> Result<(), TransitionError> {
                            written.map_err(TransitionError::StateWrite)?;
                            debug!(transition = %name, to = target.name(), "transition applied");
                            Ok(())
                        },
                    )
                }
            }))
    }

    /// Configured states, in declaration order.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Look up a transition definition by name.
    pub fn transition<Q>(&self, name: &Q) -> Option<&Transition<S>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index
            .get(name)
            .and_then(|&position| self.transitions.get(position))
            .map(|(_, transition)| transition)
    }

    /// Transition names, in declaration order.
    pub fn transition_names(&self) -> impl Iterator<Item = &K> {
        self.transitions.iter().map(|(name, _)| name)
    }

    /// Names of the transitions whose source states include `state`.
    ///
    /// Only the transition table is consulted; guards are not run.
    pub fn transitions_from<'m>(&'m self, state: &'m S) -> impl Iterator<Item = &'m K> + 'm {
        self.transitions
            .iter()
            .filter(move |(_, transition)| transition.sources().contains(state))
            .map(|(name, _)| name)
    }

    /// Whether a guard map is configured, which makes every verdict deferred.
    pub fn has_guards(&self) -> bool {
        self.guards.is_some()
    }

    fn lookup<Q>(&self, name: &Q) -> Result<(&K, &Transition<S>), TransitionError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + Display,
    {
        self.index
            .get(name)
            .and_then(|&position| self.transitions.get(position))
            .map(|(key, transition)| (key, transition))
            .ok_or_else(|| TransitionError::UnknownTransition {
                name: name.to_string(),
                allowed: self.transition_names().map(ToString::to_string).collect(),
            })
    }

    /// Read the entity's state, check the source states, then run the guards.
    ///
    /// With a guard map configured the read is forced into the deferred
    /// shape up front, so the verdict is deferred even if no guard applies.
    fn evaluate<'a>(
        &'a self,
        name: &'a K,
        definition: &'a Transition<S>,
        entity: &'a E,
    ) -> MaybeDeferred<'a, Result<Evaluation, TransitionError>> {
        let read = (self.get_state)(entity);
        let read = if self.guards.is_some() {
            read.into_deferred()
        } else {
            read
        };

        read.and_then(move |current| {
            let current = match current {
                Ok(state) => state,
                Err(source) => return MaybeDeferred::ready(Err(TransitionError::StateRead(source))),
            };

            if let Err(denial) = definition.allows_from(name, &current) {
                debug!(transition = %name, current = current.name(), "source state does not match");
                return MaybeDeferred::ready(Ok(Evaluation::Denied(denial)));
            }

            let Some(guards) = &self.guards else {
                return MaybeDeferred::ready(Ok(Evaluation::Allowed));
            };

            let target = definition.target();
            let applicable = guards.applicable(name, &current, target);
            run_guards(applicable, entity, name, current, target).map(move |outcome| match outcome {
                Ok(None) => Ok(Evaluation::Allowed),
                Ok(Some(reason)) => {
                    debug!(transition = %name, %reason, "guard denied transition");
                    Ok(Evaluation::Denied(TransitionError::GuardDenied(reason)))
                }
                Err(fault) => {
                    warn!(transition = %name, error = %fault, "guard failed");
                    Err(TransitionError::GuardFault(fault))
                }
            })
        })
    }
}

impl<S: fmt::Debug, E: ?Sized, K: fmt::Debug> fmt::Debug for Machine<S, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("states", &self.states)
            .field("transitions", &self.transitions)
            .field("guards", &self.guards)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Guard, GuardVerdict};
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
    enum AccountState {
        Inactive,
        Active,
        Banned,
    }

    impl State for AccountState {
        fn name(&self) -> &str {
            match self {
                Self::Inactive => "inactive",
                Self::Active => "active",
                Self::Banned => "banned",
            }
        }
    }

    struct Account {
        state: Mutex<AccountState>,
    }

    impl Account {
        fn new(state: AccountState) -> Self {
            Self {
                state: Mutex::new(state),
            }
        }

        fn current(&self) -> AccountState {
            *self.state.lock().unwrap()
        }
    }

    fn builder() -> MachineBuilder<AccountState, Account> {
        MachineBuilder::new()
            .states([
                AccountState::Inactive,
                AccountState::Active,
                AccountState::Banned,
            ])
            .transition("activate", AccountState::Inactive, AccountState::Active)
            .transition(
                "ban",
                [AccountState::Inactive, AccountState::Active],
                AccountState::Banned,
            )
    }

    fn sync_machine() -> Machine<AccountState, Account> {
        builder()
            .get_state(Account::current)
            .set_state(|account: &Account, state| *account.state.lock().unwrap() = state)
            .build()
            .unwrap()
    }

    fn deferred_machine() -> Machine<AccountState, Account> {
        builder()
            .get_state_deferred(|account| {
                MaybeDeferred::defer(async move {
                    tokio::task::yield_now().await;
                    Ok(account.current())
                })
            })
            .set_state_deferred(|account, state| {
                MaybeDeferred::defer(async move {
                    tokio::task::yield_now().await;
                    *account.state.lock().unwrap() = state;
                    Ok(())
                })
            })
            .build()
            .unwrap()
    }

    #[test]
    fn can_is_true_from_an_allowed_state() {
        let machine = sync_machine();
        let account = Account::new(AccountState::Active);

        let verdict = machine.can("ban", &account).unwrap();
        assert!(verdict.into_ready().unwrap().unwrap());
        assert_eq!(account.current(), AccountState::Active);
    }

    #[test]
    fn can_is_false_from_a_disallowed_state() {
        let machine = sync_machine();
        let account = Account::new(AccountState::Banned);

        let verdict = machine.can("ban", &account).unwrap();
        assert!(!verdict.into_ready().unwrap().unwrap());
    }

    #[test]
    fn apply_moves_to_target_state() {
        let machine = sync_machine();
        let account = Account::new(AccountState::Active);

        machine
            .apply("ban", &account)
            .unwrap()
            .into_ready()
            .unwrap()
            .unwrap();
        assert_eq!(account.current(), AccountState::Banned);
    }

    #[test]
    fn apply_from_wrong_single_state_reports_source() {
        let machine = sync_machine();
        let account = Account::new(AccountState::Active);

        let err = machine
            .apply("activate", &account)
            .unwrap()
            .into_ready()
            .unwrap()
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Transition activate can only be applied from state inactive; current state is active"
        );
        assert_eq!(account.current(), AccountState::Active);
    }

    #[test]
    fn unknown_transition_fails_synchronously_even_with_guards() {
        let machine = builder()
            .get_state(Account::current)
            .set_state(|account: &Account, state| *account.state.lock().unwrap() = state)
            .guards(GuardMap::new())
            .build()
            .unwrap();
        let account = Account::new(AccountState::Active);

        let err = machine.can("promote", &account).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown transition promote; allowed transitions are [activate, ban]"
        );
        assert!(machine.apply("promote", &account).is_err());
    }

    #[test]
    fn empty_guard_map_forces_deferred_verdicts() {
        let machine = builder()
            .get_state(Account::current)
            .set_state(|account: &Account, state| *account.state.lock().unwrap() = state)
            .guards(GuardMap::new())
            .build()
            .unwrap();
        let account = Account::new(AccountState::Active);

        assert!(machine.has_guards());
        assert!(machine.can("ban", &account).unwrap().is_deferred());
        assert!(machine.apply("ban", &account).unwrap().is_deferred());
    }

    #[test]
    fn deferred_verdict_does_not_mutate_until_awaited() {
        let machine = deferred_machine();
        let account = Account::new(AccountState::Active);

        let verdict = machine.apply("ban", &account).unwrap();
        assert!(verdict.is_deferred());
        assert_eq!(account.current(), AccountState::Active);
        drop(verdict);
        assert_eq!(account.current(), AccountState::Active);
    }

    #[tokio::test]
    async fn deferred_accessors_produce_deferred_verdicts() {
        let machine = deferred_machine();
        let account = Account::new(AccountState::Inactive);

        let verdict = machine.can("activate", &account).unwrap();
        assert!(verdict.is_deferred());
        assert!(verdict.await.unwrap());

        machine.apply("activate", &account).unwrap().await.unwrap();
        assert_eq!(account.current(), AccountState::Active);
    }

    #[tokio::test]
    async fn deferred_mutator_after_ready_accessor_defers_apply_only() {
        let writes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&writes);
        let machine = builder()
            .get_state(Account::current)
            .set_state_deferred(move |account, state| {
                let counter = Arc::clone(&counter);
                MaybeDeferred::defer(async move {
                    tokio::task::yield_now().await;
                    *account.state.lock().unwrap() = state;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .build()
            .unwrap();
        let account = Account::new(AccountState::Inactive);

        assert!(machine.can("activate", &account).unwrap().is_ready());

        let verdict = machine.apply("activate", &account).unwrap();
        assert!(verdict.is_deferred());
        verdict.await.unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(account.current(), AccountState::Active);
    }

    #[tokio::test]
    async fn guard_denial_is_false_for_can_and_error_for_apply() {
        let machine = builder()
            .get_state(Account::current)
            .set_state(|account: &Account, state| *account.state.lock().unwrap() = state)
            .guard_all(Guard::from_fn(|_ctx| Ok(GuardVerdict::deny("Test error"))))
            .build()
            .unwrap();
        let account = Account::new(AccountState::Active);

        assert!(!machine.can("ban", &account).unwrap().await.unwrap());

        let err = machine.apply("ban", &account).unwrap().await.unwrap_err();
        assert_eq!(err.to_string(), "Test error");
        assert!(matches!(err, TransitionError::GuardDenied(_)));
        assert_eq!(account.current(), AccountState::Active);
    }

    #[tokio::test]
    async fn guard_fault_propagates_from_can_and_apply() {
        let machine = builder()
            .get_state(Account::current)
            .set_state(|account: &Account, state| *account.state.lock().unwrap() = state)
            .guard_transition("ban", Guard::from_fn(|_ctx| Err("lookup failed".into())))
            .build()
            .unwrap();
        let account = Account::new(AccountState::Active);

        let err = machine.can("ban", &account).unwrap().await.unwrap_err();
        assert!(matches!(err, TransitionError::GuardFault(_)));
        assert_eq!(err.to_string(), "lookup failed");

        let err = machine.apply("ban", &account).unwrap().await.unwrap_err();
        assert!(matches!(err, TransitionError::GuardFault(_)));
        assert_eq!(account.current(), AccountState::Active);
    }

    #[tokio::test]
    async fn source_mismatch_skips_guards() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let machine = builder()
            .get_state(Account::current)
            .set_state(|account: &Account, state| *account.state.lock().unwrap() = state)
            .guard_all(Guard::from_fn(move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(GuardVerdict::Allow)
            }))
            .build()
            .unwrap();
        let account = Account::new(AccountState::Banned);

        assert!(!machine.can("ban", &account).unwrap().await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_accessor_is_an_error_not_false() {
        let machine = builder()
            .get_state_deferred(|_account| MaybeDeferred::ready(Err("row not found".into())))
            .set_state(|account: &Account, state| *account.state.lock().unwrap() = state)
            .build()
            .unwrap();
        let account = Account::new(AccountState::Active);

        let err = machine
            .can("ban", &account)
            .unwrap()
            .into_ready()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, TransitionError::StateRead(_)));
        assert_eq!(err.to_string(), "Failed to read entity state: row not found");
    }

    #[test]
    fn failing_mutator_reports_write_error() {
        let machine = builder()
            .get_state(Account::current)
            .set_state_deferred(|_account, _state| MaybeDeferred::ready(Err("read-only replica".into())))
            .build()
            .unwrap();
        let account = Account::new(AccountState::Active);

        let err = machine
            .apply("ban", &account)
            .unwrap()
            .into_ready()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, TransitionError::StateWrite(_)));
    }

    #[test]
    fn introspection_follows_declaration_order() {
        let machine = sync_machine();

        let names: Vec<&String> = machine.transition_names().collect();
        assert_eq!(names, ["activate", "ban"]);

        let from_active: Vec<&String> = machine.transitions_from(&AccountState::Active).collect();
        assert_eq!(from_active, ["ban"]);

        let from_inactive: Vec<&String> =
            machine.transitions_from(&AccountState::Inactive).collect();
        assert_eq!(from_inactive, ["activate", "ban"]);

        assert_eq!(machine.states().len(), 3);
        assert_eq!(
            machine.transition("activate").map(Transition::target),
            Some(&AccountState::Active)
        );
        assert!(machine.transition("promote").is_none());
        assert!(!machine.has_guards());
    }
}
