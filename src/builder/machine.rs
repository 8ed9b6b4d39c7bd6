//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::builder::validation::validate_configuration;
use crate::core::{
    BoxError, Guard, GuardContext, GuardMap, GuardOutcome, MaybeDeferred, Sources, State, Transition,
    TransitionName,
};
use crate::machine::evaluator::{StateReader, StateWriter};
use crate::machine::Machine;
use std::collections::HashSet;
use stillwater::validation::Validation;

/// Builder for constructing machines with a fluent API.
///
/// States, at least one transition, a state accessor and a state mutator
/// are required. Guards are optional; registering any guard, or an empty
/// guard map, makes every verdict of the resulting machine deferred.
pub struct MachineBuilder<S, E: ?Sized, K = String> {
    states: Vec<S>,
    transitions: Vec<(K, Transition<S>)>,
    get_state: Option<Box<StateReader<S, E>>>,
    set_state: Option<Box<StateWriter<S, E>>>,
    guards: Option<GuardMap<S, E, K>>,
}

impl<S: State, E: ?Sized + Sync, K: TransitionName> MachineBuilder<S, E, K> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            transitions: Vec::new(),
            get_state: None,
            set_state: None,
            guards: None,
        }
    }

    /// Add one state.
    pub fn state(mut self, state: S) -> Self {
        self.states.push(state);
        self
    }

    /// Add several states.
    pub fn states(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.states.extend(states);
        self
    }

    /// Add a named transition from one or more source states to `to`.
    pub fn transition(mut self, name: impl Into<K>, from: impl Into<Sources<S>>, to: S) -> Self {
        self.transitions
            .push((name.into(), Transition::new(from, to)));
        self
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, name: impl Into<K>, transition: Transition<S>) -> Self {
        self.transitions.push((name.into(), transition));
        self
    }

    /// Read state with a function that always answers immediately.
    pub fn get_state<F>(mut self, read: F) -> Self
    where
        F: Fn(&E) -> S + Send + Sync + 'static,
    {
        self.get_state = Some(reader::<S, E, _>(move |entity| {
            MaybeDeferred::ready(Ok(read(entity)))
        }));
        self
    }

    /// Read state with a function that may defer or fail.
    pub fn get_state_deferred<F>(mut self, read: F) -> Self
    where
        F: for<'a> Fn(&'a E) -> MaybeDeferred<'a, Result<S, BoxError>> + Send + Sync + 'static,
    {
        self.get_state = Some(Box::new(read));
        self
    }

    /// Write state with a function that always completes immediately.
    pub fn set_state<F>(mut self, write: F) -> Self
    where
        F: Fn(&E, S) + Send + Sync + 'static,
    {
        self.set_state = Some(writer::<S, E, _>(move |entity, state| {
            write(entity, state);
            MaybeDeferred::ready(Ok(()))
        }));
        self
    }

    /// Write state with a function that may defer or fail.
    pub fn set_state_deferred<F>(mut self, write: F) -> Self
    where
        F: for<'a> Fn(&'a E, S) -> MaybeDeferred<'a, Result<(), BoxError>> + Send + Sync + 'static,
    {
        self.set_state = Some(Box::new(write));
        self
    }

    /// Use `guards` as the guard map, replacing any guards added so far.
    ///
    /// An empty map still counts as configured.
    pub fn guards(mut self, guards: GuardMap<S, E, K>) -> Self {
        self.guards = Some(guards);
        self
    }

    /// Add a guard that runs for every transition.
    pub fn guard_all(self, guard: Guard<S, E, K>) -> Self {
        self.with_guards(|map| map.all(guard))
    }

    /// Add a guard that runs only for the named transition.
    pub fn guard_transition(self, name: impl Into<K>, guard: Guard<S, E, K>) -> Self {
        self.with_guards(|map| map.transition(name, guard))
    }

    /// Add a guard that runs when leaving `state`.
    pub fn guard_from(self, state: S, guard: Guard<S, E, K>) -> Self {
        self.with_guards(|map| map.from_state(state, guard))
    }

    /// Add a guard that runs when entering `state`.
    pub fn guard_to(self, state: S, guard: Guard<S, E, K>) -> Self {
        self.with_guards(|map| map.to_state(state, guard))
    }

    /// Deny every transition unless `predicate` holds.
    ///
    /// The `require_*` helpers build a [`Guard::require`] guard with this
    /// builder's types already fixed, so the predicate can read
    /// `ctx.entity` without annotations.
    pub fn require_all<P>(self, predicate: P, reason: impl Into<String>) -> Self
    where
        P: for<'a> Fn(GuardContext<'a, S, E, K>) -> bool + Send + Sync + 'static,
    {
        self.guard_all(Guard::require(predicate, reason))
    }

    /// Deny the named transition unless `predicate` holds.
    pub fn require_transition<P>(
        self,
        name: impl Into<K>,
        predicate: P,
        reason: impl Into<String>,
    ) -> Self
    where
        P: for<'a> Fn(GuardContext<'a, S, E, K>) -> bool + Send + Sync + 'static,
    {
        self.guard_transition(name, Guard::require(predicate, reason))
    }

    /// Deny leaving `state` unless `predicate` holds.
    pub fn require_from<P>(self, state: S, predicate: P, reason: impl Into<String>) -> Self
    where
        P: for<'a> Fn(GuardContext<'a, S, E, K>) -> bool + Send + Sync + 'static,
    {
        self.guard_from(state, Guard::require(predicate, reason))
    }

    /// Deny entering `state` unless `predicate` holds.
    pub fn require_to<P>(self, state: S, predicate: P, reason: impl Into<String>) -> Self
    where
        P: for<'a> Fn(GuardContext<'a, S, E, K>) -> bool + Send + Sync + 'static,
    {
        self.guard_to(state, Guard::require(predicate, reason))
    }

    /// Add a guard for every transition from a closure that answers
    /// immediately.
    pub fn guard_all_fn<F>(self, check: F) -> Self
    where
        F: for<'a> Fn(GuardContext<'a, S, E, K>) -> GuardOutcome + Send + Sync + 'static,
    {
        self.guard_all(Guard::from_fn(check))
    }

    /// Build the machine.
    /// Returns an error if required parts are missing or the configuration
    /// references unknown states or transitions.
    pub fn build(self) -> Result<Machine<S, E, K>, BuildError> {
        if self.states.is_empty() {
            return Err(BuildError::MissingStates);
        }

        if self.transitions.is_empty() {
            return Err(BuildError::NoTransitions);
        }

        if let Some(name) = first_duplicate(&self.transitions) {
            return Err(BuildError::DuplicateTransition(name));
        }

        let validation =
            validate_configuration(&self.states, &self.transitions, self.guards.as_ref());
        if let Validation::Failure(issues) = validation {
            return Err(BuildError::InvalidConfiguration(
                issues.iter().map(|issue| issue.clone()).collect(),
            ));
        }

        let get_state = self.get_state.ok_or(BuildError::MissingStateAccessor)?;
        let set_state = self.set_state.ok_or(BuildError::MissingStateMutator)?;

        Ok(Machine::from_parts(
            self.states,
            self.transitions,
            get_state,
            set_state,
            self.guards,
        ))
    }

    fn with_guards(mut self, add: impl FnOnce(GuardMap<S, E, K>) -> GuardMap<S, E, K>) -> Self {
        let guards = self.guards.take().unwrap_or_default();
        self.guards = Some(add(guards));
        self
    }
}

impl<S: State, E: ?Sized + Sync, K: TransitionName> Default for MachineBuilder<S, E, K> {
    fn default() -> Self {
        Self::new()
    }
}

fn first_duplicate<K: TransitionName, T>(transitions: &[(K, T)]) -> Option<String> {
    let mut seen = HashSet::new();
    transitions
        .iter()
        .map(|(name, _)| name)
        .find(|name| !seen.insert(*name))
        .map(ToString::to_string)
}

fn reader<S, E: ?Sized, F>(read: F) -> Box<StateReader<S, E>>
where
    F: for<'a> Fn(&'a E) -> MaybeDeferred<'a, Result<S, BoxError>> + Send + Sync + 'static,
{
    Box::new(read)
}

fn writer<S, E: ?Sized, F>(write: F) -> Box<StateWriter<S, E>>
where
    F: for<'a> Fn(&'a E, S) -> MaybeDeferred<'a, Result<(), BoxError>> + Send + Sync + 'static,
{
    Box::new(write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::error::ConfigIssue;
    use crate::core::GuardVerdict;
    use std::future::IntoFuture;
    use std::sync::Mutex;

    struct Ticket {
        state: Mutex<&'static str>,
    }

    fn base() -> MachineBuilder<&'static str, Ticket> {
        MachineBuilder::new()
            .states(["open", "closed"])
            .transition("close", "open", "closed")
            .get_state(|ticket: &Ticket| *ticket.state.lock().unwrap())
            .set_state(|ticket: &Ticket, state| *ticket.state.lock().unwrap() = state)
    }

    #[test]
    fn builder_requires_states() {
        let result = MachineBuilder::<&'static str, Ticket>::new()
            .transition("close", "open", "closed")
            .build();

        assert!(matches!(result, Err(BuildError::MissingStates)));
    }

    #[test]
    fn builder_requires_transitions() {
        let result = MachineBuilder::<&'static str, Ticket>::new()
            .states(["open", "closed"])
            .build();

        assert!(matches!(result, Err(BuildError::NoTransitions)));
    }

    #[test]
    fn builder_requires_accessor_and_mutator() {
        let missing_reader = MachineBuilder::<&'static str, Ticket>::new()
            .states(["open", "closed"])
            .transition("close", "open", "closed")
            .build();
        assert!(matches!(missing_reader, Err(BuildError::MissingStateAccessor)));

        let missing_writer = MachineBuilder::<&'static str, Ticket>::new()
            .states(["open", "closed"])
            .transition("close", "open", "closed")
            .get_state(|ticket: &Ticket| *ticket.state.lock().unwrap())
            .build();
        assert!(matches!(missing_writer, Err(BuildError::MissingStateMutator)));
    }

    #[test]
    fn duplicate_transition_names_are_rejected() {
        let result = base().transition("close", "open", "closed").build();

        match result {
            Err(BuildError::DuplicateTransition(name)) => assert_eq!(name, "close"),
            other => panic!("expected duplicate transition error, got {:?}", other.err()),
        }
    }

    #[test]
    fn unknown_states_are_reported_together() {
        let result = base()
            .transition("reopen", "archived", "reopened")
            .guard_from("frozen", Guard::require(|_ctx| true, "unused"))
            .build();

        let Err(BuildError::InvalidConfiguration(issues)) = result else {
            panic!("expected invalid configuration");
        };
        assert_eq!(issues.len(), 3);
        assert!(issues.contains(&ConfigIssue::UnknownGuardState {
            state: "frozen".into()
        }));
    }

    #[test]
    fn invalid_configuration_message_lists_issues() {
        let err = base()
            .transition("reopen", "archived", "open")
            .build()
            .err()
            .unwrap();

        assert_eq!(
            err.to_string(),
            "Invalid machine configuration: transition reopen lists unknown source state archived"
        );
    }

    #[test]
    fn guard_helpers_configure_a_guard_map() {
        let machine = base()
            .guard_transition("close", Guard::require(|_ctx| true, "unused"))
            .build()
            .unwrap();

        assert!(machine.has_guards());
    }

    #[test]
    fn require_helpers_read_the_entity_without_annotations() {
        struct Member {
            state: Mutex<&'static str>,
            verified: bool,
            strikes: u32,
        }

        let machine = MachineBuilder::<&'static str, Member>::new()
            .states(["pending", "active", "suspended"])
            .transition("approve", "pending", "active")
            .transition("suspend", "active", "suspended")
            .get_state(|member: &Member| *member.state.lock().unwrap())
            .set_state(|member: &Member, state| *member.state.lock().unwrap() = state)
            .require_transition("approve", |ctx| ctx.entity.verified, "Member is not verified")
            .require_to("suspended", |ctx| ctx.entity.strikes >= 3, "Not enough strikes")
            .require_from("pending", |ctx| ctx.to == &"active", "unused")
            .require_all(|ctx| ctx.transition.len() > 3, "unused")
            .guard_all_fn(|ctx| {
                if ctx.entity.strikes > 9 {
                    Ok(GuardVerdict::deny("Banned for good"))
                } else {
                    Ok(GuardVerdict::Allow)
                }
            })
            .build()
            .unwrap();

        let unverified = Member {
            state: Mutex::new("pending"),
            verified: false,
            strikes: 0,
        };
        let verdict = machine.apply("approve", &unverified).unwrap();
        let err = futures::executor::block_on(verdict.into_future()).unwrap_err();
        assert_eq!(err.to_string(), "Member is not verified");

        let repeat = Member {
            state: Mutex::new("active"),
            verified: true,
            strikes: 4,
        };
        let verdict = machine.apply("suspend", &repeat).unwrap();
        futures::executor::block_on(verdict.into_future()).unwrap();
        assert_eq!(*repeat.state.lock().unwrap(), "suspended");
    }

    #[test]
    fn fluent_api_builds_machine() {
        let machine = base()
            .state("archived")
            .add_transition("archive", Transition::new("closed", "archived"))
            .build()
            .unwrap();

        assert_eq!(machine.states(), ["open", "closed", "archived"]);
        assert!(!machine.has_guards());
    }
}
