//! Configuration checks run by `MachineBuilder::build`.
//!
//! Checks accumulate through Stillwater's `Validation` so that a
//! misconfigured machine reports every problem in one pass.

use crate::builder::error::ConfigIssue;
use crate::core::{GuardMap, State, Transition, TransitionName};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigIssue>>;

/// Check that every state and transition referenced by the table and the
/// guard map is part of the configuration.
pub(crate) fn validate_configuration<S, E, K>(
    states: &[S],
    transitions: &[(K, Transition<S>)],
    guards: Option<&GuardMap<S, E, K>>,
) -> Check
where
    S: State,
    E: ?Sized,
    K: TransitionName,
{
    let mut checks: Vec<Check> = Vec::new();

    for (name, transition) in transitions {
        if transition.sources().is_empty() {
            checks.push(Validation::fail(ConfigIssue::EmptySources {
                transition: name.to_string(),
            }));
        }

        for source in transition.sources().iter() {
            checks.push(require(states.contains(source), || {
                ConfigIssue::UnknownSourceState {
                    transition: name.to_string(),
                    state: source.name().to_string(),
                }
            }));
        }

        checks.push(require(states.contains(transition.target()), || {
            ConfigIssue::UnknownTargetState {
                transition: name.to_string(),
                state: transition.target().name().to_string(),
            }
        }));
    }

    if let Some(guards) = guards {
        for scoped in guards.scoped_transitions() {
            let known = transitions.iter().any(|(name, _)| name == scoped);
            checks.push(require(known, || ConfigIssue::UnknownGuardTransition {
                transition: scoped.to_string(),
            }));
        }

        let mut reported: Vec<&S> = Vec::new();
        for state in guards.scoped_states() {
            if reported.contains(&state) {
                continue;
            }
            reported.push(state);
            checks.push(require(states.contains(state), || {
                ConfigIssue::UnknownGuardState {
                    state: state.name().to_string(),
                }
            }));
        }
    }

    Validation::all_vec(checks).map(|_| ())
}

fn require(holds: bool, issue: impl FnOnce() -> ConfigIssue) -> Check {
    if holds {
        Validation::success(())
    } else {
        Validation::fail(issue())
    }
}
