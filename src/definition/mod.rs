//! Declarative machine definitions.
//!
//! The data half of a machine (its states and transition table) can be kept
//! in configuration and loaded at startup. Accessors, mutators and guards are
//! code and are attached to the builder that a definition produces.
//!
//! ```rust
//! use std::sync::Mutex;
//! use turnstile::definition::MachineDefinition;
//!
//! struct User {
//!     state: Mutex<String>,
//! }
//!
//! let definition: MachineDefinition<String> = MachineDefinition::from_json(
//!     r#"{
//!         "states": ["inactive", "active", "banned"],
//!         "transitions": {
//!             "activate": { "from": "inactive", "to": "active" },
//!             "ban": { "from": ["inactive", "active"], "to": "banned" }
//!         }
//!     }"#,
//! )
//! .unwrap();
//!
//! let machine = definition
//!     .into_builder::<User>()
//!     .get_state(|user: &User| user.state.lock().unwrap().clone())
//!     .set_state(|user: &User, state| *user.state.lock().unwrap() = state)
//!     .build()
//!     .unwrap();
//!
//! let user = User { state: Mutex::new("inactive".into()) };
//! assert!(machine.can("activate", &user).unwrap().into_ready().unwrap().unwrap());
//! ```

pub mod error;

pub use error::DefinitionError;

use crate::builder::MachineBuilder;
use crate::core::{Sources, State};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the transition table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionDefinition<S> {
    /// A single state or a list of states.
    pub from: Sources<S>,
    pub to: S,
}

/// Serializable description of a machine's states and transitions.
///
/// Transitions are keyed by name, so a document cannot define the same name
/// twice and names come back in lexical order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineDefinition<S> {
    pub states: Vec<S>,
    pub transitions: BTreeMap<String, TransitionDefinition<S>>,
}

impl<S> MachineDefinition<S> {
    /// Create a definition with the given states and no transitions.
    pub fn new(states: impl IntoIterator<Item = S>) -> Self {
        Self {
            states: states.into_iter().collect(),
            transitions: BTreeMap::new(),
        }
    }

    /// Add or replace a transition.
    pub fn with_transition(
        mut self,
        name: impl Into<String>,
        from: impl Into<Sources<S>>,
        to: S,
    ) -> Self {
        self.transitions.insert(
            name.into(),
            TransitionDefinition {
                from: from.into(),
                to,
            },
        );
        self
    }

    /// Parse a definition from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError>
    where
        S: DeserializeOwned,
    {
        serde_json::from_str(json).map_err(DefinitionError::Parse)
    }

    /// Render the definition as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DefinitionError>
    where
        S: Serialize,
    {
        serde_json::to_string_pretty(self).map_err(DefinitionError::Serialize)
    }
}

impl<S: State> MachineDefinition<S> {
    /// Start a builder pre-populated with this definition's states and
    /// transitions.
    ///
    /// The state accessor, the mutator and any guards still have to be
    /// supplied before calling `build`, which also checks that every state
    /// the table mentions is declared.
    pub fn into_builder<E: ?Sized + Sync>(self) -> MachineBuilder<S, E> {
        self.transitions.into_iter().fold(
            MachineBuilder::new().states(self.states),
            |builder, (name, transition)| builder.transition(name, transition.from, transition.to),
        )
    }
}
