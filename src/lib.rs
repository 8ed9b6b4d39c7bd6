//! Turnstile: transition and guard evaluation for declarative state machines
//!
//! Turnstile answers two questions about an entity whose state lives
//! elsewhere (a struct field, a database row, a remote service): may this
//! named transition happen now, and if so, make it happen. The machine never
//! stores entity state itself. It reads and writes it through caller-supplied
//! functions and consults guards before committing.
//!
//! # Core Concepts
//!
//! - **State**: type-safe state tokens via the `State` trait
//! - **Transition**: a named edge from one or more source states to a target
//! - **Guards**: predicates scoped to all transitions, one transition, a
//!   source state or a target state, run in that order
//! - **MaybeDeferred**: results stay synchronous as long as nothing defers
//!
//! # Example
//!
//! ```rust
//! use std::sync::Mutex;
//! use turnstile::core::State;
//! use turnstile::{state_enum, MachineBuilder};
//!
//! state_enum! {
//!     pub enum UserState {
//!         Inactive = "inactive",
//!         Active = "active",
//!         Banned = "banned",
//!     }
//! }
//!
//! struct User {
//!     state: Mutex<UserState>,
//!     admin: bool,
//! }
//!
//! let machine = MachineBuilder::<UserState, User>::new()
//!     .states([UserState::Inactive, UserState::Active, UserState::Banned])
//!     .transition("activate", UserState::Inactive, UserState::Active)
//!     .transition("ban", [UserState::Inactive, UserState::Active], UserState::Banned)
//!     .get_state(|user: &User| *user.state.lock().unwrap())
//!     .set_state(|user: &User, state| *user.state.lock().unwrap() = state)
//!     .require_to(UserState::Banned, |ctx| !ctx.entity.admin, "Admins cannot be banned")
//!     .build()
//!     .unwrap();
//!
//! let user = User { state: Mutex::new(UserState::Active), admin: false };
//!
//! # futures::executor::block_on(async {
//! // Guards are configured, so verdicts are deferred.
//! assert!(machine.can("ban", &user).unwrap().await.unwrap());
//! machine.apply("ban", &user).unwrap().await.unwrap();
//! assert_eq!(user.state.lock().unwrap().name(), "banned");
//! # });
//! ```

pub mod builder;
pub mod core;
pub mod definition;
pub mod machine;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use core::{Guard, GuardMap, MaybeDeferred, State, TransitionError};
pub use definition::MachineDefinition;
pub use machine::{Machine, Verdict};
