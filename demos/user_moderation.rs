//! User Moderation
//!
//! This example demonstrates synchronous accessors combined with a guard map.
//!
//! Key concepts:
//! - Multi-source transitions (`ban` from inactive or active)
//! - Guards scoped to a transition and to a target state
//! - `can` answering false where `apply` reports why
//! - Verdicts becoming deferred once a guard map is configured
//!
//! Run with: RUST_LOG=turnstile=debug cargo run --example user_moderation

use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use turnstile::{state_enum, Machine, MachineBuilder};

state_enum! {
    enum UserState {
        Inactive = "inactive",
        Active = "active",
        Banned = "banned",
    }
}

struct User {
    name: &'static str,
    role: Role,
    reports: u32,
    state: Mutex<UserState>,
}

#[derive(PartialEq)]
enum Role {
    Member,
    Moderator,
}

impl User {
    fn new(name: &'static str, role: Role, reports: u32, state: UserState) -> Self {
        Self {
            name,
            role,
            reports,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> UserState {
        *self.state.lock().unwrap()
    }

    fn set(&self, state: UserState) {
        *self.state.lock().unwrap() = state;
    }
}

fn moderation() -> Machine<UserState, User> {
    MachineBuilder::<UserState, User>::new()
        .states([UserState::Inactive, UserState::Active, UserState::Banned])
        .transition("activate", UserState::Inactive, UserState::Active)
        .transition("ban", [UserState::Inactive, UserState::Active], UserState::Banned)
        .get_state(User::state)
        .set_state(User::set)
        .require_transition(
            "ban",
            |ctx| ctx.entity.reports >= 3,
            "At least three reports are required to ban a user",
        )
        .require_to(
            UserState::Banned,
            |ctx| ctx.entity.role != Role::Moderator,
            "Moderators cannot be banned",
        )
        .build()
        .expect("moderation machine is well formed")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    println!("=== User Moderation ===\n");

    let machine = moderation();
    let users = [
        User::new("alice", Role::Member, 5, UserState::Active),
        User::new("bob", Role::Member, 1, UserState::Active),
        User::new("carol", Role::Moderator, 9, UserState::Active),
        User::new("dave", Role::Member, 4, UserState::Banned),
    ];

    for user in &users {
        println!("{} ({}):", user.name, user.state());

        let allowed = machine
            .can("ban", user)
            .expect("ban is a known transition")
            .await;
        println!("  can ban: {:?}", allowed);

        match machine.apply("ban", user).expect("ban is a known transition").await {
            Ok(()) => println!("  banned, now {}", user.state()),
            Err(err) => println!("  not banned: {}", err),
        }
    }

    println!("\nUnknown transitions fail before anything runs:");
    let unknown = machine.can("promote", &users[0]);
    if let Err(err) = unknown {
        println!("  {}", err);
    }
}
