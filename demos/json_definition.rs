//! JSON Definition
//!
//! This example demonstrates loading a transition table from JSON and
//! attaching accessors and guards in code.
//!
//! Key concepts:
//! - `MachineDefinition` parsed with serde
//! - States generated with `state_enum!` deserializing from their labels
//! - Build-time validation reporting every configuration issue at once
//!
//! Run with: cargo run --example json_definition

use std::future::IntoFuture;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use turnstile::core::State;
use turnstile::{state_enum, MachineDefinition};

state_enum! {
    enum TicketState {
        Open = "open",
        InProgress = "in_progress",
        Resolved = "resolved",
        Closed = "closed",
    }
}

const TICKETS: &str = r#"{
    "states": ["open", "in_progress", "resolved", "closed"],
    "transitions": {
        "start": { "from": "open", "to": "in_progress" },
        "resolve": { "from": ["open", "in_progress"], "to": "resolved" },
        "close": { "from": "resolved", "to": "closed" }
    }
}"#;

const BROKEN: &str = r#"{
    "states": ["open", "closed"],
    "transitions": {
        "close": { "from": ["open", "resolved"], "to": "closed" },
        "reopen": { "from": [], "to": "in_progress" }
    }
}"#;

struct Ticket {
    assignee: Option<&'static str>,
    state: Mutex<TicketState>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    println!("=== JSON Definition ===\n");

    let definition: MachineDefinition<TicketState> = MachineDefinition::from_json(TICKETS)?;
    let machine = definition
        .into_builder::<Ticket>()
        .get_state(|ticket: &Ticket| *ticket.state.lock().unwrap())
        .set_state(|ticket: &Ticket, state| *ticket.state.lock().unwrap() = state)
        .require_to(
            TicketState::InProgress,
            |ctx| ctx.entity.assignee.is_some(),
            "Ticket has no assignee",
        )
        .build()?;

    println!("transitions: {:?}", machine.transition_names().collect::<Vec<_>>());
    println!(
        "from open: {:?}",
        machine.transitions_from(&TicketState::Open).collect::<Vec<_>>()
    );

    let ticket = Ticket {
        assignee: Some("sam"),
        state: Mutex::new(TicketState::Open),
    };
    for step in ["start", "resolve", "close"] {
        futures::executor::block_on(machine.apply(step, &ticket)?.into_future())?;
        println!("{step}: now {}", ticket.state.lock().unwrap().name());
    }

    println!("\nA broken definition reports every problem:");
    let broken: MachineDefinition<String> = MachineDefinition::from_json(BROKEN)?;
    let result = broken
        .into_builder::<Ticket>()
        .get_state(|_ticket: &Ticket| String::from("open"))
        .set_state(|_ticket: &Ticket, _state| {})
        .build();
    if let Err(err) = result {
        println!("  {err}");
    }

    Ok(())
}
