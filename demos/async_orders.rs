//! Async Orders
//!
//! This example demonstrates an order machine whose state lives in a
//! (simulated) remote store and whose guards call out asynchronously.
//!
//! Key concepts:
//! - Deferred state accessor and mutator
//! - Deferred guards scoped to a source state
//! - A guard failure propagating as an error instead of a denial
//! - `apply` resolving only after the write is confirmed
//!
//! Run with: RUST_LOG=turnstile=trace cargo run --example async_orders

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use turnstile::core::{BoxError, Guard, GuardVerdict, MaybeDeferred};
use turnstile::{state_enum, Machine, MachineBuilder};

state_enum! {
    enum OrderState {
        Pending = "pending",
        Paid = "paid",
        Shipped = "shipped",
        Cancelled = "cancelled",
    }
}

/// Stand-in for a database table keyed by order id.
#[derive(Default)]
struct OrderStore {
    rows: Mutex<HashMap<u64, OrderState>>,
}

struct Order {
    id: u64,
    amount_cents: u64,
    store: Arc<OrderStore>,
}

impl OrderStore {
    async fn load(&self, id: u64) -> Result<OrderState, BoxError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .ok_or_else(|| format!("order {id} not found").into())
    }

    async fn save(&self, id: u64, state: OrderState) -> Result<(), BoxError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.rows.lock().unwrap().insert(id, state);
        Ok(())
    }
}

async fn fraud_check(amount_cents: u64) -> Result<GuardVerdict, BoxError> {
    tokio::time::sleep(Duration::from_millis(3)).await;
    match amount_cents {
        0 => Err("fraud service rejected an empty order".into()),
        cents if cents > 100_000 => Ok(GuardVerdict::deny("Order requires manual review")),
        _ => Ok(GuardVerdict::Allow),
    }
}

fn orders() -> Machine<OrderState, Order> {
    MachineBuilder::new()
        .states([
            OrderState::Pending,
            OrderState::Paid,
            OrderState::Shipped,
            OrderState::Cancelled,
        ])
        .transition("pay", OrderState::Pending, OrderState::Paid)
        .transition("ship", OrderState::Paid, OrderState::Shipped)
        .transition("cancel", [OrderState::Pending, OrderState::Paid], OrderState::Cancelled)
        .get_state_deferred(|order: &Order| {
            MaybeDeferred::defer(order.store.load(order.id))
        })
        .set_state_deferred(|order: &Order, state| {
            MaybeDeferred::defer(order.store.save(order.id, state))
        })
        .guard_from(
            OrderState::Pending,
            Guard::<OrderState, Order>::new(|ctx| {
                MaybeDeferred::defer(fraud_check(ctx.entity.amount_cents))
            }),
        )
        .build()
        .expect("order machine is well formed")
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    println!("=== Async Orders ===\n");

    let store = Arc::new(OrderStore::default());
    let machine = orders();
    let cases = [(1, 4_500), (2, 250_000), (3, 0)];

    for (id, amount_cents) in cases {
        store.save(id, OrderState::Pending).await?;
        let order = Order {
            id,
            amount_cents,
            store: Arc::clone(&store),
        };

        println!("order {id} ({amount_cents} cents):");
        for step in ["pay", "ship"] {
            match machine.apply(step, &order)?.await {
                Ok(()) => println!("  {step}: now {}", store.load(id).await?),
                Err(err) if err.is_denial() => println!("  {step}: denied: {err}"),
                Err(err) => println!("  {step}: failed: {err}"),
            }
        }
    }

    Ok(())
}
