//! History and Warm Restart
//!
//! This example demonstrates re-entering a composite state with and without
//! history, on an asynchronous machine.
//!
//! Key concepts:
//! - Shallow history restarts the immediate nested level
//! - Deep history resumes the exact nested leaf
//! - Events sent before start are queued, not dropped
//! - The debug interface resumes a state after a process restart
//!
//! Run with: RUST_LOG=hfsm=debug cargo run --example history_resume

use hfsm::core::{Event, State};
use hfsm::machine::{FsmAsync, FsmDebug};
use hfsm::{event_kinds, FsmSync};
use tracing_subscriber::EnvFilter;

event_kinds! {
    NEXT = "Next";
    PAUSE = "Pause";
    RESUME = "Resume";
    RESUME_DEEP = "ResumeDeep";
}

/// Order handling: Picking -> Packing[Box -> Tape -> Label] -> Shipped.
fn order_machine() -> Result<(FsmAsync, State), Box<dyn std::error::Error>> {
    let boxing = State::new("Box");
    let tape = State::new("Tape");
    let label = State::new("Label");
    let packer = FsmSync::of(
        "packer",
        boxing.on(&NEXT, &tape),
        [tape.on(&NEXT, &label), label.on_final(&NEXT)],
    )?;

    let picking = State::new("Picking");
    let packing = State::composite("Packing", [packer]);
    let paused = State::new("Paused");
    let shipped = State::new("Shipped");

    let fsm = FsmAsync::of(
        "orders",
        picking.on(&NEXT, &packing),
        [
            packing
                .on(&PAUSE, &paused)
                .on_completion(&shipped)
                .entry(|| println!("  entering Packing")),
            paused
                .on(&RESUME, packing.history())
                .on(&RESUME_DEEP, packing.deep_history()),
        ],
    )?;
    Ok((fsm, packing))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== History and Warm Restart ===\n");

    let (orders, _) = order_machine()?;

    // queued until start
    orders.trigger(&NEXT)?;
    orders.trigger(&NEXT)?;
    orders.start()?;
    orders.settle().await;
    println!("After two steps:  {}", orders.current_state_tree());

    orders.trigger(&PAUSE)?;
    orders.trigger(&RESUME_DEEP)?;
    orders.settle().await;
    println!("Deep history:     {}", orders.current_state_tree());

    orders.trigger(&PAUSE)?;
    orders.trigger(&RESUME)?;
    orders.settle().await;
    println!("Shallow history:  {}", orders.current_state_tree());

    orders.trigger(&NEXT)?;
    let ticket = orders.trigger_with_ticket(&NEXT)?;
    println!("Last event handled: {}", ticket.outcome().await?);
    println!("Completed:        {}", orders.current_state_tree());

    println!("\nWarm restart of a fresh machine:");
    let (restored, packing) = order_machine()?;
    let debug = restored.debug();
    debug.resume(&packing)?;
    println!("Restored:         {}", restored.current_state_tree());
    debug.trigger_sync(Event::new(&NEXT))?;
    println!("One step later:   {}", restored.current_state_tree());

    println!("\n=== Example Complete ===");
    Ok(())
}
