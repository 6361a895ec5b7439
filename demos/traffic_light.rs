//! Traffic Light State Machine
//!
//! This example demonstrates a composite state with a cyclic sub-machine.
//!
//! Key concepts:
//! - Cyclic sub-machine (Red -> Green -> Yellow -> Red)
//! - Payload-typed guards (daylight on or off)
//! - Event kinds derived from other kinds
//! - Listening to state changes
//!
//! Run with: RUST_LOG=hfsm=debug cargo run --example traffic_light

use hfsm::core::State;
use hfsm::describe::StateChangedInfo;
use hfsm::{event_kinds, FsmBuilder, FsmSync};
use tracing_subscriber::EnvFilter;

event_kinds! {
    TIMER = "Timer";
    DAYLIGHT = "Daylight";
    MODE = "Mode";
    SWITCH_OFF = "SwitchOff": MODE;
    SWITCH_ON = "SwitchOn": MODE;
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Traffic Light State Machine ===\n");

    // The cycle itself runs as a sub-machine
    let red = State::new("Red");
    let green = State::new("Green");
    let yellow = State::new("Yellow");
    let cycle = FsmSync::of(
        "cycle",
        red.on(&TIMER, &green).entry(|| println!("  STOP")),
        [
            green.on(&TIMER, &yellow).entry(|| println!("  GO")),
            yellow.on(&TIMER, &red).entry(|| println!("  CAUTION")),
        ],
    )?;

    // Operating resumes the cycle where it stopped (deep history)
    let operating = State::composite("Operating", [cycle]);
    let blinking = State::new("Blinking");
    let off = State::new("Off");

    let light = FsmBuilder::new("traffic-light")
        .start(
            operating
                .on_payload(&DAYLIGHT, &blinking, |day: &bool| !*day)
                .on(&SWITCH_OFF, &off),
        )
        .state(
            blinking
                .on_payload(&DAYLIGHT, operating.deep_history(), |day: &bool| *day)
                .on(&SWITCH_OFF, &off)
                .entry(|| println!("  (blinking yellow)")),
        )
        .state(off.on(&SWITCH_ON, &operating).on_final(&MODE))
        .build_sync()?;

    light.on_state_changed(|change| {
        let info = StateChangedInfo::from(change);
        println!(
            "  [{}] {} -> {}",
            info.fsm, info.old_state_name, info.new_state_name
        );
    });

    light.start()?;
    for _ in 0..4 {
        light.trigger(&TIMER)?;
    }
    println!("\nCurrently: {}", light.current_state_tree());

    println!("\nNight falls:");
    light.trigger_with(&DAYLIGHT, false)?;
    println!("Currently: {}", light.current_state_tree());

    println!("\nMorning:");
    light.trigger_with(&DAYLIGHT, true)?;
    println!("Currently: {}", light.current_state_tree());

    println!("\nMaintenance:");
    light.trigger(&SWITCH_OFF)?;
    light.trigger(&SWITCH_ON)?;
    println!("Currently: {}", light.current_state_tree());
    light.trigger(&SWITCH_OFF)?;
    light.trigger(&SWITCH_OFF)?;
    println!("Finished: {}", light.has_finished());

    println!("\nStructure:");
    println!("{}", light.describe().to_json()?);

    println!("\n=== Example Complete ===");
    Ok(())
}
