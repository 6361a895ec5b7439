//! Property-based tests for the machine engine.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use hfsm::core::{Event, EventKind, History, State, Transition, TransitionEndPoint};
use hfsm::{event_kinds, FsmSync};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

event_kinds! {
    NEXT = "Next";
    SKIP = "Skip";
    FAST_NEXT = "FastNext": NEXT;
    OTHER = "Other";
    FINISH = "Finish";
}

#[derive(Clone, Debug)]
enum Payload {
    None,
    Unsigned(u32),
    Signed(i64),
}

prop_compose! {
    fn arbitrary_kind()(variant in 0..4u8) -> &'static EventKind {
        match variant {
            0 => &NEXT,
            1 => &SKIP,
            2 => &FAST_NEXT,
            _ => &OTHER,
        }
    }
}

fn arbitrary_payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        Just(Payload::None),
        any::<u32>().prop_map(Payload::Unsigned),
        any::<i64>().prop_map(Payload::Signed),
    ]
}

fn event(kind: &'static EventKind, payload: &Payload) -> Event {
    match payload {
        Payload::None => Event::new(kind),
        Payload::Unsigned(n) => Event::with_payload(kind, *n),
        Payload::Signed(n) => Event::with_payload(kind, *n),
    }
}

/// A ring of `size` states: NEXT moves one step, SKIP moves two steps,
/// FINISH ends the machine from the last state.
fn ring(size: usize) -> (Vec<State>, FsmSync) {
    let states: Vec<State> = (0..size).map(|i| State::new(format!("S{i}"))).collect();
    let containers: Vec<_> = states
        .iter()
        .enumerate()
        .map(|(i, state)| {
            let container = state
                .on(&NEXT, &states[(i + 1) % size])
                .on(&SKIP, &states[(i + 2) % size]);
            if i == size - 1 {
                container.on_final(&FINISH)
            } else {
                container
            }
        })
        .collect();

    let mut containers = containers.into_iter();
    let start = containers.next().unwrap();
    let fsm = FsmSync::of("ring", start, containers).unwrap();
    (states, fsm)
}

proptest! {
    #[test]
    fn guard_round_trip(
        kind in arbitrary_kind(),
        payload in arbitrary_payload(),
        divisor in 1..10u32,
    ) {
        let transition = Transition::new(&NEXT, State::new("target"))
            .when_payload(move |n: &u32| n % divisor == 0);

        let expected = kind.is_a(&NEXT)
            && matches!(payload, Payload::Unsigned(n) if n % divisor == 0);

        prop_assert_eq!(transition.is_allowed(&event(kind, &payload)).unwrap(), expected);
    }

    #[test]
    fn untyped_transition_ignores_payload(
        kind in arbitrary_kind(),
        payload in arbitrary_payload(),
    ) {
        let transition = Transition::new(&NEXT, State::new("target"));

        prop_assert_eq!(
            transition.is_allowed(&event(kind, &payload)).unwrap(),
            kind.is_a(&NEXT)
        );
    }

    #[test]
    fn dispatch_is_deterministic(
        size in 2..6usize,
        kinds in prop::collection::vec(arbitrary_kind(), 0..30),
    ) {
        let (first_states, first) = ring(size);
        let (second_states, second) = ring(size);
        first.start().unwrap();
        second.start().unwrap();

        for kind in &kinds {
            let handled_first = first.trigger(*kind).unwrap();
            let handled_second = second.trigger(*kind).unwrap();
            prop_assert_eq!(handled_first, handled_second);
        }

        let position = |states: &[State], fsm: &FsmSync| {
            states.iter().position(|s| *s == fsm.current_state())
        };
        prop_assert_eq!(
            position(&first_states, &first),
            position(&second_states, &second)
        );
    }

    #[test]
    fn ring_position_follows_the_events(
        size in 2..6usize,
        kinds in prop::collection::vec(arbitrary_kind(), 0..30),
    ) {
        let (states, fsm) = ring(size);
        fsm.start().unwrap();

        let mut expected = 0;
        for kind in &kinds {
            if kind.is_a(&NEXT) {
                expected = (expected + 1) % size;
            } else if kind.is_a(&SKIP) {
                expected = (expected + 2) % size;
            }
            fsm.trigger(*kind).unwrap();
        }

        prop_assert_eq!(fsm.current_state(), states[expected].clone());
    }

    #[test]
    fn final_state_is_equivalent_to_any_final(
        size in 2..6usize,
    ) {
        let (_, fsm) = ring(size);
        fsm.start().unwrap();
        for _ in 0..size - 1 {
            fsm.trigger(&NEXT).unwrap();
        }

        prop_assert!(!fsm.trigger(&FINISH).unwrap());
        prop_assert!(fsm.has_finished());
        prop_assert_eq!(fsm.current_state(), State::final_state());
        prop_assert!(fsm.trigger(&NEXT).is_err());
    }

    #[test]
    fn history_without_running_children_is_a_fresh_entry(
        children in 1..4usize,
        history in prop_oneof![Just(History::None), Just(History::Shallow), Just(History::Deep)],
    ) {
        let entries = Arc::new(AtomicUsize::new(0));
        let sub_machines: Vec<FsmSync> = (0..children)
            .map(|i| {
                let leaf = State::new(format!("leaf{i}"));
                let counter = Arc::clone(&entries);
                FsmSync::of(
                    format!("child{i}"),
                    leaf.on_final(&FINISH).entry(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }),
                    [],
                )
                .unwrap()
            })
            .collect();
        let composite = State::composite("W", sub_machines);
        let idle = State::new("Idle");
        let endpoint = TransitionEndPoint::with_history(composite.clone(), history);
        let fsm = FsmSync::of("m", idle.on(&NEXT, endpoint), [composite.to_container()]).unwrap();

        fsm.start().unwrap();
        fsm.trigger(&NEXT).unwrap();

        prop_assert_eq!(fsm.current_state(), composite);
        prop_assert_eq!(entries.load(Ordering::SeqCst), children);
        prop_assert_eq!(fsm.current_state_tree().children.len(), children);
    }
}
