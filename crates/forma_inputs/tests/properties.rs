//! Property-based invariant tests for the input components.
//!
//! Verifies:
//! 1. Consolidating the consolidated view again changes nothing
//! 2. Dirty and touched never revert once set
//! 3. `invalid` is the OR of the validation flags, `valid` its complement
//! 4. Callbacks never run before the next scheduler turn
//! 5. A controlled input always shows the caller's value
//! 6. Interval edits keep `start <= end`
//! 7. The number of list items follows the list value

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use forma_inputs::consolidate::{get_consolidated_properties, map_properties_into_model};
use forma_inputs::prelude::*;
use forma_inputs::text_input::TextKind;
use forma_inputs::{InputKind, ViewOptions};
use proptest::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Action {
    Input(String),
    Focus,
    Blur,
    Click,
    Touch,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        "[a-z0-9]{0,6}".prop_map(Action::Input),
        Just(Action::Focus),
        Just(Action::Blur),
        Just(Action::Click),
        Just(Action::Touch),
    ]
}

fn arb_text_props() -> impl Strategy<Value = TextProps<String>> {
    (
        proptest::option::of("[a-z]{1,8}"),
        proptest::option::of(proptest::option::of("[a-z]{0,8}")),
        proptest::option::of(0i64..10),
        proptest::option::of(any::<bool>()),
        proptest::option::of(Just("^[a-c]*$")),
    )
        .prop_map(|(name, value, maximum_length, required, pattern)| {
            let mut props = TextProps::new();
            if let Some(name) = name {
                props = props.name(name);
            }
            if let Some(value) = value {
                props = props.value(value);
            }
            if let Some(maximum_length) = maximum_length {
                props = props.maximum_length(maximum_length);
            }
            if let Some(required) = required {
                props = props.required(required);
            }
            if let Some(pattern) = pattern {
                props = props.pattern(pattern);
            }
            props
        })
}

fn apply(ctx: &mut InputContext, input: &mut TextInput<String>, action: &Action) {
    match action {
        Action::Input(text) => {
            input.input(ctx, text, None);
        }
        Action::Focus => input.focus(ctx, None),
        Action::Blur => input.blur(ctx, None),
        Action::Click => input.click(ctx, None),
        Action::Touch => input.touch(ctx, None),
    }
}

// ── Properties ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn consolidation_is_idempotent(props in arb_text_props()) {
        let default_model = TextKind::<String>::default_model(&FormaConfig::default());
        let options = ViewOptions::default();

        let once = get_consolidated_properties(map_properties_into_model(&props, &default_model, &options));
        let twice = get_consolidated_properties(map_properties_into_model(&once.to_props(), &default_model, &options));

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn dirty_and_touched_are_monotonic(actions in proptest::collection::vec(arb_action(), 0..12)) {
        let mut ctx = InputContext::new();
        let mut input = TextInput::<String>::new(&mut ctx, &TextProps::new());
        let mut was_dirty = false;
        let mut was_touched = false;

        for action in &actions {
            apply(&mut ctx, &mut input, action);
            let state = input.model_state();

            prop_assert!(state.dirty || !was_dirty);
            prop_assert!(state.touched || !was_touched);
            prop_assert_eq!(state.pristine, !state.dirty);
            prop_assert_eq!(state.untouched, !state.touched);
            was_dirty = state.dirty;
            was_touched = state.touched;
        }
    }

    #[test]
    fn invalid_is_or_of_flags(
        props in arb_text_props(),
        actions in proptest::collection::vec(arb_action(), 0..8),
    ) {
        let mut ctx = InputContext::new();
        let mut input = TextInput::new(&mut ctx, &props);

        for action in &actions {
            apply(&mut ctx, &mut input, action);
            let state = input.model_state();
            let any_flag = state.active_flags().next().is_some();

            prop_assert_eq!(state.invalid, any_flag);
            prop_assert_eq!(state.valid, !state.invalid);
        }
    }

    #[test]
    fn callbacks_wait_for_next_turn(actions in proptest::collection::vec(arb_action(), 1..8)) {
        let mut ctx = InputContext::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let props = TextProps::<String>::new().on_change(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut input = TextInput::new(&mut ctx, &props);

        for action in &actions {
            apply(&mut ctx, &mut input, action);
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);

        let ran = ctx.run_turn();
        prop_assert!(calls.load(Ordering::SeqCst) <= ran);
        prop_assert!(ctx.scheduler.is_idle());
    }

    #[test]
    fn controlled_input_shows_caller_value(
        given in proptest::option::of("[a-z]{0,6}"),
        typed in proptest::collection::vec("[a-z]{0,6}", 1..6),
    ) {
        let mut ctx = InputContext::new();
        let props = TextProps::<String>::new()
            .value(given.clone())
            .on_change_value(|_, _, _| {});
        let mut input = TextInput::new(&mut ctx, &props);
        prop_assert!(input.is_controlled());

        for text in &typed {
            input.input(&mut ctx, text, None);
            ctx.run_turn();
            input.render(&mut ctx, &props);
            prop_assert_eq!(input.value().cloned(), given.clone().filter(|text| !text.is_empty()));
        }
    }

    #[test]
    fn interval_keeps_order(
        edits in proptest::collection::vec(
            (any::<bool>(), proptest::option::of(-100.0f64..100.0)),
            1..10,
        ),
    ) {
        let mut ctx = InputContext::new();
        let mut interval = Interval::new(&mut ctx, &IntervalProps::new());

        for (start_side, value) in edits {
            let side = if start_side { Side::Start } else { Side::End };
            interval.change_value(&mut ctx, side, value, None);

            if let (Some(start), Some(end)) = (interval.value().start, interval.value().end) {
                prop_assert!(start <= end);
            }
        }
    }

    #[test]
    fn list_items_follow_value(operations in proptest::collection::vec(0u8..3, 0..12)) {
        let mut ctx = InputContext::new();
        let mut inputs = Inputs::<String>::new(&mut ctx, &InputsProps::new());

        for operation in operations {
            match operation {
                0 => {
                    inputs.add(&mut ctx, None);
                }
                1 => {
                    inputs.remove(&mut ctx, 0, None);
                }
                _ => {
                    inputs.input(&mut ctx, 0, "item", None);
                }
            }
            let count = inputs.value().map_or(0, Vec::len);
            prop_assert_eq!(inputs.len(), count);
            prop_assert_eq!(inputs.value().is_none(), inputs.is_empty());
        }
    }
}
