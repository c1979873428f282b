//! Controlled and uncontrolled value ownership
//!
//! An input is *controlled* when its caller owns the value: a value is
//! given explicitly and the caller listens for changes. Otherwise the input
//! keeps its value in a local [`ValueState`] signal.
//!
//! In both modes the input tracks its model state locally. A controlled
//! input writes through a [`StateSetter`] that only persists model state
//! changes, so the caller's value always wins on the next render.

use forma_core::{Runtime, Signal};
use serde::Serialize;

use crate::model::{InputValue, ModelExtension, ModelState};
use crate::props::Props;

/// Locally held state of an input
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueState<T> {
    pub value: Option<T>,
    pub model_state: ModelState,
    /// Merge the locally derived value into the caller's value on next render
    pub attach_blob_property: bool,
}

impl<T> ValueState<T> {
    pub fn new(value: Option<T>, model_state: ModelState) -> Self {
        Self {
            value,
            model_state,
            attach_blob_property: false,
        }
    }
}

/// Whether the caller owns the value
///
/// True unless uncontrolled behaviour is enforced, when a value (possibly
/// `null`) is given at the top level or through the model and a change or
/// value-change callback is registered.
pub fn is_controlled<T: InputValue, X: ModelExtension>(
    props: &Props<T, X>,
    enforce_uncontrolled_default: bool,
) -> bool {
    !props
        .enforce_uncontrolled
        .unwrap_or(enforce_uncontrolled_default)
        && props.has_explicit_value()
        && props.callbacks.observes_changes()
}

/// Pick the value an input starts with
///
/// The first given of: `alternate`, the top-level value, the model value,
/// the initial value, the top-level default, the model default, `fallback`.
pub fn determine_initial_value<T: InputValue, X: ModelExtension>(
    props: &Props<T, X>,
    fallback: Option<T>,
    alternate: Option<Option<T>>,
) -> Option<T> {
    let model = props.model.as_ref().map(|model| &model.fields);

    alternate
        .or_else(|| props.fields.value.clone())
        .or_else(|| model.and_then(|fields| fields.value.clone()))
        .or_else(|| props.initial_value.clone())
        .or_else(|| props.fields.default.clone())
        .or_else(|| model.and_then(|fields| fields.default.clone()))
        .unwrap_or(fallback)
}

/// Fill properties the caller left out from the local state
///
/// A model value is lifted to the top level, a missing value comes from the
/// local state and every state flag not given anywhere is taken from the
/// local model state.
pub fn derive_missing_properties_from_state<T: InputValue, X: ModelExtension>(
    mut props: Props<T, X>,
    state: &ValueState<T>,
) -> Props<T, X> {
    if props.fields.value.is_none() {
        let model_value = props
            .model
            .as_ref()
            .and_then(|model| model.fields.value.clone());
        props.fields.value = Some(model_value.unwrap_or_else(|| state.value.clone()));
    }

    let model = props.model.get_or_insert_with(Default::default);
    model.state.fill_missing_from(&state.model_state);

    props
}

// =============================================================================
// State Setter
// =============================================================================

/// Writes a component's local value state
#[derive(Clone, Debug, PartialEq)]
pub enum StateSetter<T> {
    /// Writes through and requests a render
    Real,
    /// Controlled inputs: only model state changes and attached values are
    /// written through
    ModelStateOnly { snapshot: ValueState<T> },
    /// Records the result for the next comparison and writes nothing
    Dummy { snapshot: ValueState<T> },
}

impl<T: InputValue> StateSetter<T> {
    /// Setter for the ownership mode resolved during render
    pub fn for_mode(controlled: bool, current: ValueState<T>) -> Self {
        if controlled {
            StateSetter::ModelStateOnly { snapshot: current }
        } else {
            StateSetter::Real
        }
    }

    /// Apply `next` as the new local state
    ///
    /// Returns whether the signal was written.
    pub fn apply(
        &mut self,
        runtime: &mut Runtime,
        signal: Signal<ValueState<T>>,
        next: ValueState<T>,
    ) -> bool {
        match self {
            StateSetter::Real => {
                let unchanged = runtime.with(signal, |current| *current == next).unwrap_or(false);
                if unchanged {
                    return false;
                }
                runtime.set_rebuild(signal, next);
                true
            }
            StateSetter::ModelStateOnly { snapshot } => {
                let write = snapshot.model_state != next.model_state || next.attach_blob_property;
                *snapshot = next.clone();
                if write {
                    runtime.set_rebuild(signal, next);
                }
                write
            }
            StateSetter::Dummy { snapshot } => {
                *snapshot = next;
                false
            }
        }
    }

    /// State the next handler should start from
    pub fn current(&self, runtime: &Runtime, signal: Signal<ValueState<T>>) -> Option<ValueState<T>> {
        match self {
            StateSetter::Real => runtime.get(signal),
            StateSetter::ModelStateOnly { snapshot } | StateSetter::Dummy { snapshot } => {
                Some(snapshot.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_controlled() {
        let value_only: Props<String> = Props::new().value(Some("a".to_string()));
        assert!(!is_controlled(&value_only, false));

        let callback_only: Props<String> = Props::new().on_change(|_, _| {});
        assert!(!is_controlled(&callback_only, false));

        let controlled: Props<String> = Props::new()
            .model_value(None)
            .on_change_value(|_, _, _| {});
        assert!(is_controlled(&controlled, false));

        let enforced = controlled.clone().enforce_uncontrolled(true);
        assert!(!is_controlled(&enforced, false));
        assert!(!is_controlled(&controlled, true));
    }

    #[test]
    fn test_initial_value_precedence() {
        let props: Props<String> = Props::new()
            .initial_value(Some("initial".to_string()))
            .default_value(Some("default".to_string()));
        assert_eq!(
            determine_initial_value(&props, None, None).as_deref(),
            Some("initial")
        );

        let props = props.model_value(Some("model".to_string()));
        assert_eq!(
            determine_initial_value(&props, None, None).as_deref(),
            Some("model")
        );

        let props = props.value(None);
        assert_eq!(determine_initial_value(&props, None, None), None);

        assert_eq!(
            determine_initial_value(&props, None, Some(Some("alt".to_string()))).as_deref(),
            Some("alt")
        );

        let empty: Props<String> = Props::new();
        assert_eq!(
            determine_initial_value(&empty, Some("fallback".to_string()), None).as_deref(),
            Some("fallback")
        );
    }

    #[test]
    fn test_derive_missing_properties() {
        let mut state = ValueState::new(Some("local".to_string()), ModelState::default());
        state.model_state.mark_dirty();

        let derived = derive_missing_properties_from_state(Props::<String>::new(), &state);
        assert_eq!(derived.fields.value, Some(Some("local".to_string())));
        let model_state = &derived.model.as_ref().unwrap().state;
        assert_eq!(model_state.dirty, Some(true));
        assert_eq!(model_state.pristine, Some(false));

        let given = Props::<String>::new().model_value(Some("given".to_string()));
        let derived = derive_missing_properties_from_state(given, &state);
        assert_eq!(derived.fields.value, Some(Some("given".to_string())));
    }

    #[test]
    fn test_real_setter_requests_render() {
        let mut runtime = Runtime::new();
        let signal = runtime.create_signal(ValueState::new(None::<String>, ModelState::default()));
        let mut setter = StateSetter::Real;

        let next = ValueState::new(Some("a".to_string()), ModelState::default());
        assert!(setter.apply(&mut runtime, signal, next.clone()));
        assert!(runtime.take_render_request());

        assert!(!setter.apply(&mut runtime, signal, next));
        assert!(!runtime.take_render_request());
    }

    #[test]
    fn test_model_state_only_setter() {
        let mut runtime = Runtime::new();
        let initial = ValueState::new(Some("a".to_string()), ModelState::default());
        let signal = runtime.create_signal(initial.clone());
        let mut setter = StateSetter::for_mode(true, initial);

        let value_only = ValueState::new(Some("b".to_string()), ModelState::default());
        assert!(!setter.apply(&mut runtime, signal, value_only));
        assert_eq!(runtime.get(signal).unwrap().value.as_deref(), Some("a"));
        assert_eq!(
            setter.current(&runtime, signal).unwrap().value.as_deref(),
            Some("b")
        );

        let mut dirty = ModelState::default();
        dirty.mark_dirty();
        assert!(setter.apply(&mut runtime, signal, ValueState::new(Some("c".to_string()), dirty)));
        assert!(runtime.get(signal).unwrap().model_state.dirty);
    }

    #[test]
    fn test_dummy_setter_never_writes() {
        let mut runtime = Runtime::new();
        let initial = ValueState::new(Some(1.0), ModelState::default());
        let signal = runtime.create_signal(initial.clone());
        let mut setter = StateSetter::Dummy { snapshot: initial };

        let mut dirty = ModelState::default();
        dirty.mark_dirty();
        assert!(!setter.apply(&mut runtime, signal, ValueState::new(Some(2.0), dirty)));
        assert_eq!(runtime.get(signal).unwrap().value, Some(1.0));
        assert!(!runtime.take_render_request());
    }
}
