//! Shared pieces of inputs composed of child inputs
//!
//! Composite inputs aggregate the model state of their children and expose
//! their own `onChange`, `onChangeValue` and `onChangeState` callbacks.

use std::fmt;
use std::sync::Arc;

use forma_core::Scheduler;

use crate::dispatch::{EventKind, InputEvent};
use crate::model::{ModelState, ValidationKey};

/// Combine child states into one
///
/// `dirty`, `focused`, `touched`, `visited`, `invalid` and `invalidRequired`
/// are set when any child has them; `pristine` and `untouched` only when all
/// children have them. Without children the state is pristine and valid.
pub fn aggregate_state<'a>(states: impl IntoIterator<Item = &'a ModelState>) -> ModelState {
    let mut aggregated = ModelState::with_validation_keys(&[ValidationKey::Required]);
    for state in states {
        aggregated.dirty |= state.dirty;
        aggregated.focused |= state.focused;
        aggregated.touched |= state.touched;
        aggregated.visited |= state.visited;
        aggregated.pristine &= state.pristine;
        aggregated.untouched &= state.untouched;
        let required = aggregated.flag(ValidationKey::Required) || state.flag(ValidationKey::Required);
        aggregated.set_flag(ValidationKey::Required, required);
        aggregated.invalid |= state.invalid;
    }
    aggregated.valid = !aggregated.invalid;
    aggregated
}

/// Consolidated view of a composite input
pub trait CompositeView: Clone + 'static {
    type Value: Clone + 'static;

    fn value(&self) -> Option<&Self::Value>;

    fn state(&self) -> &ModelState;
}

pub type CompositeChangeCallback<P> = Arc<dyn Fn(&P, Option<&InputEvent>) + Send + Sync>;
pub type CompositeValueCallback<V, P> =
    Arc<dyn Fn(Option<&V>, Option<&InputEvent>, &P) + Send + Sync>;
pub type CompositeStateCallback<P> =
    Arc<dyn Fn(&ModelState, Option<&InputEvent>, &P) + Send + Sync>;

/// Callbacks of a composite input
pub struct CompositeCallbacks<V, P> {
    pub on_change: Option<CompositeChangeCallback<P>>,
    pub on_change_value: Option<CompositeValueCallback<V, P>>,
    pub on_change_state: Option<CompositeStateCallback<P>>,
}

impl<V, P> CompositeCallbacks<V, P> {
    pub fn observes_changes(&self) -> bool {
        self.on_change.is_some() || self.on_change_value.is_some()
    }
}

impl<V, P> CompositeCallbacks<V, P>
where
    P: CompositeView<Value = V>,
    V: Clone + 'static,
{
    /// Queue the callback for `kind` with a snapshot of `properties`
    ///
    /// Only `Change`, `ChangeValue` and `ChangeState` exist on composites.
    pub fn notify(
        &self,
        scheduler: &mut Scheduler,
        kind: EventKind,
        properties: &P,
        event: Option<&InputEvent>,
    ) -> bool {
        let snapshot = properties.clone();
        let event = event.cloned();
        match kind {
            EventKind::Change => match self.on_change.clone() {
                Some(callback) => scheduler.defer(move || callback(&snapshot, event.as_ref())),
                None => return false,
            },
            EventKind::ChangeValue => match self.on_change_value.clone() {
                Some(callback) => {
                    scheduler.defer(move || callback(snapshot.value(), event.as_ref(), &snapshot))
                }
                None => return false,
            },
            EventKind::ChangeState => match self.on_change_state.clone() {
                Some(callback) => {
                    scheduler.defer(move || callback(snapshot.state(), event.as_ref(), &snapshot))
                }
                None => return false,
            },
            _ => return false,
        }
        tracing::debug!(event = kind.name(), "composite callback deferred");
        true
    }
}

impl<V, P> Default for CompositeCallbacks<V, P> {
    fn default() -> Self {
        Self {
            on_change: None,
            on_change_value: None,
            on_change_state: None,
        }
    }
}

impl<V, P> Clone for CompositeCallbacks<V, P> {
    fn clone(&self) -> Self {
        Self {
            on_change: self.on_change.clone(),
            on_change_value: self.on_change_value.clone(),
            on_change_state: self.on_change_state.clone(),
        }
    }
}

impl<V, P> fmt::Debug for CompositeCallbacks<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeCallbacks")
            .field("on_change", &self.on_change.is_some())
            .field("on_change_value", &self.on_change_value.is_some())
            .field("on_change_state", &self.on_change_state.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_state() {
        let mut touched = ModelState::default();
        touched.mark_touched();
        let mut required = ModelState::default();
        required.set_flag(ValidationKey::Required, true);
        required.recompute_validity();

        let aggregated = aggregate_state([&touched, &required]);

        assert!(aggregated.touched);
        assert!(!aggregated.untouched);
        assert!(aggregated.pristine);
        assert!(aggregated.flag(ValidationKey::Required));
        assert!(aggregated.invalid);
        assert!(!aggregated.valid);
    }

    #[test]
    fn test_empty_aggregate_is_valid() {
        let children: [&ModelState; 0] = [];
        let aggregated = aggregate_state(children);

        assert!(aggregated.valid);
        assert!(aggregated.pristine);
        assert!(aggregated.untouched);
    }
}
