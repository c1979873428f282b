//! Event callbacks and their deferred dispatch
//!
//! Every callback a component exposes is identified by an [`EventKind`].
//! Handlers never invoke callbacks directly: they collect the kinds to
//! notify in an [`Outbox`] and, once their own state has settled, queue the
//! callbacks on the [`Scheduler`] for its next turn.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use forma_core::Scheduler;
use serde::Serialize;

use crate::consolidate::Properties;
use crate::error::FormaError;
use crate::model::{ModelExtension, ModelState};

/// Source of a component notification
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    Pointer { x: f32, y: f32 },
    Focus,
    Blur,
    Key { key: String },
    /// Text typed into an input
    Input { data: String },
    /// Value change applied by code
    Programmatic,
    /// File properties derived in the background
    Derivation,
}

// =============================================================================
// Event Kinds
// =============================================================================

/// Closed set of component callbacks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Blur,
    Change,
    ChangeState,
    ChangeValue,
    Click,
    Focus,
    Touch,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Blur,
        EventKind::Change,
        EventKind::ChangeState,
        EventKind::ChangeValue,
        EventKind::Click,
        EventKind::Focus,
        EventKind::Touch,
    ];

    /// Event name, e.g. `changeValue`
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Blur => "blur",
            EventKind::Change => "change",
            EventKind::ChangeState => "changeState",
            EventKind::ChangeValue => "changeValue",
            EventKind::Click => "click",
            EventKind::Focus => "focus",
            EventKind::Touch => "touch",
        }
    }

    /// Property name of the handler, e.g. `onChangeValue`
    pub fn handler_name(self) -> &'static str {
        match self {
            EventKind::Blur => "onBlur",
            EventKind::Change => "onChange",
            EventKind::ChangeState => "onChangeState",
            EventKind::ChangeValue => "onChangeValue",
            EventKind::Click => "onClick",
            EventKind::Focus => "onFocus",
            EventKind::Touch => "onTouch",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = FormaError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name || kind.handler_name() == name)
            .ok_or_else(|| FormaError::UnknownEvent(name.to_string()))
    }
}

// =============================================================================
// Callbacks
// =============================================================================

/// Callback receiving the triggering event
pub type EventCallback<T, X> = Arc<dyn Fn(Option<&InputEvent>, &Properties<T, X>) + Send + Sync>;
/// Callback receiving the consolidated properties
pub type ChangeCallback<T, X> = Arc<dyn Fn(&Properties<T, X>, Option<&InputEvent>) + Send + Sync>;
/// Callback receiving the new model state
pub type StateCallback<T, X> =
    Arc<dyn Fn(&ModelState, Option<&InputEvent>, &Properties<T, X>) + Send + Sync>;
/// Callback receiving the new value
pub type ValueCallback<T, X> =
    Arc<dyn Fn(Option<&T>, Option<&InputEvent>, &Properties<T, X>) + Send + Sync>;

/// Optional callbacks of an input component
pub struct Callbacks<T, X: ModelExtension> {
    pub on_blur: Option<EventCallback<T, X>>,
    pub on_change: Option<ChangeCallback<T, X>>,
    pub on_change_state: Option<StateCallback<T, X>>,
    pub on_change_value: Option<ValueCallback<T, X>>,
    pub on_click: Option<EventCallback<T, X>>,
    pub on_focus: Option<EventCallback<T, X>>,
    pub on_touch: Option<EventCallback<T, X>>,
}

impl<T, X: ModelExtension> Callbacks<T, X> {
    /// Whether a handler is registered for `kind`
    pub fn has(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Blur => self.on_blur.is_some(),
            EventKind::Change => self.on_change.is_some(),
            EventKind::ChangeState => self.on_change_state.is_some(),
            EventKind::ChangeValue => self.on_change_value.is_some(),
            EventKind::Click => self.on_click.is_some(),
            EventKind::Focus => self.on_focus.is_some(),
            EventKind::Touch => self.on_touch.is_some(),
        }
    }

    /// Whether the caller listens for value changes
    pub fn observes_changes(&self) -> bool {
        self.has(EventKind::Change) || self.has(EventKind::ChangeValue)
    }

    fn event_callback(&self, kind: EventKind) -> Option<&EventCallback<T, X>> {
        match kind {
            EventKind::Blur => self.on_blur.as_ref(),
            EventKind::Click => self.on_click.as_ref(),
            EventKind::Focus => self.on_focus.as_ref(),
            EventKind::Touch => self.on_touch.as_ref(),
            EventKind::Change | EventKind::ChangeState | EventKind::ChangeValue => None,
        }
    }
}

impl<T, X: ModelExtension> Default for Callbacks<T, X> {
    fn default() -> Self {
        Self {
            on_blur: None,
            on_change: None,
            on_change_state: None,
            on_change_value: None,
            on_click: None,
            on_focus: None,
            on_touch: None,
        }
    }
}

impl<T, X: ModelExtension> Clone for Callbacks<T, X> {
    fn clone(&self) -> Self {
        Self {
            on_blur: self.on_blur.clone(),
            on_change: self.on_change.clone(),
            on_change_state: self.on_change_state.clone(),
            on_change_value: self.on_change_value.clone(),
            on_click: self.on_click.clone(),
            on_focus: self.on_focus.clone(),
            on_touch: self.on_touch.clone(),
        }
    }
}

/// Callbacks compare equal when they hold the same handlers
impl<T, X: ModelExtension> PartialEq for Callbacks<T, X> {
    fn eq(&self, other: &Self) -> bool {
        fn same<F: ?Sized>(a: &Option<Arc<F>>, b: &Option<Arc<F>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        same(&self.on_blur, &other.on_blur)
            && same(&self.on_change, &other.on_change)
            && same(&self.on_change_state, &other.on_change_state)
            && same(&self.on_change_value, &other.on_change_value)
            && same(&self.on_click, &other.on_click)
            && same(&self.on_focus, &other.on_focus)
            && same(&self.on_touch, &other.on_touch)
    }
}

impl<T, X: ModelExtension> fmt::Debug for Callbacks<T, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<&str> = EventKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .map(EventKind::handler_name)
            .collect();
        f.debug_tuple("Callbacks").field(&registered).finish()
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Queue the handler for `kind` if the caller registered one
///
/// The callback receives a snapshot of `properties` taken now and runs on
/// the scheduler's next turn. Returns whether a callback was queued.
pub fn trigger_callback_if_exists<T, X>(
    scheduler: &mut Scheduler,
    properties: &Properties<T, X>,
    kind: EventKind,
    event: Option<&InputEvent>,
) -> bool
where
    T: Clone + 'static,
    X: ModelExtension,
{
    let callbacks = &properties.callbacks;
    if !callbacks.has(kind) {
        return false;
    }

    let snapshot = properties.clone();
    let event = event.cloned();
    tracing::debug!(event = kind.name(), name = %properties.name, "callback deferred");

    match kind {
        EventKind::Change => {
            if let Some(callback) = callbacks.on_change.clone() {
                scheduler.defer(move || callback(&snapshot, event.as_ref()));
            }
        }
        EventKind::ChangeState => {
            if let Some(callback) = callbacks.on_change_state.clone() {
                scheduler
                    .defer(move || callback(&snapshot.model.state, event.as_ref(), &snapshot));
            }
        }
        EventKind::ChangeValue => {
            if let Some(callback) = callbacks.on_change_value.clone() {
                scheduler.defer(move || callback(snapshot.value.as_ref(), event.as_ref(), &snapshot));
            }
        }
        EventKind::Blur | EventKind::Click | EventKind::Focus | EventKind::Touch => {
            if let Some(callback) = callbacks.event_callback(kind).cloned() {
                scheduler.defer(move || callback(event.as_ref(), &snapshot));
            }
        }
    }

    true
}

/// Notifications collected while a handler runs
#[derive(Debug, Default)]
pub struct Outbox {
    kinds: Vec<EventKind>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `kind` once, later pushes of the same kind are dropped
    pub fn push(&mut self, kind: EventKind) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    /// Queue every collected notification against the settled properties
    ///
    /// Returns the number of callbacks queued.
    pub fn flush<T, X>(
        self,
        scheduler: &mut Scheduler,
        properties: &Properties<T, X>,
        event: Option<&InputEvent>,
    ) -> usize
    where
        T: Clone + 'static,
        X: ModelExtension,
    {
        self.kinds
            .into_iter()
            .filter(|kind| trigger_callback_if_exists(scheduler, properties, *kind, event))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::{get_consolidated_properties, map_properties_into_model, ViewOptions};
    use crate::model::{Model, ValueType};
    use crate::props::Props;
    use std::sync::Mutex;

    fn properties(props: &Props<String>) -> Properties<String> {
        let default_model = Model::new(ValueType::String);
        get_consolidated_properties(map_properties_into_model(
            props,
            &default_model,
            &ViewOptions::default(),
        ))
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!("changeValue".parse::<EventKind>().unwrap(), EventKind::ChangeValue);
        assert_eq!("onBlur".parse::<EventKind>().unwrap(), EventKind::Blur);
        assert_eq!(EventKind::ChangeState.handler_name(), "onChangeState");
        assert!(matches!(
            "onHover".parse::<EventKind>(),
            Err(FormaError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_missing_callback_is_not_queued() {
        let mut scheduler = Scheduler::new();
        let properties = properties(&Props::new());

        assert!(!trigger_callback_if_exists(
            &mut scheduler,
            &properties,
            EventKind::Focus,
            None
        ));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_callback_runs_on_next_turn() {
        let mut scheduler = Scheduler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        let props = Props::new()
            .value(Some("a".to_string()))
            .on_change_value(move |value, _, _| {
                seen_clone.lock().unwrap().push(value.cloned());
            });
        let properties = properties(&props);

        assert!(trigger_callback_if_exists(
            &mut scheduler,
            &properties,
            EventKind::ChangeValue,
            Some(&InputEvent::Programmatic)
        ));
        assert!(seen.lock().unwrap().is_empty());

        scheduler.run_turn();
        assert_eq!(*seen.lock().unwrap(), vec![Some("a".to_string())]);
    }

    #[test]
    fn test_outbox_flush_counts_registered() {
        let mut scheduler = Scheduler::new();
        let props = Props::<String>::new().on_focus(|_, _| {}).on_touch(|_, _| {});
        let properties = properties(&props);

        let mut outbox = Outbox::new();
        outbox.push(EventKind::Focus);
        outbox.push(EventKind::Blur);
        outbox.push(EventKind::Touch);

        assert_eq!(outbox.flush(&mut scheduler, &properties, None), 2);
        assert_eq!(scheduler.pending(), 2);
    }

    #[test]
    fn test_outbox_queues_each_kind_once() {
        let mut scheduler = Scheduler::new();
        let props = Props::<String>::new()
            .on_change(|_, _| {})
            .on_change_state(|_, _, _| {});
        let properties = properties(&props);

        let mut outbox = Outbox::new();
        outbox.push(EventKind::ChangeState);
        outbox.push(EventKind::Change);
        outbox.push(EventKind::ChangeState);

        assert_eq!(outbox.kinds(), &[EventKind::ChangeState, EventKind::Change]);
        assert_eq!(outbox.flush(&mut scheduler, &properties, None), 2);
        assert_eq!(scheduler.pending(), 2);
    }
}
