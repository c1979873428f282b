//! Mounted components driven by scenario steps
//!
//! Every component kind is wrapped in a [`Harness`] that maps steps onto
//! its handlers and records observed callbacks into a shared log.

use anyhow::{bail, Context, Result};
use forma_inputs::checkbox::RequireableCheckbox;
use forma_inputs::composite::{CompositeCallbacks, CompositeView};
use forma_inputs::consolidate::slice_properties_for_state;
use forma_inputs::file_input::FileInput;
use forma_inputs::interval::Interval;
use forma_inputs::text_input::{TextInput, TextualValue};
use forma_inputs::{
    EventKind, InputContext, InputEvent, InputValue, Inputs, InputsProps, IntervalProps,
    ModelExtension, ModelState, Properties, Props,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::scenario::{Action, ComponentKind, Step};

// =============================================================================
// Callback Log
// =============================================================================

/// A callback invocation observed during a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub callback: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<InputEvent>,
    pub value: Value,
}

/// Callback invocations shared with the registered closures
#[derive(Debug, Clone, Default)]
pub struct CallbackLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CallbackLog {
    fn record(&self, kind: EventKind, event: Option<&InputEvent>, value: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                callback: kind.handler_name(),
                event: event.cloned(),
                value,
            });
        }
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default()
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Register a recording callback for every observed event
fn observe_single<T, X>(mut props: Props<T, X>, observed: &[EventKind], log: &CallbackLog) -> Props<T, X>
where
    T: InputValue,
    X: ModelExtension,
{
    for kind in observed {
        let log = log.clone();
        let kind = *kind;
        props = match kind {
            EventKind::Change => props.on_change(move |properties, event| {
                log.record(kind, event, to_json(&properties.value))
            }),
            EventKind::ChangeValue => props.on_change_value(move |value, event, _| {
                log.record(kind, event, to_json(&value))
            }),
            EventKind::ChangeState => props.on_change_state(move |state, event, _| {
                log.record(kind, event, state_summary(state))
            }),
            EventKind::Blur => props.on_blur(move |event, properties| {
                log.record(kind, event, to_json(&properties.value))
            }),
            EventKind::Click => props.on_click(move |event, properties| {
                log.record(kind, event, to_json(&properties.value))
            }),
            EventKind::Focus => props.on_focus(move |event, properties| {
                log.record(kind, event, to_json(&properties.value))
            }),
            EventKind::Touch => props.on_touch(move |event, properties| {
                log.record(kind, event, to_json(&properties.value))
            }),
        };
    }
    props
}

/// Recording callbacks for a composite input
///
/// Composites only notify `onChange`, `onChangeValue` and `onChangeState`.
fn observe_composite<V, P>(observed: &[EventKind], log: &CallbackLog) -> Result<CompositeCallbacks<V, P>>
where
    V: Serialize + Clone + 'static,
    P: CompositeView<Value = V>,
{
    let mut callbacks = CompositeCallbacks::default();
    for kind in observed {
        let log = log.clone();
        let kind = *kind;
        match kind {
            EventKind::Change => {
                callbacks.on_change = Some(Arc::new(move |properties: &P, event: Option<&InputEvent>| {
                    log.record(kind, event, to_json(&properties.value()))
                }));
            }
            EventKind::ChangeValue => {
                callbacks.on_change_value =
                    Some(Arc::new(move |value: Option<&V>, event: Option<&InputEvent>, _: &P| {
                        log.record(kind, event, to_json(&value))
                    }));
            }
            EventKind::ChangeState => {
                callbacks.on_change_state = Some(Arc::new(
                    move |state: &ModelState, event: Option<&InputEvent>, _: &P| {
                        log.record(kind, event, state_summary(state))
                    },
                ));
            }
            other => bail!("{} is not available on composite inputs", other.handler_name()),
        }
    }
    Ok(callbacks)
}

/// Names of the set interaction flags and failing validations
pub fn state_summary(state: &ModelState) -> Value {
    let interaction = [
        ("dirty", state.dirty),
        ("touched", state.touched),
        ("focused", state.focused),
        ("visited", state.visited),
    ];
    let flags: Vec<&str> = interaction
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .chain(state.active_flags().map(|key| key.as_str()))
        .collect();
    to_json(&flags)
}

// =============================================================================
// Harness
// =============================================================================

/// A mounted component driven by scenario steps
pub trait Harness {
    /// Apply an interaction step
    fn apply(&mut self, ctx: &mut InputContext, step: &Step) -> Result<()>;

    /// Render again, replacing the raw properties when given
    fn render(&mut self, ctx: &mut InputContext, props: Option<&Value>) -> Result<()>;

    /// Serializable view of the consolidated properties
    fn snapshot(&self) -> Value;

    fn state(&self) -> &ModelState;
}

/// Mount the component a scenario names
pub fn mount(
    ctx: &mut InputContext,
    kind: ComponentKind,
    props: &Value,
    observed: &[EventKind],
    log: &CallbackLog,
) -> Result<Box<dyn Harness>> {
    let harness: Box<dyn Harness> = match kind {
        ComponentKind::Text => Box::new(Single::<TextInput<String>>::mount(ctx, props, observed, log)?),
        ComponentKind::Number => Box::new(Single::<TextInput<f64>>::mount(ctx, props, observed, log)?),
        ComponentKind::Checkbox => {
            Box::new(Single::<RequireableCheckbox>::mount(ctx, props, observed, log)?)
        }
        ComponentKind::File => Box::new(Single::<FileInput>::mount(ctx, props, observed, log)?),
        ComponentKind::Interval => Box::new(IntervalHarness::mount(ctx, props, observed, log)?),
        ComponentKind::Inputs => Box::new(InputsHarness::mount(ctx, props, observed, log)?),
    };
    Ok(harness)
}

fn parse_props<P: serde::de::DeserializeOwned>(props: &Value) -> Result<P> {
    serde_json::from_value(props.clone()).context("Invalid component properties")
}

fn parse_value<T: serde::de::DeserializeOwned>(value: &Option<Value>) -> Result<Option<T>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .context("Invalid value for this component"),
    }
}

// =============================================================================
// Single-value inputs
// =============================================================================

/// Handlers shared by the single-value inputs
trait SingleInput: Sized {
    type Value: InputValue;
    type Extension: ModelExtension;

    fn mount(ctx: &mut InputContext, props: &Props<Self::Value, Self::Extension>) -> Self;
    fn render(&mut self, ctx: &mut InputContext, props: &Props<Self::Value, Self::Extension>);
    fn properties(&self) -> &Properties<Self::Value, Self::Extension>;
    fn focus(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>);
    fn blur(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>);
    fn click(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>);
    fn touch(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>);
    fn change_value(
        &mut self,
        ctx: &mut InputContext,
        value: Option<Self::Value>,
        event: Option<&InputEvent>,
    ) -> bool;

    fn input(&mut self, _ctx: &mut InputContext, _text: &str, _event: Option<&InputEvent>) -> Result<bool> {
        bail!("this input does not accept typed text")
    }

    fn toggle(&mut self, _ctx: &mut InputContext, _event: Option<&InputEvent>) -> Result<bool> {
        bail!("only checkboxes can be toggled")
    }

    fn derive(&mut self, _ctx: &mut InputContext) -> Result<bool> {
        bail!("only file inputs derive values")
    }
}

impl<T: TextualValue> SingleInput for TextInput<T> {
    type Value = T;
    type Extension = forma_inputs::NoExtension;

    fn mount(ctx: &mut InputContext, props: &Props<T>) -> Self {
        TextInput::new(ctx, props)
    }

    fn render(&mut self, ctx: &mut InputContext, props: &Props<T>) {
        TextInput::render(self, ctx, props);
    }

    fn properties(&self) -> &Properties<T> {
        TextInput::properties(self)
    }

    fn focus(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        TextInput::focus(self, ctx, event)
    }

    fn blur(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        TextInput::blur(self, ctx, event)
    }

    fn click(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        TextInput::click(self, ctx, event)
    }

    fn touch(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        TextInput::touch(self, ctx, event)
    }

    fn change_value(&mut self, ctx: &mut InputContext, value: Option<T>, event: Option<&InputEvent>) -> bool {
        TextInput::change_value(self, ctx, value, event)
    }

    fn input(&mut self, ctx: &mut InputContext, text: &str, event: Option<&InputEvent>) -> Result<bool> {
        Ok(TextInput::input(self, ctx, text, event))
    }
}

impl SingleInput for RequireableCheckbox {
    type Value = bool;
    type Extension = forma_inputs::NoExtension;

    fn mount(ctx: &mut InputContext, props: &Props<bool>) -> Self {
        RequireableCheckbox::new(ctx, props)
    }

    fn render(&mut self, ctx: &mut InputContext, props: &Props<bool>) {
        RequireableCheckbox::render(self, ctx, props);
    }

    fn properties(&self) -> &Properties<bool> {
        RequireableCheckbox::properties(self)
    }

    fn focus(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        RequireableCheckbox::focus(self, ctx, event)
    }

    fn blur(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        RequireableCheckbox::blur(self, ctx, event)
    }

    fn click(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        RequireableCheckbox::click(self, ctx, event)
    }

    fn touch(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        RequireableCheckbox::touch(self, ctx, event)
    }

    fn change_value(&mut self, ctx: &mut InputContext, value: Option<bool>, event: Option<&InputEvent>) -> bool {
        self.set_checked(ctx, value.unwrap_or(false), event)
    }

    fn toggle(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) -> Result<bool> {
        Ok(RequireableCheckbox::toggle(self, ctx, event))
    }
}

impl SingleInput for FileInput {
    type Value = forma_inputs::FileValue;
    type Extension = forma_inputs::FileExtension;

    fn mount(ctx: &mut InputContext, props: &forma_inputs::FileProps) -> Self {
        FileInput::new(ctx, props)
    }

    fn render(&mut self, ctx: &mut InputContext, props: &forma_inputs::FileProps) {
        FileInput::render(self, ctx, props);
    }

    fn properties(&self) -> &forma_inputs::FileProperties {
        FileInput::properties(self)
    }

    fn focus(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        FileInput::focus(self, ctx, event)
    }

    fn blur(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        FileInput::blur(self, ctx, event)
    }

    fn click(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        FileInput::click(self, ctx, event)
    }

    fn touch(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        FileInput::touch(self, ctx, event)
    }

    fn change_value(
        &mut self,
        ctx: &mut InputContext,
        value: Option<forma_inputs::FileValue>,
        event: Option<&InputEvent>,
    ) -> bool {
        FileInput::change_value(self, ctx, value, event)
    }

    fn derive(&mut self, ctx: &mut InputContext) -> Result<bool> {
        Ok(self.derive_blocking(ctx))
    }
}

/// Harness around a single-value input
struct Single<I: SingleInput> {
    input: I,
    props: Props<I::Value, I::Extension>,
    observed: Vec<EventKind>,
    log: CallbackLog,
}

impl<I: SingleInput> Single<I> {
    fn mount(ctx: &mut InputContext, props: &Value, observed: &[EventKind], log: &CallbackLog) -> Result<Self> {
        let props = observe_single(parse_props(props)?, observed, log);
        let input = I::mount(ctx, &props);
        Ok(Self {
            input,
            props,
            observed: observed.to_vec(),
            log: log.clone(),
        })
    }
}

impl<I: SingleInput> Harness for Single<I> {
    fn apply(&mut self, ctx: &mut InputContext, step: &Step) -> Result<()> {
        let event = step.action.event();
        let event = event.as_ref();
        match &step.action {
            Action::Focus => self.input.focus(ctx, event),
            Action::Blur => self.input.blur(ctx, event),
            Action::Click => self.input.click(ctx, event),
            Action::Touch => self.input.touch(ctx, event),
            Action::Change { value } => {
                self.input.change_value(ctx, parse_value(value)?, event);
            }
            Action::Input { text } => {
                self.input.input(ctx, text, event)?;
            }
            Action::Toggle => {
                self.input.toggle(ctx, event)?;
            }
            Action::Derive => {
                self.input.derive(ctx)?;
            }
            other => bail!("{} is not supported by single inputs", other.name()),
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut InputContext, props: Option<&Value>) -> Result<()> {
        if let Some(props) = props {
            self.props = observe_single(parse_props(props)?, &self.observed, &self.log);
        }
        self.input.render(ctx, &self.props);
        Ok(())
    }

    fn snapshot(&self) -> Value {
        slice_properties_for_state(self.input.properties())
    }

    fn state(&self) -> &ModelState {
        &self.input.properties().state
    }
}

// =============================================================================
// Composite inputs
// =============================================================================

struct IntervalHarness {
    interval: Interval,
    props: IntervalProps,
    observed: Vec<EventKind>,
    log: CallbackLog,
}

impl IntervalHarness {
    fn mount(ctx: &mut InputContext, props: &Value, observed: &[EventKind], log: &CallbackLog) -> Result<Self> {
        let props = Self::props(props, observed, log)?;
        let interval = Interval::new(ctx, &props);
        Ok(Self {
            interval,
            props,
            observed: observed.to_vec(),
            log: log.clone(),
        })
    }

    fn props(props: &Value, observed: &[EventKind], log: &CallbackLog) -> Result<IntervalProps> {
        let mut props: IntervalProps = parse_props(props)?;
        props.callbacks = observe_composite(observed, log)?;
        Ok(props)
    }
}

impl Harness for IntervalHarness {
    fn apply(&mut self, ctx: &mut InputContext, step: &Step) -> Result<()> {
        let side = step.side.context("interval steps need a side (start or end)")?;
        let event = step.action.event();
        let event = event.as_ref();
        match &step.action {
            Action::Focus => self.interval.focus(ctx, side, event),
            Action::Blur => self.interval.blur(ctx, side, event),
            Action::Click => self.interval.click(ctx, side, event),
            Action::Touch => self.interval.touch(ctx, side, event),
            Action::Change { value } => {
                self.interval.change_value(ctx, side, parse_value(value)?, event);
            }
            Action::Input { text } => {
                self.interval.input(ctx, side, text, event);
            }
            other => bail!("{} is not supported by intervals", other.name()),
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut InputContext, props: Option<&Value>) -> Result<()> {
        if let Some(props) = props {
            self.props = Self::props(props, &self.observed, &self.log)?;
        }
        self.interval.render(ctx, &self.props);
        Ok(())
    }

    fn snapshot(&self) -> Value {
        to_json(self.interval.properties())
    }

    fn state(&self) -> &ModelState {
        self.interval.model_state()
    }
}

struct InputsHarness {
    inputs: Inputs<String>,
    props: InputsProps<String>,
    observed: Vec<EventKind>,
    log: CallbackLog,
}

impl InputsHarness {
    fn mount(ctx: &mut InputContext, props: &Value, observed: &[EventKind], log: &CallbackLog) -> Result<Self> {
        let props = Self::props(props, observed, log)?;
        let inputs = Inputs::new(ctx, &props);
        Ok(Self {
            inputs,
            props,
            observed: observed.to_vec(),
            log: log.clone(),
        })
    }

    fn props(props: &Value, observed: &[EventKind], log: &CallbackLog) -> Result<InputsProps<String>> {
        let mut props: InputsProps<String> = parse_props(props)?;
        props.callbacks = observe_composite(observed, log)?;
        Ok(props)
    }
}

impl Harness for InputsHarness {
    fn apply(&mut self, ctx: &mut InputContext, step: &Step) -> Result<()> {
        let event = step.action.event();
        let event = event.as_ref();
        if let Action::Add = step.action {
            self.inputs.add(ctx, event);
            return Ok(());
        }

        let index = step.index.context("list steps need an item index")?;
        match &step.action {
            Action::Focus => self.inputs.focus(ctx, index, event),
            Action::Blur => self.inputs.blur(ctx, index, event),
            Action::Remove => {
                self.inputs.remove(ctx, index, event);
            }
            Action::Change { value } => {
                self.inputs.change_value(ctx, index, parse_value(value)?, event);
            }
            Action::Input { text } => {
                self.inputs.input(ctx, index, text, event);
            }
            other => bail!("{} is not supported by lists", other.name()),
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut InputContext, props: Option<&Value>) -> Result<()> {
        if let Some(props) = props {
            self.props = Self::props(props, &self.observed, &self.log)?;
        }
        self.inputs.render(ctx, &self.props);
        Ok(())
    }

    fn snapshot(&self) -> Value {
        to_json(self.inputs.properties())
    }

    fn state(&self) -> &ModelState {
        self.inputs.model_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(action: Action) -> Step {
        Step {
            action,
            side: None,
            index: None,
        }
    }

    #[test]
    fn test_text_harness_records_callbacks() {
        let mut ctx = InputContext::new();
        let log = CallbackLog::default();
        let mut harness = mount(
            &mut ctx,
            ComponentKind::Text,
            &json!({"name": "title"}),
            &[EventKind::ChangeValue],
            &log,
        )
        .unwrap();

        harness
            .apply(&mut ctx, &step(Action::Input { text: "abc".to_string() }))
            .unwrap();
        assert!(log.drain().is_empty());

        ctx.run_turn();
        let entries = log.drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].callback, "onChangeValue");
        assert_eq!(entries[0].value, json!("abc"));
        assert_eq!(harness.snapshot()["value"], json!("abc"));
    }

    #[test]
    fn test_interval_needs_side() {
        let mut ctx = InputContext::new();
        let log = CallbackLog::default();
        let mut harness = mount(&mut ctx, ComponentKind::Interval, &json!({}), &[], &log).unwrap();

        assert!(harness.apply(&mut ctx, &step(Action::Focus)).is_err());
    }

    #[test]
    fn test_composite_rejects_focus_callbacks() {
        let mut ctx = InputContext::new();
        let log = CallbackLog::default();
        let result = mount(&mut ctx, ComponentKind::Inputs, &json!({}), &[EventKind::Focus], &log);

        assert!(result.is_err());
    }

    #[test]
    fn test_checkbox_toggle() {
        let mut ctx = InputContext::new();
        let log = CallbackLog::default();
        let mut harness = mount(
            &mut ctx,
            ComponentKind::Checkbox,
            &json!({"required": true}),
            &[],
            &log,
        )
        .unwrap();
        assert!(harness.state().invalid);

        harness.apply(&mut ctx, &step(Action::Toggle)).unwrap();
        assert!(harness.state().valid);
    }

    #[test]
    fn test_state_summary() {
        let mut state = ModelState::default();
        state.mark_dirty();
        state.set_flag(forma_inputs::ValidationKey::Required, true);

        assert_eq!(state_summary(&state), json!(["dirty", "invalidRequired"]));
    }
}
