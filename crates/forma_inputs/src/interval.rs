//! Interval input
//!
//! Two numeric text inputs describing a range. Each side's bounds follow
//! the other side's value so the start never exceeds the end, and editing
//! one side drags the other along when they would cross.

use forma_core::Signal;
use serde::{Deserialize, Serialize};

use crate::composite::{aggregate_state, CompositeCallbacks, CompositeView};
use crate::context::{InputContext, WidgetId};
use crate::controlled::{StateSetter, ValueState};
use crate::dispatch::{EventKind, InputEvent};
use crate::model::{InputValue, ModelState, NO_NAME_DEFINED};
use crate::props::{present, Props};
use crate::text_input::{TextInput, TextProperties};

/// Value of an interval input
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalValue {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl IntervalValue {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }
}

impl InputValue for IntervalValue {
    fn is_blank(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// One side of an interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Start,
    End,
}

impl Side {
    pub fn name(self) -> &'static str {
        match self {
            Side::Start => "start",
            Side::End => "end",
        }
    }
}

pub type IntervalCallbacks = CompositeCallbacks<IntervalValue, IntervalProperties>;

/// Raw properties of an interval
///
/// `disabled`, `required`, `maximum` and `minimum` apply to both sides
/// unless a side sets them itself.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntervalProps {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Option<IntervalValue>>,
    pub start: Props<f64>,
    pub end: Props<f64>,
    pub disabled: Option<bool>,
    pub required: Option<bool>,
    pub maximum: Option<f64>,
    pub minimum: Option<f64>,
    pub enforce_uncontrolled: Option<bool>,
    #[serde(skip)]
    pub callbacks: IntervalCallbacks,
}

impl IntervalProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, value: Option<IntervalValue>) -> Self {
        self.value = Some(value);
        self
    }

    pub fn start(mut self, start: Props<f64>) -> Self {
        self.start = start;
        self
    }

    pub fn end(mut self, end: Props<f64>) -> Self {
        self.end = end;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn enforce_uncontrolled(mut self, enforce: bool) -> Self {
        self.enforce_uncontrolled = Some(enforce);
        self
    }

    pub fn on_change(
        mut self,
        callback: impl Fn(&IntervalProperties, Option<&InputEvent>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_change = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_change_value(
        mut self,
        callback: impl Fn(Option<&IntervalValue>, Option<&InputEvent>, &IntervalProperties)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.callbacks.on_change_value = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_change_state(
        mut self,
        callback: impl Fn(&ModelState, Option<&InputEvent>, &IntervalProperties)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.callbacks.on_change_state = Some(std::sync::Arc::new(callback));
        self
    }

    fn side(&self, side: Side) -> &Props<f64> {
        match side {
            Side::Start => &self.start,
            Side::End => &self.end,
        }
    }

    /// Value given for a side, `None` when absent
    fn side_value(&self, side: Side) -> Option<Option<f64>> {
        let props = self.side(side);
        props.fields.value.or_else(|| {
            props
                .model
                .as_ref()
                .and_then(|model| model.fields.value)
        })
    }

    /// Configured `(minimum, maximum)` of a side before clamping
    fn configured_range(&self, side: Side) -> (f64, f64) {
        let props = self.side(side);
        let model = props.model.as_ref().map(|model| &model.fields);
        let minimum = props
            .fields
            .minimum
            .or_else(|| model.and_then(|model| model.minimum))
            .or(self.minimum)
            .unwrap_or(f64::NEG_INFINITY);
        let maximum = props
            .fields
            .maximum
            .or_else(|| model.and_then(|model| model.maximum))
            .or(self.maximum)
            .unwrap_or(f64::INFINITY);
        (minimum, maximum)
    }

    fn is_controlled(&self, enforce_default: bool) -> bool {
        let enforce = self.enforce_uncontrolled.unwrap_or(enforce_default);
        let given = self.value.is_some()
            || self.side_value(Side::Start).is_some()
            || self.side_value(Side::End).is_some();
        !enforce && given && self.callbacks.observes_changes()
    }

    /// Value shown for this render, falling back to the local value
    fn resolve_value(&self, local: IntervalValue) -> IntervalValue {
        if let Some(value) = self.value {
            return value.unwrap_or_default();
        }
        IntervalValue {
            start: self.side_value(Side::Start).unwrap_or(local.start),
            end: self.side_value(Side::End).unwrap_or(local.end),
        }
    }

    /// Properties of one side with the shared fields and clamped bounds
    fn child_props(&self, side: Side, value: IntervalValue) -> Props<f64> {
        let mut props = self.side(side).clone();
        if props.disabled.is_none() {
            props.disabled = self.disabled;
        }
        if props.required.is_none() {
            props.required = self.required;
        }
        if props.fields.name.is_none() {
            props.fields.name = Some(side.name().to_string());
        }

        let (start_minimum, start_maximum) = self.configured_range(Side::Start);
        let (end_minimum, end_maximum) = self.configured_range(Side::End);
        match side {
            Side::Start => {
                let maximum = start_maximum
                    .min(value.end.unwrap_or(f64::INFINITY))
                    .min(end_maximum);
                props.fields.minimum = Some(start_minimum);
                props.fields.maximum = Some(maximum);
                props.fields.value = Some(value.start);
            }
            Side::End => {
                let minimum = end_minimum
                    .max(value.start.unwrap_or(f64::NEG_INFINITY))
                    .max(start_minimum);
                props.fields.minimum = Some(minimum);
                props.fields.maximum = Some(end_maximum);
                props.fields.value = Some(value.end);
            }
        }
        props
    }
}

/// Consolidated view of an interval
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalProperties {
    pub name: String,
    pub value: IntervalValue,
    pub disabled: bool,
    pub required: bool,
    #[serde(flatten)]
    pub state: ModelState,
    pub start: TextProperties<f64>,
    pub end: TextProperties<f64>,
}

impl CompositeView for IntervalProperties {
    type Value = IntervalValue;

    fn value(&self) -> Option<&IntervalValue> {
        Some(&self.value)
    }

    fn state(&self) -> &ModelState {
        &self.state
    }
}

/// Value of one side after the other side was edited to `edited`
fn follow(side: Side, current: IntervalValue, edited: Option<f64>) -> IntervalValue {
    match side {
        Side::Start => {
            let end = current
                .end
                .unwrap_or(f64::NEG_INFINITY)
                .max(edited.unwrap_or(f64::NEG_INFINITY));
            IntervalValue {
                start: edited,
                end: if end.is_finite() { Some(end) } else { edited },
            }
        }
        Side::End => {
            let start = current
                .start
                .unwrap_or(f64::INFINITY)
                .min(edited.unwrap_or(f64::INFINITY));
            IntervalValue {
                start: if start.is_finite() { Some(start) } else { edited },
                end: edited,
            }
        }
    }
}

/// Mounted interval input
pub struct Interval {
    id: WidgetId,
    start: TextInput<f64>,
    end: TextInput<f64>,
    value_state: Signal<ValueState<IntervalValue>>,
    setter: StateSetter<IntervalValue>,
    controlled: bool,
    props: IntervalProps,
    properties: IntervalProperties,
}

impl Interval {
    pub fn new(ctx: &mut InputContext, props: &IntervalProps) -> Self {
        let id = ctx.register_widget("interval");
        let initial = props.resolve_value(IntervalValue {
            start: props.start.initial_value.flatten().or(props.start.fields.default.flatten()),
            end: props.end.initial_value.flatten().or(props.end.fields.default.flatten()),
        });
        let value_state = ctx
            .runtime
            .create_signal(ValueState::new(Some(initial), ModelState::default()));

        let start = TextInput::new(ctx, &props.child_props(Side::Start, initial));
        let end = TextInput::new(ctx, &props.child_props(Side::End, initial));
        let properties = build_properties(props, initial, start.properties(), end.properties());

        let mut interval = Self {
            id,
            start,
            end,
            value_state,
            setter: StateSetter::Real,
            controlled: false,
            props: props.clone(),
            properties,
        };
        interval.render(ctx, props);
        interval
    }

    pub fn render(&mut self, ctx: &mut InputContext, props: &IntervalProps) -> &IntervalProperties {
        let controlled = props.is_controlled(ctx.config().enforce_uncontrolled);
        let local = ctx.runtime.get(self.value_state);
        let local_value = local
            .as_ref()
            .and_then(|state| state.value)
            .unwrap_or_default();

        let value = props.resolve_value(local_value);
        self.props = props.clone();
        self.render_children(ctx, value);

        let current = ValueState::new(Some(value), self.properties.state.clone());
        let needs_sync = match &local {
            Some(local) => {
                (!controlled && local.value != current.value)
                    || local.model_state != current.model_state
            }
            None => false,
        };
        if needs_sync {
            tracing::trace!(id = ?self.id, "synchronizing interval state");
            ctx.runtime.set_rebuild(self.value_state, current.clone());
            ctx.mark_dirty(self.id);
        }

        self.controlled = controlled;
        self.setter = if controlled {
            StateSetter::Dummy { snapshot: current }
        } else {
            StateSetter::Real
        };
        ctx.note_render(self.id);
        &self.properties
    }

    pub fn unmount(self, ctx: &mut InputContext) {
        self.start.unmount(ctx);
        self.end.unmount(ctx);
        ctx.runtime.dispose_signal(self.value_state);
        ctx.unregister_widget(self.id);
    }

    fn render_children(&mut self, ctx: &mut InputContext, value: IntervalValue) {
        self.start.render(ctx, &self.props.child_props(Side::Start, value));
        self.end.render(ctx, &self.props.child_props(Side::End, value));
        self.properties = build_properties(
            &self.props,
            value,
            self.start.properties(),
            self.end.properties(),
        );
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn properties(&self) -> &IntervalProperties {
        &self.properties
    }

    pub fn value(&self) -> IntervalValue {
        self.properties.value
    }

    pub fn model_state(&self) -> &ModelState {
        &self.properties.state
    }

    pub fn is_controlled(&self) -> bool {
        self.controlled
    }

    pub fn side(&self, side: Side) -> &TextInput<f64> {
        match side {
            Side::Start => &self.start,
            Side::End => &self.end,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut TextInput<f64> {
        match side {
            Side::Start => &mut self.start,
            Side::End => &mut self.end,
        }
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

    /// Text typed into one side
    pub fn input(
        &mut self,
        ctx: &mut InputContext,
        side: Side,
        text: &str,
        event: Option<&InputEvent>,
    ) -> bool {
        if !self.side_mut(side).input(ctx, text, event) {
            return false;
        }
        let edited = self.side(side).value().copied();
        self.apply_edit(ctx, side, edited, event);
        true
    }

    /// Set the value of one side
    pub fn change_value(
        &mut self,
        ctx: &mut InputContext,
        side: Side,
        value: Option<f64>,
        event: Option<&InputEvent>,
    ) -> bool {
        if !self.side_mut(side).change_value(ctx, value, event) {
            return false;
        }
        self.apply_edit(ctx, side, value, event);
        true
    }

    pub fn focus(&mut self, ctx: &mut InputContext, side: Side, event: Option<&InputEvent>) {
        self.side_mut(side).focus(ctx, event);
        self.settle_interaction(ctx, event);
    }

    pub fn blur(&mut self, ctx: &mut InputContext, side: Side, event: Option<&InputEvent>) {
        self.side_mut(side).blur(ctx, event);
        self.settle_interaction(ctx, event);
    }

    pub fn click(&mut self, ctx: &mut InputContext, side: Side, event: Option<&InputEvent>) {
        self.side_mut(side).click(ctx, event);
        self.settle_interaction(ctx, event);
    }

    pub fn touch(&mut self, ctx: &mut InputContext, side: Side, event: Option<&InputEvent>) {
        self.side_mut(side).touch(ctx, event);
        self.settle_interaction(ctx, event);
    }

    fn apply_edit(
        &mut self,
        ctx: &mut InputContext,
        side: Side,
        edited: Option<f64>,
        event: Option<&InputEvent>,
    ) {
        let old_state = self.properties.state.clone();
        let next = follow(side, self.properties.value, edited);

        // Children show what the interval will render next.
        let shown = if self.controlled {
            self.props.resolve_value(next)
        } else {
            next
        };
        self.render_children(ctx, next);
        let working = IntervalProperties {
            value: next,
            ..self.properties.clone()
        };

        let persisted = ValueState::new(Some(next), working.state.clone());
        if self.setter.apply(&mut ctx.runtime, self.value_state, persisted) {
            ctx.mark_dirty(self.id);
        }

        let callbacks = self.props.callbacks.clone();
        callbacks.notify(&mut ctx.scheduler, EventKind::ChangeValue, &working, event);
        callbacks.notify(&mut ctx.scheduler, EventKind::Change, &working, event);
        if working.state != old_state {
            callbacks.notify(&mut ctx.scheduler, EventKind::ChangeState, &working, event);
        }

        if shown != next {
            self.render_children(ctx, shown);
        }
    }

    /// Notify state observers after a focus related child event
    fn settle_interaction(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        let old_state = self.properties.state.clone();
        self.properties = build_properties(
            &self.props,
            self.properties.value,
            self.start.properties(),
            self.end.properties(),
        );
        if self.properties.state == old_state {
            return;
        }

        let persisted = ValueState::new(Some(self.properties.value), self.properties.state.clone());
        if self.setter.apply(&mut ctx.runtime, self.value_state, persisted) {
            ctx.mark_dirty(self.id);
        }
        let callbacks = self.props.callbacks.clone();
        callbacks.notify(&mut ctx.scheduler, EventKind::ChangeState, &self.properties, event);
        callbacks.notify(&mut ctx.scheduler, EventKind::Change, &self.properties, event);
    }
}

fn build_properties(
    props: &IntervalProps,
    value: IntervalValue,
    start: &TextProperties<f64>,
    end: &TextProperties<f64>,
) -> IntervalProperties {
    IntervalProperties {
        name: props
            .name
            .clone()
            .unwrap_or_else(|| NO_NAME_DEFINED.to_string()),
        value,
        disabled: start.disabled && end.disabled,
        required: start.required || end.required,
        state: aggregate_state([&start.state, &end.state]),
        start: start.clone(),
        end: end.clone(),
    }
}
