//! List of inputs
//!
//! Manages a variable number of text inputs holding the items of a list.
//! Items can be added and removed; a `null` item value removes the item.
//! The list validates its length against `maximumNumber` and
//! `minimumNumber`.

use forma_core::Signal;
use serde::{Deserialize, Serialize};

use crate::composite::{aggregate_state, CompositeCallbacks, CompositeView};
use crate::context::{InputContext, WidgetId};
use crate::controlled::{StateSetter, ValueState};
use crate::dispatch::{EventKind, InputEvent};
use crate::model::{InputValue, ModelState, ValidationKey, NO_NAME_DEFINED};
use crate::props::{present, Props};
use crate::text_input::{TextInput, TextProperties, TextualValue};

/// Items of a list input, `None` items are empty inputs
pub type Items<T> = Vec<Option<T>>;

impl<T: InputValue> InputValue for Vec<Option<T>> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

pub type InputsCallbacks<T> = CompositeCallbacks<Items<T>, InputsProperties<T>>;

/// Nested model of a list input
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase", bound(deserialize = "T: InputValue"))]
pub struct InputsModelProps<T> {
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Option<Items<T>>>,
    pub default: Option<Items<T>>,
    pub maximum_number: Option<f64>,
    pub minimum_number: Option<f64>,
    pub empty_equals_null: Option<bool>,
}

impl<T> Default for InputsModelProps<T> {
    fn default() -> Self {
        Self {
            value: None,
            default: None,
            maximum_number: None,
            minimum_number: None,
            empty_equals_null: None,
        }
    }
}

/// Raw properties of a list input
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase", bound(deserialize = "T: InputValue"))]
pub struct InputsProps<T: InputValue> {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Option<Items<T>>>,
    pub model: Option<InputsModelProps<T>>,
    pub default: Option<Items<T>>,
    pub maximum_number: Option<f64>,
    pub minimum_number: Option<f64>,
    pub empty_equals_null: Option<bool>,
    pub disabled: Option<bool>,
    pub enforce_uncontrolled: Option<bool>,
    /// Properties every item starts from
    pub item: Props<T>,
    #[serde(skip)]
    pub callbacks: InputsCallbacks<T>,
}

impl<T: InputValue> Default for InputsProps<T> {
    fn default() -> Self {
        Self {
            name: None,
            value: None,
            model: None,
            default: None,
            maximum_number: None,
            minimum_number: None,
            empty_equals_null: None,
            disabled: None,
            enforce_uncontrolled: None,
            item: Props::default(),
            callbacks: CompositeCallbacks::default(),
        }
    }
}

impl<T: InputValue> InputsProps<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, value: Option<Items<T>>) -> Self {
        self.value = Some(value);
        self
    }

    pub fn model_value(mut self, value: Option<Items<T>>) -> Self {
        self.model.get_or_insert_with(Default::default).value = Some(value);
        self
    }

    pub fn default_value(mut self, default: Items<T>) -> Self {
        self.default = Some(default);
        self
    }

    pub fn maximum_number(mut self, maximum: f64) -> Self {
        self.maximum_number = Some(maximum);
        self
    }

    pub fn minimum_number(mut self, minimum: f64) -> Self {
        self.minimum_number = Some(minimum);
        self
    }

    pub fn empty_equals_null(mut self, empty_equals_null: bool) -> Self {
        self.empty_equals_null = Some(empty_equals_null);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn enforce_uncontrolled(mut self, enforce: bool) -> Self {
        self.enforce_uncontrolled = Some(enforce);
        self
    }

    pub fn item(mut self, item: Props<T>) -> Self {
        self.item = item;
        self
    }

    pub fn on_change(
        mut self,
        callback: impl Fn(&InputsProperties<T>, Option<&InputEvent>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_change = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_change_value(
        mut self,
        callback: impl Fn(Option<&Items<T>>, Option<&InputEvent>, &InputsProperties<T>)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.callbacks.on_change_value = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_change_state(
        mut self,
        callback: impl Fn(&ModelState, Option<&InputEvent>, &InputsProperties<T>)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.callbacks.on_change_state = Some(std::sync::Arc::new(callback));
        self
    }

    fn model_field<F: Copy>(&self, field: impl Fn(&InputsModelProps<T>) -> Option<F>) -> Option<F> {
        self.model.as_ref().and_then(field)
    }

    fn maximum(&self) -> f64 {
        self.maximum_number
            .or_else(|| self.model_field(|model| model.maximum_number))
            .unwrap_or(f64::INFINITY)
    }

    fn minimum(&self) -> f64 {
        self.minimum_number
            .or_else(|| self.model_field(|model| model.minimum_number))
            .unwrap_or(0.0)
    }

    fn treats_empty_as_null(&self) -> bool {
        self.empty_equals_null
            .or_else(|| self.model_field(|model| model.empty_equals_null))
            .unwrap_or(true)
    }

    /// Items given by the caller, top level first
    fn given_value(&self) -> Option<Option<Items<T>>> {
        self.value.clone().or_else(|| {
            self.model
                .as_ref()
                .and_then(|model| model.value.clone())
        })
    }

    /// The caller owns the items when both the value and the model value
    /// are given and a change callback listens
    fn is_controlled(&self, enforce_default: bool) -> bool {
        let enforce = self.enforce_uncontrolled.unwrap_or(enforce_default);
        let model_given = self
            .model
            .as_ref()
            .map_or(false, |model| model.value.is_some());
        !enforce && self.value.is_some() && model_given && self.callbacks.observes_changes()
    }

    fn initial_value(&self) -> Option<Items<T>> {
        self.given_value()
            .or_else(|| self.default.clone().map(Some))
            .or_else(|| {
                self.model
                    .as_ref()
                    .and_then(|model| model.default.clone())
                    .map(Some)
            })
            .flatten()
    }

    fn normalize(&self, items: Option<Items<T>>) -> Option<Items<T>> {
        match items {
            Some(items) if items.is_empty() && self.treats_empty_as_null() => None,
            items => items,
        }
    }

    fn item_props(&self, index: usize, value: Option<T>) -> Props<T> {
        let mut props = self.item.clone();
        props.fields.name = Some(format!(
            "{}-{}",
            self.name.as_deref().unwrap_or(NO_NAME_DEFINED),
            index + 1
        ));
        if props.disabled.is_none() {
            props.disabled = self.disabled;
        }
        props.fields.value = Some(value);
        props
    }

    /// Value a new item starts with
    fn prototype_value(&self) -> Option<T> {
        self.item
            .fields
            .value
            .clone()
            .or_else(|| self.item.initial_value.clone())
            .or_else(|| self.item.fields.default.clone())
            .flatten()
    }
}

/// Consolidated view of a list input
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputsProperties<T> {
    pub name: String,
    pub value: Option<Items<T>>,
    pub disabled: bool,
    pub empty_equals_null: bool,
    pub maximum_number: f64,
    pub minimum_number: f64,
    #[serde(flatten)]
    pub state: ModelState,
    pub items: Vec<TextProperties<T>>,
}

impl<T: InputValue> CompositeView for InputsProperties<T> {
    type Value = Items<T>;

    fn value(&self) -> Option<&Items<T>> {
        self.value.as_ref()
    }

    fn state(&self) -> &ModelState {
        &self.state
    }
}

/// Lifecycle of a freshly added item
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemPhase {
    Added,
    Rendered,
    Stabilized,
}

/// Mounted list input
pub struct Inputs<T: TextualValue> {
    id: WidgetId,
    children: Vec<TextInput<T>>,
    value_state: Signal<ValueState<Items<T>>>,
    phase: Signal<ItemPhase>,
    setter: StateSetter<Items<T>>,
    controlled: bool,
    props: InputsProps<T>,
    properties: InputsProperties<T>,
}

impl<T: TextualValue> Inputs<T> {
    pub fn new(ctx: &mut InputContext, props: &InputsProps<T>) -> Self {
        let id = ctx.register_widget("inputs");
        let initial = props.normalize(props.initial_value());
        let value_state = ctx
            .runtime
            .create_signal(ValueState::new(initial.clone(), ModelState::default()));
        let phase = ctx.runtime.create_signal(ItemPhase::Stabilized);

        let mut inputs = Self {
            id,
            children: Vec::new(),
            value_state,
            phase,
            setter: StateSetter::Real,
            controlled: false,
            props: props.clone(),
            properties: build_properties(props, initial.clone(), &[]),
        };
        inputs.sync_children(ctx, initial);
        inputs.render(ctx, props);
        inputs
    }

    pub fn render(&mut self, ctx: &mut InputContext, props: &InputsProps<T>) -> &InputsProperties<T> {
        let controlled = props.is_controlled(ctx.config().enforce_uncontrolled);
        let local = ctx.runtime.get(self.value_state);
        let local_value = local.as_ref().and_then(|state| state.value.clone());

        self.props = props.clone();
        let value = if controlled {
            props.normalize(props.given_value().flatten())
        } else {
            local_value
        };
        self.sync_children(ctx, value.clone());

        let current = ValueState::new(value, self.properties.state.clone());
        let needs_sync = local
            .as_ref()
            .map_or(false, |local| local.model_state != current.model_state);
        if needs_sync {
            tracing::trace!(id = ?self.id, "synchronizing inputs state");
            ctx.runtime.set_rebuild(self.value_state, current.clone());
            ctx.mark_dirty(self.id);
        }

        self.controlled = controlled;
        self.setter = if controlled {
            StateSetter::Dummy { snapshot: current }
        } else {
            StateSetter::Real
        };

        if ctx.runtime.get(self.phase) == Some(ItemPhase::Rendered) {
            ctx.runtime.set(self.phase, ItemPhase::Stabilized);
            self.props
                .callbacks
                .notify(&mut ctx.scheduler, EventKind::Change, &self.properties, None);
        }
        ctx.note_render(self.id);
        &self.properties
    }

    pub fn unmount(self, ctx: &mut InputContext) {
        for child in self.children {
            child.unmount(ctx);
        }
        ctx.runtime.dispose_signal(self.value_state);
        ctx.runtime.dispose_signal(self.phase);
        ctx.unregister_widget(self.id);
    }

    /// Mount, render or drop children to match `items`
    fn sync_children(&mut self, ctx: &mut InputContext, items: Option<Items<T>>) {
        let values = items.clone().unwrap_or_default();
        for (index, value) in values.iter().enumerate() {
            let props = self.props.item_props(index, value.clone());
            match self.children.get_mut(index) {
                Some(child) => {
                    child.render(ctx, &props);
                }
                None => self.children.push(TextInput::new(ctx, &props)),
            }
        }
        for child in self.children.drain(values.len()..) {
            child.unmount(ctx);
        }

        let children: Vec<TextProperties<T>> = self
            .children
            .iter()
            .map(|child| child.properties().clone())
            .collect();
        self.properties = build_properties(&self.props, items, &children);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn properties(&self) -> &InputsProperties<T> {
        &self.properties
    }

    pub fn value(&self) -> Option<&Items<T>> {
        self.properties.value.as_ref()
    }

    pub fn model_state(&self) -> &ModelState {
        &self.properties.state
    }

    pub fn is_controlled(&self) -> bool {
        self.controlled
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&TextInput<T>> {
        self.children.get(index)
    }

    fn items(&self) -> Items<T> {
        self.properties.value.clone().unwrap_or_default()
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

    /// Append an item starting from the item prototype
    pub fn add(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) -> bool {
        if self.properties.disabled {
            return false;
        }
        let mut items = self.items();
        items.push(self.props.prototype_value());
        self.commit(ctx, Some(items), event);

        ctx.runtime.set(self.phase, ItemPhase::Added);
        let phase = self.phase;
        ctx.runtime.on_commit(move |runtime| {
            if runtime.get(phase) == Some(ItemPhase::Added) {
                runtime.set_rebuild(phase, ItemPhase::Rendered);
            }
        });
        true
    }

    /// Remove the item at `index`
    pub fn remove(&mut self, ctx: &mut InputContext, index: usize, event: Option<&InputEvent>) -> bool {
        if self.properties.disabled || index >= self.children.len() {
            return false;
        }
        let mut items = self.items();
        items.remove(index);
        self.children.remove(index).unmount(ctx);
        self.commit(ctx, Some(items), event);
        true
    }

    /// Set the value of one item, `None` removes it
    pub fn change_value(
        &mut self,
        ctx: &mut InputContext,
        index: usize,
        value: Option<T>,
        event: Option<&InputEvent>,
    ) -> bool {
        let Some(child) = self.children.get_mut(index) else {
            return false;
        };
        if !child.change_value(ctx, value.clone(), event) {
            return false;
        }
        self.apply_item(ctx, index, value, event);
        true
    }

    /// Text typed into one item
    pub fn input(
        &mut self,
        ctx: &mut InputContext,
        index: usize,
        text: &str,
        event: Option<&InputEvent>,
    ) -> bool {
        let Some(child) = self.children.get_mut(index) else {
            return false;
        };
        if !child.input(ctx, text, event) {
            return false;
        }
        let value = child.value().cloned();
        self.apply_item(ctx, index, value, event);
        true
    }

    pub fn focus(&mut self, ctx: &mut InputContext, index: usize, event: Option<&InputEvent>) {
        if let Some(child) = self.children.get_mut(index) {
            child.focus(ctx, event);
            self.settle_interaction(ctx, event);
        }
    }

    pub fn blur(&mut self, ctx: &mut InputContext, index: usize, event: Option<&InputEvent>) {
        if let Some(child) = self.children.get_mut(index) {
            child.blur(ctx, event);
            self.settle_interaction(ctx, event);
        }
    }

    fn apply_item(
        &mut self,
        ctx: &mut InputContext,
        index: usize,
        value: Option<T>,
        event: Option<&InputEvent>,
    ) {
        let mut items = self.items();
        match value {
            Some(value) => {
                if let Some(slot) = items.get_mut(index) {
                    *slot = Some(value);
                }
            }
            None => {
                items.remove(index);
                self.children.remove(index).unmount(ctx);
            }
        }
        self.commit(ctx, Some(items), event);
    }

    /// Persist new items and notify observers
    fn commit(&mut self, ctx: &mut InputContext, items: Option<Items<T>>, event: Option<&InputEvent>) {
        let old_state = self.properties.state.clone();
        let next = self.props.normalize(items);
        self.sync_children(ctx, next.clone());
        let working = self.properties.clone();

        let persisted = ValueState::new(next.clone(), working.state.clone());
        if self.setter.apply(&mut ctx.runtime, self.value_state, persisted) {
            ctx.mark_dirty(self.id);
        }

        let callbacks = self.props.callbacks.clone();
        callbacks.notify(&mut ctx.scheduler, EventKind::ChangeValue, &working, event);
        callbacks.notify(&mut ctx.scheduler, EventKind::Change, &working, event);
        if working.state != old_state {
            callbacks.notify(&mut ctx.scheduler, EventKind::ChangeState, &working, event);
        }

        if self.controlled {
            let shown = self.props.normalize(self.props.given_value().flatten());
            if shown != next {
                self.sync_children(ctx, shown);
            }
        }
    }

    fn settle_interaction(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        let old_state = self.properties.state.clone();
        let value = self.properties.value.clone();
        self.sync_children(ctx, value);
        if self.properties.state == old_state {
            return;
        }

        let persisted = ValueState::new(self.properties.value.clone(), self.properties.state.clone());
        if self.setter.apply(&mut ctx.runtime, self.value_state, persisted) {
            ctx.mark_dirty(self.id);
        }
        let callbacks = self.props.callbacks.clone();
        callbacks.notify(&mut ctx.scheduler, EventKind::ChangeState, &self.properties, event);
        callbacks.notify(&mut ctx.scheduler, EventKind::Change, &self.properties, event);
    }
}

fn build_properties<T: InputValue>(
    props: &InputsProps<T>,
    value: Option<Items<T>>,
    items: &[TextProperties<T>],
) -> InputsProperties<T> {
    let maximum = props.maximum();
    let minimum = props.minimum();
    let count = value.as_ref().map_or(0, Vec::len) as f64;

    let mut state = aggregate_state(items.iter().map(|item| &item.state));
    state.set_flag(ValidationKey::MaximumNumber, maximum < count);
    state.set_flag(ValidationKey::MinimumNumber, minimum > count);
    state.invalid |= state.flag(ValidationKey::MaximumNumber) || state.flag(ValidationKey::MinimumNumber);
    state.valid = !state.invalid;

    InputsProperties {
        name: props
            .name
            .clone()
            .unwrap_or_else(|| NO_NAME_DEFINED.to_string()),
        value,
        disabled: props.disabled.unwrap_or(false),
        empty_equals_null: props.treats_empty_as_null(),
        maximum_number: maximum,
        minimum_number: minimum,
        state,
        items: items.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn strings(values: &[&str]) -> Items<String> {
        values.iter().map(|value| Some(value.to_string())).collect()
    }

    #[test]
    fn test_initial_items() {
        let mut ctx = InputContext::new();
        let props = InputsProps::new()
            .name("tags")
            .default_value(strings(&["a", "b"]));
        let inputs = Inputs::<String>::new(&mut ctx, &props);

        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs.value(), Some(&strings(&["a", "b"])));
        assert_eq!(inputs.item(1).unwrap().properties().name, "tags-2");
    }

    #[test]
    fn test_empty_list_is_null() {
        let mut ctx = InputContext::new();
        let inputs = Inputs::<String>::new(&mut ctx, &InputsProps::new().default_value(Vec::new()));
        assert_eq!(inputs.value(), None);

        let kept = Inputs::<String>::new(
            &mut ctx,
            &InputsProps::new().default_value(Vec::new()).empty_equals_null(false),
        );
        assert_eq!(kept.value(), Some(&Vec::new()));
    }

    #[test]
    fn test_add_change_remove() {
        let mut ctx = InputContext::new();
        let mut inputs = Inputs::<String>::new(&mut ctx, &InputsProps::new());

        assert!(inputs.add(&mut ctx, None));
        assert_eq!(inputs.value(), Some(&vec![None]));

        assert!(inputs.input(&mut ctx, 0, "x", None));
        assert!(inputs.add(&mut ctx, None));
        assert!(inputs.change_value(&mut ctx, 1, Some("y".to_string()), None));
        assert_eq!(inputs.value(), Some(&strings(&["x", "y"])));

        assert!(inputs.remove(&mut ctx, 0, None));
        assert_eq!(inputs.value(), Some(&strings(&["y"])));
        assert_eq!(inputs.item(0).unwrap().value().map(String::as_str), Some("y"));
    }

    #[test]
    fn test_null_item_value_removes_item() {
        let mut ctx = InputContext::new();
        let props = InputsProps::new().default_value(strings(&["a", "b"]));
        let mut inputs = Inputs::<String>::new(&mut ctx, &props);

        assert!(inputs.input(&mut ctx, 0, "", None));

        assert_eq!(inputs.value(), Some(&strings(&["b"])));
        assert_eq!(inputs.len(), 1);
    }

    #[test]
    fn test_number_validation() {
        let mut ctx = InputContext::new();
        let props = InputsProps::<String>::new()
            .minimum_number(1.0)
            .maximum_number(2.0);
        let mut inputs = Inputs::new(&mut ctx, &props);
        assert!(inputs.model_state().flag(ValidationKey::MinimumNumber));
        assert!(inputs.model_state().invalid);

        inputs.add(&mut ctx, None);
        assert!(inputs.model_state().valid);

        inputs.add(&mut ctx, None);
        inputs.add(&mut ctx, None);
        assert!(inputs.model_state().flag(ValidationKey::MaximumNumber));
        assert!(!inputs.model_state().flag(ValidationKey::MinimumNumber));
    }

    #[test]
    fn test_added_item_triggers_change_after_commit() {
        let mut ctx = InputContext::new();
        let changes = Arc::new(Mutex::new(0));
        let counter = changes.clone();
        let props = InputsProps::<String>::new().on_change(move |_, _| *counter.lock().unwrap() += 1);
        let mut inputs = Inputs::new(&mut ctx, &props);

        inputs.add(&mut ctx, None);
        ctx.run_turn();
        assert_eq!(*changes.lock().unwrap(), 1);

        ctx.commit();
        assert!(ctx.take_render_request());
        inputs.render(&mut ctx, &props);
        ctx.run_turn();
        assert_eq!(*changes.lock().unwrap(), 2);

        inputs.render(&mut ctx, &props);
        ctx.run_turn();
        assert_eq!(*changes.lock().unwrap(), 2);
    }

    #[test]
    fn test_controlled_items_stay() {
        let mut ctx = InputContext::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let given = strings(&["a"]);
        let props = InputsProps::new()
            .value(Some(given.clone()))
            .model_value(Some(given.clone()))
            .on_change_value(move |value: Option<&Items<String>>, _, _| {
                log.lock().unwrap().push(value.cloned())
            });
        let mut inputs = Inputs::new(&mut ctx, &props);
        assert!(inputs.is_controlled());

        inputs.add(&mut ctx, None);
        ctx.run_turn();

        assert_eq!(*seen.lock().unwrap(), vec![Some(vec![Some("a".to_string()), None])]);
        assert_eq!(inputs.value(), Some(&given));
        assert_eq!(inputs.len(), 1);
    }

    #[test]
    fn test_value_alone_is_uncontrolled() {
        let mut ctx = InputContext::new();
        let props = InputsProps::new()
            .value(Some(strings(&["a"])))
            .on_change_value(|_, _, _| {});
        let inputs = Inputs::<String>::new(&mut ctx, &props);

        assert!(!inputs.is_controlled());
    }
}
