//! Shared render and event handling engine of single-value inputs
//!
//! A [`Reconciler`] owns one input's local state and implements the event
//! handlers every single-value input shares. Components describe what is
//! specific to them through an [`InputKind`]: the default model, the
//! validators and an optional value normalization.
//!
//! Each render recomputes the consolidated [`Properties`] from scratch.
//! Handlers work on a copy of those properties, queue callbacks against the
//! settled copy and write the resulting local state through the setter
//! chosen for the current ownership mode.

use forma_core::Signal;

use crate::config::FormaConfig;
use crate::consolidate::{
    get_consolidated_properties, map_properties_into_model, MappedProperties, Properties,
    ViewOptions,
};
use crate::context::{InputContext, WidgetId};
use crate::controlled::{
    derive_missing_properties_from_state, determine_initial_value, is_controlled, StateSetter,
    ValueState,
};
use crate::dispatch::{EventKind, InputEvent, Outbox};
use crate::model::{InputValue, Model, ModelExtension, ModelState};
use crate::props::Props;
use crate::validation::{determine_validation_state, ValidatorSet};

/// What distinguishes one kind of single-value input from another
pub trait InputKind: 'static {
    type Value: InputValue;
    type Extension: ModelExtension;

    /// Name used for registration and logging
    const KIND: &'static str;

    /// Required text used when neither props nor config give one
    const REQUIRED_TEXT: &'static str = "Please fill this field.";

    /// Validators of this kind, keyed by the flag they set
    fn validators() -> ValidatorSet<Self::Value, Self::Extension>;

    /// The immutable model every render starts from
    fn default_model(config: &FormaConfig) -> Model<Self::Value, Self::Extension>;

    /// Adjust the merged model before validation
    fn normalize(_model: &mut Model<Self::Value, Self::Extension>) {}

    /// Combine a caller value with a locally derived one
    fn merge_attached(
        _given: Option<Self::Value>,
        local: Self::Value,
    ) -> Option<Self::Value> {
        Some(local)
    }
}

/// Mounted single-value input
pub struct Reconciler<K: InputKind> {
    id: WidgetId,
    default_model: Model<K::Value, K::Extension>,
    validators: ValidatorSet<K::Value, K::Extension>,
    value_state: Signal<ValueState<K::Value>>,
    setter: StateSetter<K::Value>,
    controlled: bool,
    properties: Properties<K::Value, K::Extension>,
}

impl<K: InputKind> Reconciler<K> {
    /// Mount an input and run its first render
    pub fn mount(ctx: &mut InputContext, props: &Props<K::Value, K::Extension>) -> Self {
        Self::mount_with(ctx, props, None)
    }

    /// Mount with an initial value taking precedence over every property
    pub fn mount_with(
        ctx: &mut InputContext,
        props: &Props<K::Value, K::Extension>,
        alternate: Option<Option<K::Value>>,
    ) -> Self {
        let id = ctx.register_widget(K::KIND);
        let default_model = K::default_model(ctx.config());
        let validators = K::validators();

        let initial = determine_initial_value(props, default_model.default.clone(), alternate);
        let state = ValueState::new(initial, default_model.state.clone());
        let value_state = ctx.runtime.create_signal(state.clone());

        let given = derive_missing_properties_from_state(props.clone(), &state);
        let options = ctx.view_defaults(K::REQUIRED_TEXT);
        let properties = consolidate::<K>(&default_model, &validators, &given, &options);

        let mut reconciler = Self {
            id,
            default_model,
            validators,
            value_state,
            setter: StateSetter::Real,
            controlled: false,
            properties,
        };
        reconciler.render(ctx, props);
        reconciler
    }

    /// Recompute the consolidated properties for new caller properties
    ///
    /// Local state is only written when it drifted from the rendered
    /// result, so rendering twice with the same properties is stable.
    pub fn render(
        &mut self,
        ctx: &mut InputContext,
        props: &Props<K::Value, K::Extension>,
    ) -> &Properties<K::Value, K::Extension> {
        let controlled = is_controlled(props, ctx.config().enforce_uncontrolled);
        let state = ctx.runtime.get(self.value_state).unwrap_or_else(|| {
            ValueState::new(
                self.properties.value.clone(),
                self.properties.model.state.clone(),
            )
        });

        let mut given = derive_missing_properties_from_state(props.clone(), &state);
        if state.attach_blob_property {
            if let Some(local) = state.value.clone() {
                let caller = given.fields.value.clone().flatten();
                given.fields.value = Some(K::merge_attached(caller, local));
            }
        }

        let options = ctx.view_defaults(K::REQUIRED_TEXT);
        let properties =
            consolidate::<K>(&self.default_model, &self.validators, &given, &options);

        let current = ValueState::new(properties.value.clone(), properties.model.state.clone());
        let needs_sync = state.attach_blob_property
            || (!controlled && state.value != current.value)
            || state.model_state != current.model_state;
        if needs_sync {
            tracing::trace!(id = ?self.id, kind = K::KIND, "synchronizing local state");
            ctx.runtime.set_rebuild(self.value_state, current.clone());
            ctx.mark_dirty(self.id);
        }

        if controlled != self.controlled {
            tracing::debug!(id = ?self.id, kind = K::KIND, controlled, "ownership mode changed");
        }
        self.controlled = controlled;
        self.setter = StateSetter::for_mode(controlled, current);
        self.properties = properties;
        ctx.note_render(self.id);

        &self.properties
    }

    /// Release the local state and unregister
    pub fn unmount(self, ctx: &mut InputContext) {
        ctx.runtime.dispose_signal(self.value_state);
        ctx.unregister_widget(self.id);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// Consolidated properties of the last render or handler
    pub fn properties(&self) -> &Properties<K::Value, K::Extension> {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut Properties<K::Value, K::Extension> {
        &mut self.properties
    }

    pub fn value(&self) -> Option<&K::Value> {
        self.properties.value.as_ref()
    }

    pub fn model_state(&self) -> &ModelState {
        &self.properties.model.state
    }

    /// Whether the caller owned the value during the last render
    pub fn is_controlled(&self) -> bool {
        self.controlled
    }

    /// Local state as persisted in the runtime
    pub fn local_state(&self, ctx: &InputContext) -> Option<ValueState<K::Value>> {
        ctx.runtime.get(self.value_state)
    }

    pub fn default_model(&self) -> &Model<K::Value, K::Extension> {
        &self.default_model
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

    /// Leave the input
    pub fn blur(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        let old = self.current_state(ctx);
        let mut model = self.properties.model.clone();
        let mut outbox = Outbox::new();

        let mut changed = false;
        if model.state.focused {
            model.state.focused = false;
            changed = true;
        }
        if !model.state.visited {
            model.state.visited = true;
            changed = true;
        }

        let working = if changed {
            outbox.push(EventKind::Change);
            outbox.push(EventKind::ChangeState);
            self.refresh(model, &old.model_state).0
        } else {
            self.properties.clone()
        };
        outbox.push(EventKind::Blur);

        self.finish(ctx, working, old.attach_blob_property, outbox, event);
    }

    /// Enter the input, touching it
    pub fn focus(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        let mut model = self.properties.model.clone();
        let mut outbox = Outbox::new();

        let mut changed = false;
        if !model.state.focused {
            model.state.focused = true;
            changed = true;
        }
        outbox.push(EventKind::Focus);

        self.touch_with(ctx, model, changed, outbox, event);
    }

    /// Click the input, touching it
    pub fn click(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        let model = self.properties.model.clone();
        let mut outbox = Outbox::new();
        outbox.push(EventKind::Click);

        self.touch_with(ctx, model, false, outbox, event);
    }

    /// Mark the input as touched
    pub fn touch(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        let model = self.properties.model.clone();
        self.touch_with(ctx, model, false, Outbox::new(), event);
    }

    fn touch_with(
        &mut self,
        ctx: &mut InputContext,
        mut model: Model<K::Value, K::Extension>,
        mut changed: bool,
        mut outbox: Outbox,
        event: Option<&InputEvent>,
    ) {
        let old = self.current_state(ctx);
        changed |= model.state.mark_touched();

        let working = if changed {
            outbox.push(EventKind::Change);
            outbox.push(EventKind::ChangeState);
            self.refresh(model, &old.model_state).0
        } else {
            self.properties.clone()
        };
        outbox.push(EventKind::Touch);

        self.finish(ctx, working, old.attach_blob_property, outbox, event);
    }

    /// Re-consolidate and notify `onChange` without changing anything
    pub fn change(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        let old = self.current_state(ctx);
        let (working, _) = self.refresh(self.properties.model.clone(), &old.model_state);
        let mut outbox = Outbox::new();
        outbox.push(EventKind::Change);

        self.finish(ctx, working, old.attach_blob_property, outbox, event);
    }

    /// Apply a new value entered by the user
    ///
    /// Ignored for disabled inputs. A value equal to the current one changes
    /// nothing and notifies nobody. Returns whether the value changed.
    pub fn change_value(
        &mut self,
        ctx: &mut InputContext,
        value: Option<K::Value>,
        event: Option<&InputEvent>,
    ) -> bool {
        self.change_value_with(ctx, value, event, false)
    }

    pub(crate) fn change_value_with(
        &mut self,
        ctx: &mut InputContext,
        value: Option<K::Value>,
        event: Option<&InputEvent>,
        attach_blob_property: bool,
    ) -> bool {
        if !self.properties.model.is_editable() {
            tracing::debug!(id = ?self.id, kind = K::KIND, "ignoring value change of disabled input");
            return false;
        }

        let old = self.current_state(ctx);
        let mut model = self.properties.model.clone();
        model.value = value;
        K::normalize(&mut model);
        if model.value == old.value {
            return false;
        }

        let state_changed = model.state.mark_dirty();
        let (working, validation_changed) = self.refresh(model, &old.model_state);

        let mut outbox = Outbox::new();
        outbox.push(EventKind::Change);
        outbox.push(EventKind::ChangeValue);
        if state_changed || validation_changed {
            outbox.push(EventKind::ChangeState);
        }

        self.finish(ctx, working, attach_blob_property, outbox, event);
        true
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn current_state(&self, ctx: &InputContext) -> ValueState<K::Value> {
        self.setter
            .current(&ctx.runtime, self.value_state)
            .unwrap_or_else(|| {
                ValueState::new(
                    self.properties.value.clone(),
                    self.properties.model.state.clone(),
                )
            })
    }

    /// Validate `model` against `current` and rebuild the view
    fn refresh(
        &self,
        model: Model<K::Value, K::Extension>,
        current: &ModelState,
    ) -> (Properties<K::Value, K::Extension>, bool) {
        let mut mapped = MappedProperties {
            model,
            options: self.properties.options(),
            callbacks: self.properties.callbacks.clone(),
        };
        K::normalize(&mut mapped.model);
        let changed = determine_validation_state(&mut mapped.model, current, &self.validators);
        (get_consolidated_properties(mapped), changed)
    }

    /// Queue callbacks, persist local state and adopt the settled view
    fn finish(
        &mut self,
        ctx: &mut InputContext,
        working: Properties<K::Value, K::Extension>,
        attach_blob_property: bool,
        outbox: Outbox,
        event: Option<&InputEvent>,
    ) {
        let queued = outbox.flush(&mut ctx.scheduler, &working, event);
        tracing::trace!(id = ?self.id, kind = K::KIND, queued, "handler settled");

        let next = ValueState {
            value: working.value.clone(),
            model_state: working.model.state.clone(),
            attach_blob_property,
        };
        if self.setter.apply(&mut ctx.runtime, self.value_state, next) {
            ctx.mark_dirty(self.id);
        }

        self.properties = if self.controlled {
            // The caller's value stays authoritative until it renders again.
            let mut model = working.model;
            model.value = self.properties.value.clone();
            let current = model.state.clone();
            self.refresh(model, &current).0
        } else {
            working
        };
    }
}

/// Map, normalize, validate and flatten caller properties
fn consolidate<K: InputKind>(
    default_model: &Model<K::Value, K::Extension>,
    validators: &ValidatorSet<K::Value, K::Extension>,
    props: &Props<K::Value, K::Extension>,
    options: &ViewOptions,
) -> Properties<K::Value, K::Extension> {
    let mut mapped = map_properties_into_model(props, default_model, options);
    K::normalize(&mut mapped.model);
    let current = mapped.model.state.clone();
    determine_validation_state(&mut mapped.model, &current, validators);
    get_consolidated_properties(mapped)
}
