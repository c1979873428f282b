//! Text input
//!
//! Edits a typed value through its textual representation. The value type
//! decides how text is parsed and formatted, see [`TextualValue`].

use std::marker::PhantomData;

use forma_core::Signal;

use crate::config::FormaConfig;
use crate::consolidate::Properties;
use crate::context::{InputContext, WidgetId};
use crate::dispatch::InputEvent;
use crate::model::{InputValue, Model, ModelState, NoExtension, ValueType};
use crate::props::Props;
use crate::reconciler::{InputKind, Reconciler};
use crate::selection::{get_label_of_selection, get_value_from_selection, SelectionOption};
use crate::validation::ValidatorSet;

/// A value a text input can parse and format
pub trait TextualValue: InputValue {
    const VALUE_TYPE: ValueType;

    /// Parse trimmed, non-empty text; `None` when it is not a valid value
    fn parse_text(text: &str) -> Option<Self>;

    fn format_text(&self) -> String;

    /// Selection used when the caller gives none
    fn default_selection() -> Option<Vec<SelectionOption<Self>>> {
        None
    }
}

impl TextualValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn parse_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }

    fn format_text(&self) -> String {
        self.clone()
    }
}

impl TextualValue for f64 {
    const VALUE_TYPE: ValueType = ValueType::Number;

    fn parse_text(text: &str) -> Option<Self> {
        text.replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|number| !number.is_nan())
    }

    fn format_text(&self) -> String {
        self.to_string()
    }
}

impl TextualValue for i64 {
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn parse_text(text: &str) -> Option<Self> {
        text.parse::<i64>().ok().or_else(|| {
            f64::parse_text(text)
                .filter(|number| number.is_finite())
                .map(|number| number.trunc() as i64)
        })
    }

    fn format_text(&self) -> String {
        self.to_string()
    }
}

impl TextualValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn parse_text(text: &str) -> Option<Self> {
        match text.to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        }
    }

    fn format_text(&self) -> String {
        self.to_string()
    }

    fn default_selection() -> Option<Vec<SelectionOption<Self>>> {
        Some(vec![
            SelectionOption::new("No", Some(false)),
            SelectionOption::new("Yes", Some(true)),
        ])
    }
}

/// [`InputKind`] of text inputs holding `T`
pub struct TextKind<T>(PhantomData<fn() -> T>);

impl<T: TextualValue> InputKind for TextKind<T> {
    type Value = T;
    type Extension = NoExtension;

    const KIND: &'static str = "text";

    fn validators() -> ValidatorSet<T, NoExtension> {
        ValidatorSet::text()
    }

    fn default_model(_config: &FormaConfig) -> Model<T> {
        let mut model = Model::new(T::VALUE_TYPE).state(Self::validators().initial_state());
        model.selection = T::default_selection();
        model
    }

    fn normalize(model: &mut Model<T>) {
        let empty = model
            .value
            .as_ref()
            .and_then(InputValue::as_str)
            .map_or(false, str::is_empty);
        if empty && model.empty_equals_null {
            model.value = None;
        }
    }
}

pub type TextProps<T> = Props<T>;
pub type TextProperties<T> = Properties<T>;

/// Mounted text input
pub struct TextInput<T: TextualValue> {
    inner: Reconciler<TextKind<T>>,
    /// Text as last typed by the user
    typed: Signal<Option<String>>,
    given_representation: Option<String>,
}

impl<T: TextualValue> TextInput<T> {
    pub fn new(ctx: &mut InputContext, props: &TextProps<T>) -> Self {
        Self::mount(ctx, props, None)
    }

    /// Mount with a value that wins over every given one
    pub fn with_value(ctx: &mut InputContext, props: &TextProps<T>, value: Option<T>) -> Self {
        Self::mount(ctx, props, Some(value))
    }

    fn mount(ctx: &mut InputContext, props: &TextProps<T>, alternate: Option<Option<T>>) -> Self {
        let typed = ctx.runtime.create_signal(None);
        let mut input = Self {
            inner: Reconciler::mount_with(ctx, props, alternate),
            typed,
            given_representation: props.representation.clone(),
        };
        input.update_representation(ctx);
        input
    }

    pub fn render(&mut self, ctx: &mut InputContext, props: &TextProps<T>) -> &TextProperties<T> {
        self.given_representation = props.representation.clone();
        self.inner.render(ctx, props);
        self.update_representation(ctx);
        self.inner.properties()
    }

    pub fn unmount(self, ctx: &mut InputContext) {
        ctx.runtime.dispose_signal(self.typed);
        self.inner.unmount(ctx);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> WidgetId {
        self.inner.id()
    }

    pub fn properties(&self) -> &TextProperties<T> {
        self.inner.properties()
    }

    pub fn value(&self) -> Option<&T> {
        self.inner.value()
    }

    pub fn model_state(&self) -> &ModelState {
        self.inner.model_state()
    }

    pub fn is_controlled(&self) -> bool {
        self.inner.is_controlled()
    }

    /// Text shown to the user
    pub fn representation(&self) -> &str {
        self.inner.properties().representation.as_deref().unwrap_or("")
    }

    // =========================================================================
    // Representation
    // =========================================================================

    /// Parse user text into a value
    ///
    /// Applies trimming and `emptyEqualsNull`, then looks the text up as a
    /// selection label before parsing it.
    pub fn parse_value(&self, text: &str) -> Option<T> {
        let model = &self.inner.properties().model;
        let text = if model.trim { text.trim() } else { text };
        if text.is_empty() {
            if model.empty_equals_null {
                return None;
            }
            return T::parse_text(text);
        }

        if let Some(selection) = &model.selection {
            if let Some(option) = get_value_from_selection(text, selection) {
                return option.value.clone();
            }
        }
        T::parse_text(text)
    }

    /// Text for a value: its selection label or its formatted form
    pub fn format_value(&self, value: Option<&T>) -> String {
        let Some(value) = value else {
            return String::new();
        };
        self.inner
            .properties()
            .model
            .selection
            .as_deref()
            .and_then(|selection| get_label_of_selection(Some(value), selection))
            .map(str::to_string)
            .unwrap_or_else(|| value.format_text())
    }

    fn update_representation(&mut self, ctx: &InputContext) {
        let representation = match &self.given_representation {
            Some(given) => given.clone(),
            None => {
                let typed = ctx.runtime.get(self.typed).flatten();
                match typed {
                    Some(typed) if self.parse_value(&typed).as_ref() == self.value() => typed,
                    _ => self.format_value(self.value()),
                }
            }
        };
        self.inner.properties_mut().representation = Some(representation);
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

    /// Handle text typed by the user
    ///
    /// Returns whether the value changed.
    pub fn input(&mut self, ctx: &mut InputContext, text: &str, event: Option<&InputEvent>) -> bool {
        if !self.inner.properties().model.is_editable() {
            return false;
        }
        ctx.runtime.set_rebuild(self.typed, Some(text.to_string()));

        let value = self.parse_value(text);
        let changed = self.inner.change_value(ctx, value, event);
        self.update_representation(ctx);
        changed
    }

    /// Set a value directly
    pub fn change_value(
        &mut self,
        ctx: &mut InputContext,
        value: Option<T>,
        event: Option<&InputEvent>,
    ) -> bool {
        let changed = self.inner.change_value(ctx, value, event);
        if changed {
            ctx.runtime.set(self.typed, None);
        }
        self.update_representation(ctx);
        changed
    }

    /// Leave the input, replacing typed text by the formatted value
    pub fn blur(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        ctx.runtime.set(self.typed, None);
        self.inner.blur(ctx, event);
        self.update_representation(ctx);
    }

    pub fn focus(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        self.inner.focus(ctx, event);
        self.update_representation(ctx);
    }

    pub fn click(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        self.inner.click(ctx, event);
        self.update_representation(ctx);
    }

    pub fn touch(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        self.inner.touch(ctx, event);
        self.update_representation(ctx);
    }

    pub fn change(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        self.inner.change(ctx, event);
        self.update_representation(ctx);
    }
}
