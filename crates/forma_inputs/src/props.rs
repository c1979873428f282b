//! Caller supplied properties
//!
//! [`Props`] is the raw input of a component. Every field is optional so a
//! component can tell "not given" apart from an explicit value. For values,
//! `None` means absent while `Some(None)` is an explicit `null`.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::consolidate::Properties;
use crate::dispatch::{Callbacks, InputEvent};
use crate::model::{
    InputValue, Model, ModelExtension, ModelState, NoExtension, Pattern, StateOverrides,
    ValueType,
};
use crate::selection::{normalize_selection, SelectionInput};

/// Deserialize a field that distinguishes absent from `null`
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Model Fields
// =============================================================================

/// Partial model fields
///
/// Used both for the nested `model` property and for model fields given
/// directly at the top level of the properties.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(
    default,
    rename_all = "camelCase",
    bound(deserialize = "T: InputValue, X: ModelExtension")
)]
pub struct ModelFields<T, X: ModelExtension = NoExtension> {
    pub declaration: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Option<T>>,
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Option<T>>,
    pub empty_equals_null: Option<bool>,
    pub maximum: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum_length: Option<i64>,
    pub minimum_length: Option<i64>,
    pub mutable: Option<bool>,
    pub writable: Option<bool>,
    pub nullable: Option<bool>,
    pub regular_expression_pattern: Option<Pattern>,
    pub inverted_regular_expression_pattern: Option<Pattern>,
    pub selection: Option<SelectionInput<T>>,
    pub trim: Option<bool>,
    #[serde(rename = "type")]
    pub value_type: Option<ValueType>,
    #[serde(flatten)]
    pub extension: X::Overrides,
}

impl<T, X: ModelExtension> Default for ModelFields<T, X> {
    fn default() -> Self {
        Self {
            declaration: None,
            description: None,
            name: None,
            default: None,
            value: None,
            empty_equals_null: None,
            maximum: None,
            minimum: None,
            maximum_length: None,
            minimum_length: None,
            mutable: None,
            writable: None,
            nullable: None,
            regular_expression_pattern: None,
            inverted_regular_expression_pattern: None,
            selection: None,
            trim: None,
            value_type: None,
            extension: X::Overrides::default(),
        }
    }
}

impl<T: InputValue, X: ModelExtension> ModelFields<T, X> {
    /// Fields reproducing `model` exactly, state excluded
    pub fn from_model(model: &Model<T, X>) -> Self {
        Self {
            declaration: Some(model.declaration.clone()),
            description: Some(model.description.clone()),
            name: Some(model.name.clone()),
            default: Some(model.default.clone()),
            value: Some(model.value.clone()),
            empty_equals_null: Some(model.empty_equals_null),
            maximum: Some(model.maximum),
            minimum: Some(model.minimum),
            maximum_length: Some(model.maximum_length),
            minimum_length: Some(model.minimum_length),
            mutable: Some(model.mutable),
            writable: Some(model.writable),
            nullable: Some(model.nullable),
            regular_expression_pattern: model.regular_expression_pattern.clone(),
            inverted_regular_expression_pattern: model
                .inverted_regular_expression_pattern
                .clone(),
            selection: model.selection.clone().map(SelectionInput::Options),
            trim: Some(model.trim),
            value_type: Some(model.value_type),
            extension: model.extension.to_overrides(),
        }
    }

    /// Copy every given field onto `model`
    ///
    /// Returns whether a value (possibly `null`) was given.
    pub fn apply_to(&self, model: &mut Model<T, X>, selection_labels: Option<&[String]>) -> bool {
        if let Some(declaration) = &self.declaration {
            model.declaration = declaration.clone();
        }
        if let Some(description) = &self.description {
            model.description = description.clone();
        }
        if let Some(name) = &self.name {
            model.name = name.clone();
        }
        if let Some(default) = &self.default {
            model.default = default.clone();
        }
        if let Some(value) = &self.value {
            model.value = value.clone();
        }
        if let Some(empty_equals_null) = self.empty_equals_null {
            model.empty_equals_null = empty_equals_null;
        }
        if let Some(maximum) = self.maximum {
            model.maximum = maximum;
        }
        if let Some(minimum) = self.minimum {
            model.minimum = minimum;
        }
        if let Some(maximum_length) = self.maximum_length {
            model.maximum_length = maximum_length;
        }
        if let Some(minimum_length) = self.minimum_length {
            model.minimum_length = minimum_length;
        }
        if let Some(mutable) = self.mutable {
            model.mutable = mutable;
        }
        if let Some(writable) = self.writable {
            model.writable = writable;
        }
        if let Some(nullable) = self.nullable {
            model.nullable = nullable;
        }
        if let Some(pattern) = &self.regular_expression_pattern {
            model.regular_expression_pattern = Some(pattern.clone());
        }
        if let Some(pattern) = &self.inverted_regular_expression_pattern {
            model.inverted_regular_expression_pattern = Some(pattern.clone());
        }
        if let Some(selection) = &self.selection {
            model.selection = Some(normalize_selection(selection, selection_labels));
        }
        if let Some(trim) = self.trim {
            model.trim = trim;
        }
        if let Some(value_type) = self.value_type {
            model.value_type = value_type;
        }
        model.extension.apply(&self.extension);

        self.value.is_some()
    }
}

/// The nested `model` property: model fields plus a partial state
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(
    default,
    rename_all = "camelCase",
    bound(deserialize = "T: InputValue, X: ModelExtension")
)]
pub struct ModelOverrides<T, X: ModelExtension = NoExtension> {
    #[serde(flatten)]
    pub fields: ModelFields<T, X>,
    pub state: StateOverrides,
}

impl<T, X: ModelExtension> Default for ModelOverrides<T, X> {
    fn default() -> Self {
        Self {
            fields: ModelFields::default(),
            state: StateOverrides::default(),
        }
    }
}

// =============================================================================
// Props
// =============================================================================

/// Raw properties of an input component
#[derive(Clone, Deserialize)]
#[serde(
    default,
    rename_all = "camelCase",
    bound(deserialize = "T: InputValue, X: ModelExtension")
)]
pub struct Props<T, X: ModelExtension = NoExtension> {
    /// Model fields given at the top level, they win over `model`
    #[serde(flatten)]
    pub fields: ModelFields<T, X>,
    /// State flags given at the top level, they win over `model.state`
    #[serde(flatten)]
    pub state: StateOverrides,
    pub model: Option<ModelOverrides<T, X>>,
    #[serde(default, deserialize_with = "present")]
    pub initial_value: Option<Option<T>>,
    /// Alias for `mutable = false`
    pub disabled: Option<bool>,
    /// Alias for `nullable = false`
    pub required: Option<bool>,
    /// Alias for `model.regularExpressionPattern`
    pub pattern: Option<Pattern>,
    /// Alias for `model.invertedRegularExpressionPattern`
    pub inverted_pattern: Option<Pattern>,
    pub enforce_uncontrolled: Option<bool>,
    pub show_validation_state: Option<bool>,
    pub show_initial_validation_state: Option<bool>,
    pub required_text: Option<String>,
    /// Textual representation of the value, maintained by text inputs
    pub representation: Option<String>,
    /// Labels replacing selection labels by position
    pub selection_labels: Option<Vec<String>>,
    #[serde(skip)]
    pub callbacks: Callbacks<T, X>,
}

impl<T, X: ModelExtension> Default for Props<T, X> {
    fn default() -> Self {
        Self {
            fields: ModelFields::default(),
            state: StateOverrides::default(),
            model: None,
            initial_value: None,
            disabled: None,
            required: None,
            pattern: None,
            inverted_pattern: None,
            enforce_uncontrolled: None,
            show_validation_state: None,
            show_initial_validation_state: None,
            required_text: None,
            representation: None,
            selection_labels: None,
            callbacks: Callbacks::default(),
        }
    }
}

impl<T: fmt::Debug, X: ModelExtension> fmt::Debug for Props<T, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("fields", &self.fields)
            .field("state", &self.state)
            .field("model", &self.model)
            .field("initial_value", &self.initial_value)
            .field("disabled", &self.disabled)
            .field("required", &self.required)
            .field("enforce_uncontrolled", &self.enforce_uncontrolled)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

impl<T: InputValue, X: ModelExtension> Props<T, X> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value given at the top level
    pub fn value(mut self, value: Option<T>) -> Self {
        self.fields.value = Some(value);
        self
    }

    /// Value given through the nested model
    pub fn model_value(mut self, value: Option<T>) -> Self {
        self.model.get_or_insert_with(ModelOverrides::default).fields.value = Some(value);
        self
    }

    pub fn initial_value(mut self, value: Option<T>) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn default_value(mut self, default: Option<T>) -> Self {
        self.fields.default = Some(default);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.fields.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.fields.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn inverted_pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.inverted_pattern = Some(pattern.into());
        self
    }

    pub fn maximum(mut self, maximum: f64) -> Self {
        self.fields.maximum = Some(maximum);
        self
    }

    pub fn minimum(mut self, minimum: f64) -> Self {
        self.fields.minimum = Some(minimum);
        self
    }

    pub fn maximum_length(mut self, maximum_length: i64) -> Self {
        self.fields.maximum_length = Some(maximum_length);
        self
    }

    pub fn minimum_length(mut self, minimum_length: i64) -> Self {
        self.fields.minimum_length = Some(minimum_length);
        self
    }

    pub fn selection(mut self, selection: SelectionInput<T>) -> Self {
        self.fields.selection = Some(selection);
        self
    }

    pub fn representation(mut self, representation: impl Into<String>) -> Self {
        self.representation = Some(representation.into());
        self
    }

    pub fn enforce_uncontrolled(mut self, enforce: bool) -> Self {
        self.enforce_uncontrolled = Some(enforce);
        self
    }

    pub fn show_initial_validation_state(mut self, show: bool) -> Self {
        self.show_initial_validation_state = Some(show);
        self
    }

    /// Set component specific model fields
    pub fn extension(mut self, extension: X::Overrides) -> Self {
        self.fields.extension = extension;
        self
    }

    pub fn on_blur(
        mut self,
        callback: impl Fn(Option<&InputEvent>, &Properties<T, X>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_blur = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_change(
        mut self,
        callback: impl Fn(&Properties<T, X>, Option<&InputEvent>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_change = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_change_state(
        mut self,
        callback: impl Fn(&ModelState, Option<&InputEvent>, &Properties<T, X>)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.callbacks.on_change_state = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_change_value(
        mut self,
        callback: impl Fn(Option<&T>, Option<&InputEvent>, &Properties<T, X>)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.callbacks.on_change_value = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_click(
        mut self,
        callback: impl Fn(Option<&InputEvent>, &Properties<T, X>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_click = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_focus(
        mut self,
        callback: impl Fn(Option<&InputEvent>, &Properties<T, X>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_focus = Some(std::sync::Arc::new(callback));
        self
    }

    pub fn on_touch(
        mut self,
        callback: impl Fn(Option<&InputEvent>, &Properties<T, X>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_touch = Some(std::sync::Arc::new(callback));
        self
    }

    /// Whether a value was given at the top level or through the model
    pub fn has_explicit_value(&self) -> bool {
        self.fields.value.is_some()
            || self
                .model
                .as_ref()
                .map_or(false, |model| model.fields.value.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationKey;
    use std::collections::BTreeMap;

    #[test]
    fn test_absent_and_null_values() {
        let absent: Props<String> = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.fields.value, None);
        assert!(!absent.has_explicit_value());

        let null: Props<String> = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert_eq!(null.fields.value, Some(None));
        assert!(null.has_explicit_value());

        let given: Props<String> = serde_json::from_str(r#"{"value": "a"}"#).unwrap();
        assert_eq!(given.fields.value, Some(Some("a".to_string())));
    }

    #[test]
    fn test_deserialize_nested_model_and_flags() {
        let props: Props<f64> = serde_json::from_str(
            r#"{
                "name": "age",
                "required": true,
                "dirty": true,
                "model": {"maximum": 120, "state": {"focused": true}}
            }"#,
        )
        .unwrap();

        assert_eq!(props.fields.name.as_deref(), Some("age"));
        assert_eq!(props.required, Some(true));
        assert_eq!(props.state.dirty, Some(true));
        let model = props.model.unwrap();
        assert_eq!(model.fields.maximum, Some(120.0));
        assert_eq!(model.state.focused, Some(true));
    }

    #[test]
    fn test_deserialize_top_level_validation_flags() {
        let props: Props<String> = toml::from_str(
            r#"
                name = "title"
                maximumLength = 3
                invalidRequired = true
                touched = true

                [model.state]
                invalidPattern = false
            "#,
        )
        .unwrap();

        assert_eq!(props.fields.maximum_length, Some(3));
        assert_eq!(props.state.touched, Some(true));
        assert_eq!(
            props.state.validation,
            BTreeMap::from([(ValidationKey::Required, true)])
        );
        let model = props.model.unwrap();
        assert_eq!(
            model.state.validation,
            BTreeMap::from([(ValidationKey::Pattern, false)])
        );
    }

    #[test]
    fn test_model_fields_roundtrip_through_model() {
        let mut model: Model<String> = Model::new(ValueType::String).name("title");
        model.value = Some("x".to_string());
        model.maximum_length = 3;

        let mut copy: Model<String> = Model::new(ValueType::String);
        let value_given = ModelFields::from_model(&model).apply_to(&mut copy, None);

        assert!(value_given);
        assert_eq!(copy, model);
    }

    #[test]
    fn test_builder() {
        let props: Props<String> = Props::new()
            .model_value(Some("a".to_string()))
            .required(true)
            .on_change(|_, _| {});

        assert!(props.has_explicit_value());
        assert!(props.callbacks.on_change.is_some());
        assert!(props.callbacks.on_change_value.is_none());
    }
}
