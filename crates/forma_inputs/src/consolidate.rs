//! Property to model mapping and consolidation
//!
//! Rendering an input runs two pure steps:
//!
//! 1. [`map_properties_into_model`] merges the caller's [`Props`] into a
//!    fresh copy of the component's default model, resolving aliases and
//!    top-level overrides.
//! 2. [`get_consolidated_properties`] flattens the model into the
//!    [`Properties`] view handed to callbacks.
//!
//! Consolidation is idempotent: converting the view back with
//! [`Properties::to_props`] and consolidating again yields the same view.

use serde::Serialize;

use crate::dispatch::Callbacks;
use crate::model::{
    InputValue, Model, ModelExtension, ModelState, NoExtension, Pattern, StateOverrides,
    ValueType,
};
use crate::props::{ModelFields, Props};
use crate::selection::SelectionOption;

/// Non-model options of an input
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewOptions {
    pub enforce_uncontrolled: bool,
    pub show_validation_state: bool,
    pub show_initial_validation_state: bool,
    pub required_text: Option<String>,
    pub representation: Option<String>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            enforce_uncontrolled: false,
            show_validation_state: true,
            show_initial_validation_state: false,
            required_text: None,
            representation: None,
        }
    }
}

/// Properties after merging into the model, before flattening
#[derive(Clone, Debug, PartialEq)]
pub struct MappedProperties<T, X: ModelExtension = NoExtension> {
    pub model: Model<T, X>,
    pub options: ViewOptions,
    pub callbacks: Callbacks<T, X>,
}

/// Merge caller properties into a copy of `default_model`
///
/// Precedence, lowest first: the default model, the nested `model`
/// property, the `disabled`/`required`/`pattern` aliases, model fields given
/// at the top level. State flags given at the top level win over
/// `model.state`. A value that is still not given afterwards falls back to
/// the model default.
pub fn map_properties_into_model<T, X>(
    props: &Props<T, X>,
    default_model: &Model<T, X>,
    default_options: &ViewOptions,
) -> MappedProperties<T, X>
where
    T: InputValue,
    X: ModelExtension,
{
    let mut model = default_model.clone();
    let labels = props.selection_labels.as_deref();
    let mut value_given = false;

    if let Some(nested) = &props.model {
        value_given |= nested.fields.apply_to(&mut model, labels);
        nested.state.apply_to(&mut model.state);
    }

    if props.disabled == Some(true) {
        model.mutable = false;
    }
    if props.required == Some(true) {
        model.nullable = false;
    }
    if let Some(pattern) = &props.pattern {
        model.regular_expression_pattern = Some(pattern.clone());
    }
    if let Some(pattern) = &props.inverted_pattern {
        model.inverted_regular_expression_pattern = Some(pattern.clone());
    }

    value_given |= props.fields.apply_to(&mut model, labels);
    props.state.apply_to(&mut model.state);

    if !value_given {
        model.value = model.default.clone();
    }

    let options = ViewOptions {
        enforce_uncontrolled: props
            .enforce_uncontrolled
            .unwrap_or(default_options.enforce_uncontrolled),
        show_validation_state: props
            .show_validation_state
            .unwrap_or(default_options.show_validation_state),
        show_initial_validation_state: props
            .show_initial_validation_state
            .unwrap_or(default_options.show_initial_validation_state),
        required_text: props
            .required_text
            .clone()
            .or_else(|| default_options.required_text.clone()),
        representation: props
            .representation
            .clone()
            .or_else(|| default_options.representation.clone()),
    };

    MappedProperties {
        model,
        options,
        callbacks: props.callbacks.clone(),
    }
}

// =============================================================================
// Consolidated View
// =============================================================================

/// Flattened view of an input handed to callbacks
///
/// Model fields and state flags appear at the top level. The `disabled` and
/// `required` aliases are derived from `mutable`/`writable` and `nullable`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties<T, X: ModelExtension = NoExtension> {
    pub declaration: String,
    pub description: String,
    pub name: String,
    pub default: Option<T>,
    pub value: Option<T>,
    pub empty_equals_null: bool,
    pub maximum: f64,
    pub minimum: f64,
    pub maximum_length: i64,
    pub minimum_length: i64,
    pub pattern: Option<Pattern>,
    pub inverted_pattern: Option<Pattern>,
    pub selection: Option<Vec<SelectionOption<T>>>,
    pub trim: bool,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub disabled: bool,
    pub required: bool,
    #[serde(flatten)]
    pub state: ModelState,
    #[serde(flatten)]
    pub extension: X,
    pub enforce_uncontrolled: bool,
    pub show_validation_state: bool,
    pub show_initial_validation_state: bool,
    pub required_text: Option<String>,
    pub representation: Option<String>,
    pub model: Model<T, X>,
    #[serde(skip)]
    pub callbacks: Callbacks<T, X>,
}

/// Flatten mapped properties into the consolidated view
pub fn get_consolidated_properties<T, X>(mapped: MappedProperties<T, X>) -> Properties<T, X>
where
    T: InputValue,
    X: ModelExtension,
{
    let MappedProperties {
        model,
        options,
        callbacks,
    } = mapped;

    Properties {
        declaration: model.declaration.clone(),
        description: model.description.clone(),
        name: model.name.clone(),
        default: model.default.clone(),
        value: model.value.clone(),
        empty_equals_null: model.empty_equals_null,
        maximum: model.maximum,
        minimum: model.minimum,
        maximum_length: model.maximum_length,
        minimum_length: model.minimum_length,
        pattern: model.regular_expression_pattern.clone(),
        inverted_pattern: model.inverted_regular_expression_pattern.clone(),
        selection: model.selection.clone(),
        trim: model.trim,
        value_type: model.value_type,
        disabled: !model.is_editable(),
        required: !model.nullable,
        state: model.state.clone(),
        extension: model.extension.clone(),
        enforce_uncontrolled: options.enforce_uncontrolled,
        show_validation_state: options.show_validation_state,
        show_initial_validation_state: options.show_initial_validation_state,
        required_text: options.required_text,
        representation: options.representation,
        model,
        callbacks,
    }
}

impl<T: InputValue, X: ModelExtension> Properties<T, X> {
    /// Split the view back into its mapped parts
    pub fn to_mapped(&self) -> MappedProperties<T, X> {
        MappedProperties {
            model: self.model.clone(),
            options: self.options(),
            callbacks: self.callbacks.clone(),
        }
    }

    pub fn options(&self) -> ViewOptions {
        ViewOptions {
            enforce_uncontrolled: self.enforce_uncontrolled,
            show_validation_state: self.show_validation_state,
            show_initial_validation_state: self.show_initial_validation_state,
            required_text: self.required_text.clone(),
            representation: self.representation.clone(),
        }
    }

    /// Raw properties reproducing this view when consolidated again
    pub fn to_props(&self) -> Props<T, X> {
        Props {
            fields: ModelFields::from_model(&self.model),
            state: StateOverrides::from_state(&self.model.state),
            model: None,
            initial_value: None,
            disabled: None,
            required: None,
            pattern: None,
            inverted_pattern: None,
            enforce_uncontrolled: Some(self.enforce_uncontrolled),
            show_validation_state: Some(self.show_validation_state),
            show_initial_validation_state: Some(self.show_initial_validation_state),
            required_text: self.required_text.clone(),
            representation: self.representation.clone(),
            selection_labels: None,
            callbacks: self.callbacks.clone(),
        }
    }

    /// Whether validation results should be presented to the user
    pub fn shows_validation_state(&self) -> bool {
        self.show_validation_state && (self.show_initial_validation_state || self.state.visited)
    }
}

/// Serializable snapshot of the view for persisting as state
///
/// Callbacks and the textual representation are left out.
pub fn slice_properties_for_state<T, X>(properties: &Properties<T, X>) -> serde_json::Value
where
    T: InputValue,
    X: ModelExtension,
{
    let mut value = serde_json::to_value(properties).unwrap_or(serde_json::Value::Null);
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("representation");
        if let Some(serde_json::Value::Object(model)) = map.get_mut("model") {
            model.remove("representation");
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationKey;

    fn default_model() -> Model<String> {
        Model::new(ValueType::String).name("title")
    }

    fn consolidate(props: &Props<String>) -> Properties<String> {
        get_consolidated_properties(map_properties_into_model(
            props,
            &default_model(),
            &ViewOptions::default(),
        ))
    }

    #[test]
    fn test_default_model_is_not_mutated() {
        let model = default_model();
        let props = Props::new().value(Some("x".to_string())).required(true);

        let _ = map_properties_into_model(&props, &model, &ViewOptions::default());
        assert_eq!(model, default_model());
    }

    #[test]
    fn test_value_falls_back_to_default() {
        let properties = consolidate(&Props::new().default_value(Some("d".to_string())));
        assert_eq!(properties.value.as_deref(), Some("d"));

        let null = consolidate(&Props::new().default_value(Some("d".to_string())).value(None));
        assert_eq!(null.value, None);
    }

    #[test]
    fn test_top_level_wins_over_model() {
        let mut props = Props::new().model_value(Some("nested".to_string()));
        props.fields.name = Some("top".to_string());
        props.model.as_mut().unwrap().fields.name = Some("nested".to_string());

        let properties = consolidate(&props);
        assert_eq!(properties.name, "top");
        assert_eq!(properties.value.as_deref(), Some("nested"));
    }

    #[test]
    fn test_aliases() {
        let properties = consolidate(&Props::new().disabled(true).required(true).pattern("^a"));

        assert!(properties.disabled);
        assert!(!properties.model.mutable);
        assert!(properties.required);
        assert!(!properties.model.nullable);
        assert_eq!(properties.pattern, Some(Pattern::from("^a")));
    }

    #[test]
    fn test_top_level_mutable_overrides_disabled_alias() {
        let mut props = Props::new().disabled(true);
        props.fields.mutable = Some(true);

        assert!(!consolidate(&props).disabled);
    }

    #[test]
    fn test_writable_false_disables() {
        let mut props = Props::<String>::new();
        props.fields.writable = Some(false);

        assert!(consolidate(&props).disabled);
    }

    #[test]
    fn test_state_copy_down() {
        let mut props = Props::<String>::new();
        props.state.focused = Some(true);
        props.state.validation.insert(ValidationKey::Pattern, true);

        let properties = consolidate(&props);
        assert!(properties.state.focused);
        assert!(properties.model.state.focused);
        assert!(properties.state.flag(ValidationKey::Pattern));
    }

    #[test]
    fn test_consolidation_is_idempotent() {
        let props = Props::new()
            .value(Some("abc".to_string()))
            .required(true)
            .maximum_length(5)
            .pattern("^a")
            .on_change(|_, _| {});
        let first = consolidate(&props);
        let second = consolidate(&first.to_props());

        assert_eq!(first, second);
    }

    #[test]
    fn test_slice_drops_representation() {
        let properties = consolidate(&Props::new().representation("abc"));
        let slice = slice_properties_for_state(&properties);

        assert!(slice.get("representation").is_none());
        assert_eq!(slice["name"], "title");
        assert_eq!(slice["pristine"], true);
    }

    #[test]
    fn test_shows_validation_state() {
        let mut properties = consolidate(&Props::new());
        assert!(!properties.shows_validation_state());

        properties.state.visited = true;
        assert!(properties.shows_validation_state());
    }
}
