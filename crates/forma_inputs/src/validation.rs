//! Validators and validation state
//!
//! A [`ValidatorSet`] maps validation flags to predicates over the model.
//! Every component starts from [`ValidatorSet::base`] (the required check)
//! and adds its own predicates; a predicate registered under an existing
//! key replaces the earlier one.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::error::{FormaError, Result};
use crate::model::{InputValue, Model, ModelExtension, ModelState, Pattern, ValidationKey, ValueType};

/// Predicate reporting `true` when the model's value is invalid
pub type Validator<T, X> = Box<dyn Fn(&Model<T, X>) -> bool>;

/// Validators keyed by the flag they set
pub struct ValidatorSet<T, X: ModelExtension> {
    validators: BTreeMap<ValidationKey, Validator<T, X>>,
}

impl<T: InputValue, X: ModelExtension> ValidatorSet<T, X> {
    /// Empty set
    pub fn new() -> Self {
        Self {
            validators: BTreeMap::new(),
        }
    }

    /// The required check shared by all inputs
    pub fn base() -> Self {
        Self::new().with(ValidationKey::Required, invalid_required::<T, X>)
    }

    /// Base set plus range, length and pattern checks
    pub fn text() -> Self {
        Self::base()
            .with(ValidationKey::Maximum, invalid_maximum::<T, X>)
            .with(ValidationKey::Minimum, invalid_minimum::<T, X>)
            .with(ValidationKey::MaximumLength, invalid_maximum_length::<T, X>)
            .with(ValidationKey::MinimumLength, invalid_minimum_length::<T, X>)
            .with(ValidationKey::Pattern, invalid_pattern::<T, X>)
            .with(ValidationKey::InvertedPattern, invalid_inverted_pattern::<T, X>)
    }

    /// Register a validator, replacing any validator for the same key
    pub fn with(mut self, key: ValidationKey, validator: impl Fn(&Model<T, X>) -> bool + 'static) -> Self {
        self.validators.insert(key, Box::new(validator));
        self
    }

    pub fn keys(&self) -> Vec<ValidationKey> {
        self.validators.keys().copied().collect()
    }

    /// Fresh model state tracking exactly the keys of this set
    pub fn initial_state(&self) -> ModelState {
        ModelState::with_validation_keys(&self.keys())
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl<T: InputValue, X: ModelExtension> Default for ValidatorSet<T, X> {
    fn default() -> Self {
        Self::base()
    }
}

impl<T, X: ModelExtension> fmt::Debug for ValidatorSet<T, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.validators.keys()).finish()
    }
}

/// Run every validator against `model` and store the flags in its state
///
/// Flags are compared to `current` to report whether any of them flipped.
/// `invalid` and `valid` are always re-derived from the flags.
pub fn determine_validation_state<T, X>(
    model: &mut Model<T, X>,
    current: &ModelState,
    validators: &ValidatorSet<T, X>,
) -> bool
where
    T: InputValue,
    X: ModelExtension,
{
    let mut changed = false;
    for (key, validator) in &validators.validators {
        let invalid = validator(model);
        if current.flag(*key) != invalid {
            changed = true;
        }
        model.state.set_flag(*key, invalid);
    }
    model.state.recompute_validity();

    if changed {
        tracing::debug!(
            name = %model.name,
            invalid = model.state.invalid,
            "validation state changed"
        );
    }

    changed
}

// =============================================================================
// Validators
// =============================================================================

/// Required and empty
///
/// Boolean models only need some boolean, other models a non-blank value.
pub fn invalid_required<T: InputValue, X>(model: &Model<T, X>) -> bool {
    if model.nullable {
        return false;
    }
    match model.value_type {
        ValueType::Boolean => model.value.as_ref().and_then(InputValue::as_bool).is_none(),
        _ => model.value.as_ref().map_or(true, InputValue::is_blank),
    }
}

pub fn invalid_maximum<T: InputValue, X>(model: &Model<T, X>) -> bool {
    model
        .value
        .as_ref()
        .and_then(InputValue::as_number)
        .map_or(false, |number| model.maximum < number)
}

pub fn invalid_minimum<T: InputValue, X>(model: &Model<T, X>) -> bool {
    model
        .value
        .as_ref()
        .and_then(InputValue::as_number)
        .map_or(false, |number| number < model.minimum)
}

pub fn invalid_maximum_length<T: InputValue, X>(model: &Model<T, X>) -> bool {
    model.maximum_length >= 0
        && text_length(model).map_or(false, |length| model.maximum_length < length)
}

pub fn invalid_minimum_length<T: InputValue, X>(model: &Model<T, X>) -> bool {
    text_length(model).map_or(false, |length| length < model.minimum_length)
}

pub fn invalid_pattern<T: InputValue, X>(model: &Model<T, X>) -> bool {
    match (&model.regular_expression_pattern, &model.value) {
        (Some(pattern), Some(value)) => value
            .pattern_text()
            .map_or(false, |text| !matches_all(pattern, &text)),
        _ => false,
    }
}

pub fn invalid_inverted_pattern<T: InputValue, X>(model: &Model<T, X>) -> bool {
    match (&model.inverted_regular_expression_pattern, &model.value) {
        (Some(pattern), Some(value)) => value
            .pattern_text()
            .map_or(false, |text| matches_any(pattern, &text)),
        _ => false,
    }
}

fn text_length<T: InputValue, X>(model: &Model<T, X>) -> Option<i64> {
    model
        .value
        .as_ref()
        .and_then(InputValue::as_str)
        .map(|text| text.chars().count() as i64)
}

// =============================================================================
// Patterns
// =============================================================================

thread_local! {
    static PATTERN_CACHE: RefCell<FxHashMap<String, Option<Regex>>> =
        RefCell::new(FxHashMap::default());
}

/// Compile a validation pattern
pub fn compile_pattern(expression: &str) -> Result<Regex> {
    Regex::new(expression).map_err(|error| FormaError::InvalidPattern {
        pattern: expression.to_string(),
        reason: error.to_string(),
    })
}

/// Test `text` against a cached expression
///
/// Returns `None` for expressions that fail to compile. Those are logged
/// once and treated as permissive by the validators.
pub fn pattern_matches(expression: &str, text: &str) -> Option<bool> {
    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        let compiled = cache.entry(expression.to_string()).or_insert_with(|| {
            compile_pattern(expression)
                .map_err(|error| tracing::warn!(%error, "ignoring malformed pattern"))
                .ok()
        });
        compiled.as_ref().map(|regex| regex.is_match(text))
    })
}

/// Every expression matches, malformed ones count as matching
pub fn matches_all(pattern: &Pattern, text: &str) -> bool {
    pattern
        .expressions()
        .all(|expression| pattern_matches(expression, text).unwrap_or(true))
}

/// Some expression matches, malformed ones count as not matching
pub fn matches_any(pattern: &Pattern, text: &str) -> bool {
    pattern
        .expressions()
        .any(|expression| pattern_matches(expression, text).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoExtension;

    fn text_model(value: Option<&str>) -> Model<String> {
        let mut model = Model::new(ValueType::String);
        model.value = value.map(str::to_string);
        model
    }

    #[test]
    fn test_required_only_when_not_nullable() {
        let mut model = text_model(None);
        assert!(!invalid_required(&model));

        model.nullable = false;
        assert!(invalid_required(&model));

        model.value = Some(String::new());
        assert!(invalid_required(&model));

        model.value = Some("x".to_string());
        assert!(!invalid_required(&model));
    }

    #[test]
    fn test_required_boolean_accepts_false() {
        let mut model: Model<bool> = Model::new(ValueType::Boolean);
        model.nullable = false;
        model.value = Some(false);
        assert!(!invalid_required(&model));

        model.value = None;
        assert!(invalid_required(&model));
    }

    #[test]
    fn test_required_number_accepts_zero() {
        let mut model: Model<f64> = Model::new(ValueType::Number);
        model.nullable = false;
        model.value = Some(0.0);
        assert!(!invalid_required(&model));
    }

    #[test]
    fn test_range() {
        let mut model: Model<f64> = Model::new(ValueType::Number);
        model.maximum = 10.0;
        model.minimum = 2.0;

        model.value = Some(11.0);
        assert!(invalid_maximum(&model));
        model.value = Some(1.0);
        assert!(invalid_minimum(&model));
        model.value = Some(10.0);
        assert!(!invalid_maximum(&model) && !invalid_minimum(&model));
    }

    #[test]
    fn test_length() {
        let mut model = text_model(Some("abcd"));
        assert!(!invalid_maximum_length(&model));

        model.maximum_length = 3;
        assert!(invalid_maximum_length(&model));

        model.minimum_length = 5;
        assert!(invalid_minimum_length(&model));

        model.value = None;
        assert!(!invalid_minimum_length(&model));
    }

    #[test]
    fn test_patterns() {
        let mut model = text_model(Some("abc"));
        model.regular_expression_pattern = Some(Pattern::Any(vec!["^a".into(), "c$".into()]));
        assert!(!invalid_pattern(&model));

        model.regular_expression_pattern = Some(Pattern::Any(vec!["^a".into(), "^b".into()]));
        assert!(invalid_pattern(&model));

        model.inverted_regular_expression_pattern = Some(Pattern::from("b"));
        assert!(invalid_inverted_pattern(&model));
    }

    #[test]
    fn test_malformed_pattern_is_permissive() {
        let mut model = text_model(Some("abc"));
        model.regular_expression_pattern = Some(Pattern::from("(unclosed"));
        model.inverted_regular_expression_pattern = Some(Pattern::from("[z-a]"));

        assert!(!invalid_pattern(&model));
        assert!(!invalid_inverted_pattern(&model));
        assert!(matches!(
            compile_pattern("(unclosed"),
            Err(FormaError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_determine_validation_state_reports_flips() {
        let validators: ValidatorSet<String, NoExtension> = ValidatorSet::text();
        let mut model = text_model(None);
        model.nullable = false;
        model.state = validators.initial_state();
        let current = model.state.clone();

        assert!(determine_validation_state(&mut model, &current, &validators));
        assert!(model.state.flag(ValidationKey::Required));
        assert!(model.state.invalid && !model.state.valid);

        let current = model.state.clone();
        assert!(!determine_validation_state(&mut model, &current, &validators));
    }

    #[test]
    fn test_same_key_replaces_validator() {
        let validators: ValidatorSet<bool, NoExtension> =
            ValidatorSet::base().with(ValidationKey::Required, |model: &Model<bool>| {
                !model.nullable && !model.value.unwrap_or(false)
            });
        assert_eq!(validators.len(), 1);

        let mut model: Model<bool> = Model::new(ValueType::Boolean);
        model.nullable = false;
        model.value = Some(false);
        let current = model.state.clone();

        assert!(determine_validation_state(&mut model, &current, &validators));
        assert!(model.state.invalid);
    }
}
