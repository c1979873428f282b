//! Models and model state
//!
//! A [`Model`] is the declarative description of one input: its name, value,
//! default, constraints and current [`ModelState`]. Every component starts
//! from an immutable default model and merges caller properties into a fresh
//! copy on each render.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::selection::SelectionOption;

/// Name given to models that never received one
pub const NO_NAME_DEFINED: &str = "NO_NAME_DEFINED";

// =============================================================================
// Values
// =============================================================================

/// A value an input can hold
///
/// Absence of a value (`null`) is modelled as `None` around the value type,
/// so implementors only describe concrete values.
pub trait InputValue:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static
{
    /// Whether the value counts as "nothing entered" for required checks
    fn is_blank(&self) -> bool {
        false
    }

    /// Numeric view used by range validation
    fn as_number(&self) -> Option<f64> {
        None
    }

    /// String view used by length validation
    fn as_str(&self) -> Option<&str> {
        None
    }

    fn as_bool(&self) -> Option<bool> {
        None
    }

    /// Text tested against regular expression patterns
    fn pattern_text(&self) -> Option<Cow<'_, str>> {
        self.as_str().map(Cow::Borrowed)
    }
}

impl InputValue for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }

    fn as_str(&self) -> Option<&str> {
        Some(self)
    }
}

impl InputValue for f64 {
    fn is_blank(&self) -> bool {
        self.is_nan()
    }

    fn as_number(&self) -> Option<f64> {
        Some(*self)
    }

    fn pattern_text(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(self.to_string()))
    }
}

impl InputValue for i64 {
    fn as_number(&self) -> Option<f64> {
        Some(*self as f64)
    }

    fn pattern_text(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(self.to_string()))
    }
}

impl InputValue for bool {
    fn is_blank(&self) -> bool {
        !*self
    }

    fn as_bool(&self) -> Option<bool> {
        Some(*self)
    }

    fn pattern_text(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(if *self { "true" } else { "false" }))
    }
}

/// Declared type of a model value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    #[serde(alias = "text")]
    String,
    Number,
    Integer,
    Boolean,
    File,
    List,
    Interval,
}

/// One regular expression or a list of them
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Single(String),
    Any(Vec<String>),
}

impl Pattern {
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Pattern::Single(expression) => std::slice::from_ref(expression),
            Pattern::Any(expressions) => expressions,
        };
        slice.iter().map(String::as_str)
    }
}

impl From<&str> for Pattern {
    fn from(expression: &str) -> Self {
        Pattern::Single(expression.to_string())
    }
}

impl From<String> for Pattern {
    fn from(expression: String) -> Self {
        Pattern::Single(expression)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Single(expression) => f.write_str(expression),
            Pattern::Any(expressions) => f.write_str(&expressions.join(", ")),
        }
    }
}

// =============================================================================
// Model State
// =============================================================================

/// Named validation flags
///
/// A flag set to `true` means the corresponding validator reported the
/// current value as invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationKey {
    #[serde(rename = "invalidRequired")]
    Required,
    #[serde(rename = "invalidMaximum")]
    Maximum,
    #[serde(rename = "invalidMinimum")]
    Minimum,
    #[serde(rename = "invalidMaximumLength")]
    MaximumLength,
    #[serde(rename = "invalidMinimumLength")]
    MinimumLength,
    #[serde(rename = "invalidPattern")]
    Pattern,
    #[serde(rename = "invalidInvertedPattern")]
    InvertedPattern,
    #[serde(rename = "invalidMaximumSize")]
    MaximumSize,
    #[serde(rename = "invalidMinimumSize")]
    MinimumSize,
    #[serde(rename = "invalidContentTypePattern")]
    ContentTypePattern,
    #[serde(rename = "invalidInvertedContentTypePattern")]
    InvertedContentTypePattern,
    #[serde(rename = "invalidName")]
    Name,
    #[serde(rename = "invalidMaximumNumber")]
    MaximumNumber,
    #[serde(rename = "invalidMinimumNumber")]
    MinimumNumber,
}

impl ValidationKey {
    pub const ALL: [ValidationKey; 14] = [
        ValidationKey::Required,
        ValidationKey::Maximum,
        ValidationKey::Minimum,
        ValidationKey::MaximumLength,
        ValidationKey::MinimumLength,
        ValidationKey::Pattern,
        ValidationKey::InvertedPattern,
        ValidationKey::MaximumSize,
        ValidationKey::MinimumSize,
        ValidationKey::ContentTypePattern,
        ValidationKey::InvertedContentTypePattern,
        ValidationKey::Name,
        ValidationKey::MaximumNumber,
        ValidationKey::MinimumNumber,
    ];

    /// Look up a flag by its wire name (`invalidRequired`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValidationKey::Required => "invalidRequired",
            ValidationKey::Maximum => "invalidMaximum",
            ValidationKey::Minimum => "invalidMinimum",
            ValidationKey::MaximumLength => "invalidMaximumLength",
            ValidationKey::MinimumLength => "invalidMinimumLength",
            ValidationKey::Pattern => "invalidPattern",
            ValidationKey::InvertedPattern => "invalidInvertedPattern",
            ValidationKey::MaximumSize => "invalidMaximumSize",
            ValidationKey::MinimumSize => "invalidMinimumSize",
            ValidationKey::ContentTypePattern => "invalidContentTypePattern",
            ValidationKey::InvertedContentTypePattern => "invalidInvertedContentTypePattern",
            ValidationKey::Name => "invalidName",
            ValidationKey::MaximumNumber => "invalidMaximumNumber",
            ValidationKey::MinimumNumber => "invalidMinimumNumber",
        }
    }
}

impl fmt::Display for ValidationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interaction and validity flags of one input
///
/// `dirty`/`pristine` and `touched`/`untouched` are always complements and
/// only ever move from the pristine/untouched side to the other.
/// `invalid` is the OR of all validation flags and `valid` its complement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelState {
    pub dirty: bool,
    pub pristine: bool,
    pub touched: bool,
    pub untouched: bool,
    pub focused: bool,
    pub visited: bool,
    pub invalid: bool,
    pub valid: bool,
    #[serde(flatten)]
    pub validation: BTreeMap<ValidationKey, bool>,
}

impl Default for ModelState {
    fn default() -> Self {
        Self::with_validation_keys(&[ValidationKey::Required])
    }
}

impl ModelState {
    /// Fresh state tracking the given validation flags, all passing
    pub fn with_validation_keys(keys: &[ValidationKey]) -> Self {
        Self {
            dirty: false,
            pristine: true,
            touched: false,
            untouched: true,
            focused: false,
            visited: false,
            invalid: false,
            valid: true,
            validation: keys.iter().map(|key| (*key, false)).collect(),
        }
    }

    /// Value of a validation flag, untracked flags read as passing
    pub fn flag(&self, key: ValidationKey) -> bool {
        self.validation.get(&key).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, key: ValidationKey, invalid: bool) {
        self.validation.insert(key, invalid);
    }

    /// Derive `invalid` and `valid` from the validation flags
    pub fn recompute_validity(&mut self) {
        self.invalid = self.validation.values().any(|invalid| *invalid);
        self.valid = !self.invalid;
    }

    /// Move from pristine to dirty, returns whether anything changed
    pub fn mark_dirty(&mut self) -> bool {
        if self.dirty && !self.pristine {
            return false;
        }
        self.dirty = true;
        self.pristine = false;
        true
    }

    /// Move from untouched to touched, returns whether anything changed
    pub fn mark_touched(&mut self) -> bool {
        if self.touched && !self.untouched {
            return false;
        }
        self.touched = true;
        self.untouched = false;
        true
    }

    /// Active validation flags in key order
    pub fn active_flags(&self) -> impl Iterator<Item = ValidationKey> + '_ {
        self.validation
            .iter()
            .filter(|(_, invalid)| **invalid)
            .map(|(key, _)| *key)
    }
}

/// Partial model state supplied by a caller
///
/// Set fields replace the corresponding state flag, unset fields leave it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pristine: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touched: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub untouched: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visited: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    /// Validation flags given next to the other state flags
    #[serde(flatten, deserialize_with = "validation_flags")]
    pub validation: BTreeMap<ValidationKey, bool>,
}

/// Keep the entries naming a validation flag with a boolean value
///
/// A flattened map sees every key its parent left over, including model
/// fields given at the same level, so anything else is skipped.
fn validation_flags<'de, D>(deserializer: D) -> Result<BTreeMap<ValidationKey, bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Flag(bool),
        Other(serde::de::IgnoredAny),
    }

    let entries = BTreeMap::<String, Entry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|(name, entry)| match entry {
            Entry::Flag(invalid) => ValidationKey::from_name(&name).map(|key| (key, invalid)),
            Entry::Other(_) => None,
        })
        .collect())
}

impl StateOverrides {
    /// Overrides that reproduce `state` exactly
    pub fn from_state(state: &ModelState) -> Self {
        Self {
            dirty: Some(state.dirty),
            pristine: Some(state.pristine),
            touched: Some(state.touched),
            untouched: Some(state.untouched),
            focused: Some(state.focused),
            visited: Some(state.visited),
            invalid: Some(state.invalid),
            valid: Some(state.valid),
            validation: state.validation.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, state: &mut ModelState) {
        let flags = [
            (self.dirty, &mut state.dirty),
            (self.pristine, &mut state.pristine),
            (self.touched, &mut state.touched),
            (self.untouched, &mut state.untouched),
            (self.focused, &mut state.focused),
            (self.visited, &mut state.visited),
            (self.invalid, &mut state.invalid),
            (self.valid, &mut state.valid),
        ];
        for (given, flag) in flags {
            if let Some(given) = given {
                *flag = given;
            }
        }
        for (key, invalid) in &self.validation {
            state.set_flag(*key, *invalid);
        }
    }

    /// Fill every unset flag from `state`, keeping flags already given
    pub fn fill_missing_from(&mut self, state: &ModelState) {
        let flags = [
            (&mut self.dirty, state.dirty),
            (&mut self.pristine, state.pristine),
            (&mut self.touched, state.touched),
            (&mut self.untouched, state.untouched),
            (&mut self.focused, state.focused),
            (&mut self.visited, state.visited),
            (&mut self.invalid, state.invalid),
            (&mut self.valid, state.valid),
        ];
        for (given, current) in flags {
            given.get_or_insert(current);
        }
        for (key, invalid) in &state.validation {
            self.validation.entry(*key).or_insert(*invalid);
        }
    }
}

// =============================================================================
// Model Extensions
// =============================================================================

/// Component specific model fields
///
/// Extensions are flattened into the model and can be overridden from the
/// caller's properties the same way as the common model fields.
pub trait ModelExtension:
    Clone + fmt::Debug + PartialEq + Default + Serialize + 'static
{
    /// Partial form of the extension as supplied by callers
    type Overrides: Clone + fmt::Debug + Default + PartialEq + DeserializeOwned + 'static;

    fn apply(&mut self, overrides: &Self::Overrides);

    /// Overrides that reproduce this extension exactly
    fn to_overrides(&self) -> Self::Overrides;
}

/// Extension for models without component specific fields
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoExtension {}

impl ModelExtension for NoExtension {
    type Overrides = NoExtension;

    fn apply(&mut self, _overrides: &Self::Overrides) {}

    fn to_overrides(&self) -> Self::Overrides {
        NoExtension {}
    }
}

// =============================================================================
// Model
// =============================================================================

/// Full description of one input
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model<T, X = NoExtension> {
    pub declaration: String,
    pub description: String,
    pub name: String,
    pub default: Option<T>,
    pub value: Option<T>,
    /// Treat an empty text as `null`
    pub empty_equals_null: bool,
    pub maximum: f64,
    pub minimum: f64,
    /// Maximum text length, negative means unlimited
    pub maximum_length: i64,
    pub minimum_length: i64,
    pub mutable: bool,
    pub writable: bool,
    pub nullable: bool,
    pub regular_expression_pattern: Option<Pattern>,
    pub inverted_regular_expression_pattern: Option<Pattern>,
    pub selection: Option<Vec<SelectionOption<T>>>,
    pub trim: bool,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub state: ModelState,
    #[serde(flatten)]
    pub extension: X,
}

impl<T: InputValue, X: ModelExtension> Model<T, X> {
    /// Default model for a value type
    pub fn new(value_type: ValueType) -> Self {
        Self {
            declaration: String::new(),
            description: String::new(),
            name: NO_NAME_DEFINED.to_string(),
            default: None,
            value: None,
            empty_equals_null: true,
            maximum: f64::INFINITY,
            minimum: f64::NEG_INFINITY,
            maximum_length: -1,
            minimum_length: 0,
            mutable: true,
            writable: true,
            nullable: true,
            regular_expression_pattern: None,
            inverted_regular_expression_pattern: None,
            selection: None,
            trim: true,
            value_type,
            state: ModelState::default(),
            extension: X::default(),
        }
    }

    /// Set the model name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the default value
    pub fn default_value(mut self, default: Option<T>) -> Self {
        self.default = default;
        self
    }

    /// Set the initial model state
    pub fn state(mut self, state: ModelState) -> Self {
        self.state = state;
        self
    }

    /// Set the component extension
    pub fn extension(mut self, extension: X) -> Self {
        self.extension = extension;
        self
    }

    /// Whether the user can change the value
    pub fn is_editable(&self) -> bool {
        self.mutable && self.writable
    }
}
