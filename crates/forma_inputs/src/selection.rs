//! Selection option normalization
//!
//! Callers describe the allowed values of an input in several shapes; all of
//! them are normalized into an ordered list of [`SelectionOption`]s.

use serde::{Deserialize, Serialize};

use crate::model::InputValue;

/// One selectable value with its display label
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionOption<T> {
    pub label: String,
    pub value: Option<T>,
}

impl<T> SelectionOption<T> {
    pub fn new(label: impl Into<String>, value: Option<T>) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Selection as supplied by a caller
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SelectionInput<T> {
    /// `[value, label]` pairs
    Pairs(Vec<(T, String)>),
    /// Fully described options
    Options(Vec<SelectionOption<T>>),
    /// Plain values, labelled by their text
    Values(Vec<T>),
}

/// Normalize a caller selection into labelled options
///
/// `labels` replaces option labels by position.
pub fn normalize_selection<T: InputValue>(
    selection: &SelectionInput<T>,
    labels: Option<&[String]>,
) -> Vec<SelectionOption<T>> {
    let mut options: Vec<SelectionOption<T>> = match selection {
        SelectionInput::Options(options) => options.clone(),
        SelectionInput::Values(values) => values
            .iter()
            .map(|value| SelectionOption::new(label_for(value), Some(value.clone())))
            .collect(),
        SelectionInput::Pairs(pairs) => pairs
            .iter()
            .map(|(value, label)| SelectionOption::new(label.clone(), Some(value.clone())))
            .collect(),
    };

    if let Some(labels) = labels {
        for (option, label) in options.iter_mut().zip(labels) {
            option.label = label.clone();
        }
    }

    options
}

fn label_for<T: InputValue>(value: &T) -> String {
    value
        .pattern_text()
        .map(|text| text.into_owned())
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Label of the option holding `value`
pub fn get_label_of_selection<'a, T: InputValue>(
    value: Option<&T>,
    selection: &'a [SelectionOption<T>],
) -> Option<&'a str> {
    selection
        .iter()
        .find(|option| option.value.as_ref() == value)
        .map(|option| option.label.as_str())
}

/// Value of the option labelled `label`
///
/// Labels are compared exactly first, then case-insensitively. Returns
/// `None` when no option matches.
pub fn get_value_from_selection<'a, T: InputValue>(
    label: &str,
    selection: &'a [SelectionOption<T>],
) -> Option<&'a SelectionOption<T>> {
    selection
        .iter()
        .find(|option| option.label == label)
        .or_else(|| {
            let lowered = label.to_lowercase();
            selection
                .iter()
                .find(|option| option.label.to_lowercase() == lowered)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_values() {
        let selection = SelectionInput::Values(vec!["a".to_string(), "b".to_string()]);
        let options = normalize_selection(&selection, None);

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "a");
        assert_eq!(options[1].value.as_deref(), Some("b"));
    }

    #[test]
    fn test_normalize_pairs_with_labels() {
        let selection = SelectionInput::Pairs(vec![(1i64, "One".to_string()), (2, "Two".to_string())]);
        let labels = vec!["Eins".to_string()];
        let options = normalize_selection(&selection, Some(&labels));

        assert_eq!(options[0].label, "Eins");
        assert_eq!(options[1].label, "Two");
        assert_eq!(options[1].value, Some(2));
    }

    #[test]
    fn test_untagged_selection_shapes() {
        let values: SelectionInput<String> = serde_json::from_str(r#"["x", "y"]"#).unwrap();
        assert!(matches!(values, SelectionInput::Values(_)));

        let pairs: SelectionInput<String> = serde_json::from_str(r#"[["x", "Ex"]]"#).unwrap();
        assert!(matches!(pairs, SelectionInput::Pairs(_)));

        let options: SelectionInput<String> =
            serde_json::from_str(r#"[{"label": "Ex", "value": "x"}]"#).unwrap();
        assert!(matches!(options, SelectionInput::Options(_)));
    }

    #[test]
    fn test_lookup_helpers() {
        let options = vec![
            SelectionOption::new("No", Some(false)),
            SelectionOption::new("Yes", Some(true)),
        ];

        assert_eq!(get_label_of_selection(Some(&true), &options), Some("Yes"));
        assert_eq!(get_label_of_selection(None, &options), None);
        assert_eq!(
            get_value_from_selection("yes", &options).and_then(|o| o.value),
            Some(true)
        );
        assert!(get_value_from_selection("maybe", &options).is_none());
    }
}
