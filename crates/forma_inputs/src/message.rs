//! Validation message templates
//!
//! Templates reference properties of an input with `${name}` placeholders,
//! nested fields with dotted paths (`${model.maximum}`).

use serde_json::Value;

use crate::config::FormaConfig;
use crate::consolidate::{slice_properties_for_state, Properties};
use crate::model::{InputValue, ModelExtension, ValidationKey};

/// Substitute `${path}` placeholders from `scope`
///
/// Arrays are joined with `", "`. A placeholder naming an unknown field
/// turns the whole message into the empty string.
pub fn render_message(template: &str, scope: &Value) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let Some(length) = rest[start + 2..].find('}') else {
            break;
        };
        rendered.push_str(&rest[..start]);
        let path = rest[start + 2..start + 2 + length].trim();
        match lookup(scope, path) {
            Some(value) => rendered.push_str(&display(value)),
            None => {
                tracing::warn!(template, placeholder = path, "unknown field in message template");
                return String::new();
            }
        }
        rest = &rest[start + 3 + length..];
    }

    rendered.push_str(rest);
    rendered
}

fn lookup<'a>(scope: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(scope, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{}", float as i64)
            }
            _ => number.to_string(),
        },
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Rendered messages of every failing validation of an input
///
/// `requiredText` replaces the template of the required check.
pub fn validation_messages<T, X>(
    properties: &Properties<T, X>,
    config: &FormaConfig,
) -> Vec<(ValidationKey, String)>
where
    T: InputValue,
    X: ModelExtension,
{
    let scope = slice_properties_for_state(properties);
    properties
        .state
        .active_flags()
        .map(|key| {
            let template = match (key, properties.required_text.as_deref()) {
                (ValidationKey::Required, Some(text)) => text.to_string(),
                _ => config.message(key).into_owned(),
            };
            (key, render_message(&template, &scope))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::InputContext;
    use crate::props::Props;
    use crate::text_input::TextInput;

    #[test]
    fn test_substitutes_fields() {
        let scope = json!({"maximumLength": 10.0, "name": "title", "model": {"minimum": 2.5}});

        assert_eq!(
            render_message("Please type less or equal than ${maximumLength} symbols.", &scope),
            "Please type less or equal than 10 symbols."
        );
        assert_eq!(render_message("${name} >= ${model.minimum}", &scope), "title >= 2.5");
    }

    #[test]
    fn test_arrays_join() {
        let scope = json!({"pattern": ["^a", "b$"]});
        assert_eq!(render_message("Match ${pattern}.", &scope), "Match ^a, b$.");
    }

    #[test]
    fn test_unknown_field_empties_message() {
        let scope = json!({"name": "title"});
        assert_eq!(render_message("Hello ${nickname}!", &scope), "");
    }

    #[test]
    fn test_unclosed_placeholder_is_literal() {
        let scope = json!({});
        assert_eq!(render_message("costs ${ or more", &scope), "costs ${ or more");
        assert_eq!(render_message("no placeholders", &scope), "no placeholders");
    }

    #[test]
    fn test_validation_messages() {
        let mut ctx = InputContext::new();
        let props = Props::new().maximum_length(2).value(Some("abc".to_string()));
        let input = TextInput::<String>::new(&mut ctx, &props);

        assert_eq!(
            validation_messages(input.properties(), ctx.config()),
            vec![(
                ValidationKey::MaximumLength,
                "Please type less or equal than 2 symbols.".to_string()
            )]
        );
    }
}
