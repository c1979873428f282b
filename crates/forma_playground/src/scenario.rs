//! Scenario files
//!
//! A scenario names the component to mount, its raw properties, the
//! callbacks to observe and the steps to replay:
//!
//! ```toml
//! kind = "text"
//! observe = ["onChange", "onChangeState"]
//!
//! [props]
//! name = "title"
//! maximumLength = 3
//!
//! [[steps]]
//! action = "focus"
//!
//! [[steps]]
//! action = "input"
//! text = "abcd"
//! ```

use anyhow::{Context, Result};
use clap::ValueEnum;
use forma_inputs::interval::Side;
use forma_inputs::{EventKind, InputEvent};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Component a scenario drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Text input holding a string
    Text,
    /// Text input holding a number
    Number,
    Checkbox,
    File,
    Interval,
    /// List of text inputs
    Inputs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub kind: ComponentKind,
    #[serde(default)]
    pub description: Option<String>,
    /// Raw properties, as a caller would pass them
    #[serde(default)]
    pub props: Option<Value>,
    /// Callbacks to record, by event or handler name
    #[serde(default)]
    pub observe: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        Ok(scenario)
    }

    /// Observed callbacks, rejecting unknown names
    pub fn observed(&self) -> Result<Vec<EventKind>> {
        self.observe
            .iter()
            .map(|name| {
                name.parse::<EventKind>()
                    .with_context(|| format!("Invalid entry in observe: {name}"))
            })
            .collect()
    }

    /// Raw properties, an empty object when none are given
    pub fn props(&self) -> Value {
        self.props
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

/// One scripted interaction
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    /// Interval side the step targets
    #[serde(default)]
    pub side: Option<Side>,
    /// List item the step targets
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Focus,
    Blur,
    Click,
    Touch,
    /// Set a value directly, a missing value means `null`
    Change {
        #[serde(default)]
        value: Option<Value>,
    },
    /// Type text into the input
    Input { text: String },
    Toggle,
    Add,
    Remove,
    /// Render again, optionally with replaced properties
    Render {
        #[serde(default)]
        props: Option<Value>,
    },
    /// Commit the pending render and run commit effects
    Commit,
    /// Run pending file derivations to completion
    Derive,
    /// Only let the scheduler run
    Turn,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Focus => "focus",
            Action::Blur => "blur",
            Action::Click => "click",
            Action::Touch => "touch",
            Action::Change { .. } => "change",
            Action::Input { .. } => "input",
            Action::Toggle => "toggle",
            Action::Add => "add",
            Action::Remove => "remove",
            Action::Render { .. } => "render",
            Action::Commit => "commit",
            Action::Derive => "derive",
            Action::Turn => "turn",
        }
    }

    /// Event handed to the component's callbacks
    pub fn event(&self) -> Option<InputEvent> {
        match self {
            Action::Focus => Some(InputEvent::Focus),
            Action::Blur => Some(InputEvent::Blur),
            Action::Click | Action::Toggle => Some(InputEvent::Pointer { x: 0.0, y: 0.0 }),
            Action::Input { text } => Some(InputEvent::Input { data: text.clone() }),
            Action::Change { .. } | Action::Add | Action::Remove => Some(InputEvent::Programmatic),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        kind = "interval"
        observe = ["onChange", "changeValue"]

        [props]
        name = "range"
        maximum = 10

        [[steps]]
        action = "input"
        side = "start"
        text = "3"

        [[steps]]
        action = "change"
        side = "end"

        [[steps]]
        action = "turn"
    "#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse(SCENARIO).unwrap();

        assert_eq!(scenario.kind, ComponentKind::Interval);
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[0].side, Some(Side::Start));
        assert!(matches!(&scenario.steps[0].action, Action::Input { text } if text == "3"));
        assert!(matches!(&scenario.steps[1].action, Action::Change { value: None }));
        assert_eq!(scenario.props()["maximum"], Value::from(10));
    }

    #[test]
    fn test_observed_callbacks() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        assert_eq!(
            scenario.observed().unwrap(),
            vec![EventKind::Change, EventKind::ChangeValue]
        );

        let unknown = Scenario::parse("kind = \"text\"\nobserve = [\"onHover\"]\n").unwrap();
        assert!(unknown.observed().is_err());
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = Scenario::parse("kind = \"text\"\n[[steps]]\naction = \"hover\"\n");
        assert!(result.is_err());
    }
}
