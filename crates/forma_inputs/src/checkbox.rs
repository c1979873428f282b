//! Requireable checkbox
//!
//! A boolean input whose required check demands `true`: an unchecked box is
//! missing when the input is required, not merely a `false` answer.

use crate::config::FormaConfig;
use crate::consolidate::Properties;
use crate::context::{InputContext, WidgetId};
use crate::dispatch::InputEvent;
use crate::model::{Model, ModelState, NoExtension, ValidationKey, ValueType};
use crate::props::Props;
use crate::reconciler::{InputKind, Reconciler};
use crate::validation::ValidatorSet;

fn invalid_required(model: &Model<bool>) -> bool {
    !model.nullable && !model.value.unwrap_or(false)
}

/// [`InputKind`] of checkboxes
pub struct CheckboxKind;

impl InputKind for CheckboxKind {
    type Value = bool;
    type Extension = NoExtension;

    const KIND: &'static str = "checkbox";
    const REQUIRED_TEXT: &'static str = "Please check this field.";

    fn validators() -> ValidatorSet<bool, NoExtension> {
        ValidatorSet::base().with(ValidationKey::Required, invalid_required)
    }

    fn default_model(_config: &FormaConfig) -> Model<bool> {
        Model::new(ValueType::Boolean)
            .default_value(Some(false))
            .state(Self::validators().initial_state())
    }
}

pub type CheckboxProps = Props<bool>;
pub type CheckboxProperties = Properties<bool>;

/// Mounted requireable checkbox
pub struct RequireableCheckbox {
    inner: Reconciler<CheckboxKind>,
}

impl RequireableCheckbox {
    pub fn new(ctx: &mut InputContext, props: &CheckboxProps) -> Self {
        Self {
            inner: Reconciler::mount(ctx, props),
        }
    }

    /// Mount with an explicit checked state winning over every given value
    pub fn with_checked(ctx: &mut InputContext, props: &CheckboxProps, checked: bool) -> Self {
        Self {
            inner: Reconciler::mount_with(ctx, props, Some(Some(checked))),
        }
    }

    pub fn render(&mut self, ctx: &mut InputContext, props: &CheckboxProps) -> &CheckboxProperties {
        self.inner.render(ctx, props)
    }

    pub fn unmount(self, ctx: &mut InputContext) {
        self.inner.unmount(ctx);
    }

    pub fn id(&self) -> WidgetId {
        self.inner.id()
    }

    pub fn properties(&self) -> &CheckboxProperties {
        self.inner.properties()
    }

    pub fn model_state(&self) -> &ModelState {
        self.inner.model_state()
    }

    pub fn is_controlled(&self) -> bool {
        self.inner.is_controlled()
    }

    pub fn checked(&self) -> bool {
        self.inner.value().copied().unwrap_or(false)
    }

    pub fn set_checked(
        &mut self,
        ctx: &mut InputContext,
        checked: bool,
        event: Option<&InputEvent>,
    ) -> bool {
        self.inner.change_value(ctx, Some(checked), event)
    }

    /// Flip the checked state as a click on the box would
    pub fn toggle(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) -> bool {
        let checked = !self.checked();
        self.inner.click(ctx, event);
        self.set_checked(ctx, checked, event)
    }

    pub fn blur(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        self.inner.blur(ctx, event);
    }

    pub fn focus(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        self.inner.focus(ctx, event);
    }

    pub fn click(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        self.inner.click(ctx, event);
    }

    pub fn touch(&mut self, ctx: &mut InputContext, event: Option<&InputEvent>) {
        self.inner.touch(ctx, event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_unchecked_required_is_invalid() {
        let mut ctx = InputContext::new();
        let mut checkbox = RequireableCheckbox::new(&mut ctx, &CheckboxProps::new().required(true));

        assert!(!checkbox.checked());
        assert!(checkbox.model_state().flag(ValidationKey::Required));
        assert_eq!(
            checkbox.properties().required_text.as_deref(),
            Some("Please check this field.")
        );

        assert!(checkbox.toggle(&mut ctx, None));
        assert!(checkbox.checked());
        assert!(checkbox.model_state().valid);
        assert!(checkbox.model_state().touched);
        assert!(checkbox.model_state().dirty);
    }

    #[test]
    fn test_optional_unchecked_is_valid() {
        let mut ctx = InputContext::new();
        let checkbox = RequireableCheckbox::new(&mut ctx, &CheckboxProps::new());

        assert!(checkbox.model_state().valid);
        assert_eq!(checkbox.properties().value, Some(false));
    }

    #[test]
    fn test_checked_wins_over_value() {
        let mut ctx = InputContext::new();
        let props = CheckboxProps::new().default_value(Some(false));
        let checkbox = RequireableCheckbox::with_checked(&mut ctx, &props, true);

        assert!(checkbox.checked());
    }

    #[test]
    fn test_state_callback_order() {
        let mut ctx = InputContext::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (on_click, on_change_state) = (log.clone(), log.clone());
        let props = CheckboxProps::new()
            .on_click(move |_, _| on_click.lock().unwrap().push("click"))
            .on_change_state(move |_, _, _| on_change_state.lock().unwrap().push("changeState"));
        let mut checkbox = RequireableCheckbox::new(&mut ctx, &props);

        checkbox.click(&mut ctx, Some(&InputEvent::Pointer { x: 1.0, y: 1.0 }));
        assert!(log.lock().unwrap().is_empty());

        ctx.run_turn();
        assert_eq!(*log.lock().unwrap(), vec!["click", "changeState"]);

        checkbox.click(&mut ctx, None);
        ctx.run_turn();
        assert_eq!(log.lock().unwrap().len(), 3);
    }
}
