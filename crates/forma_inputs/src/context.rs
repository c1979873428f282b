//! Input Context - owns local state, deferred callbacks and dirty tracking
//!
//! The InputContext provides:
//! - The signal runtime holding every input's local value state
//! - The scheduler running deferred callbacks on the next turn
//! - Widget registration and dirty tracking for incremental re-renders
//! - The context wide [`FormaConfig`]

use forma_core::{Runtime, Scheduler};
use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};

use crate::config::FormaConfig;
use crate::consolidate::ViewOptions;
use crate::model::ValidationKey;

new_key_type! {
    /// Unique identifier for a mounted input
    pub struct WidgetId;
}

/// Per-widget bookkeeping
struct WidgetData {
    kind: &'static str,
    renders: u64,
}

/// The central coordinator for mounted inputs
pub struct InputContext {
    /// Local state signals and commit effects
    pub runtime: Runtime,
    /// Deferred callbacks
    pub scheduler: Scheduler,
    widgets: SlotMap<WidgetId, WidgetData>,
    dirty: FxHashSet<WidgetId>,
    config: FormaConfig,
}

impl Default for InputContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InputContext {
    /// Create a context with the default configuration
    pub fn new() -> Self {
        Self::with_config(FormaConfig::default())
    }

    pub fn with_config(config: FormaConfig) -> Self {
        Self {
            runtime: Runtime::new(),
            scheduler: Scheduler::new(),
            widgets: SlotMap::with_key(),
            dirty: FxHashSet::default(),
            config,
        }
    }

    pub fn config(&self) -> &FormaConfig {
        &self.config
    }

    /// View options every input starts from
    pub fn view_defaults(&self, required_text: &str) -> ViewOptions {
        let required_text = self
            .config
            .messages
            .get(&ValidationKey::Required)
            .cloned()
            .unwrap_or_else(|| required_text.to_string());
        ViewOptions {
            enforce_uncontrolled: self.config.enforce_uncontrolled,
            show_validation_state: self.config.show_validation_state,
            show_initial_validation_state: self.config.show_initial_validation_state,
            required_text: Some(required_text),
            representation: None,
        }
    }

    // =========================================================================
    // Widget Registration
    // =========================================================================

    /// Register a new input and get its ID
    pub fn register_widget(&mut self, kind: &'static str) -> WidgetId {
        let id = self.widgets.insert(WidgetData { kind, renders: 0 });
        tracing::debug!(?id, kind, "input mounted");
        id
    }

    /// Unregister an input
    pub fn unregister_widget(&mut self, id: WidgetId) {
        if let Some(data) = self.widgets.remove(id) {
            tracing::debug!(?id, kind = data.kind, "input unmounted");
        }
        self.dirty.remove(&id);
    }

    /// Check if an input is registered
    pub fn is_registered(&self, id: WidgetId) -> bool {
        self.widgets.contains_key(id)
    }

    pub fn widget_kind(&self, id: WidgetId) -> Option<&'static str> {
        self.widgets.get(id).map(|data| data.kind)
    }

    /// Number of renders of an input
    pub fn render_count(&self, id: WidgetId) -> u64 {
        self.widgets.get(id).map_or(0, |data| data.renders)
    }

    pub(crate) fn note_render(&mut self, id: WidgetId) {
        if let Some(data) = self.widgets.get_mut(id) {
            data.renders += 1;
        }
        self.dirty.remove(&id);
    }

    // =========================================================================
    // Dirty Tracking
    // =========================================================================

    /// Mark an input as needing re-render
    pub fn mark_dirty(&mut self, id: WidgetId) {
        if self.widgets.contains_key(id) {
            self.dirty.insert(id);
            self.runtime.request_render();
        }
    }

    /// Check if an input needs re-render
    pub fn is_dirty(&self, id: WidgetId) -> bool {
        self.dirty.contains(&id)
    }

    /// Check if any input needs re-render
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Take the set of inputs needing re-render
    pub fn take_dirty(&mut self) -> Vec<WidgetId> {
        self.dirty.drain().collect()
    }

    // =========================================================================
    // Host Loop
    // =========================================================================

    /// Batch handler calls so their writes land before the next render
    pub fn batch<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.runtime.batch_start();
        let result = f(self);
        self.runtime.batch_end();
        result
    }

    /// Consume a pending render request
    pub fn take_render_request(&mut self) -> bool {
        self.runtime.take_render_request()
    }

    /// Mark the current render committed and run commit effects
    pub fn commit(&mut self) -> usize {
        self.runtime.commit()
    }

    /// Run deferred callbacks queued so far
    pub fn run_turn(&mut self) -> usize {
        self.scheduler.run_turn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration() {
        let mut ctx = InputContext::new();
        let id = ctx.register_widget("text-input");

        assert!(ctx.is_registered(id));
        assert_eq!(ctx.widget_kind(id), Some("text-input"));

        ctx.unregister_widget(id);
        assert!(!ctx.is_registered(id));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut ctx = InputContext::new();
        let id = ctx.register_widget("checkbox");

        assert!(!ctx.has_dirty());
        ctx.mark_dirty(id);
        assert!(ctx.is_dirty(id));
        assert!(ctx.take_render_request());

        ctx.note_render(id);
        assert!(!ctx.is_dirty(id));
        assert_eq!(ctx.render_count(id), 1);
    }

    #[test]
    fn test_batch_defers_render_request() {
        let mut ctx = InputContext::new();
        let id = ctx.register_widget("checkbox");

        ctx.batch(|ctx| {
            ctx.mark_dirty(id);
            assert!(!ctx.take_render_request());
        });
        assert!(ctx.take_render_request());
    }

    #[test]
    fn test_view_defaults_from_config() {
        let mut config = FormaConfig::default();
        config.show_initial_validation_state = true;
        config
            .messages
            .insert(ValidationKey::Required, "Required.".to_string());
        let ctx = InputContext::with_config(config);

        let defaults = ctx.view_defaults("Please fill this field.");
        assert!(defaults.show_initial_validation_state);
        assert_eq!(defaults.required_text.as_deref(), Some("Required."));
    }
}
