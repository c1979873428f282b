//! Signals, commit effects and render requests
//!
//! The [`Runtime`] is the host primitive every input component is built on.
//! It owns three things:
//! - Signals holding per-component local state (value and model state)
//! - Effects that run once after the next render commit
//! - A render request flag raised by rebuilding writes
//!
//! Writes come in two flavours, mirroring how state is used by inputs:
//!
//! ```rust
//! use forma_core::reactive::Runtime;
//!
//! let mut runtime = Runtime::new();
//! let count = runtime.create_signal(0i32);
//!
//! // Plain write, no render is requested
//! runtime.set(count, 1);
//! assert!(!runtime.take_render_request());
//!
//! // Rebuilding write, the host re-renders on its next pass
//! runtime.set_rebuild(count, 2);
//! assert!(runtime.take_render_request());
//! assert_eq!(runtime.get(count), Some(2));
//! ```

use slotmap::{new_key_type, SlotMap};
use std::any::Any;
use std::marker::PhantomData;

new_key_type! {
    /// Unique identifier for a signal
    pub struct SignalId;
}

/// A typed signal handle (cheap to copy)
#[derive(Debug)]
pub struct Signal<T> {
    id: SignalId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Signal<T> {}

impl<T> Signal<T> {
    /// Get the signal's internal ID
    pub fn id(&self) -> SignalId {
        self.id
    }
}

/// An effect queued to run after the next commit
type CommitEffect = Box<dyn FnOnce(&mut Runtime)>;

struct SignalNode {
    value: Box<dyn Any>,
}

/// Local state store for input components
pub struct Runtime {
    signals: SlotMap<SignalId, SignalNode>,
    /// Effects registered during render, run by [`Runtime::commit`]
    commit_effects: Vec<CommitEffect>,
    /// Current batch depth (> 0 means render requests are held back)
    batch_depth: u32,
    render_requested: bool,
    /// Number of completed commits
    commits: u64,
}

impl Runtime {
    /// Create an empty runtime
    pub fn new() -> Self {
        Self {
            signals: SlotMap::with_key(),
            commit_effects: Vec::new(),
            batch_depth: 0,
            render_requested: false,
            commits: 0,
        }
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Create a new signal with an initial value
    pub fn create_signal<T: 'static>(&mut self, initial: T) -> Signal<T> {
        let id = self.signals.insert(SignalNode {
            value: Box::new(initial),
        });
        Signal {
            id,
            _marker: PhantomData,
        }
    }

    /// Get a clone of the current value of a signal
    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.with(signal, T::clone)
    }

    /// Borrow the current value of a signal
    pub fn with<T: 'static, R>(&self, signal: Signal<T>, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.signals
            .get(signal.id)
            .and_then(|node| node.value.downcast_ref::<T>())
            .map(f)
    }

    /// Set the value of a signal without requesting a render
    ///
    /// Returns false if the signal was disposed.
    pub fn set<T: 'static>(&mut self, signal: Signal<T>, value: T) -> bool {
        match self.signals.get_mut(signal.id) {
            Some(node) => {
                node.value = Box::new(value);
                true
            }
            None => {
                tracing::warn!(signal = ?signal.id, "write to disposed signal ignored");
                false
            }
        }
    }

    /// Set the value of a signal AND request a render
    pub fn set_rebuild<T: 'static>(&mut self, signal: Signal<T>, value: T) {
        if self.set(signal, value) {
            self.request_render();
        }
    }

    /// Drop a signal and its value
    pub fn dispose_signal<T>(&mut self, signal: Signal<T>) {
        self.signals.remove(signal.id);
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Start a batch - render requests are held until the batch ends
    pub fn batch_start(&mut self) {
        self.batch_depth += 1;
    }

    /// End a batch
    pub fn batch_end(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
    }

    fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    // =========================================================================
    // RENDERING
    // =========================================================================

    /// Ask the host to render again
    pub fn request_render(&mut self) {
        self.render_requested = true;
    }

    /// Consume a pending render request
    ///
    /// While a batch is open this always returns false and keeps the request,
    /// so every write of the batch lands before the next render.
    pub fn take_render_request(&mut self) -> bool {
        if self.in_batch() {
            return false;
        }
        std::mem::take(&mut self.render_requested)
    }

    /// Queue an effect to run after the next commit
    pub fn on_commit(&mut self, effect: impl FnOnce(&mut Runtime) + 'static) {
        self.commit_effects.push(Box::new(effect));
    }

    /// Mark the current render as committed and run queued effects
    ///
    /// Effects queued while committing run on the following commit.
    /// Returns the number of effects that ran.
    pub fn commit(&mut self) -> usize {
        let effects = std::mem::take(&mut self.commit_effects);
        let count = effects.len();
        for effect in effects {
            effect(self);
        }
        self.commits += 1;
        tracing::trace!(commit = self.commits, effects = count, "render committed");
        count
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_signal_create_get_set() {
        let mut runtime = Runtime::new();

        let count = runtime.create_signal(0i32);
        assert_eq!(runtime.get(count), Some(0));

        assert!(runtime.set(count, 42));
        assert_eq!(runtime.get(count), Some(42));
        assert!(!runtime.take_render_request());
    }

    #[test]
    fn test_set_rebuild_requests_render_once() {
        let mut runtime = Runtime::new();
        let name = runtime.create_signal(String::new());

        runtime.set_rebuild(name, "a".to_string());
        runtime.set_rebuild(name, "ab".to_string());
        assert!(runtime.take_render_request());
        assert!(!runtime.take_render_request());
    }

    #[test]
    fn test_batch_holds_render_request() {
        let mut runtime = Runtime::new();
        let count = runtime.create_signal(0i32);

        runtime.batch_start();
        runtime.set_rebuild(count, 1);
        let next = runtime.get(count).unwrap_or_default() + 1;
        runtime.set_rebuild(count, next);
        assert!(!runtime.take_render_request());
        runtime.batch_end();

        assert!(runtime.take_render_request());
        assert_eq!(runtime.get(count), Some(2));
    }

    #[test]
    fn test_disposed_signal() {
        let mut runtime = Runtime::new();
        let count = runtime.create_signal(1i32);
        runtime.dispose_signal(count);

        assert_eq!(runtime.get(count), None);
        runtime.set_rebuild(count, 2);
        assert!(!runtime.take_render_request());
    }

    #[test]
    fn test_commit_effects_run_once() {
        let mut runtime = Runtime::new();
        let runs = Rc::new(RefCell::new(Vec::new()));

        let runs_clone = runs.clone();
        runtime.on_commit(move |_| runs_clone.borrow_mut().push("first"));
        assert!(runs.borrow().is_empty());

        assert_eq!(runtime.commit(), 1);
        assert_eq!(*runs.borrow(), vec!["first"]);

        assert_eq!(runtime.commit(), 0);
        assert_eq!(runs.borrow().len(), 1);
    }

    #[test]
    fn test_effect_queued_during_commit_runs_next_commit() {
        let mut runtime = Runtime::new();
        let stage = runtime.create_signal(0u8);

        runtime.on_commit(move |rt| {
            rt.set(stage, 1);
            rt.on_commit(move |rt| {
                rt.set(stage, 2);
            });
        });

        runtime.commit();
        assert_eq!(runtime.get(stage), Some(1));
        runtime.commit();
        assert_eq!(runtime.get(stage), Some(2));
    }
}
