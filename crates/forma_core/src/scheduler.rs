//! Next-turn task queue
//!
//! Component callbacks never run inside the event handler that triggered
//! them. They are queued here and run when the host advances the scheduler,
//! after every internal state change of the handler has settled.

use std::collections::VecDeque;

/// A deferred unit of work
pub type Task = Box<dyn FnOnce()>;

/// FIFO queue of tasks deferred to the next scheduler turn
#[derive(Default)]
pub struct Scheduler {
    queue: VecDeque<Task>,
    turns: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task for the next turn
    pub fn defer(&mut self, task: impl FnOnce() + 'static) {
        self.queue.push_back(Box::new(task));
    }

    /// Run every task queued so far, in order
    ///
    /// Returns the number of tasks that ran. A panicking task propagates to
    /// the caller, remaining tasks stay queued.
    pub fn run_turn(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.queue.pop_front() {
            task();
            ran += 1;
        }
        self.turns += 1;
        if ran > 0 {
            tracing::trace!(turn = self.turns, tasks = ran, "scheduler turn");
        }
        ran
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of turns run so far
    pub fn turns(&self) -> u64 {
        self.turns
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.queue.len())
            .field("turns", &self.turns)
            .finish()
    }
}
