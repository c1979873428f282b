//! Forma Core Runtime
//!
//! Host primitives for the Forma input components:
//!
//! - **Signals**: typed local state with plain and rebuilding writes
//! - **Commit effects**: work that runs once after a render is committed
//! - **Scheduler**: a next-turn queue for deferred component callbacks
//!
//! # Example
//!
//! ```rust
//! use forma_core::{Runtime, Scheduler};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut runtime = Runtime::new();
//! let mut scheduler = Scheduler::new();
//!
//! let value = runtime.create_signal(String::from("a"));
//! runtime.set_rebuild(value, String::from("b"));
//!
//! let fired = Rc::new(Cell::new(false));
//! let fired_clone = fired.clone();
//! scheduler.defer(move || fired_clone.set(true));
//!
//! assert!(!fired.get());
//! scheduler.run_turn();
//! assert!(fired.get());
//! assert!(runtime.take_render_request());
//! ```

pub mod reactive;
pub mod scheduler;

pub use reactive::{Runtime, Signal, SignalId};
pub use scheduler::{Scheduler, Task};
