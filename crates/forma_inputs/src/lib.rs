//! Forma Input Components
//!
//! Form inputs that reconcile caller properties, a declarative model and
//! local interaction state into one consolidated view.
//!
//! # Architecture
//!
//! Every input runs the same pipeline on render:
//!
//! 1. **Consolidation**: raw properties are mapped onto the input's default
//!    model. Top level fields win over `model.*` fields, which win over the
//!    defaults.
//!
//! 2. **Validation**: the model's validators recompute the `invalid*` flags,
//!    `invalid` and `valid` of the model state.
//!
//! 3. **Controlled resolution**: an input is controlled when the caller
//!    supplies a value and listens for changes. Controlled inputs never
//!    persist their value locally, uncontrolled ones own it.
//!
//! Callbacks are never invoked synchronously from a handler. They are queued
//! on the context's scheduler and observe the settled state on the next turn.
//!
//! # Example
//!
//! ```rust
//! use forma_inputs::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! let mut ctx = InputContext::new();
//! let seen = Arc::new(Mutex::new(None));
//! let seen_clone = seen.clone();
//!
//! let props = TextProps::<String>::new()
//!     .name("title")
//!     .maximum_length(3)
//!     .on_change_value(move |value, _, _| *seen_clone.lock().unwrap() = value.cloned());
//! let mut input = TextInput::new(&mut ctx, &props);
//!
//! input.input(&mut ctx, "abcd", None);
//! assert!(input.model_state().invalid);
//!
//! ctx.run_turn();
//! assert_eq!(seen.lock().unwrap().as_deref(), Some("abcd"));
//! ```

pub mod checkbox;
pub mod composite;
pub mod config;
pub mod consolidate;
pub mod context;
pub mod controlled;
pub mod derivation;
pub mod dispatch;
pub mod error;
pub mod file_input;
pub mod file_value;
pub mod inputs;
pub mod interval;
pub mod message;
pub mod model;
pub mod props;
pub mod reconciler;
pub mod selection;
pub mod text_input;
pub mod validation;

pub use checkbox::{CheckboxKind, CheckboxProperties, CheckboxProps, RequireableCheckbox};
pub use composite::{aggregate_state, CompositeCallbacks, CompositeView};
pub use config::{FileConfig, FormaConfig, HashingConfig};
pub use consolidate::{
    get_consolidated_properties, map_properties_into_model, slice_properties_for_state,
    MappedProperties, Properties, ViewOptions,
};
pub use context::{InputContext, WidgetId};
pub use controlled::{StateSetter, ValueState};
pub use derivation::{DerivedFile, FileDerivation};
pub use dispatch::{Callbacks, EventKind, InputEvent};
pub use error::{FormaError, Result};
pub use file_input::{FileExtension, FileInput, FileKind, FileModel, FileProperties, FileProps};
pub use file_value::{Blob, FileValue, RepresentationType};
pub use inputs::{Inputs, InputsProperties, InputsProps, Items};
pub use interval::{Interval, IntervalProperties, IntervalProps, IntervalValue, Side};
pub use message::{render_message, validation_messages};
pub use model::{InputValue, Model, ModelExtension, ModelState, NoExtension, ValidationKey, ValueType};
pub use props::{ModelOverrides, Props};
pub use reconciler::{InputKind, Reconciler};
pub use selection::{SelectionInput, SelectionOption};
pub use text_input::{TextInput, TextKind, TextProperties, TextProps, TextualValue};
pub use validation::ValidatorSet;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::checkbox::{CheckboxProps, RequireableCheckbox};
    pub use crate::config::FormaConfig;
    pub use crate::context::InputContext;
    pub use crate::dispatch::{EventKind, InputEvent};
    pub use crate::file_input::{FileInput, FileProps};
    pub use crate::file_value::{Blob, FileValue};
    pub use crate::inputs::{Inputs, InputsProps};
    pub use crate::interval::{Interval, IntervalProps, IntervalValue, Side};
    pub use crate::model::{InputValue, ModelState, ValidationKey};
    pub use crate::text_input::{TextInput, TextProps};
}
