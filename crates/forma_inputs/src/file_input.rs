//! File input
//!
//! Holds a [`FileValue`] and validates its size, content type and name. A
//! value missing derivable fields is completed asynchronously: rendering
//! queues a [`FileDerivation`] that becomes available after the next commit,
//! the host runs it and hands the result back to [`FileInput::settle`].

use forma_core::Signal;
use serde::{Deserialize, Serialize};

use crate::config::FormaConfig;
use crate::consolidate::Properties;
use crate::context::{InputContext, WidgetId};
use crate::derivation::{needs_derivation, DerivedFile, FileDerivation};
use crate::dispatch::InputEvent;
use crate::error::Result;
use crate::file_value::{determine_content_type, determine_representation_type, FileValue, RepresentationType};
use crate::model::{Model, ModelExtension, ModelState, NoExtension, Pattern, ValidationKey, ValueType};
use crate::props::{ModelFields, ModelOverrides, Props};
use crate::reconciler::{InputKind, Reconciler};
use crate::validation::{determine_validation_state, matches_all, matches_any, ValidatorSet};

/// Default content type pattern: anything shaped like `type/subtype`
pub const DEFAULT_CONTENT_TYPE_PATTERN: &str = "^.+/.+$";

// =============================================================================
// Model Extension
// =============================================================================

/// File specific model fields
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileExtension {
    /// Maximum blob size in bytes
    pub maximum_size: f64,
    pub minimum_size: f64,
    pub content_type_pattern: Option<Pattern>,
    pub inverted_content_type_pattern: Option<Pattern>,
    /// Model the file name is validated against
    pub file_name: Model<String>,
}

impl Default for FileExtension {
    fn default() -> Self {
        let mut file_name = Model::new(ValueType::String).name("Name");
        file_name.maximum_length = 1024;
        file_name.regular_expression_pattern = Some(Pattern::from("^[^/]+$"));
        file_name.nullable = false;
        file_name.empty_equals_null = false;

        Self {
            maximum_size: f64::INFINITY,
            minimum_size: 0.0,
            content_type_pattern: Some(Pattern::from(DEFAULT_CONTENT_TYPE_PATTERN)),
            inverted_content_type_pattern: None,
            file_name,
        }
    }
}

/// Partial [`FileExtension`] as given by callers
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileExtensionOverrides {
    pub maximum_size: Option<f64>,
    pub minimum_size: Option<f64>,
    pub content_type_pattern: Option<Pattern>,
    pub inverted_content_type_pattern: Option<Pattern>,
    pub file_name: Option<ModelOverrides<String>>,
}

impl ModelExtension for FileExtension {
    type Overrides = FileExtensionOverrides;

    fn apply(&mut self, overrides: &Self::Overrides) {
        if let Some(maximum_size) = overrides.maximum_size {
            self.maximum_size = maximum_size;
        }
        if let Some(minimum_size) = overrides.minimum_size {
            self.minimum_size = minimum_size;
        }
        if let Some(pattern) = &overrides.content_type_pattern {
            self.content_type_pattern = Some(pattern.clone());
        }
        if let Some(pattern) = &overrides.inverted_content_type_pattern {
            self.inverted_content_type_pattern = Some(pattern.clone());
        }
        if let Some(file_name) = &overrides.file_name {
            file_name.fields.apply_to(&mut self.file_name, None);
            file_name.state.apply_to(&mut self.file_name.state);
        }
    }

    fn to_overrides(&self) -> Self::Overrides {
        FileExtensionOverrides {
            maximum_size: Some(self.maximum_size),
            minimum_size: Some(self.minimum_size),
            content_type_pattern: self.content_type_pattern.clone(),
            inverted_content_type_pattern: self.inverted_content_type_pattern.clone(),
            file_name: Some(ModelOverrides {
                fields: ModelFields::from_model(&self.file_name),
                state: crate::model::StateOverrides::from_state(&self.file_name.state),
            }),
        }
    }
}

pub type FileModel = Model<FileValue, FileExtension>;
pub type FileProps = Props<FileValue, FileExtension>;
pub type FileProperties = Properties<FileValue, FileExtension>;

// =============================================================================
// Validators
// =============================================================================

fn invalid_maximum_size(model: &FileModel) -> bool {
    let size = model.value.as_ref().map_or(0, FileValue::size);
    model.extension.maximum_size < size as f64
}

fn invalid_minimum_size(model: &FileModel) -> bool {
    let size = model.value.as_ref().map_or(0, FileValue::size);
    model.extension.minimum_size > size as f64
}

fn blob_content_type(model: &FileModel) -> Option<&str> {
    model.value.as_ref()?.blob.as_ref()?.content_type()
}

fn invalid_content_type_pattern(model: &FileModel) -> bool {
    match (blob_content_type(model), &model.extension.content_type_pattern) {
        (Some(content_type), Some(pattern)) => !matches_all(pattern, content_type),
        _ => false,
    }
}

fn invalid_inverted_content_type_pattern(model: &FileModel) -> bool {
    match (
        blob_content_type(model),
        &model.extension.inverted_content_type_pattern,
    ) {
        (Some(content_type), Some(pattern)) => matches_any(pattern, content_type),
        _ => false,
    }
}

/// Validate the file name against the nested name model
fn invalid_name(model: &FileModel) -> bool {
    let Some(value) = &model.value else {
        return false;
    };
    let mut name_model = model.extension.file_name.clone();
    name_model.value = value.name.clone();

    let validators = ValidatorSet::<String, NoExtension>::text();
    let current = name_model.state.clone();
    determine_validation_state(&mut name_model, &current, &validators);
    name_model.state.invalid
}

// =============================================================================
// Kind
// =============================================================================

/// [`InputKind`] of file inputs
pub struct FileKind;

impl InputKind for FileKind {
    type Value = FileValue;
    type Extension = FileExtension;

    const KIND: &'static str = "file";
    const REQUIRED_TEXT: &'static str = "Please select a file.";

    fn validators() -> ValidatorSet<FileValue, FileExtension> {
        ValidatorSet::base()
            .with(ValidationKey::MaximumSize, invalid_maximum_size)
            .with(ValidationKey::MinimumSize, invalid_minimum_size)
            .with(ValidationKey::ContentTypePattern, invalid_content_type_pattern)
            .with(
                ValidationKey::InvertedContentTypePattern,
                invalid_inverted_content_type_pattern,
            )
            .with(ValidationKey::Name, invalid_name)
    }

    fn default_model(_config: &FormaConfig) -> FileModel {
        let validators = Self::validators();
        Model::new(ValueType::File).state(validators.initial_state())
    }

    /// Fields the caller gave win over derived ones
    fn merge_attached(given: Option<FileValue>, local: FileValue) -> Option<FileValue> {
        Some(match given {
            Some(given) => given.or(local),
            None => local,
        })
    }
}

// =============================================================================
// Component
// =============================================================================

/// Mounted file input
pub struct FileInput {
    inner: Reconciler<FileKind>,
    generation: u64,
    scheduled: Option<FileValue>,
    pending: Signal<Option<FileDerivation>>,
}

impl FileInput {
    pub fn new(ctx: &mut InputContext, props: &FileProps) -> Self {
        let pending = ctx.runtime.create_signal(None);
        let mut input = Self {
            inner: Reconciler::mount(ctx, props),
            generation: 0,
            scheduled: None,
            pending,
        };
        input.schedule_derivation(ctx);
        input
    }

    /// Render with new caller properties
    pub fn render(&mut self, ctx: &mut InputContext, props: &FileProps) -> &FileProperties {
        self.inner.render(ctx, props);
        self.schedule_derivation(ctx);
        self.inner.properties()
    }

    pub fn unmount(self, ctx: &mut InputContext) {
        ctx.runtime.dispose_signal(self.pending);
        self.inner.unmount(ctx);
    }

    /// Queue a derivation for the current value once the render commits
    fn schedule_derivation(&mut self, ctx: &mut InputContext) {
        let Some(value) = self.inner.value().cloned() else {
            self.scheduled = None;
            return;
        };
        if self.scheduled.as_ref() == Some(&value) || !needs_derivation(&value, &ctx.config().file) {
            return;
        }

        self.generation += 1;
        let job = FileDerivation {
            generation: self.generation,
            value: value.clone(),
            hashing: ctx.config().hashing.clone(),
            file: ctx.config().file.clone(),
        };
        tracing::debug!(id = ?self.id(), generation = self.generation, "scheduling file derivation");
        self.scheduled = Some(value);

        let pending = self.pending;
        ctx.runtime.on_commit(move |runtime| {
            runtime.set(pending, Some(job));
        });
    }

    /// Take the derivation queued by the last committed render
    pub fn take_derivation(&mut self, ctx: &mut InputContext) -> Option<FileDerivation> {
        let job = ctx.runtime.get(self.pending).flatten()?;
        ctx.runtime.set(self.pending, None);
        Some(job)
    }

    /// Apply the outcome of a derivation
    ///
    /// Failures are logged and leave the value untouched. Results of jobs
    /// started for an outdated value are discarded. Returns whether the
    /// value changed.
    pub fn settle(&mut self, ctx: &mut InputContext, result: Result<DerivedFile>) -> bool {
        let derived = match result {
            Ok(derived) => derived,
            Err(error) => {
                tracing::warn!(id = ?self.id(), %error, "file derivation failed");
                return false;
            }
        };
        if derived.generation != self.generation {
            tracing::debug!(
                id = ?self.id(),
                generation = derived.generation,
                current = self.generation,
                "dropping stale file derivation"
            );
            return false;
        }

        self.scheduled = Some(derived.value.clone());
        self.inner.change_value_with(
            ctx,
            Some(derived.value),
            Some(&InputEvent::Derivation),
            true,
        )
    }

    /// Run a queued derivation to completion and apply it
    pub fn derive_blocking(&mut self, ctx: &mut InputContext) -> bool {
        match self.take_derivation(ctx) {
            Some(job) => {
                let result = pollster::block_on(job.run());
                self.settle(ctx, result)
            }
            None => false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> WidgetId {
        self.inner.id()
    }

    pub fn properties(&self) -> &FileProperties {
        self.inner.properties()
    }

    pub fn value(&self) -> Option<&FileValue> {
        self.inner.value()
    }

    pub fn model_state(&self) -> &ModelState {
        self.inner.model_state()
    }

    pub fn is_controlled(&self) -> bool {
        self.inner.is_controlled()
    }

    /// Generation of the most recent derivation or user change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn content_type(&self) -> Option<String> {
        self.value().and_then(determine_content_type)
    }

    /// How the current content can be presented
    pub fn representation_type(&self) -> Option<RepresentationType> {
        self.content_type()
            .map(|content_type| determine_representation_type(&content_type))
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

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

    /// Replace the file, invalidating any running derivation
    pub fn change_value(
        &mut self,
        ctx: &mut InputContext,
        value: Option<FileValue>,
        event: Option<&InputEvent>,
    ) -> bool {
        let changed = self.inner.change_value(ctx, value, event);
        if changed {
            self.generation += 1;
            self.scheduled = None;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::file_value::Blob;

    fn text_file(name: &str, text: &str) -> FileValue {
        FileValue::from_blob(name, Blob::from_text(text, "text/plain"))
    }

    #[test]
    fn test_default_model() {
        let model = FileKind::default_model(&FormaConfig::default());

        assert_eq!(model.value_type, ValueType::File);
        assert_eq!(model.extension.maximum_size, f64::INFINITY);
        assert_eq!(model.extension.file_name.maximum_length, 1024);
        assert!(!model.state.flag(ValidationKey::Name));
        assert!(model.state.validation.contains_key(&ValidationKey::MaximumSize));
    }

    #[test]
    fn test_size_validation() {
        let mut ctx = InputContext::new();
        let props = FileProps::new()
            .value(Some(text_file("a.txt", "hello")))
            .extension(FileExtensionOverrides {
                maximum_size: Some(3.0),
                ..Default::default()
            });
        let input = FileInput::new(&mut ctx, &props);

        assert!(input.model_state().flag(ValidationKey::MaximumSize));
        assert!(!input.model_state().flag(ValidationKey::MinimumSize));
        assert!(input.model_state().invalid);
    }

    #[test]
    fn test_content_type_and_name_validation() {
        let mut ctx = InputContext::new();
        let blob = Blob::new(b"x".to_vec(), Some("image/png".to_string()));
        let props = FileProps::new()
            .value(Some(FileValue::from_blob("dir/a.png", blob)))
            .extension(FileExtensionOverrides {
                content_type_pattern: Some(Pattern::from("^text/")),
                inverted_content_type_pattern: Some(Pattern::from("png")),
                ..Default::default()
            });
        let input = FileInput::new(&mut ctx, &props);
        let state = input.model_state();

        assert!(state.flag(ValidationKey::ContentTypePattern));
        assert!(state.flag(ValidationKey::InvertedContentTypePattern));
        assert!(state.flag(ValidationKey::Name));
    }

    #[test]
    fn test_required_text() {
        let mut ctx = InputContext::new();
        let input = FileInput::new(&mut ctx, &FileProps::new().required(true));

        assert!(input.model_state().flag(ValidationKey::Required));
        assert_eq!(input.properties().required_text.as_deref(), Some("Please select a file."));
    }

    #[test]
    fn test_derivation_after_commit() {
        let mut ctx = InputContext::new();
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = changes.clone();
        let props = FileProps::new()
            .default_value(Some(FileValue {
                source: Some("hello".to_string()),
                name: Some("a.txt".to_string()),
                ..Default::default()
            }))
            .on_change_value(move |value, _, _| {
                assert!(value.and_then(|value| value.hash.as_ref()).is_some());
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let mut input = FileInput::new(&mut ctx, &props);

        assert!(input.take_derivation(&mut ctx).is_none());
        ctx.commit();
        assert!(input.derive_blocking(&mut ctx));
        assert!(input.take_derivation(&mut ctx).is_none());

        ctx.run_turn();
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        let value = input.value().unwrap();
        assert_eq!(value.url.as_deref(), Some("data:text/plain;base64,aGVsbG8="));
        assert_eq!(input.representation_type(), Some(RepresentationType::EmbedableText));

        input.render(&mut ctx, &props);
        ctx.commit();
        assert!(input.take_derivation(&mut ctx).is_none());
        assert_eq!(input.value().unwrap().source.as_deref(), Some("hello"));
    }

    #[test]
    fn test_stale_derivation_is_dropped() {
        let mut ctx = InputContext::new();
        let props = FileProps::new().default_value(Some(FileValue {
            source: Some("first".to_string()),
            ..Default::default()
        }));
        let mut input = FileInput::new(&mut ctx, &props);
        ctx.commit();
        let job = input.take_derivation(&mut ctx).unwrap();

        input.change_value(&mut ctx, Some(text_file("b.txt", "second")), None);
        let result = pollster::block_on(job.run());

        assert!(!input.settle(&mut ctx, result));
        assert_eq!(input.value().unwrap().name.as_deref(), Some("b.txt"));
    }

    #[test]
    fn test_failed_derivation_keeps_value() {
        let mut ctx = InputContext::new();
        let value = FileValue {
            url: Some("data:text/plain;base64,@@".to_string()),
            ..Default::default()
        };
        let mut input = FileInput::new(&mut ctx, &FileProps::new().default_value(Some(value.clone())));
        ctx.commit();

        assert!(!input.derive_blocking(&mut ctx));
        assert_eq!(input.value(), Some(&value));
    }

    #[test]
    fn test_controlled_caller_fields_win() {
        let mut ctx = InputContext::new();
        let given = FileValue {
            source: Some("hello".to_string()),
            name: Some("given.txt".to_string()),
            ..Default::default()
        };
        let props = FileProps::new()
            .value(Some(given))
            .on_change_value(|_, _, _| {});
        let mut input = FileInput::new(&mut ctx, &props);
        assert!(input.is_controlled());

        ctx.commit();
        input.derive_blocking(&mut ctx);
        let rendered = input.render(&mut ctx, &props).value.clone().unwrap();

        assert_eq!(rendered.name.as_deref(), Some("given.txt"));
        assert_eq!(rendered.source.as_deref(), Some("hello"));
        assert!(rendered.hash.is_some());
    }
}
