//! Forma configuration
//!
//! Defaults shared by every input of a context: validation message
//! templates, validation-state display flags, the uncontrolled override and
//! file hashing settings. Loaded from TOML:
//!
//! ```toml
//! show_initial_validation_state = true
//!
//! [messages]
//! invalidRequired = "Required."
//!
//! [hashing]
//! prefix = "sha256-"
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FormaError, Result};
use crate::model::ValidationKey;

/// Context wide defaults for input components
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FormaConfig {
    /// Treat every input as uncontrolled unless it says otherwise
    pub enforce_uncontrolled: bool,
    pub show_validation_state: bool,
    /// Show validation results before the user interacted
    pub show_initial_validation_state: bool,
    /// Message templates replacing the built-in ones
    pub messages: BTreeMap<ValidationKey, String>,
    pub hashing: HashingConfig,
    pub file: FileConfig,
}

impl Default for FormaConfig {
    fn default() -> Self {
        Self {
            enforce_uncontrolled: false,
            show_validation_state: true,
            show_initial_validation_state: false,
            messages: BTreeMap::new(),
            hashing: HashingConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl FormaConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded forma configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.hashing.read_chunk_size_in_byte == 0 {
            return Err(FormaError::Config(
                "hashing.read_chunk_size_in_byte must be greater than zero".to_string(),
            ));
        }
        if self.file.encoding.trim().is_empty() {
            return Err(FormaError::Config("file.encoding must not be empty".to_string()));
        }
        Ok(())
    }

    /// Message template for a validation flag
    pub fn message(&self, key: ValidationKey) -> Cow<'_, str> {
        match self.messages.get(&key) {
            Some(template) => Cow::Borrowed(template.as_str()),
            None => Cow::Borrowed(default_message(key)),
        }
    }
}

/// Built-in message template for a validation flag
pub fn default_message(key: ValidationKey) -> &'static str {
    match key {
        ValidationKey::Required => "Please fill this field.",
        ValidationKey::Maximum => "Please provide a number less or equal than ${maximum}.",
        ValidationKey::Minimum => "Please provide a number greater or equal than ${minimum}.",
        ValidationKey::MaximumLength => "Please type less or equal than ${maximumLength} symbols.",
        ValidationKey::MinimumLength => {
            "Please type at least or equal ${minimumLength} symbols."
        }
        ValidationKey::Pattern => {
            "Your string have to match the regular expression \"${pattern}\"."
        }
        ValidationKey::InvertedPattern => {
            "Your string must not match the regular expression \"${invertedPattern}\"."
        }
        ValidationKey::MaximumSize => {
            "Please provide a file with less or equal size than ${maximumSize} byte."
        }
        ValidationKey::MinimumSize => {
            "Please provide a file with more or equal size than ${minimumSize} byte."
        }
        ValidationKey::ContentTypePattern => {
            "Your file's mime-type has to match the regular expression \"${contentTypePattern}\"."
        }
        ValidationKey::InvertedContentTypePattern => {
            "Your file's mime-type must not match the regular expression \"${invertedContentTypePattern}\"."
        }
        ValidationKey::Name => "Please provide a valid file name.",
        ValidationKey::MaximumNumber => "Please remove inputs until there are at most ${maximumNumber}.",
        ValidationKey::MinimumNumber => "Please add inputs until there are at least ${minimumNumber}.",
    }
}

/// File hashing settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Encode the digest as base64 instead of lowercase hex
    pub binary_string: bool,
    /// Prepended to every computed hash
    pub prefix: String,
    pub read_chunk_size_in_byte: usize,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            binary_string: false,
            prefix: String::new(),
            read_chunk_size_in_byte: 2 * 1024 * 1024,
        }
    }
}

/// File value derivation settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    /// Encoding of textual blobs, a `-sig` suffix strips a byte order mark
    pub encoding: String,
    /// Content type of blobs created from a textual source, `None` disables
    pub source_to_blob_content_type: Option<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            source_to_blob_content_type: Some("text/plain".to_string()),
        }
    }
}
