//! Asynchronous completion of file values
//!
//! A file value given with only some of its fields (for example a data url,
//! or a blob without a hash) is completed in the background. Each job is
//! stamped with the generation of the input it was started for; results of
//! outdated jobs are discarded by the input.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::config::{FileConfig, HashingConfig};
use crate::error::Result;
use crate::file_value::{
    blob_from_data_url, data_url_from_blob, is_data_url, read_binary_data_into_text, Blob,
    FileValue,
};

/// Whether any field of `value` can still be derived from the others
pub fn needs_derivation(value: &FileValue, file: &FileConfig) -> bool {
    match &value.blob {
        Some(blob) => {
            value.source.is_none()
                || value.hash.is_none()
                || (value.url.is_none() && blob.content_type().is_some())
        }
        None => {
            value.url.as_deref().map_or(false, is_data_url)
                || (value.source.is_some() && file.source_to_blob_content_type.is_some())
        }
    }
}

/// Pending derivation of one file value
#[derive(Clone, Debug, PartialEq)]
pub struct FileDerivation {
    pub generation: u64,
    pub value: FileValue,
    pub hashing: HashingConfig,
    pub file: FileConfig,
}

/// Completed file value with the generation it was started for
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedFile {
    pub generation: u64,
    pub value: FileValue,
}

impl FileDerivation {
    /// Fill every derivable field
    pub async fn run(self) -> Result<DerivedFile> {
        let mut value = self.value;

        if value.blob.is_none() {
            if let Some(url) = value.url.as_deref().filter(|url| is_data_url(url)) {
                value.blob = Some(blob_from_data_url(url)?);
            } else if let (Some(source), Some(content_type)) =
                (&value.source, &self.file.source_to_blob_content_type)
            {
                value.blob = Some(Blob::from_text(source, content_type.clone()));
            }
        }

        if let Some(blob) = &value.blob {
            if value.source.is_none() {
                value.source = Some(if blob.is_text() {
                    read_binary_data_into_text(blob.bytes(), &self.file.encoding)?
                } else {
                    BASE64.encode(blob.bytes())
                });
            }
            if value.url.is_none() {
                value.url = data_url_from_blob(blob);
            }
            if value.hash.is_none() {
                value.hash = Some(hash_bytes(blob.bytes(), &self.hashing).await);
            }
        }

        tracing::trace!(generation = self.generation, "derived file value");
        Ok(DerivedFile {
            generation: self.generation,
            value,
        })
    }
}

/// SHA-256 digest of `bytes`, read in chunks
///
/// Yields between chunks so large files don't starve other tasks.
pub async fn hash_bytes(bytes: &[u8], hashing: &HashingConfig) -> String {
    let mut hasher = Sha256::new();
    for chunk in bytes.chunks(hashing.read_chunk_size_in_byte.max(1)) {
        hasher.update(chunk);
        tokio::task::yield_now().await;
    }
    let digest = hasher.finalize();

    let encoded = if hashing.binary_string {
        BASE64.encode(digest)
    } else {
        hex::encode(digest)
    };
    format!("{}{}", hashing.prefix, encoded)
}
