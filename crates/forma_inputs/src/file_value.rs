//! File values, blobs and content types

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{FormaError, Result};
use crate::model::InputValue;
use crate::validation::pattern_matches;

const IMAGE_CONTENT_TYPE: &str = "(?i)^image/(?:p?jpe?g|png|svg(?:\\+xml)?|vnd\\.microsoft\\.icon|gif|tiff|webp|vnd\\.wap\\.wbmp|x-(?:icon|jng|ms-bmp))$";
const TEXT_CONTENT_TYPE: &str = "(?i)^(?:application/(?:json|xml))|(?:text/(?:plain|x-ndpb[wy]html|javascript|x?html?|xml|(?:(?:x-)?(?:csv|python-script))))$";
const EMBEDABLE_TEXT_CONTENT_TYPE: &str = "(?i)^text/plain$";
const VIDEO_CONTENT_TYPE: &str = "(?i)^video/(?:(?:x-)?(?:x-)?webm|3gpp|mp2t|mp4|mpeg|quicktime|(?:x-)?flv|(?:x-)?m4v|(?:x-)mng|x-ms-as|x-ms-wmv|x-msvideo)|(?:application/(?:x-)?shockwave-flash)$";
const CHARSET_SUFFIX: &str = "; *charset=.+$";
const DATA_URL_CONTENT_TYPE: &str = "^data:([^/]+/[^;,]+)";

// =============================================================================
// Blob
// =============================================================================

/// Binary file content with its content type
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BlobRepr", into = "BlobRepr")]
pub struct Blob {
    bytes: Arc<[u8]>,
    content_type: Option<String>,
}

impl Blob {
    pub fn new(bytes: impl Into<Arc<[u8]>>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Blob holding UTF-8 text
    pub fn from_text(text: &str, content_type: impl Into<String>) -> Self {
        Self::new(text.as_bytes(), Some(content_type.into()))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the content type denotes text
    pub fn is_text(&self) -> bool {
        self.content_type().map_or(false, is_text_content_type)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("size", &self.size())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Serialized blob: content as text or base64 when read, size when written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct BlobRepr {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base64: Option<String>,
}

impl TryFrom<BlobRepr> for Blob {
    type Error = FormaError;

    fn try_from(repr: BlobRepr) -> Result<Self> {
        let bytes: Vec<u8> = match (repr.text, repr.base64) {
            (Some(text), _) => text.into_bytes(),
            (None, Some(encoded)) => BASE64
                .decode(encoded.as_bytes())
                .map_err(|error| FormaError::Derivation(format!("invalid base64 blob: {error}")))?,
            (None, None) => {
                return Err(FormaError::Derivation(
                    "blob needs either text or base64 content".to_string(),
                ))
            }
        };
        Ok(Blob::new(bytes, repr.content_type))
    }
}

impl From<Blob> for BlobRepr {
    fn from(blob: Blob) -> Self {
        BlobRepr {
            size: Some(blob.size()),
            content_type: blob.content_type,
            text: None,
            base64: None,
        }
    }
}

// =============================================================================
// File Value
// =============================================================================

/// Value of a file input
///
/// Any of the fields can be derived from the others: the source from the
/// blob, the blob from a data url or the source, the url from the blob and
/// the hash from the blob.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Text content, or base64 content for binary blobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileValue {
    pub fn from_blob(name: impl Into<String>, blob: Blob) -> Self {
        Self {
            blob: Some(blob),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Fill every field `self` lacks from `other`
    pub fn or(self, other: FileValue) -> FileValue {
        FileValue {
            blob: self.blob.or(other.blob),
            hash: self.hash.or(other.hash),
            name: self.name.or(other.name),
            source: self.source.or(other.source),
            url: self.url.or(other.url),
        }
    }

    /// Size of the blob, zero without one
    pub fn size(&self) -> usize {
        self.blob.as_ref().map_or(0, Blob::size)
    }
}

impl InputValue for FileValue {
    fn is_blank(&self) -> bool {
        self.blob.is_none()
            && self.hash.is_none()
            && self.name.is_none()
            && self.source.is_none()
            && self.url.is_none()
    }

    fn pattern_text(&self) -> Option<Cow<'_, str>> {
        self.name.as_deref().map(Cow::Borrowed)
    }
}

// =============================================================================
// Content Types
// =============================================================================

/// How file content can be presented
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepresentationType {
    Binary,
    Image,
    EmbedableText,
    Text,
    Video,
}

pub fn is_text_content_type(content_type: &str) -> bool {
    pattern_matches(TEXT_CONTENT_TYPE, content_type).unwrap_or(false)
}

/// Classify a content type, ignoring any charset parameter
pub fn determine_representation_type(content_type: &str) -> RepresentationType {
    let stripped = match regex::Regex::new(CHARSET_SUFFIX) {
        Ok(charset) => charset.replace(content_type, ""),
        Err(_) => Cow::Borrowed(content_type),
    };
    let matches = |pattern: &str| pattern_matches(pattern, &stripped).unwrap_or(false);

    if matches(TEXT_CONTENT_TYPE) {
        if matches(EMBEDABLE_TEXT_CONTENT_TYPE) {
            return RepresentationType::EmbedableText;
        }
        return RepresentationType::Text;
    }
    if matches(IMAGE_CONTENT_TYPE) {
        return RepresentationType::Image;
    }
    if matches(VIDEO_CONTENT_TYPE) {
        return RepresentationType::Video;
    }
    RepresentationType::Binary
}

/// Content type of a file value, from its blob or its data url
pub fn determine_content_type(value: &FileValue) -> Option<String> {
    if let Some(content_type) = value.blob.as_ref().and_then(Blob::content_type) {
        return Some(content_type.to_string());
    }
    let url = value.url.as_deref()?;
    let expression = regex::Regex::new(DATA_URL_CONTENT_TYPE).ok()?;
    expression
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|content_type| content_type.as_str().to_string())
}

pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// Decode a `data:` url into a blob
pub fn blob_from_data_url(url: &str) -> Result<Blob> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| FormaError::Derivation("not a data url".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| FormaError::Derivation("data url without payload".to_string()))?;

    let mut parameters = header.split(';');
    let content_type = parameters
        .next()
        .filter(|content_type| !content_type.is_empty())
        .map(str::to_string);
    let is_base64 = parameters.any(|parameter| parameter == "base64");

    let bytes = if is_base64 {
        BASE64
            .decode(payload.as_bytes())
            .map_err(|error| FormaError::Derivation(format!("invalid data url payload: {error}")))?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(Blob::new(bytes, content_type))
}

/// `data:` url embedding the blob's content
pub fn data_url_from_blob(blob: &Blob) -> Option<String> {
    let content_type = blob.content_type()?;
    Some(format!(
        "data:{content_type};base64,{}",
        BASE64.encode(blob.bytes())
    ))
}

/// Decode textual blob content
///
/// Only UTF-8 is supported. A `-sig` suffix on the encoding strips a
/// leading byte order mark. Line endings are normalized to `\n`.
pub fn read_binary_data_into_text(bytes: &[u8], encoding: &str) -> Result<String> {
    let (base, strip_bom) = match encoding.strip_suffix("-sig") {
        Some(base) => (base, true),
        None => (encoding, false),
    };
    if !matches!(base.to_ascii_lowercase().as_str(), "utf-8" | "utf8") {
        return Err(FormaError::Derivation(format!("unsupported encoding {encoding:?}")));
    }

    let mut content = std::str::from_utf8(bytes)
        .map_err(|error| FormaError::Derivation(format!("blob is not valid {base}: {error}")))?;
    if strip_bom {
        content = content.strip_prefix('\u{feff}').unwrap_or(content);
    }
    Ok(content.replace("\r\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representation_types() {
        assert_eq!(
            determine_representation_type("text/plain; charset=utf-8"),
            RepresentationType::EmbedableText
        );
        assert_eq!(determine_representation_type("text/csv"), RepresentationType::Text);
        assert_eq!(determine_representation_type("application/json"), RepresentationType::Text);
        assert_eq!(determine_representation_type("image/PNG"), RepresentationType::Image);
        assert_eq!(determine_representation_type("video/mp4"), RepresentationType::Video);
        assert_eq!(
            determine_representation_type("application/octet-stream"),
            RepresentationType::Binary
        );
    }

    #[test]
    fn test_content_type_from_data_url() {
        let value = FileValue {
            url: Some("data:image/png;base64,AAAA".to_string()),
            ..Default::default()
        };
        assert_eq!(determine_content_type(&value).as_deref(), Some("image/png"));
        assert_eq!(determine_content_type(&FileValue::default()), None);
    }

    #[test]
    fn test_data_url_roundtrip() {
        let blob = Blob::from_text("hello", "text/plain");
        let url = data_url_from_blob(&blob).unwrap();
        assert_eq!(url, "data:text/plain;base64,aGVsbG8=");

        let decoded = blob_from_data_url(&url).unwrap();
        assert_eq!(decoded, blob);

        assert!(blob_from_data_url("data:text/plain").is_err());
        assert!(blob_from_data_url("http://example.com").is_err());
    }

    #[test]
    fn test_read_text() {
        let text = read_binary_data_into_text("\u{feff}a\r\nb".as_bytes(), "utf-8-sig").unwrap();
        assert_eq!(text, "a\nb");

        let kept = read_binary_data_into_text("\u{feff}a".as_bytes(), "utf-8").unwrap();
        assert_eq!(kept, "\u{feff}a");

        assert!(read_binary_data_into_text(&[0xff, 0xfe], "utf-8").is_err());
        assert!(read_binary_data_into_text(b"a", "latin-1").is_err());
    }

    #[test]
    fn test_blob_serde() {
        let blob: Blob = serde_json::from_str(r#"{"type": "text/plain", "text": "hi"}"#).unwrap();
        assert_eq!(blob.bytes(), b"hi");
        assert!(blob.is_text());

        let json = serde_json::to_value(&blob).unwrap();
        assert_eq!(json["size"], 2);
        assert_eq!(json["type"], "text/plain");

        assert!(serde_json::from_str::<Blob>(r#"{"type": "text/plain"}"#).is_err());
    }

    #[test]
    fn test_merge_values() {
        let local = FileValue {
            source: Some("x".to_string()),
            name: Some("local.txt".to_string()),
            ..Default::default()
        };
        let given = FileValue {
            name: Some("given.txt".to_string()),
            ..Default::default()
        };
        let merged = given.or(local);

        assert_eq!(merged.name.as_deref(), Some("given.txt"));
        assert_eq!(merged.source.as_deref(), Some("x"));
    }
}
