//! The outcome of [`Loader::parse`](crate::Loader::parse).

use bytes::Bytes;
use std::path::PathBuf;

/// Content types produced by the built-in rules.
pub mod content_type {
    pub const JAVASCRIPT: &str = "application/javascript";
    pub const TYPESCRIPT: &str = "application/typescript";
    pub const JSON: &str = "application/json";
    pub const TEXT: &str = "text/plain";
    pub const OCTET_STREAM: &str = "application/octet-stream";

    /// The media type without parameters, lower-cased
    /// (`Text/Plain; charset=utf-8` → `text/plain`).
    #[must_use]
    pub fn essence(content_type: &str) -> String {
        content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    /// Whether payloads of this type are evaluated as modules.
    #[must_use]
    pub fn is_module(content_type: &str) -> bool {
        matches!(
            essence(content_type).as_str(),
            "application/typescript" | "application/javascript" | "text/javascript"
        )
    }
}

/// What the caller has to do to obtain the final bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Fetch this URI (usually a self-contained `data:` URI).
    ReferenceUri(String),
    /// Use these bytes as they are.
    Buffer(Bytes),
    /// Read this file.
    FileReference(PathBuf),
    /// Synthesized module source.
    GeneratedSource(String),
}

impl Payload {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReferenceUri(_) => "reference_uri",
            Self::Buffer(_) => "buffer",
            Self::FileReference(_) => "file_reference",
            Self::GeneratedSource(_) => "generated_source",
        }
    }
}

/// A payload tagged with the content type that says how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub content_type: String,
    pub payload: Payload,
}

impl LoadResult {
    pub fn new(content_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            content_type: content_type.into(),
            payload,
        }
    }

    pub fn buffer(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self::new(content_type, Payload::Buffer(bytes.into()))
    }

    pub fn generated(content_type: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(content_type, Payload::GeneratedSource(code.into()))
    }

    pub fn reference_uri(content_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::new(content_type, Payload::ReferenceUri(uri.into()))
    }

    pub fn file_reference(content_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(content_type, Payload::FileReference(path.into()))
    }
}
