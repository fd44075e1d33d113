//! Extension-based classification.
//!
//! Consulted only when no plugin claims an input.

use serde::Serialize;
use std::fmt;

/// Semantic kind of a file, selecting the transform rule applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    JavaScript,
    TypeScript,
    Css,
    Html,
    Json,
    Text,
    /// Anything unrecognized, including a missing extension.
    Buffer,
}

impl FileKind {
    /// Classify a (case-insensitive) extension without a leading dot.
    ///
    /// Compound extensions such as `tar.gz` are matched as a whole and so
    /// fall through to [`FileKind::Buffer`].
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "js" => Self::JavaScript,
            "ts" => Self::TypeScript,
            "css" => Self::Css,
            "html" => Self::Html,
            "json" => Self::Json,
            "txt" => Self::Text,
            _ => Self::Buffer,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Css => "CSS",
            Self::Html => "HTML",
            Self::Json => "JSON",
            Self::Text => "Text",
            Self::Buffer => "Buffer",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The extension of a source identifier: everything after its first `.`,
/// or `""` if there is none.
///
/// The split runs over the whole identifier, so a dot in a directory name
/// starts the extension (`/dir.v2/app.js` → `v2/app.js`).
#[must_use]
pub fn extension_of(source: &str) -> &str {
    source.split_once('.').map_or("", |(_, ext)| ext)
}

/// The extension used for dispatch: the override when given, else the one
/// inferred from `source`. Always lower-cased, without a leading dot.
#[must_use]
pub fn effective_extension(source: &str, ext_override: Option<&str>) -> String {
    let ext = match ext_override {
        Some(ext) => ext.strip_prefix('.').unwrap_or(ext),
        None => extension_of(source),
    };
    ext.to_ascii_lowercase()
}
