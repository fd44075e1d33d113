use std::path::PathBuf;
use thiserror::Error;

/// Core error type for configuration and setup.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while resolving a [`LoadResult`](crate::LoadResult) into bytes or a value.
///
/// Parsing never fails; every error a caller can observe comes from this
/// stage.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Unsupported URI scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("Malformed data URI: {reason}")]
    InvalidDataUri { reason: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid UTF-8 text: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    #[error("Module evaluation failed: {reason}")]
    Evaluate { reason: String },
}

impl LoadError {
    /// Map an I/O error on `path`, keeping "not found" distinct.
    #[must_use]
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Read { path, source }
        }
    }

    pub(crate) fn evaluate(reason: impl Into<String>) -> Self {
        Self::Evaluate {
            reason: reason.into(),
        }
    }

    /// Whether this error means the requested resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_not_found() {
        let err = LoadError::from_io(
            "/missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "File not found: /missing.txt");
    }

    #[test]
    fn test_from_io_other() {
        let err = LoadError::from_io(
            "/locked.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_not_found());
        assert!(err.to_string().starts_with("Failed to read /locked.txt"));
    }
}
