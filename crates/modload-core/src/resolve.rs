//! Resolution stage: turns a [`LoadResult`] into bytes, then into a value.
//!
//! Unlike [`Loader::parse`](crate::Loader::parse), everything here can fail.

use crate::error::LoadError;
use crate::evaluate::{LoadedValue, ModuleEvaluator};
use crate::result::{content_type, LoadResult, Payload};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use std::path::Path;
use url::Url;

/// Fetches references. Holds one HTTP client reused across calls.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    client: reqwest::Client,
}

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing HTTP client for `http`/`https` references.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The bytes a result stands for.
    pub async fn fetch(&self, result: &LoadResult) -> Result<Bytes, LoadError> {
        match &result.payload {
            Payload::Buffer(bytes) => Ok(bytes.clone()),
            Payload::GeneratedSource(code) => Ok(Bytes::from(code.clone())),
            Payload::FileReference(path) => read_file(path).await,
            Payload::ReferenceUri(uri) => self.fetch_uri(uri).await,
        }
    }

    /// Fetch a `data:`, `file:`, `http:` or `https:` URI.
    pub async fn fetch_uri(&self, uri: &str) -> Result<Bytes, LoadError> {
        if uri.starts_with("data:") {
            return decode_data_uri(uri).map(|(_, bytes)| bytes);
        }

        let url = Url::parse(uri).map_err(|e| LoadError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "file" => {
                let path = url.to_file_path().map_err(|()| LoadError::InvalidUri {
                    uri: uri.to_string(),
                    reason: "not a local file path".to_string(),
                })?;
                read_file(&path).await
            }
            "http" | "https" => self.fetch_http(url).await,
            scheme => Err(LoadError::UnsupportedScheme {
                scheme: scheme.to_string(),
            }),
        }
    }

    async fn fetch_http(&self, url: Url) -> Result<Bytes, LoadError> {
        let uri = url.to_string();
        let fetch_error = |source: reqwest::Error| LoadError::Fetch {
            uri: uri.clone(),
            source,
        };

        self.client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(fetch_error)?
            .bytes()
            .await
            .map_err(fetch_error)
    }
}

/// Read a whole file.
pub async fn read_file(path: &Path) -> Result<Bytes, LoadError> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|e| LoadError::from_io(path, e))
}

/// Split a `data:` URI into its media type and decoded bytes.
///
/// An omitted media type defaults to `text/plain;charset=US-ASCII`.
pub fn decode_data_uri(uri: &str) -> Result<(String, Bytes), LoadError> {
    let rest = uri.strip_prefix("data:").ok_or_else(|| LoadError::InvalidDataUri {
        reason: "missing data: prefix".to_string(),
    })?;

    let (meta, data) = rest.split_once(',').ok_or_else(|| LoadError::InvalidDataUri {
        reason: "missing ',' separator".to_string(),
    })?;

    let (media_type, is_base64) = match meta.strip_suffix(";base64") {
        Some(media_type) => (media_type, true),
        None => (meta, false),
    };

    let media_type = if media_type.is_empty() {
        "text/plain;charset=US-ASCII".to_string()
    } else {
        media_type.to_string()
    };

    let bytes = if is_base64 {
        let data: Vec<u8> = percent_decode_str(data).collect();
        STANDARD
            .decode(data)
            .map_err(|e| LoadError::InvalidDataUri {
                reason: e.to_string(),
            })?
    } else {
        percent_decode_str(data).collect()
    };

    Ok((media_type, Bytes::from(bytes)))
}

/// Interpret fetched bytes according to their content type.
pub fn load_value(
    content_type: &str,
    bytes: Bytes,
    evaluator: &dyn ModuleEvaluator,
) -> Result<LoadedValue, LoadError> {
    match content_type::essence(content_type).as_str() {
        content_type::JSON => Ok(LoadedValue::Json(serde_json::from_slice(&bytes)?)),
        content_type::TEXT => Ok(LoadedValue::Text(String::from_utf8(bytes.to_vec())?)),
        content_type::OCTET_STREAM => Ok(LoadedValue::Bytes(bytes)),
        _ if content_type::is_module(content_type) => {
            let code = String::from_utf8(bytes.to_vec())?;
            evaluator.evaluate(&code, content_type)
        }
        _ => Err(LoadError::UnsupportedContentType {
            content_type: content_type.to_string(),
        }),
    }
}
