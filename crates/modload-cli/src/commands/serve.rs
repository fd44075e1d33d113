//! `modload serve` command implementation.
//!
//! Serves every file under a root directory as an importable module:
//!
//! ```text
//! GET /data/config.json?ext=txt
//!   → join onto root (reject `..`)
//!   → read file
//!   → Loader::parse (plugins, then extension rules)
//!   → Loader::fetch (buffer / generated code / data URI / file reference)
//!   → 200 with the result's content type
//! ```
//!
//! Any failure along the way answers 404 with the error text as the body.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use miette::{IntoDiagnostic, Result};
use modload_core::config::load_config;
use modload_core::resolve::read_file;
use modload_core::{
    FileConfig, LoadError, Loader, LoaderOptions, ParseInput, ServerConfig, SignaturePlugin,
};
use modload_util::path::join_under_root;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

/// Serve action as given on the command line. Unset fields fall back to the
/// config file, then to defaults.
#[derive(Debug, Clone, Default)]
pub struct ServeAction {
    /// Working directory.
    pub cwd: PathBuf,
    /// Directory to serve.
    pub root: Option<PathBuf>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Host to bind to.
    pub host: Option<String>,
    /// Explicit config file path (overrides auto-discovery).
    pub config: Option<PathBuf>,
    /// Force JSON files through the module rule.
    pub json_to_ts: bool,
    /// Force text files through the module rule.
    pub txt_to_ts: bool,
    /// Register the built-in content sniffers.
    pub sniff: bool,
}

/// Settings after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSettings {
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    pub sniff: bool,
    pub options: LoaderOptions,
}

impl ServeAction {
    /// Merge this action over a config file. Flags win.
    #[must_use]
    pub fn settings(&self, file: FileConfig) -> ServeSettings {
        let FileConfig { loader, server } = file;
        let ServerConfig {
            root,
            host,
            port,
            sniff,
        } = server;

        let root = self
            .root
            .clone()
            .or(root)
            .unwrap_or_else(|| self.cwd.clone());
        let root = if root.is_relative() {
            self.cwd.join(root)
        } else {
            root
        };

        let mut options = loader;
        options.json_to_ts |= self.json_to_ts;
        options.txt_to_ts |= self.txt_to_ts;

        ServeSettings {
            root,
            host: self.host.clone().unwrap_or(host),
            port: self.port.unwrap_or(port),
            sniff: sniff || self.sniff,
            options,
        }
    }
}

/// Shared state for request handlers.
#[derive(Debug)]
pub struct ServeState {
    /// Directory request paths are joined onto.
    pub root: PathBuf,
    pub loader: Loader,
}

impl ServeState {
    #[must_use]
    pub fn new(root: PathBuf, loader: Loader) -> Self {
        Self { root, loader }
    }

    /// Build the loader and state for merged settings.
    #[must_use]
    pub fn from_settings(settings: &ServeSettings) -> Self {
        let mut builder = Loader::builder().options(settings.options.clone());
        if settings.sniff {
            builder = builder.plugins(SignaturePlugin::defaults());
        }
        Self::new(settings.root.clone(), builder.build())
    }
}

/// Run the server until the process is stopped.
pub async fn run(action: ServeAction) -> Result<()> {
    let search_dir = action.root.as_ref().map_or_else(
        || action.cwd.clone(),
        |root| action.cwd.join(root),
    );
    let file = load_config(&search_dir, action.config.as_deref()).into_diagnostic()?;
    let settings = action.settings(file);

    let root = settings.root.canonicalize().into_diagnostic()?;
    let state = Arc::new(ServeState::from_settings(&ServeSettings {
        root,
        ..settings.clone()
    }));

    let host_ip = if settings.host == "localhost" {
        "127.0.0.1"
    } else {
        settings.host.as_str()
    };
    let addr: SocketAddr = format!("{host_ip}:{}", settings.port)
        .parse()
        .into_diagnostic()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;

    tracing::info!(
        root = %state.root.display(),
        %addr,
        plugins = ?state.loader.plugins().names(),
        json_to_ts = settings.options.json_to_ts,
        txt_to_ts = settings.options.txt_to_ts,
        "serving"
    );
    println!();
    println!("  modload serving {}", state.root.display());
    println!("  Listening on http://{}:{}", settings.host, settings.port);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    axum::serve(listener, router(state)).await.into_diagnostic()?;

    Ok(())
}

/// The HTTP surface: every GET path is a file under the root.
pub fn router(state: Arc<ServeState>) -> Router {
    Router::new()
        .route("/", get(serve_file))
        .route("/*path", get(serve_file))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ExtQuery {
    ext: Option<String>,
}

async fn serve_file(
    State(state): State<Arc<ServeState>>,
    method: Method,
    uri: Uri,
    query: Result<Query<ExtQuery>, QueryRejection>,
) -> Response {
    let start = Instant::now();
    let path = uri.path();

    let outcome = match query {
        Ok(Query(query)) => load(&state, path, query.ext).await,
        Err(rejection) => Err(LoadError::InvalidUri {
            uri: uri.to_string(),
            reason: rejection.body_text(),
        }),
    };

    match outcome {
        Ok((content_type, body)) => {
            tracing::info!(
                %method,
                path,
                status = 200,
                content_type = %content_type,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "served"
            );
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            tracing::warn!(
                %method,
                path,
                status = 404,
                error = %e,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "not served"
            );
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

async fn load(
    state: &ServeState,
    path: &str,
    ext: Option<String>,
) -> Result<(String, Bytes), LoadError> {
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|e| LoadError::InvalidUri {
            uri: path.to_string(),
            reason: e.to_string(),
        })?;

    let file_path = join_under_root(&state.root, &decoded).ok_or_else(|| LoadError::NotFound {
        path: PathBuf::from(&*decoded),
    })?;

    let buf = read_file(&file_path).await?;
    let input = ParseInput::new(buf, &*decoded).with_extension(ext);
    let result = state.loader.parse(&input);

    tracing::debug!(
        path = %decoded,
        content_type = %result.content_type,
        payload = result.payload.kind(),
        "parsed"
    );

    let body = state.loader.fetch(&result).await?;
    Ok((result.content_type, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modload_core::content_type;
    use std::path::Path;
    use tempfile::tempdir;

    async fn spawn(root: &Path, loader: Loader) -> SocketAddr {
        let state = Arc::new(ServeState::new(root.to_path_buf(), loader));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        addr
    }

    async fn get(addr: SocketAddr, path: &str) -> (u16, String, String) {
        let resp = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.text().await.unwrap();
        (status, content_type, body)
    }

    #[tokio::test]
    async fn test_serves_javascript_verbatim() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "export const a = 1;").unwrap();
        let addr = spawn(dir.path(), Loader::default()).await;

        let (status, ctype, body) = get(addr, "/app.js").await;
        assert_eq!(status, 200);
        assert_eq!(ctype, content_type::JAVASCRIPT);
        assert_eq!(body, "export const a = 1;");
    }

    #[tokio::test]
    async fn test_missing_file_is_404_with_message() {
        let dir = tempdir().unwrap();
        let addr = spawn(dir.path(), Loader::default()).await;

        let (status, _, body) = get(addr, "/nope.ts").await;
        assert_eq!(status, 404);
        assert!(body.contains("nope.ts"), "body: {body}");
    }

    #[tokio::test]
    async fn test_ext_query_overrides_extension() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), r#"{"a":1}"#).unwrap();
        let addr = spawn(dir.path(), Loader::default()).await;

        let (status, ctype, body) = get(addr, "/data.json?ext=txt").await;
        assert_eq!(status, 200);
        assert_eq!(ctype, content_type::TEXT);
        assert_eq!(body, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_html_serves_generated_module() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "<b>hi</b>").unwrap();
        let addr = spawn(dir.path(), Loader::default()).await;

        let (status, ctype, body) = get(addr, "/page.html").await;
        assert_eq!(status, 200);
        assert_eq!(ctype, content_type::TYPESCRIPT);
        assert!(body.contains("DOMParser"), "body: {body}");
        assert!(body.contains(r#""<b>hi</b>""#), "body: {body}");
    }

    #[tokio::test]
    async fn test_json_to_ts_serves_module() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), " [1] \n").unwrap();
        let loader = Loader::new(LoaderOptions::default().with_json_to_ts(true));
        let addr = spawn(dir.path(), loader).await;

        let (status, ctype, body) = get(addr, "/data.json").await;
        assert_eq!(status, 200);
        assert_eq!(ctype, content_type::TYPESCRIPT);
        assert_eq!(body, "export default [1];");
    }

    #[tokio::test]
    async fn test_malformed_query_is_404() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        let addr = spawn(dir.path(), Loader::default()).await;

        let (status, _, body) = get(addr, "/a.json?ext=txt&ext=js").await;
        assert_eq!(status, 404);
        assert!(body.contains("ext"), "body: {body}");

        let (status, _, _) = get(addr, "/missing.json?ext=a&ext=b").await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_unrelated_query_params_are_ignored() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "1;").unwrap();
        let addr = spawn(dir.path(), Loader::default()).await;

        let (status, ctype, _) = get(addr, "/a.js?t=123").await;
        assert_eq!(status, 200);
        assert_eq!(ctype, content_type::JAVASCRIPT);
    }

    #[tokio::test]
    async fn test_nested_and_encoded_paths() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a dir")).unwrap();
        std::fs::write(dir.path().join("a dir/note.txt"), "hello").unwrap();
        let addr = spawn(dir.path(), Loader::default()).await;

        let (status, ctype, body) = get(addr, "/a%20dir/note.txt").await;
        assert_eq!(status, 200);
        assert_eq!(ctype, content_type::TEXT);
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("public");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "s3cret").unwrap();
        let addr = spawn(&root, Loader::default()).await;

        let (status, _, body) = get(addr, "/..%2fsecret.txt").await;
        assert_eq!(status, 404);
        assert!(!body.contains("s3cret"));
    }

    #[tokio::test]
    async fn test_sniffing_plugin_claims_png() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("image.dat"),
            b"\x89PNG\r\n\x1a\n\x00\x00",
        )
        .unwrap();
        let settings = ServeSettings {
            root: dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            sniff: true,
            options: LoaderOptions::default(),
        };
        let state = ServeState::from_settings(&settings);
        let addr = spawn(dir.path(), state.loader).await;

        let resp = reqwest::get(format!("http://{addr}/image.dat")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(
            resp.headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn test_cors_is_permissive() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export {};").unwrap();
        let addr = spawn(dir.path(), Loader::default()).await;

        let resp = reqwest::Client::new()
            .get(format!("http://{addr}/a.ts"))
            .header(reqwest::header::ORIGIN, "http://example.com")
            .send()
            .await
            .unwrap();
        assert_eq!(
            resp.headers()
                .get(reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[test]
    fn test_flags_override_config_file() {
        let action = ServeAction {
            cwd: PathBuf::from("/work"),
            port: Some(9000),
            txt_to_ts: true,
            ..Default::default()
        };
        let file: FileConfig = serde_json::from_str(
            r#"{"jsonToTS": true, "server": {"root": "/srv", "port": 8080, "host": "0.0.0.0"}}"#,
        )
        .unwrap();

        let settings = action.settings(file);
        assert_eq!(settings.root, PathBuf::from("/srv"));
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.host, "0.0.0.0");
        assert!(settings.options.json_to_ts);
        assert!(settings.options.txt_to_ts);
        assert!(!settings.sniff);
    }

    #[test]
    fn test_defaults_serve_cwd() {
        let action = ServeAction {
            cwd: PathBuf::from("/work"),
            root: Some(PathBuf::from("site")),
            ..Default::default()
        };

        let settings = action.settings(FileConfig::default());
        assert_eq!(settings.root, PathBuf::from("/work/site"));
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 7000);
    }
}
