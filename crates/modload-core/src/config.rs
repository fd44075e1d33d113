use crate::error::Error;
use crate::options::LoaderOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the served root when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "modload.json";

/// Runtime configuration for the modload CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// HTTP adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory request paths are joined onto. Relative paths are taken
    /// relative to the config file's directory.
    pub root: Option<PathBuf>,
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Register the built-in content sniffers (PNG, JPEG, GIF, WebP, PDF, WASM).
    pub sniff: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: None,
            host: "localhost".to_string(),
            port: 7000,
            sniff: false,
        }
    }
}

/// Contents of a `modload.json` file.
///
/// Loader options sit at the top level, server settings under `"server"`:
///
/// ```json
/// { "jsonToTS": true, "server": { "port": 8080 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(flatten)]
    pub loader: LoaderOptions,
    pub server: ServerConfig,
}

/// Find `modload.json` in `dir`.
#[must_use]
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

/// Read and parse a config file.
pub fn load_config_file(path: &Path) -> Result<FileConfig, Error> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config: FileConfig =
        serde_json::from_str(&raw).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    if let (Some(root), Some(base)) = (config.server.root.as_ref(), path.parent()) {
        if root.is_relative() {
            config.server.root = Some(base.join(root));
        }
    }

    Ok(config)
}

/// Load the config for `dir`: an explicit file wins, else `modload.json` in
/// `dir`, else defaults.
pub fn load_config(dir: &Path, explicit: Option<&Path>) -> Result<FileConfig, Error> {
    match explicit.map(Path::to_path_buf).or_else(|| find_config_file(dir)) {
        Some(path) => load_config_file(&path),
        None => Ok(FileConfig::default()),
    }
}
