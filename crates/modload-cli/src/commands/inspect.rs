//! `modload inspect` command implementation.
//!
//! Runs one file through the loader and reports the load result: which
//! plugin or extension rule claimed it, the content type, and the payload.
//! With `--load` the result is also resolved and evaluated.

use miette::{IntoDiagnostic, Result};
use modload_core::config::load_config;
use modload_core::resolve::read_file;
use modload_core::{
    FileKind, LoadError, LoadResult, LoadedValue, Loader, ParseInput, Payload, SignaturePlugin,
};
use serde::Serialize;
use std::path::PathBuf;

/// Schema version of the `--json` output.
pub const INSPECT_SCHEMA_VERSION: u32 = 1;

/// Inspect action.
#[derive(Debug, Clone, Default)]
pub struct InspectAction {
    /// Working directory; relative `file` paths and config discovery use it.
    pub cwd: PathBuf,
    /// File to inspect.
    pub file: PathBuf,
    /// Extension override.
    pub ext: Option<String>,
    /// Explicit config file path (overrides auto-discovery).
    pub config: Option<PathBuf>,
    pub json_to_ts: bool,
    pub txt_to_ts: bool,
    /// Register the built-in content sniffers.
    pub sniff: bool,
    /// Resolve and evaluate the result.
    pub load: bool,
}

/// Inspect result for JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub schema_version: u32,
    pub ok: bool,
    pub source: String,
    pub extension: String,
    pub kind: String,
    /// Name of the plugin that claimed the file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    pub content_type: String,
    pub payload: PayloadJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueJson>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadJson {
    ReferenceUri { uri: String },
    Buffer { len: usize },
    FileReference { path: String },
    GeneratedSource { code: String },
}

impl From<&Payload> for PayloadJson {
    fn from(payload: &Payload) -> Self {
        match payload {
            Payload::ReferenceUri(uri) => Self::ReferenceUri { uri: uri.clone() },
            Payload::Buffer(bytes) => Self::Buffer { len: bytes.len() },
            Payload::FileReference(path) => Self::FileReference {
                path: path.display().to_string(),
            },
            Payload::GeneratedSource(code) => Self::GeneratedSource { code: code.clone() },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValueJson {
    pub kind: String,
    pub display: String,
}

impl From<&LoadedValue> for ValueJson {
    fn from(value: &LoadedValue) -> Self {
        Self {
            kind: value.kind().to_string(),
            display: value.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct InspectErrorJson {
    code: String,
    message: String,
}

/// Inspect error result for JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectErrorResult {
    schema_version: u32,
    ok: bool,
    error: InspectErrorJson,
}

/// Why an inspection failed.
#[derive(Debug)]
pub struct InspectFailure {
    pub code: &'static str,
    pub message: String,
}

impl InspectFailure {
    fn config(e: &modload_core::Error) -> Self {
        Self {
            code: "INSPECT_CONFIG_INVALID",
            message: e.to_string(),
        }
    }

    fn read(e: &LoadError) -> Self {
        let code = if e.is_not_found() {
            "INSPECT_FILE_NOT_FOUND"
        } else {
            "INSPECT_READ_FAILED"
        };
        Self {
            code,
            message: e.to_string(),
        }
    }

    fn load(e: &LoadError) -> Self {
        Self {
            code: "INSPECT_LOAD_FAILED",
            message: e.to_string(),
        }
    }
}

/// Run the inspect command.
pub fn run(action: InspectAction, json: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;

    match runtime.block_on(inspect(&action)) {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string(&report).into_diagnostic()?);
            } else {
                print_human(&report);
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                let result = InspectErrorResult {
                    schema_version: INSPECT_SCHEMA_VERSION,
                    ok: false,
                    error: InspectErrorJson {
                        code: failure.code.to_string(),
                        message: failure.message,
                    },
                };
                println!("{}", serde_json::to_string(&result).into_diagnostic()?);
            } else {
                eprintln!("error: {}", failure.message);
            }
            std::process::exit(1);
        }
    }
}

/// Build the loader for `action`, parse the file, and optionally load it.
pub async fn inspect(action: &InspectAction) -> std::result::Result<InspectReport, InspectFailure> {
    let file_config =
        load_config(&action.cwd, action.config.as_deref()).map_err(|e| InspectFailure::config(&e))?;

    let mut options = file_config.loader;
    options.json_to_ts |= action.json_to_ts;
    options.txt_to_ts |= action.txt_to_ts;

    let mut builder = Loader::builder().options(options);
    if action.sniff || file_config.server.sniff {
        builder = builder.plugins(SignaturePlugin::defaults());
    }
    let loader = builder.build();

    let path = action.cwd.join(&action.file);
    let buf = read_file(&path).await.map_err(|e| InspectFailure::read(&e))?;

    let source = action.file.to_string_lossy().replace('\\', "/");
    let input = ParseInput::new(buf, source.clone()).with_extension(action.ext.clone());
    let plugin = loader.matching_plugin(&input).map(|p| p.name().to_string());
    let extension = input.extension();
    let result = loader.parse(&input);

    tracing::debug!(
        source = %source,
        plugin = ?plugin,
        content_type = %result.content_type,
        payload = result.payload.kind(),
        "parsed"
    );

    let value = if action.load {
        let value = loader
            .load(&result)
            .await
            .map_err(|e| InspectFailure::load(&e))?;
        Some(ValueJson::from(&value))
    } else {
        None
    };

    Ok(report(source, extension, plugin, &result, value))
}

fn report(
    source: String,
    extension: String,
    plugin: Option<String>,
    result: &LoadResult,
    value: Option<ValueJson>,
) -> InspectReport {
    let kind = if plugin.is_some() {
        "plugin".to_string()
    } else {
        FileKind::from_extension(&extension).to_string()
    };

    InspectReport {
        schema_version: INSPECT_SCHEMA_VERSION,
        ok: true,
        source,
        extension,
        kind,
        plugin,
        content_type: result.content_type.clone(),
        payload: PayloadJson::from(&result.payload),
        value,
    }
}

fn print_human(report: &InspectReport) {
    println!("  Source:       {}", report.source);
    println!(
        "  Extension:    {}",
        if report.extension.is_empty() {
            "(none)"
        } else {
            &report.extension
        }
    );
    match &report.plugin {
        Some(name) => println!("  Claimed by:   plugin {name}"),
        None => println!("  Rule:         {}", report.kind),
    }
    println!("  Content-Type: {}", report.content_type);

    match &report.payload {
        PayloadJson::Buffer { len } => println!("  Payload:      buffer ({len} bytes)"),
        PayloadJson::FileReference { path } => println!("  Payload:      file {path}"),
        PayloadJson::ReferenceUri { uri } => {
            println!("  Payload:      reference URI ({} chars)", uri.len());
            println!();
            println!("{uri}");
        }
        PayloadJson::GeneratedSource { code } => {
            println!("  Payload:      generated source");
            println!();
            println!("{code}");
        }
    }

    if let Some(value) = &report.value {
        println!();
        println!("  Value ({}):", value.kind);
        println!("{}", value.display);
    }
}
