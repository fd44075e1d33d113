#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use modload_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "modload")]
#[command(author, version, about = "Serve any file as an importable module", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Serve a directory over HTTP, turning every file into a module
    Serve {
        /// Directory to serve (default: config file `server.root`, then cwd)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Port to listen on (default: 7000)
        #[arg(long, short = 'p', env = "MODLOAD_PORT")]
        port: Option<u16>,

        /// Host to bind to (default: localhost)
        #[arg(long)]
        host: Option<String>,

        /// Path to a config file (default: modload.json in the root)
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,

        /// Serve JSON files as modules exporting the parsed document
        #[arg(long)]
        json_to_ts: bool,

        /// Serve text files as modules exporting the text
        #[arg(long)]
        txt_to_ts: bool,

        /// Detect images, PDF and WebAssembly by their leading bytes
        #[arg(long)]
        sniff: bool,
    },

    /// Show how a single file would be loaded
    Inspect {
        /// File to inspect
        file: PathBuf,

        /// Treat the file as having this extension
        #[arg(long)]
        ext: Option<String>,

        /// Path to a config file (default: modload.json in the cwd)
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,

        /// Serve JSON files as modules exporting the parsed document
        #[arg(long)]
        json_to_ts: bool,

        /// Serve text files as modules exporting the text
        #[arg(long)]
        txt_to_ts: bool,

        /// Detect images, PDF and WebAssembly by their leading bytes
        #[arg(long)]
        sniff: bool,

        /// Also resolve the result and evaluate it to a value
        #[arg(long)]
        load: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Serve {
            root,
            port,
            host,
            config: config_file,
            json_to_ts,
            txt_to_ts,
            sniff,
        }) => {
            let action = commands::serve::ServeAction {
                cwd: config.cwd,
                root,
                port,
                host,
                config: config_file,
                json_to_ts,
                txt_to_ts,
                sniff,
            };

            let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
            rt.block_on(commands::serve::run(action))
        }
        Some(Commands::Inspect {
            file,
            ext,
            config: config_file,
            json_to_ts,
            txt_to_ts,
            sniff,
            load,
        }) => {
            let action = commands::inspect::InspectAction {
                cwd: config.cwd,
                file,
                ext,
                config: config_file,
                json_to_ts,
                txt_to_ts,
                sniff,
                load,
            };
            commands::inspect::run(action, cli.json)
        }
    }
}
