#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Classify files and turn them into importable modules.
//!
//! The entry point is [`Loader::parse`]: it hands the input to each registered
//! [`Plugin`] in order, and when none claims it, dispatches on the file
//! extension to a built-in transform rule. The resulting [`LoadResult`] is
//! turned into bytes or a value by [`Loader::fetch`] and [`Loader::load`].

pub mod classify;
pub mod config;
pub mod css;
pub mod error;
pub mod evaluate;
pub mod html;
pub mod loader;
pub mod options;
pub mod plugin;
pub mod resolve;
pub mod result;
pub mod rules;
pub mod version;

pub use classify::{effective_extension, extension_of, FileKind};
pub use config::{Config, FileConfig, ServerConfig};
pub use error::{Error, LoadError};
pub use evaluate::{LiteralEvaluator, LoadedValue, ModuleEvaluator};
pub use loader::{Loader, LoaderBuilder, ParseInput};
pub use options::LoaderOptions;
pub use plugin::{FileReferencePlugin, FnPlugin, Plugin, PluginRegistry, SignaturePlugin};
pub use result::{content_type, LoadResult, Payload};
pub use version::VERSION;
