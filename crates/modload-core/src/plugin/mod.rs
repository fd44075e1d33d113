//! Plugin system for the loader.
//!
//! A plugin is a predicate plus a transform. Plugins are consulted in
//! registration order before any built-in rule, and the first plugin whose
//! [`Plugin::test`] returns `true` produces the result on its own: neither
//! later plugins nor the extension rules run.
//!
//! ## Example
//!
//! ```ignore
//! use modload_core::{content_type, LoadResult, LoaderOptions, Plugin};
//! use bytes::Bytes;
//!
//! struct YamlPlugin;
//!
//! impl Plugin for YamlPlugin {
//!     fn name(&self) -> &str { "yaml" }
//!
//!     fn test(&self, _buf: &[u8], source: &str) -> bool {
//!         source.ends_with(".yaml")
//!     }
//!
//!     fn transform(&self, buf: &Bytes, _source: &str, _options: &LoaderOptions) -> LoadResult {
//!         LoadResult::buffer("application/yaml", buf.clone())
//!     }
//! }
//! ```

mod builtin;

pub use builtin::{FileReferencePlugin, SignaturePlugin};

use crate::options::LoaderOptions;
use crate::result::LoadResult;
use bytes::Bytes;
use std::fmt;

/// An override that can claim inputs before the built-in rules see them.
///
/// Plugins are shared across concurrent requests and must not keep per-call
/// state.
pub trait Plugin: Send + Sync {
    /// Plugin name for debugging and logs.
    fn name(&self) -> &str;

    /// Whether this plugin handles the input.
    fn test(&self, buf: &[u8], source: &str) -> bool;

    /// Produce the result for an input this plugin claimed.
    fn transform(&self, buf: &Bytes, source: &str, options: &LoaderOptions) -> LoadResult;
}

/// Ordered plugin list. Insertion order is dispatch order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin.
    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// The first plugin claiming the input, if any.
    #[must_use]
    pub fn find(&self, buf: &[u8], source: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.test(buf, source))
            .map(AsRef::as_ref)
    }

    /// Names in dispatch order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

type TestFn = dyn Fn(&[u8], &str) -> bool + Send + Sync;
type TransformFn = dyn Fn(&Bytes, &str, &LoaderOptions) -> LoadResult + Send + Sync;

/// Plugin backed by a pair of closures.
pub struct FnPlugin {
    name: String,
    test: Box<TestFn>,
    transform: Box<TransformFn>,
}

impl FnPlugin {
    /// Create a plugin from a predicate and a transform.
    pub fn new(
        name: impl Into<String>,
        test: impl Fn(&[u8], &str) -> bool + Send + Sync + 'static,
        transform: impl Fn(&Bytes, &str, &LoaderOptions) -> LoadResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            test: Box::new(test),
            transform: Box::new(transform),
        }
    }
}

impl Plugin for FnPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, buf: &[u8], source: &str) -> bool {
        (self.test)(buf, source)
    }

    fn transform(&self, buf: &Bytes, source: &str, options: &LoaderOptions) -> LoadResult {
        (self.transform)(buf, source, options)
    }
}
