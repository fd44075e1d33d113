//! The loader: plugin dispatch, then extension rules.

use crate::classify::{effective_extension, FileKind};
use crate::error::LoadError;
use crate::evaluate::{LiteralEvaluator, LoadedValue, ModuleEvaluator};
use crate::options::LoaderOptions;
use crate::plugin::{Plugin, PluginRegistry};
use crate::resolve::{load_value, Resolver};
use crate::result::LoadResult;
use crate::rules;
use bytes::Bytes;

/// One input to [`Loader::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseInput {
    /// Raw file contents.
    pub buf: Bytes,
    /// Path-like identifier, used for extension inference and plugin tests.
    pub source: String,
    /// Extension override; wins over the one inferred from `source`.
    pub ext: Option<String>,
}

impl ParseInput {
    pub fn new(buf: impl Into<Bytes>, source: impl Into<String>) -> Self {
        Self {
            buf: buf.into(),
            source: source.into(),
            ext: None,
        }
    }

    /// Set or clear the extension override.
    #[must_use]
    pub fn with_extension(mut self, ext: Option<impl Into<String>>) -> Self {
        self.ext = ext.map(Into::into);
        self
    }

    /// The lower-cased extension dispatch uses when no plugin matches.
    #[must_use]
    pub fn extension(&self) -> String {
        effective_extension(&self.source, self.ext.as_deref())
    }
}

/// Classifies inputs and turns them into [`LoadResult`]s.
///
/// Plugins, options and the evaluator are fixed at construction. `parse`
/// keeps no per-call state, so one loader can serve any number of
/// concurrent requests behind an `Arc`.
pub struct Loader {
    plugins: PluginRegistry,
    options: LoaderOptions,
    evaluator: Box<dyn ModuleEvaluator>,
    resolver: Resolver,
}

impl Loader {
    /// A loader with no plugins and the literal evaluator.
    #[must_use]
    pub fn new(options: LoaderOptions) -> Self {
        Self::builder().options(options).build()
    }

    #[must_use]
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::default()
    }

    #[must_use]
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    #[must_use]
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// The plugin that would claim `input`, if any.
    #[must_use]
    pub fn matching_plugin(&self, input: &ParseInput) -> Option<&dyn Plugin> {
        self.plugins.find(&input.buf, &input.source)
    }

    /// Classify and transform one input. Never fails.
    ///
    /// The first plugin whose test matches produces the result verbatim;
    /// otherwise the built-in rule for the effective extension applies.
    #[must_use]
    pub fn parse(&self, input: &ParseInput) -> LoadResult {
        if let Some(plugin) = self.matching_plugin(input) {
            return plugin.transform(&input.buf, &input.source, &self.options);
        }

        let kind = FileKind::from_extension(&input.extension());
        rules::apply(kind, &input.buf, &self.options)
    }

    /// Resolve a result into the bytes a caller should serve.
    pub async fn fetch(&self, result: &LoadResult) -> Result<Bytes, LoadError> {
        self.resolver.fetch(result).await
    }

    /// Resolve a result into a value, evaluating modules with the
    /// configured evaluator.
    pub async fn load(&self, result: &LoadResult) -> Result<LoadedValue, LoadError> {
        let bytes = self.fetch(result).await?;
        load_value(&result.content_type, bytes, self.evaluator.as_ref())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("plugins", &self.plugins)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Loader`].
#[derive(Default)]
pub struct LoaderBuilder {
    plugins: PluginRegistry,
    options: LoaderOptions,
    evaluator: Option<Box<dyn ModuleEvaluator>>,
    resolver: Option<Resolver>,
}

impl LoaderBuilder {
    #[must_use]
    pub fn options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Append a plugin. Registration order is dispatch order.
    #[must_use]
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.add(Box::new(plugin));
        self
    }

    /// Append already-boxed plugins, keeping their order.
    #[must_use]
    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Box<dyn Plugin>>) -> Self {
        for plugin in plugins {
            self.plugins.add(plugin);
        }
        self
    }

    #[must_use]
    pub fn evaluator(mut self, evaluator: impl ModuleEvaluator + 'static) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    #[must_use]
    pub fn resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn build(self) -> Loader {
        Loader {
            plugins: self.plugins,
            options: self.options,
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Box::new(LiteralEvaluator)),
            resolver: self.resolver.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::FnPlugin;
    use crate::result::{content_type, Payload};

    #[test]
    fn test_parse_input_extension() {
        let input = ParseInput::new(Bytes::new(), "/a/b.JSON");
        assert_eq!(input.extension(), "json");

        let input = input.with_extension(Some("Txt"));
        assert_eq!(input.extension(), "txt");

        let input = input.with_extension(None::<String>);
        assert_eq!(input.extension(), "json");
    }

    #[test]
    fn test_parse_dispatches_on_extension() {
        let loader = Loader::default();
        let result = loader.parse(&ParseInput::new(b"let a;".to_vec(), "/app.js"));
        assert_eq!(result.content_type, content_type::JAVASCRIPT);
        assert_eq!(result.payload, Payload::Buffer(Bytes::from_static(b"let a;")));
    }

    #[test]
    fn test_plugin_bypasses_rules() {
        let loader = Loader::builder()
            .plugin(FnPlugin::new(
                "everything",
                |_, _| true,
                |_, source, _| LoadResult::generated("text/x-custom", source.to_string()),
            ))
            .build();

        let result = loader.parse(&ParseInput::new(b"{}".to_vec(), "/data.json"));
        assert_eq!(result, LoadResult::generated("text/x-custom", "/data.json"));
        assert_eq!(
            loader
                .matching_plugin(&ParseInput::new(Bytes::new(), "x"))
                .map(|plugin| plugin.name()),
            Some("everything")
        );
    }

    #[test]
    fn test_builder_keeps_plugin_order() {
        let loader = Loader::builder()
            .plugins(crate::plugin::SignaturePlugin::defaults())
            .plugin(FnPlugin::new(
                "last",
                |_, _| false,
                |buf, _, _| LoadResult::buffer("x/y", buf.clone()),
            ))
            .build();
        assert_eq!(loader.plugins().names().last(), Some(&"last"));
        assert_eq!(loader.plugins().len(), 7);
    }

    #[tokio::test]
    async fn test_load_generated_json() {
        let loader = Loader::new(LoaderOptions::default().with_json_to_ts(true));
        let result = loader.parse(&ParseInput::new(b"{\"n\": 1}".to_vec(), "/n.json"));
        let value = loader.load(&result).await.unwrap();
        assert_eq!(value.as_json(), Some(&serde_json::json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_custom_evaluator() {
        struct Fixed;

        impl ModuleEvaluator for Fixed {
            fn evaluate(&self, _code: &str, _ct: &str) -> Result<LoadedValue, LoadError> {
                Ok(LoadedValue::Text("evaluated".to_string()))
            }
        }

        let loader = Loader::builder().evaluator(Fixed).build();
        let result = loader.parse(&ParseInput::new(b"export default 1;".to_vec(), "/m.ts"));
        let value = loader.load(&result).await.unwrap();
        assert_eq!(value.as_text(), Some("evaluated"));
    }
}
