use serde::{Deserialize, Serialize};

/// Import specifier of the DOM parser used by generated HTML modules.
pub const DEFAULT_HTML_PARSER_MODULE: &str =
    "https://deno.land/x/deno_dom@v0.1.36-alpha/deno-dom-wasm.ts";

/// Import specifier of the CSS parser used by generated CSS modules.
pub const DEFAULT_CSS_PARSER_MODULE: &str = "https://esm.sh/css@3.0.0";

/// Options fixed for the lifetime of a [`Loader`](crate::Loader).
///
/// Field names accept both the snake_case Rust spelling and the camelCase
/// spelling used in `modload.json` (`jsonToTS`, `txtToTS`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Rewrite `.json` files into `export default <json>;` modules instead of
    /// passing them through as `application/json`.
    #[serde(rename = "jsonToTS", alias = "json_to_ts")]
    pub json_to_ts: bool,

    /// Rewrite `.txt` files into modules exporting the text as a template
    /// string instead of passing them through as `text/plain`.
    #[serde(rename = "txtToTS", alias = "txt_to_ts")]
    pub txt_to_ts: bool,

    /// Module that generated HTML modules import `DOMParser` from.
    #[serde(rename = "htmlParserModule", alias = "html_parser_module")]
    pub html_parser_module: String,

    /// Module that generated CSS modules import `parse` from.
    #[serde(rename = "cssParserModule", alias = "css_parser_module")]
    pub css_parser_module: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            json_to_ts: false,
            txt_to_ts: false,
            html_parser_module: DEFAULT_HTML_PARSER_MODULE.to_string(),
            css_parser_module: DEFAULT_CSS_PARSER_MODULE.to_string(),
        }
    }
}

impl LoaderOptions {
    /// Set JSON-to-module rewriting.
    #[must_use]
    pub fn with_json_to_ts(mut self, enabled: bool) -> Self {
        self.json_to_ts = enabled;
        self
    }

    /// Set text-to-module rewriting.
    #[must_use]
    pub fn with_txt_to_ts(mut self, enabled: bool) -> Self {
        self.txt_to_ts = enabled;
        self
    }
}
