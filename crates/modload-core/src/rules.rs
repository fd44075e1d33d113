//! Built-in transform rules, one per [`FileKind`].
//!
//! Every rule is pure and total. Rules that synthesize a module produce
//! source whose `export default` is the transformed value.

use crate::classify::FileKind;
use crate::options::LoaderOptions;
use crate::result::{content_type, LoadResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;

/// Apply the built-in rule for `kind` to `buf`.
#[must_use]
pub fn apply(kind: FileKind, buf: &Bytes, options: &LoaderOptions) -> LoadResult {
    match kind {
        FileKind::JavaScript => LoadResult::buffer(content_type::JAVASCRIPT, buf.clone()),
        FileKind::TypeScript => LoadResult::buffer(content_type::TYPESCRIPT, buf.clone()),
        FileKind::Html => {
            let code = html_module(&String::from_utf8_lossy(buf), &options.html_parser_module);
            LoadResult::reference_uri(
                content_type::TYPESCRIPT,
                code_to_data_uri(&code, content_type::TYPESCRIPT),
            )
        }
        FileKind::Css => {
            let code = css_module(&String::from_utf8_lossy(buf), &options.css_parser_module);
            LoadResult::reference_uri(
                content_type::TYPESCRIPT,
                code_to_data_uri(&code, content_type::TYPESCRIPT),
            )
        }
        FileKind::Text if options.txt_to_ts => LoadResult::generated(
            content_type::TYPESCRIPT,
            text_module(&String::from_utf8_lossy(buf)),
        ),
        FileKind::Text => LoadResult::buffer(content_type::TEXT, buf.clone()),
        FileKind::Json if options.json_to_ts => LoadResult::generated(
            content_type::TYPESCRIPT,
            json_module(&String::from_utf8_lossy(buf)),
        ),
        FileKind::Json => LoadResult::buffer(content_type::JSON, buf.clone()),
        FileKind::Buffer => {
            LoadResult::generated(content_type::TYPESCRIPT, byte_array_module(buf))
        }
    }
}

/// Encode module source as `data:<mime>;base64,<code>`.
#[must_use]
pub fn code_to_data_uri(code: &str, mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(code))
}

/// Module that parses `html` with the DOM parser and exports the document.
#[must_use]
pub fn html_module(html: &str, parser_module: &str) -> String {
    format!(
        "import {{ DOMParser }} from {};\n\nexport default new DOMParser().parseFromString({}, \"text/html\");\n",
        string_literal(parser_module),
        string_literal(html)
    )
}

/// Module that parses `css` with the CSS parser and exports the stylesheet AST.
#[must_use]
pub fn css_module(css: &str, parser_module: &str) -> String {
    format!(
        "import {{ parse }} from {};\n\nexport default parse({});\n",
        string_literal(parser_module),
        string_literal(css)
    )
}

/// Module exporting `text` as a template string.
#[must_use]
pub fn text_module(text: &str) -> String {
    format!("export default `{}`;", escape_template(text))
}

/// Module exporting the JSON document verbatim.
#[must_use]
pub fn json_module(json: &str) -> String {
    format!("export default {};", json.trim())
}

/// Module exporting the bytes as a `Uint8Array`.
#[must_use]
pub fn byte_array_module(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(u8::to_string).collect();
    format!("export default new Uint8Array([{}]);", items.join(", "))
}

/// A double-quoted string literal (JSON syntax, valid JS/TS).
fn string_literal(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

/// Escape `text` for a backtick template literal.
///
/// Carriage returns are escaped because template literals normalize raw
/// `\r\n` to `\n`.
#[must_use]
pub fn escape_template(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }

    out
}
