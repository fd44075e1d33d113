//! Module evaluation: turning module source into its default export.
//!
//! Running arbitrary JavaScript needs a script engine, so evaluation sits
//! behind [`ModuleEvaluator`]. The built-in [`LiteralEvaluator`] runs no code:
//! it recognizes the module shapes emitted by [`crate::rules`] and builds the
//! exported value directly.

use crate::css::{parse_stylesheet, CssOptions, Stylesheet};
use crate::error::LoadError;
use crate::html::HtmlDocument;
use bytes::Bytes;
use std::fmt;

/// A resolved value.
#[derive(Debug, Clone)]
pub enum LoadedValue {
    Json(serde_json::Value),
    Text(String),
    Bytes(Bytes),
    Document(HtmlDocument),
    Stylesheet(Stylesheet),
}

impl LoadedValue {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Document(_) => "document",
            Self::Stylesheet(_) => "stylesheet",
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl fmt::Display for LoadedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value:#}"),
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Self::Document(doc) => f.write_str(&doc.to_html()),
            Self::Stylesheet(sheet) => f.write_str(&sheet.code),
        }
    }
}

/// Evaluates module source and returns its default export.
pub trait ModuleEvaluator: Send + Sync {
    /// Evaluate `code`, which was served as `content_type`.
    fn evaluate(&self, code: &str, content_type: &str) -> Result<LoadedValue, LoadError>;
}

/// Evaluator for the modules the built-in rules generate.
///
/// Recognized `export default` expressions:
///
/// - a JSON literal
/// - a template string without substitutions
/// - `new Uint8Array([..])` with integer elements
/// - `new DOMParser().parseFromString(<string>, "text/html")`
/// - `parse(<string>)` (the CSS parser)
///
/// Import declarations are ignored. Anything else is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralEvaluator;

const EXPORT_DEFAULT: &str = "export default ";
const UINT8_ARRAY_OPEN: &str = "new Uint8Array([";
const DOM_PARSE_OPEN: &str = "new DOMParser().parseFromString(";
const DOM_PARSE_CLOSE: &str = ", \"text/html\")";
const CSS_PARSE_OPEN: &str = "parse(";

impl ModuleEvaluator for LiteralEvaluator {
    fn evaluate(&self, code: &str, _content_type: &str) -> Result<LoadedValue, LoadError> {
        let expr = default_export(code)?;

        if expr.starts_with('`') {
            return parse_template(expr).map(LoadedValue::Text);
        }

        if let Some(items) = expr
            .strip_prefix(UINT8_ARRAY_OPEN)
            .and_then(|rest| rest.strip_suffix("])"))
        {
            return parse_byte_list(items).map(LoadedValue::Bytes);
        }

        if let Some(literal) = expr
            .strip_prefix(DOM_PARSE_OPEN)
            .and_then(|rest| rest.strip_suffix(DOM_PARSE_CLOSE))
        {
            let source = parse_string_literal(literal)?;
            return Ok(LoadedValue::Document(HtmlDocument::parse(&source)));
        }

        if let Some(literal) = expr
            .strip_prefix(CSS_PARSE_OPEN)
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let source = parse_string_literal(literal)?;
            return parse_stylesheet(&source, &CssOptions::default())
                .map(LoadedValue::Stylesheet)
                .map_err(|e| LoadError::evaluate(e.to_string()));
        }

        serde_json::from_str(expr)
            .map(LoadedValue::Json)
            .map_err(|_| LoadError::evaluate("unsupported default export expression"))
    }
}

/// The expression after `export default`, without the trailing `;`.
fn default_export(code: &str) -> Result<&str, LoadError> {
    let start = if code.starts_with(EXPORT_DEFAULT) {
        0
    } else {
        code.find(&format!("\n{EXPORT_DEFAULT}"))
            .map(|pos| pos + 1)
            .ok_or_else(|| LoadError::evaluate("module has no default export"))?
    };

    let expr = code[start + EXPORT_DEFAULT.len()..].trim_end();
    let expr = expr.strip_suffix(';').unwrap_or(expr).trim();

    if expr.is_empty() {
        return Err(LoadError::evaluate("empty default export"));
    }

    Ok(expr)
}

fn parse_string_literal(literal: &str) -> Result<String, LoadError> {
    serde_json::from_str(literal.trim())
        .map_err(|e| LoadError::evaluate(format!("invalid string literal: {e}")))
}

fn parse_byte_list(items: &str) -> Result<Bytes, LoadError> {
    items
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u8>()
                .map_err(|_| LoadError::evaluate(format!("invalid byte value: {item}")))
        })
        .collect::<Result<Vec<u8>, _>>()
        .map(Bytes::from)
}

/// Cook a substitution-free template literal (including its backticks).
fn parse_template(expr: &str) -> Result<String, LoadError> {
    let body = expr
        .strip_prefix('`')
        .ok_or_else(|| LoadError::evaluate("expected template literal"))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        match c {
            '`' => {
                if chars.as_str().is_empty() {
                    return Ok(out);
                }
                return Err(LoadError::evaluate("unexpected input after template literal"));
            }
            '$' if chars.as_str().starts_with('{') => {
                return Err(LoadError::evaluate(
                    "template substitutions are not supported",
                ));
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some('\n') => {}
                Some(escaped @ ('\\' | '`' | '$' | '\'' | '"')) => out.push(escaped),
                Some(other) => {
                    return Err(LoadError::evaluate(format!(
                        "unsupported escape sequence: \\{other}"
                    )))
                }
                None => break,
            },
            // raw CRLF in a template is cooked to LF
            '\r' => {
                if chars.as_str().starts_with('\n') {
                    chars.next();
                }
                out.push('\n');
            }
            _ => out.push(c),
        }
    }

    Err(LoadError::evaluate("unterminated template literal"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::content_type::TYPESCRIPT;
    use crate::rules;

    fn eval(code: &str) -> Result<LoadedValue, LoadError> {
        LiteralEvaluator.evaluate(code, TYPESCRIPT)
    }

    #[test]
    fn test_text_module_round_trip() {
        for text in ["", "plain", "a\\b`c", "${not} a substitution", "crlf\r\nline", "\\`"] {
            let value = eval(&rules::text_module(text)).unwrap();
            assert_eq!(value.as_text(), Some(text), "round trip of {text:?}");
        }
    }

    #[test]
    fn test_json_module() {
        let value = eval("export default {\"a\": [1, 2]};").unwrap();
        assert_eq!(value.as_json(), Some(&serde_json::json!({"a": [1, 2]})));
    }

    #[test]
    fn test_byte_array_module() {
        let value = eval(&rules::byte_array_module(&[0, 128, 255])).unwrap();
        assert_eq!(value.as_bytes(), Some([0u8, 128, 255].as_slice()));

        let empty = eval(&rules::byte_array_module(&[])).unwrap();
        assert_eq!(empty.as_bytes(), Some([].as_slice()));
    }

    #[test]
    fn test_html_module() {
        let code = rules::html_module("<title>Docs</title><p>x</p>", "dom.ts");
        match eval(&code).unwrap() {
            LoadedValue::Document(doc) => assert_eq!(doc.title().as_deref(), Some("Docs")),
            other => panic!("expected document, got {other:?}"),
        }
    }

    #[test]
    fn test_css_module() {
        let code = rules::css_module(".a { color: red; }", "css.js");
        match eval(&code).unwrap() {
            LoadedValue::Stylesheet(sheet) => assert_eq!(sheet.rule_count, 1),
            other => panic!("expected stylesheet, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_arbitrary_code() {
        let err = eval("export default function () { return 1; }").unwrap_err();
        assert!(matches!(err, LoadError::Evaluate { .. }));

        let err = eval("console.log('no export');").unwrap_err();
        assert!(err.to_string().contains("no default export"));
    }

    #[test]
    fn test_rejects_substitution() {
        let err = eval("export default `a${b}`;").unwrap_err();
        assert!(err.to_string().contains("substitutions"));
    }

    #[test]
    fn test_rejects_out_of_range_byte() {
        assert!(eval("export default new Uint8Array([1, 256]);").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(LoadedValue::Bytes(Bytes::from_static(b"abc")).to_string(), "<3 bytes>");
        assert_eq!(LoadedValue::Text("hi".into()).to_string(), "hi");
    }
}
