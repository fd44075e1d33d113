//! CSS parsing using lightningcss.
//!
//! Backs the stylesheet value produced when a generated CSS module is
//! evaluated.

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};

/// CSS parsing options.
#[derive(Debug, Clone, Default)]
pub struct CssOptions {
    /// Print the normalized stylesheet minified.
    pub minify: bool,
    /// Source file name (for error messages).
    pub filename: Option<String>,
}

/// A parsed stylesheet, detached from the source it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    /// Number of top-level rules.
    pub rule_count: usize,
    /// The stylesheet printed back out by the parser.
    pub code: String,
}

/// Parse `source` as a stylesheet.
pub fn parse_stylesheet(source: &str, options: &CssOptions) -> Result<Stylesheet, CssError> {
    let filename = options.filename.as_deref().unwrap_or("input.css");

    let parser_options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };

    let stylesheet = StyleSheet::parse(source, parser_options)
        .map_err(|e| CssError::Parse(format!("{filename}: {e}")))?;

    let rule_count = stylesheet.rules.0.len();

    let output = stylesheet
        .to_css(PrinterOptions {
            minify: options.minify,
            ..PrinterOptions::default()
        })
        .map_err(|e| CssError::Print(format!("{filename}: {e}")))?;

    Ok(Stylesheet {
        rule_count,
        code: output.code,
    })
}

/// CSS parsing error.
#[derive(Debug)]
pub enum CssError {
    /// Parse error.
    Parse(String),
    /// Print error.
    Print(String),
}

impl std::fmt::Display for CssError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CssError::Parse(msg) => write!(f, "CSS parse error: {msg}"),
            CssError::Print(msg) => write!(f, "CSS print error: {msg}"),
        }
    }
}

impl std::error::Error for CssError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_rules() {
        let css = ".a { color: red; }\n.b { margin: 0; }\n@media (min-width: 10px) { .c { color: blue; } }";
        let sheet = parse_stylesheet(css, &CssOptions::default()).unwrap();
        assert_eq!(sheet.rule_count, 3);
        assert!(sheet.code.contains(".a"));
        assert!(sheet.code.contains("@media"));
    }

    #[test]
    fn test_minified_output() {
        let css = ".foo {\n  color: red;\n  margin: 10px;\n}";
        let options = CssOptions {
            minify: true,
            ..Default::default()
        };
        let sheet = parse_stylesheet(css, &options).unwrap();
        assert!(!sheet.code.contains('\n'));
    }

    #[test]
    fn test_empty_stylesheet() {
        let sheet = parse_stylesheet("", &CssOptions::default()).unwrap();
        assert_eq!(sheet.rule_count, 0);
    }
}
