//! HTML documents produced when a generated HTML module is evaluated.

use scraper::{Html, Selector};

/// A parsed HTML document.
///
/// Parsing is error-tolerant, like a browser's `DOMParser`: malformed markup
/// still yields a document.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    #[must_use]
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// Text of the first `<title>` element.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.select_text("title").into_iter().next()
    }

    /// Text content of every element matching a CSS selector. An invalid
    /// selector matches nothing.
    #[must_use]
    pub fn select_text(&self, selector: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.html
            .select(&selector)
            .map(|element| element.text().collect())
            .collect()
    }

    /// Serialize the whole document.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.html.html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_select() {
        let doc = HtmlDocument::parse(
            "<html><head><title>Home</title></head><body><p>a</p><p>b</p></body></html>",
        );
        assert_eq!(doc.title().as_deref(), Some("Home"));
        assert_eq!(doc.select_text("p"), vec!["a", "b"]);
    }

    #[test]
    fn test_fragment_is_wrapped() {
        let doc = HtmlDocument::parse("<p>hi</p>");
        assert!(doc.to_html().contains("<body><p>hi</p></body>"));
        assert_eq!(doc.title(), None);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = HtmlDocument::parse("<p>hi</p>");
        assert!(doc.select_text("p[").is_empty());
    }
}
