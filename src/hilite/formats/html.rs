//! HTML renderer
//!
//! Every scope becomes a `<span>` with a prefixed class, text is escaped:
//!
//! ```text
//! keyword         -> <span class="hljs-keyword">
//! title.class.inherited
//!                 -> <span class="hljs-title class_ inherited__">
//! language:xml    -> <span class="language-xml">
//! ```

use crate::hilite::emitter::{ScopeNode, TreeVisitor};
use crate::hilite::formats::registry::{FormatError, Formatter};

pub const DEFAULT_CLASS_PREFIX: &str = "hljs-";

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Class attribute for a scope name
fn scope_to_css_class(scope: &str, prefix: &str) -> String {
    if let Some(language) = scope.strip_prefix("language:") {
        return format!("language-{language}");
    }
    if !scope.contains('.') {
        return format!("{prefix}{scope}");
    }
    let mut pieces = scope.split('.');
    let head = pieces.next().unwrap_or_default();
    let mut class = format!("{prefix}{head}");
    for (i, piece) in pieces.enumerate() {
        class.push(' ');
        class.push_str(piece);
        class.push_str(&"_".repeat(i + 1));
    }
    class
}

struct HtmlRenderer<'p> {
    buffer: String,
    prefix: &'p str,
}

impl TreeVisitor for HtmlRenderer<'_> {
    fn add_text(&mut self, text: &str) {
        self.buffer.push_str(&escape_html(text));
    }

    fn open_node(&mut self, scope: Option<&str>) {
        if let Some(scope) = scope {
            let class = scope_to_css_class(scope, self.prefix);
            self.buffer.push_str(&format!("<span class=\"{class}\">"));
        }
    }

    fn close_node(&mut self, scope: Option<&str>) {
        if scope.is_some() {
            self.buffer.push_str("</span>");
        }
    }
}

/// Render a tree as HTML with the given class prefix
pub fn render_html(tree: &ScopeNode, prefix: &str) -> String {
    let mut renderer = HtmlRenderer {
        buffer: String::new(),
        prefix,
    };
    tree.walk(&mut renderer);
    renderer.buffer
}

pub struct HtmlFormatter {
    class_prefix: String,
}

impl HtmlFormatter {
    pub fn new(class_prefix: &str) -> Self {
        Self {
            class_prefix: class_prefix.to_string(),
        }
    }
}

impl Default for HtmlFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_PREFIX)
    }
}

impl Formatter for HtmlFormatter {
    fn name(&self) -> &str {
        "html"
    }

    fn serialize(&self, tree: &ScopeNode) -> Result<String, FormatError> {
        Ok(render_html(tree, &self.class_prefix))
    }

    fn description(&self) -> &str {
        "HTML with <span> scopes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hilite::emitter::{Emitter, TokenTree};
    use rstest::rstest;

    #[rstest]
    #[case("keyword", "hljs-keyword")]
    #[case("title.class", "hljs-title class_")]
    #[case("title.class.inherited", "hljs-title class_ inherited__")]
    #[case("language:xml", "language-xml")]
    fn test_scope_classes(#[case] scope: &str, #[case] expected: &str) {
        assert_eq!(scope_to_css_class(scope, "hljs-"), expected);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_nested() {
        let mut tree = TokenTree::new();
        tree.add_text("a < b ");
        tree.start_scope("string");
        tree.add_text("\"x\"");
        tree.end_scope();
        let html = render_html(&tree.into_root(), "p-");
        insta::assert_snapshot!(html, @r#"a &lt; b <span class="p-string">&quot;x&quot;</span>"#);
    }
}
