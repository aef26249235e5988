//! Testing utilities
//!
//! Small grammars that exercise one engine feature each, and a compact text form
//! of token trees for assertions and snapshots:
//!
//! ```text
//! "say " (string "\"hi\"") " now"
//! ```
//!
//! Text leaves print as Rust string literals; every scope prints as
//! `(name children...)`. Scopes without a name print as `(_ ...)`.

use crate::hilite::emitter::{ScopeNode, TreeVisitor};
use crate::hilite::grammar::{Grammar, Mode};
use crate::hilite::highlighter::Highlighter;
use crate::hilite::keywords::Keywords;
use crate::hilite::settings::HighlightSettings;

struct SexpWriter {
    out: String,
    depth: usize,
}

impl SexpWriter {
    fn token(&mut self, token: &str) {
        if !self.out.is_empty() && token != ")" {
            self.out.push(' ');
        }
        self.out.push_str(token);
    }
}

impl TreeVisitor for SexpWriter {
    fn add_text(&mut self, text: &str) {
        self.token(&format!("{text:?}"));
    }

    fn open_node(&mut self, scope: Option<&str>) {
        self.depth += 1;
        // The outermost node is the tree root
        if self.depth > 1 {
            self.token(&format!("({}", scope.unwrap_or("_")));
        }
    }

    fn close_node(&mut self, _scope: Option<&str>) {
        if self.depth > 1 {
            self.token(")");
        }
        self.depth -= 1;
    }
}

/// Compact one-line form of a tree
pub fn sexp(tree: &ScopeNode) -> String {
    let mut writer = SexpWriter {
        out: String::new(),
        depth: 0,
    };
    tree.walk(&mut writer);
    writer.out
}

/// Double-quoted strings
pub fn string_grammar() -> Grammar {
    Grammar::new("strings").contains([Mode::new().scope("string").begin("\"").end("\"")])
}

/// `if` and `else` as keywords
pub fn keyword_grammar() -> Grammar {
    Grammar::new("conditions").keywords(Keywords::scoped([("keyword", "if else")]))
}

/// `X` is illegal anywhere
pub fn illegal_grammar() -> Grammar {
    Grammar::new("strict").illegal("X")
}

/// Digit runs are numbers
pub fn inner_grammar() -> Grammar {
    Grammar::new("inner").contains([Mode::new().scope("number").match_pattern(r"\d+")])
}

/// `<% ... %>` blocks are handed to the `inner` language
pub fn host_grammar() -> Grammar {
    Grammar::new("host").contains([Mode::new()
        .begin("<%")
        .end("%>")
        .sub_language("inner")
        .exclude_begin()
        .exclude_end()])
}

/// Highlighter with default settings and the given languages registered
pub fn highlighter_with<I>(grammars: I) -> Highlighter
where
    I: IntoIterator<Item = (&'static str, Grammar)>,
{
    highlighter_with_settings(HighlightSettings::default(), grammars)
}

pub fn highlighter_with_settings<I>(settings: HighlightSettings, grammars: I) -> Highlighter
where
    I: IntoIterator<Item = (&'static str, Grammar)>,
{
    let highlighter = Highlighter::new(settings);
    for (name, grammar) in grammars {
        if let Err(err) = highlighter.registry().register_grammar(name, grammar) {
            panic!("fixture grammar '{name}' failed to register: {err}");
        }
    }
    highlighter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hilite::emitter::{Emitter, TokenTree};

    #[test]
    fn test_sexp() {
        let mut tree = TokenTree::new();
        tree.add_text("a ");
        tree.start_scope("x");
        tree.start_scope("y");
        tree.add_text("b");
        tree.end_scope();
        tree.end_scope();
        assert_eq!(sexp(&tree.into_root()), r#""a " (x (y "b"))"#);
    }
}
