//! Token tree and the emitter interface
//!
//! The scanner never produces markup directly. It drives an [`Emitter`], which
//! builds a tree of scoped nodes:
//!
//! ```text
//! (root)
//! ├─ "say "
//! ├─ string
//! │  └─ "\"hi\""
//! └─ " now"
//! ```
//!
//! Renderers consume the finished tree through [`TreeVisitor`] (see
//! `hilite::formats`). Concatenating every text leaf in walk order gives back the
//! scanned input exactly.

use serde::Serialize;

/// A node of the token tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Scope(ScopeNode),
}

/// An internal node: an optional scope and its ordered children
///
/// Only the root and spliced sublanguage trees without a known language have no
/// scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub children: Vec<Node>,
}

impl ScopeNode {
    pub fn new(scope: Option<String>) -> Self {
        Self {
            scope,
            children: Vec::new(),
        }
    }

    /// Pre-order walk: open, children in order, close
    pub fn walk<V: TreeVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.open_node(self.scope.as_deref());
        for child in &self.children {
            match child {
                Node::Text(text) => visitor.add_text(text),
                Node::Scope(node) => node.walk(visitor),
            }
        }
        visitor.close_node(self.scope.as_deref());
    }

    /// All leaf text, in order
    pub fn text(&self) -> String {
        let mut collector = TextCollector::default();
        self.walk(&mut collector);
        collector.text
    }
}

/// Receives the events of a tree walk
pub trait TreeVisitor {
    fn add_text(&mut self, text: &str);
    fn open_node(&mut self, scope: Option<&str>);
    fn close_node(&mut self, scope: Option<&str>);
}

#[derive(Default)]
struct TextCollector {
    text: String,
}

impl TreeVisitor for TextCollector {
    fn add_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn open_node(&mut self, _scope: Option<&str>) {}

    fn close_node(&mut self, _scope: Option<&str>) {}
}

/// What the scanner drives while it runs
pub trait Emitter {
    /// Append a text leaf to the innermost open scope; empty text is dropped
    fn add_text(&mut self, text: &str);
    fn start_scope(&mut self, scope: &str);
    fn end_scope(&mut self);
    /// Splice a finished tree in as a single child, tagged `language:<name>`
    /// when the language is known
    fn add_sublanguage(&mut self, tree: TokenTree, language: Option<&str>);
    /// Close every scope still open
    fn finalize(&mut self);
}

/// The default emitter: builds a [`ScopeNode`] tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTree {
    /// Open nodes, root first; a node joins its parent when it closes
    stack: Vec<ScopeNode>,
}

impl Default for TokenTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenTree {
    pub fn new() -> Self {
        Self {
            stack: vec![ScopeNode::default()],
        }
    }

    /// Tree holding `text` as its only leaf
    pub fn from_text(text: &str) -> Self {
        let mut tree = Self::new();
        tree.add_text(text);
        tree
    }

    /// The root node; scopes still open are not attached to it until `finalize`
    pub fn root(&self) -> &ScopeNode {
        &self.stack[0]
    }

    pub fn into_root(mut self) -> ScopeNode {
        self.finalize();
        self.stack.swap_remove(0)
    }

    /// Number of scopes currently open (the root not counted)
    pub fn open_scopes(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn walk<V: TreeVisitor + ?Sized>(&self, visitor: &mut V) {
        self.root().walk(visitor);
    }

    pub fn text(&self) -> String {
        self.root().text()
    }

    fn top(&mut self) -> &mut ScopeNode {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }
}

impl Emitter for TokenTree {
    fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.top().children.push(Node::Text(text.to_string()));
    }

    fn start_scope(&mut self, scope: &str) {
        self.stack.push(ScopeNode::new(Some(scope.to_string())));
    }

    fn end_scope(&mut self) {
        if self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                self.top().children.push(Node::Scope(node));
            }
        }
    }

    fn add_sublanguage(&mut self, tree: TokenTree, language: Option<&str>) {
        let mut node = tree.into_root();
        if let Some(name) = language {
            node.scope = Some(format!("language:{name}"));
        }
        self.top().children.push(Node::Scope(node));
    }

    fn finalize(&mut self) {
        while self.stack.len() > 1 {
            self.end_scope();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Events(Vec<String>);

    impl TreeVisitor for Events {
        fn add_text(&mut self, text: &str) {
            self.0.push(format!("text {text}"));
        }

        fn open_node(&mut self, scope: Option<&str>) {
            self.0.push(format!("open {}", scope.unwrap_or("-")));
        }

        fn close_node(&mut self, scope: Option<&str>) {
            self.0.push(format!("close {}", scope.unwrap_or("-")));
        }
    }

    #[test]
    fn test_build_and_walk() {
        let mut tree = TokenTree::new();
        tree.add_text("say ");
        tree.start_scope("string");
        tree.add_text("\"hi\"");
        tree.end_scope();
        tree.add_text(" now");
        tree.finalize();

        let mut events = Events(Vec::new());
        tree.walk(&mut events);
        assert_eq!(
            events.0,
            vec![
                "open -",
                "text say ",
                "open string",
                "text \"hi\"",
                "close string",
                "text  now",
                "close -",
            ]
        );
        assert_eq!(tree.text(), "say \"hi\" now");
    }

    #[test]
    fn test_empty_text_is_dropped() {
        let mut tree = TokenTree::new();
        tree.add_text("");
        assert!(tree.root().children.is_empty());
    }

    #[test]
    fn test_finalize_closes_open_scopes() {
        let mut tree = TokenTree::new();
        tree.start_scope("a");
        tree.start_scope("b");
        tree.add_text("x");
        assert_eq!(tree.open_scopes(), 2);
        tree.finalize();
        assert_eq!(tree.open_scopes(), 0);
        assert_eq!(tree.text(), "x");
    }

    #[test]
    fn test_end_scope_never_pops_root() {
        let mut tree = TokenTree::new();
        tree.end_scope();
        tree.add_text("ok");
        assert_eq!(tree.root().children.len(), 1);
    }

    #[test]
    fn test_sublanguage_is_spliced_as_one_node() {
        let mut inner = TokenTree::new();
        inner.start_scope("number");
        inner.add_text("42");

        let mut outer = TokenTree::new();
        outer.add_sublanguage(inner, Some("inner"));
        outer.finalize();

        match &outer.root().children[0] {
            Node::Scope(node) => {
                assert_eq!(node.scope.as_deref(), Some("language:inner"));
                assert_eq!(node.text(), "42");
            }
            other => panic!("Expected scope node, got {other:?}"),
        }
    }

    #[test]
    fn test_serialize_tree() {
        let mut tree = TokenTree::new();
        tree.start_scope("keyword");
        tree.add_text("if");
        tree.end_scope();
        let json = serde_json::to_string(&tree.into_root()).unwrap();
        assert_eq!(json, r#"{"children":[{"scope":"keyword","children":["if"]}]}"#);
    }
}
