//! Treeviz formatter for token trees
//!
//! One line per node, nesting drawn with box characters. Scopes show as `●`,
//! text leaves as `◦` with their (escaped, truncated) content:
//!
//! ```text
//! ⧉ document
//! ├─ ◦ "say "
//! ├─ ● string
//! │ └─ ◦ "\"hi\""
//! └─ ◦ " now"
//! ```

use crate::hilite::emitter::{Node, ScopeNode};
use crate::hilite::formats::registry::{FormatError, Formatter};

const MAX_LABEL_CHARS: usize = 30;

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let mut truncated = s.chars().take(max_chars).collect::<String>();
        truncated.push_str("...");
        truncated
    } else {
        s.to_string()
    }
}

fn label(node: &Node) -> String {
    match node {
        Node::Text(text) => format!("◦ {}", truncate(&format!("{text:?}"), MAX_LABEL_CHARS)),
        Node::Scope(scope) => format!("● {}", scope.scope.as_deref().unwrap_or("(anonymous)")),
    }
}

fn format_node(node: &Node, prefix: &str, is_last: bool, output: &mut String) {
    let connector = if is_last { "└─" } else { "├─" };
    output.push_str(&format!("{prefix}{connector} {}\n", label(node)));

    if let Node::Scope(scope) = node {
        let child_prefix = format!("{prefix}{}", if is_last { "  " } else { "│ " });
        format_children(scope, &child_prefix, output);
    }
}

fn format_children(scope: &ScopeNode, prefix: &str, output: &mut String) {
    let count = scope.children.len();
    for (i, child) in scope.children.iter().enumerate() {
        format_node(child, prefix, i + 1 == count, output);
    }
}

/// Render a tree as treeviz text
pub fn to_treeviz_str(tree: &ScopeNode) -> String {
    let mut output = String::from("⧉ document\n");
    format_children(tree, "", &mut output);
    output
}

pub struct TreevizFormatter;

impl Formatter for TreevizFormatter {
    fn name(&self) -> &str {
        "treeviz"
    }

    fn serialize(&self, tree: &ScopeNode) -> Result<String, FormatError> {
        Ok(to_treeviz_str(tree))
    }

    fn description(&self) -> &str {
        "One line per node, indented by nesting"
    }
}
