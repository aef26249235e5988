//! JSON formatter: the token tree as nested `{scope, children}` objects

use crate::hilite::emitter::ScopeNode;
use crate::hilite::formats::registry::{FormatError, Formatter};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize(&self, tree: &ScopeNode) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(tree)?)
    }

    fn description(&self) -> &str {
        "Token tree as JSON"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hilite::emitter::{Emitter, TokenTree};

    #[test]
    fn test_json_tree() {
        let mut tree = TokenTree::new();
        tree.start_scope("number");
        tree.add_text("42");
        let json = JsonFormatter.serialize(&tree.into_root()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["children"][0]["scope"], "number");
        assert_eq!(value["children"][0]["children"][0], "42");
    }
}
