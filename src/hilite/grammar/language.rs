//! Grammars
//!
//! A grammar is the root of a mode tree plus language-wide settings: its name
//! and aliases, case sensitivity, auto-detection flags and scope aliases.
//! Modes shared by several parents (or mutually recursive) live in the `modes`
//! table and are referenced by name from `contains` lists.

use crate::hilite::emitter::Emitter;
use crate::hilite::error::GrammarError;
use crate::hilite::grammar::callbacks::{CompilerExtension, EmitTokens};
use crate::hilite::grammar::mode::{Illegal, Mode, ModeRef};
use crate::hilite::keywords::Keywords;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Display name of the grammar substituted for languages that fail to load
pub const PLAINTEXT_NAME: &str = "Plain text";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Grammar {
    pub name: String,
    pub aliases: Vec<String>,
    #[serde(alias = "case_insensitive")]
    pub case_insensitive: bool,
    pub unicode_regex: bool,
    pub disable_autodetect: bool,
    pub superset_of: Option<String>,
    pub keywords: Option<Keywords>,
    pub contains: Vec<ModeRef>,
    pub illegal: Option<Illegal>,
    pub class_name_aliases: HashMap<String, String>,
    /// Named modes, referenced from `contains` as `{ "ref": name }`
    pub modes: HashMap<String, Arc<Mode>>,
    #[serde(skip)]
    pub compiler_extensions: Vec<CompilerExtension>,
    #[serde(skip)]
    pub emit_tokens: Option<EmitTokens>,
}

impl Grammar {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Grammar with no rules; highlighting with it yields the input as plain text
    pub fn plaintext() -> Self {
        Self {
            name: PLAINTEXT_NAME.to_string(),
            disable_autodetect: true,
            ..Self::default()
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn unicode_regex(mut self) -> Self {
        self.unicode_regex = true;
        self
    }

    pub fn disable_autodetect(mut self) -> Self {
        self.disable_autodetect = true;
        self
    }

    pub fn superset_of(mut self, base: &str) -> Self {
        self.superset_of = Some(base.to_string());
        self
    }

    pub fn keywords(mut self, keywords: Keywords) -> Self {
        self.keywords = Some(keywords);
        self
    }

    pub fn contains<I, M>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModeRef>,
    {
        self.contains.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn illegal(mut self, illegal: impl Into<Illegal>) -> Self {
        self.illegal = Some(illegal.into());
        self
    }

    pub fn class_name_alias(mut self, from: &str, to: &str) -> Self {
        self.class_name_aliases
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Add a named mode to the shared `modes` table
    pub fn mode(mut self, name: &str, mode: Mode) -> Self {
        self.modes.insert(name.to_string(), Arc::new(mode));
        self
    }

    pub fn compiler_extension<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Mode, Option<&Mode>) -> Result<(), GrammarError> + Send + Sync + 'static,
    {
        self.compiler_extensions.push(CompilerExtension::new(f));
        self
    }

    pub fn emit_tokens<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &mut dyn Emitter) + Send + Sync + 'static,
    {
        self.emit_tokens = Some(EmitTokens::new(f));
        self
    }

    /// The grammar's top-level mode
    pub fn root_mode(&self) -> Mode {
        Mode {
            keywords: self.keywords.clone(),
            contains: self.contains.clone(),
            illegal: self.illegal.clone(),
            ..Mode::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_grammar() {
        let grammar: Grammar = serde_json::from_str(
            r#"{
                "name": "Mini",
                "aliases": ["mn"],
                "case_insensitive": true,
                "supersetOf": "base",
                "keywords": "let in",
                "classNameAliases": { "tag_name": "name" },
                "modes": { "num": { "scope": "number", "match": "\\d+" } },
                "contains": [{ "ref": "num" }]
            }"#,
        )
        .unwrap();
        assert_eq!(grammar.name, "Mini");
        assert!(grammar.case_insensitive);
        assert_eq!(grammar.superset_of.as_deref(), Some("base"));
        assert!(grammar.modes.contains_key("num"));
        assert_eq!(
            grammar.class_name_aliases.get("tag_name").map(String::as_str),
            Some("name")
        );
    }

    #[test]
    fn test_plaintext() {
        let plain = Grammar::plaintext();
        assert_eq!(plain.name, "Plain text");
        assert!(plain.disable_autodetect);
        assert!(plain.contains.is_empty());
    }

    #[test]
    fn test_root_mode_carries_top_level_rules() {
        let grammar = Grammar::new("x")
            .keywords(Keywords::words("a b"))
            .illegal("X")
            .contains([Mode::new().scope("string").begin("\"").end("\"")]);
        let root = grammar.root_mode();
        assert_eq!(root.contains.len(), 1);
        assert!(root.keywords.is_some());
        assert!(root.illegal.is_some());
        assert!(root.begin.is_none());
    }
}
