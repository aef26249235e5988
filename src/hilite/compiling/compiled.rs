//! Compiled grammar structures
//!
//! Compilation flattens the raw mode graph into an arena: every compiled mode
//! lives in `CompiledGrammar::modes` and refers to others by [`ModeId`]. A mode
//! that contains itself simply lists its own id. Nothing here changes after
//! compilation; per-scan state lives in the scanner's stack frames.

use crate::hilite::compiling::multi_regex::ResumableMultiRegex;
use crate::hilite::compiling::sugar::ScopeEmit;
use crate::hilite::grammar::callbacks::{EmitTokens, ModeCallback};
use crate::hilite::grammar::mode::SubLanguage;
use crate::hilite::keywords::KeywordTable;
use crate::hilite::patterns::LangRegex;
use std::collections::HashMap;

pub type ModeId = usize;

/// Id of the grammar's top-level mode
pub const ROOT: ModeId = 0;

#[derive(Debug)]
pub struct CompiledMode {
    /// Scope opened for the whole mode
    pub scope: Option<String>,
    pub begin_scope: Option<ScopeEmit>,
    pub end_scope: Option<ScopeEmit>,
    /// Begin source as used in the parent's matcher
    pub begin: String,
    /// This mode's own end, tested when deciding which mode a match ends
    pub end_re: Option<LangRegex>,
    /// End source including the parent's end for `endsWithParent` modes
    pub terminator_end: String,
    pub keywords: Option<KeywordTable>,
    pub keyword_pattern: Option<LangRegex>,
    pub relevance: u32,
    pub exclude_begin: bool,
    pub exclude_end: bool,
    pub return_begin: bool,
    pub return_end: bool,
    pub ends_with_parent: bool,
    pub ends_parent: bool,
    pub skip: bool,
    pub sub_language: Option<SubLanguage>,
    pub contains: Vec<ModeId>,
    pub starts: Option<ModeId>,
    pub before_begin: Option<ModeCallback>,
    pub on_begin: Option<ModeCallback>,
    pub on_end: Option<ModeCallback>,
    pub matcher: ResumableMultiRegex,
}

impl CompiledMode {
    /// Name used in diagnostics
    pub fn display_name(&self) -> &str {
        self.scope.as_deref().unwrap_or("<unnamed>")
    }
}

/// A grammar ready for scanning
#[derive(Debug)]
pub struct CompiledGrammar {
    pub name: String,
    pub case_insensitive: bool,
    pub class_name_aliases: HashMap<String, String>,
    pub emit_tokens: Option<EmitTokens>,
    pub modes: Vec<CompiledMode>,
}

impl CompiledGrammar {
    pub fn mode(&self, id: ModeId) -> &CompiledMode {
        &self.modes[id]
    }

    pub fn root(&self) -> &CompiledMode {
        self.mode(ROOT)
    }

    /// Scope name after applying the grammar's `classNameAliases`
    pub fn alias_scope<'a>(&'a self, scope: &'a str) -> &'a str {
        self.class_name_aliases
            .get(scope)
            .map(String::as_str)
            .unwrap_or(scope)
    }
}
