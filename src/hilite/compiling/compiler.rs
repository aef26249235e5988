//! Mode compiler
//!
//! Turns a raw [`Grammar`] into a [`CompiledGrammar`]. The raw grammar is only
//! read; every mode is copied, run through the sugar rewrites and compiled into
//! an arena slot.
//!
//! A raw mode can be reachable from several parents (named modes, shared `Arc`s,
//! `self`). Whether one compiled copy can serve all of them depends on the mode:
//!
//! - a mode whose end does not involve its parent (no `endsWithParent` anywhere
//!   along its `starts` chain) compiles once and is shared by every placement
//! - a parent-dependent mode compiles once per placement, since its effective
//!   end pattern includes the parent's
//!
//! Slots are reserved before children are compiled, so a mode that (directly or
//! through other modes) contains itself resolves to the id already reserved. A
//! parent-dependent mode only reuses an enclosing copy of itself when that copy
//! was placed under a parent with the same terminator; past
//! [`MAX_NESTED_PLACEMENTS`] copies on one chain the nearest one is reused.

use crate::hilite::compiling::compiled::{CompiledGrammar, CompiledMode, ModeId};
use crate::hilite::compiling::multi_regex::{ResumableMultiRegex, Rule, RuleKind};
use crate::hilite::compiling::sugar::{self, Prepared};
use crate::hilite::error::GrammarError;
use crate::hilite::grammar::language::Grammar;
use crate::hilite::grammar::mode::{Mode, ModeRef, Scope};
use crate::hilite::keywords::{KeywordScoring, KeywordTable, DEFAULT_KEYWORD_PATTERN};
use crate::hilite::patterns::{LangFlags, LangRegex, MATCH_ANYWHERE_RE};
use std::collections::HashMap;
use std::sync::Arc;

/// Settings that shape compilation but do not come from the grammar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub scoring: KeywordScoring,
}

/// Compile a grammar
pub fn compile(grammar: &Grammar, options: &CompileOptions) -> Result<CompiledGrammar, GrammarError> {
    if grammar
        .contains
        .iter()
        .any(|c| matches!(c, ModeRef::SelfRef))
    {
        return Err(GrammarError::SelfAtTopLevel);
    }

    let mut compiler = Compiler {
        grammar,
        flags: LangFlags {
            case_insensitive: grammar.case_insensitive,
            unicode: grammar.unicode_regex,
        },
        scoring: &options.scoring,
        modes: Vec::new(),
        begins: Vec::new(),
        shared: HashMap::new(),
        retained: Vec::new(),
    };
    compiler.compile_mode(None, grammar.root_mode(), None)?;

    let reserved = compiler.modes.len();
    let modes: Vec<CompiledMode> = compiler.modes.into_iter().flatten().collect();
    debug_assert_eq!(modes.len(), reserved);
    log::debug!(
        "Compiled grammar '{}' into {} modes",
        grammar.name,
        modes.len()
    );

    Ok(CompiledGrammar {
        name: grammar.name.clone(),
        case_insensitive: grammar.case_insensitive,
        class_name_aliases: grammar.class_name_aliases.clone(),
        emit_tokens: grammar.emit_tokens.clone(),
        modes,
    })
}

/// Identity of a raw mode: the address of its `Arc`, plus which variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RawId {
    ptr: usize,
    variant: usize,
}

/// Copies of one parent-dependent mode allowed on a single chain
pub const MAX_NESTED_PLACEMENTS: usize = 8;

/// The chain of modes being compiled, innermost first
struct Ctx<'a> {
    key: Option<RawId>,
    id: ModeId,
    terminator_end: &'a str,
    mode: &'a Mode,
    parent: Option<&'a Ctx<'a>>,
}

impl Ctx<'_> {
    /// An enclosing copy of `key` that can serve a placement under `self`
    fn ancestor(&self, key: RawId) -> Option<ModeId> {
        let mut nearest = None;
        let mut copies = 0;
        let mut current = Some(self);
        while let Some(ctx) = current {
            if ctx.key == Some(key) {
                let placed_under = ctx.parent.map_or("", |p| p.terminator_end);
                if placed_under == self.terminator_end {
                    return Some(ctx.id);
                }
                nearest.get_or_insert(ctx.id);
                copies += 1;
            }
            current = ctx.parent;
        }
        if copies >= MAX_NESTED_PLACEMENTS {
            log::debug!("mode placed {copies} times on one chain, reusing the nearest copy");
            return nearest;
        }
        None
    }
}

fn depends_on_parent(mode: &Mode) -> bool {
    mode.ends_with_parent || mode.starts.as_deref().is_some_and(depends_on_parent)
}

struct Compiler<'g> {
    grammar: &'g Grammar,
    flags: LangFlags,
    scoring: &'g KeywordScoring,
    modes: Vec<Option<CompiledMode>>,
    /// Begin source of every reserved slot, known before the mode is finished
    begins: Vec<String>,
    shared: HashMap<RawId, ModeId>,
    /// Keeps every keyed `Arc` alive so no address is reused mid-compile
    retained: Vec<Arc<Mode>>,
}

impl Compiler<'_> {
    fn compile_ref(&mut self, child: &ModeRef, ctx: &Ctx<'_>) -> Result<Vec<ModeId>, GrammarError> {
        match child {
            ModeRef::SelfRef => Ok(vec![ctx.id]),
            ModeRef::Named(name) => {
                let raw = self
                    .grammar
                    .modes
                    .get(name)
                    .cloned()
                    .ok_or_else(|| GrammarError::UnknownModeRef(name.clone()))?;
                self.compile_shared(&raw, Some(ctx))
            }
            ModeRef::Inline(raw) => self.compile_shared(raw, Some(ctx)),
        }
    }

    /// Compile a raw mode, expanding its variants into siblings
    fn compile_shared(
        &mut self,
        raw: &Arc<Mode>,
        parent: Option<&Ctx<'_>>,
    ) -> Result<Vec<ModeId>, GrammarError> {
        self.retained.push(Arc::clone(raw));
        let ptr = Arc::as_ptr(raw) as usize;
        if raw.variants.is_empty() {
            let id = self.compile_placed(RawId { ptr, variant: 0 }, raw, parent)?;
            return Ok(vec![id]);
        }
        let mut ids = Vec::with_capacity(raw.variants.len());
        for (i, variant) in raw.variants.iter().enumerate() {
            let expanded = raw.inherit(variant);
            ids.push(self.compile_placed(
                RawId {
                    ptr,
                    variant: i + 1,
                },
                &expanded,
                parent,
            )?);
        }
        Ok(ids)
    }

    fn compile_placed(
        &mut self,
        key: RawId,
        mode: &Mode,
        parent: Option<&Ctx<'_>>,
    ) -> Result<ModeId, GrammarError> {
        if depends_on_parent(mode) {
            if let Some(id) = parent.and_then(|p| p.ancestor(key)) {
                return Ok(id);
            }
        } else if let Some(&id) = self.shared.get(&key) {
            return Ok(id);
        }
        self.compile_mode(Some(key), mode.clone(), parent)
    }

    fn regex(&self, source: &str) -> Result<LangRegex, GrammarError> {
        LangRegex::new(source, self.flags)
    }

    fn compile_mode(
        &mut self,
        key: Option<RawId>,
        raw: Mode,
        parent: Option<&Ctx<'_>>,
    ) -> Result<ModeId, GrammarError> {
        let shareable = !depends_on_parent(&raw);
        let is_root = parent.is_none();
        let prepared: Prepared = sugar::prepare(
            raw,
            parent.map(|p| p.mode),
            &self.grammar.compiler_extensions,
        )?;
        let mode = &prepared.mode;

        let begin = if is_root {
            String::new()
        } else {
            let source = prepared.begin_source().unwrap_or(MATCH_ANYWHERE_RE);
            self.regex(source)?;
            source.to_string()
        };

        let id = self.modes.len();
        self.modes.push(None);
        self.begins.push(begin.clone());
        if let (Some(key), true) = (key, shareable) {
            self.shared.insert(key, id);
        }

        let mut end = prepared.end_source().map(str::to_string);
        if !is_root && end.is_none() && !mode.ends_with_parent {
            end = Some(MATCH_ANYWHERE_RE.to_string());
        }
        let end_re = end.as_deref().map(|s| self.regex(s)).transpose()?;

        let mut terminator_end = end.clone().unwrap_or_default();
        if mode.ends_with_parent {
            if let Some(p) = parent.filter(|p| !p.terminator_end.is_empty()) {
                if end.is_some() {
                    terminator_end.push('|');
                }
                terminator_end.push_str(p.terminator_end);
            }
        }

        let illegal = prepared.illegal_source().map(str::to_string);
        if let Some(source) = &illegal {
            self.regex(source)?;
        }

        let (keywords, keyword_pattern) = match &mode.keywords {
            Some(raw) => (
                Some(KeywordTable::compile(
                    raw,
                    self.grammar.case_insensitive,
                    self.scoring,
                )),
                Some(self.regex(raw.pattern().unwrap_or(DEFAULT_KEYWORD_PATTERN))?),
            ),
            None => (None, None),
        };

        let ctx = Ctx {
            key,
            id,
            terminator_end: &terminator_end,
            mode,
            parent,
        };
        let mut contains = Vec::new();
        for child in &mode.contains {
            if is_root && matches!(child, ModeRef::SelfRef) {
                return Err(GrammarError::SelfAtTopLevel);
            }
            contains.extend(self.compile_ref(child, &ctx)?);
        }

        // `starts` takes over at this mode's own level once it ends
        let starts = match (&mode.starts, parent) {
            (Some(next), Some(p)) => {
                self.retained.push(Arc::clone(next));
                let key = RawId {
                    ptr: Arc::as_ptr(next) as usize,
                    variant: 0,
                };
                Some(self.compile_placed(key, next, Some(p))?)
            }
            _ => None,
        };

        let mut rules: Vec<Rule> = contains
            .iter()
            .map(|&child| Rule {
                source: self.begins[child].clone(),
                kind: RuleKind::Begin(child),
            })
            .collect();
        if !terminator_end.is_empty() {
            rules.push(Rule {
                source: terminator_end.clone(),
                kind: RuleKind::End,
            });
        }
        if let Some(source) = &illegal {
            rules.push(Rule {
                source: source.clone(),
                kind: RuleKind::Illegal,
            });
        }
        let matcher = ResumableMultiRegex::new(rules, self.flags)?;

        let scope = match &mode.scope {
            Some(Scope::Name(name)) => Some(name.clone()),
            _ => None,
        };
        log::trace!(
            "mode #{id} {} begin=/{begin}/ end=/{terminator_end}/",
            scope.as_deref().unwrap_or("<unnamed>")
        );

        self.modes[id] = Some(CompiledMode {
            scope,
            begin_scope: prepared.begin_scope.clone(),
            end_scope: prepared.end_scope.clone(),
            begin,
            end_re,
            terminator_end,
            keywords,
            keyword_pattern,
            relevance: mode.relevance.unwrap_or(1),
            exclude_begin: mode.exclude_begin,
            exclude_end: mode.exclude_end,
            return_begin: mode.return_begin,
            return_end: mode.return_end,
            ends_with_parent: mode.ends_with_parent,
            ends_parent: mode.ends_parent,
            skip: mode.skip,
            sub_language: mode.sub_language.clone(),
            contains,
            starts,
            before_begin: prepared.before_begin.clone(),
            on_begin: mode.on_begin.clone(),
            on_end: mode.on_end.clone(),
            matcher,
        });
        Ok(id)
    }
}
