//! Grammar sugar
//!
//! Before a mode is compiled it goes through a fixed series of rewrites that turn
//! convenience fields into the core `begin`/`end`/`scope` form:
//!
//! 1. `className` -> `scope`, `match` -> `begin`, `beforeMatch` wrapping
//! 2. the grammar's own compiler extensions
//! 3. `beginKeywords`, `illegal` lists, default relevance
//! 4. capture scope maps over sequence patterns
//!
//! The output is a [`Prepared`] mode whose begin/end are single sources.

use crate::hilite::error::GrammarError;
use crate::hilite::grammar::callbacks::{CompilerExtension, ModeCallback};
use crate::hilite::grammar::mode::{Illegal, Mode, Pattern, Scope};
use crate::hilite::patterns::{concat, count_match_groups, either, lookahead, rewrite_backreferences};
use std::sync::Arc;

/// How the text of a begin or end match is tagged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEmit {
    /// The whole match gets one scope
    Wrap(String),
    /// Per capture group: `(group, scope)`; a group without a scope is run
    /// through keyword processing instead
    Multi(Vec<(usize, Option<String>)>),
}

/// A mode after every sugar rewrite
#[derive(Debug, Clone)]
pub struct Prepared {
    pub mode: Mode,
    pub begin_scope: Option<ScopeEmit>,
    pub end_scope: Option<ScopeEmit>,
    /// Internal begin hook installed by sugar; runs before `on:begin`
    pub before_begin: Option<ModeCallback>,
}

impl Prepared {
    pub fn begin_source(&self) -> Option<&str> {
        pattern_source(self.mode.begin.as_ref())
    }

    pub fn end_source(&self) -> Option<&str> {
        pattern_source(self.mode.end.as_ref())
    }

    pub fn illegal_source(&self) -> Option<&str> {
        match &self.mode.illegal {
            Some(Illegal::One(source)) if !source.is_empty() => Some(source),
            _ => None,
        }
    }
}

fn pattern_source(pattern: Option<&Pattern>) -> Option<&str> {
    match pattern {
        Some(Pattern::Source(source)) if !source.is_empty() => Some(source),
        _ => None,
    }
}

/// Join a sequence pattern into one source, each part in its own group
pub fn flatten_sequence(parts: &[String]) -> String {
    rewrite_backreferences(parts, "")
}

/// Run every rewrite over a copy of `raw`
pub fn prepare(
    raw: Mode,
    parent: Option<&Mode>,
    extensions: &[CompilerExtension],
) -> Result<Prepared, GrammarError> {
    let mut mode = raw;

    scope_class_name(&mut mode);
    compile_match(&mut mode)?;
    before_match(&mut mode)?;

    for extension in extensions {
        extension.apply(&mut mode, parent)?;
    }

    let before_begin = begin_keywords(&mut mode, parent.is_some());
    compile_illegal(&mut mode);
    compile_relevance(&mut mode);

    let (begin_scope, end_scope) = multi_class(&mut mode)?;

    Ok(Prepared {
        mode,
        begin_scope,
        end_scope,
        before_begin,
    })
}

/// The legacy `className` is renamed to `scope`, replacing any scope already set
fn scope_class_name(mode: &mut Mode) {
    if let Some(name) = mode.class_name.take() {
        mode.scope = Some(Scope::Name(name));
    }
}

fn compile_match(mode: &mut Mode) -> Result<(), GrammarError> {
    let Some(pattern) = mode.r#match.take() else {
        return Ok(());
    };
    if mode.begin.is_some() || mode.end.is_some() {
        return Err(GrammarError::MatchWithBeginEnd);
    }
    mode.begin = Some(pattern);
    Ok(())
}

/// Turn the mode into a zero-relevance wrapper that matches the qualifier with
/// the original begin as lookahead, then starts the original mode (which ends
/// its parent when it ends)
fn before_match(mode: &mut Mode) -> Result<(), GrammarError> {
    let Some(qualifier) = mode.before_match.take() else {
        return Ok(());
    };
    if mode.starts.is_some() {
        return Err(GrammarError::BeforeMatchWithStarts);
    }

    let original_begin = match &mode.begin {
        Some(Pattern::Source(source)) => source.clone(),
        Some(Pattern::Sequence(parts)) => flatten_sequence(parts),
        None => String::new(),
    };

    let mut original = std::mem::take(mode);
    original.ends_parent = true;

    mode.keywords = original.keywords.clone();
    mode.begin = Some(Pattern::Source(concat(&[
        qualifier.as_str(),
        lookahead(&original_begin).as_str(),
    ])));
    mode.relevance = Some(0);
    mode.starts = Some(Arc::new(
        Mode::new().relevance(0).contains([original]),
    ));
    Ok(())
}

fn skip_if_has_preceding_dot() -> ModeCallback {
    ModeCallback::new(|m, resp| {
        if m.preceding_char() == Some('.') {
            resp.ignore_match();
        }
    })
}

fn begin_keywords(mode: &mut Mode, has_parent: bool) -> Option<ModeCallback> {
    if !has_parent {
        return None;
    }
    let words = mode.begin_keywords.take()?;
    let alternatives = words.split_whitespace().collect::<Vec<_>>().join("|");
    mode.begin = Some(Pattern::Source(format!(
        r"\b({alternatives})(?!\.)(?=\b|\s)"
    )));
    if mode.keywords.is_none() {
        mode.keywords = Some(crate::hilite::keywords::Keywords::Words(words));
    }
    if mode.relevance.is_none() {
        mode.relevance = Some(0);
    }
    Some(skip_if_has_preceding_dot())
}

fn compile_illegal(mode: &mut Mode) {
    if let Some(Illegal::Any(parts)) = &mode.illegal {
        mode.illegal = Some(Illegal::One(either(parts)));
    }
}

fn compile_relevance(mode: &mut Mode) {
    if mode.relevance.is_none() {
        mode.relevance = Some(1);
    }
}

/// Map a per-part scope map onto group numbers of the flattened sequence
///
/// Part `i` (1-based) lands on group `i + offset`, where `offset` counts the
/// inner groups of every earlier part.
fn remap_scope_names(
    parts: &[String],
    names: &std::collections::BTreeMap<usize, String>,
) -> Result<Vec<(usize, Option<String>)>, GrammarError> {
    let mut offset = 0;
    let mut positions = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let index = i + 1;
        positions.push((index + offset, names.get(&index).cloned()));
        offset += count_match_groups(part.as_str())?;
    }
    Ok(positions)
}

type ScopePair = (Option<ScopeEmit>, Option<ScopeEmit>);

fn multi_class(mode: &mut Mode) -> Result<ScopePair, GrammarError> {
    if let Some(Scope::Captures(_)) = mode.scope {
        mode.begin_scope = mode.scope.take();
    }

    let mut begin_scope = match &mode.begin_scope {
        Some(Scope::Name(name)) => Some(ScopeEmit::Wrap(name.clone())),
        _ => None,
    };
    let mut end_scope = match &mode.end_scope {
        Some(Scope::Name(name)) => Some(ScopeEmit::Wrap(name.clone())),
        _ => None,
    };

    if let Some(Pattern::Sequence(parts)) = mode.begin.clone() {
        if mode.skip || mode.exclude_begin || mode.return_begin {
            return Err(GrammarError::MultiCapture(
                "skip, excludeBegin, returnBegin not compatible with beginScope".to_string(),
            ));
        }
        let Some(Scope::Captures(names)) = &mode.begin_scope else {
            return Err(GrammarError::MultiCapture(
                "beginScope must be a capture map".to_string(),
            ));
        };
        begin_scope = Some(ScopeEmit::Multi(remap_scope_names(&parts, names)?));
        mode.begin = Some(Pattern::Source(flatten_sequence(&parts)));
    }

    if let Some(Pattern::Sequence(parts)) = mode.end.clone() {
        if mode.skip || mode.exclude_end || mode.return_end {
            return Err(GrammarError::MultiCapture(
                "skip, excludeEnd, returnEnd not compatible with endScope".to_string(),
            ));
        }
        let Some(Scope::Captures(names)) = &mode.end_scope else {
            return Err(GrammarError::MultiCapture(
                "endScope must be a capture map".to_string(),
            ));
        };
        end_scope = Some(ScopeEmit::Multi(remap_scope_names(&parts, names)?));
        mode.end = Some(Pattern::Source(flatten_sequence(&parts)));
    }

    Ok((begin_scope, end_scope))
}
