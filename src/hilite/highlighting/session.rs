//! The scanning automaton
//!
//! A [`Session`] runs one compiled grammar over one input. It keeps a stack of
//! [`Frame`]s (the modes currently open, root first) and walks the input one
//! matcher hit at a time:
//!
//! ```text
//! text before the hit  -> pending buffer
//! begin(child)         -> flush buffer, open child scope, push frame
//! end                  -> flush buffer, pop frames up to the mode that ended
//! illegal              -> abort (or pass the text through when illegals are ignored)
//! ```
//!
//! The buffer is flushed through keyword scanning, or handed to another grammar
//! when the mode declares a sublanguage. Compiled modes are never touched; all
//! per-scan state (scratch data, keyword hits, matcher cursor) lives here.

use crate::hilite::compiling::{
    CompiledGrammar, CompiledMode, MatcherState, ModeId, RuleKind, RuleMatch, ScopeEmit, ROOT,
};
use crate::hilite::emitter::{Emitter, TokenTree};
use crate::hilite::error::{GrammarError, HighlightError};
use crate::hilite::grammar::callbacks::{MatchData, Response, ScratchData};
use crate::hilite::grammar::mode::SubLanguage;
use crate::hilite::highlighter::{HighlightResult, Highlighter};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An open mode and the scratch data its callbacks share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub mode: ModeId,
    pub data: ScratchData,
}

impl Frame {
    fn new(mode: ModeId, data: ScratchData) -> Self {
        Self { mode, data }
    }
}

/// Where a sublanguage scan stopped
///
/// Handing it back to the next scan of the same grammar resumes with the same
/// modes open, so separate embedded blocks read as one continuous document.
#[derive(Debug, Clone)]
pub struct Continuation {
    grammar: Arc<CompiledGrammar>,
    stack: Vec<Frame>,
}

impl Continuation {
    pub fn is_for(&self, grammar: &Arc<CompiledGrammar>) -> bool {
        Arc::ptr_eq(&self.grammar, grammar)
    }
}

/// Why a scan stopped early
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// A mode's illegal pattern matched while illegals are not ignored
    Illegal {
        message: String,
        index: usize,
        mode: String,
    },
    /// An end matched nothing right where its mode began
    ZeroWidth { rule: String },
    Runaway { iterations: usize },
    /// A narrowed matcher failed to compile on first use
    Regex(GrammarError),
    Sublanguage(HighlightError),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Illegal { message, .. } => f.write_str(message),
            ScanError::ZeroWidth { rule } => write!(f, "0 width match regex in rule {rule}"),
            ScanError::Runaway { iterations } => write!(
                f,
                "potential infinite loop, way more iterations than matches ({iterations})"
            ),
            ScanError::Regex(err) => write!(f, "{err}"),
            ScanError::Sublanguage(err) => write!(f, "{err}"),
        }
    }
}

/// Knobs of a single scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub ignore_illegals: bool,
    pub safe_mode: bool,
    pub max_iterations: usize,
    pub max_keyword_hits: usize,
}

/// What a finished scan hands back
#[derive(Debug)]
pub struct ScanOutput {
    pub tree: TokenTree,
    pub relevance: u32,
    pub continuation: Continuation,
}

#[derive(Debug, Clone, Copy)]
struct LastMatch {
    kind: RuleKind,
    index: usize,
}

pub struct Session<'a> {
    highlighter: &'a Highlighter,
    grammar: &'a Arc<CompiledGrammar>,
    code: &'a str,
    options: ScanOptions,
    stack: Vec<Frame>,
    emitter: TokenTree,
    buffer: String,
    relevance: u32,
    keyword_hits: HashMap<String, usize>,
    continuations: HashMap<String, Continuation>,
    state: MatcherState,
    resume: bool,
    last_match: Option<LastMatch>,
    iterations: usize,
    index: usize,
}

impl<'a> Session<'a> {
    pub fn new(
        highlighter: &'a Highlighter,
        grammar: &'a Arc<CompiledGrammar>,
        code: &'a str,
        options: ScanOptions,
        continuation: Option<Continuation>,
    ) -> Self {
        let stack = match continuation {
            Some(c) if c.is_for(grammar) && !c.stack.is_empty() => c.stack,
            _ => vec![Frame::new(ROOT, ScratchData::new())],
        };
        Self {
            highlighter,
            grammar,
            code,
            options,
            stack,
            emitter: TokenTree::new(),
            buffer: String::new(),
            relevance: 0,
            keyword_hits: HashMap::new(),
            continuations: HashMap::new(),
            state: MatcherState::default(),
            resume: false,
            last_match: None,
            iterations: 0,
            index: 0,
        }
    }

    pub fn run(mut self) -> Result<ScanOutput, ScanError> {
        let grammar = self.grammar();
        if let Some(emit) = &grammar.emit_tokens {
            emit.emit(self.code, &mut self.emitter);
            return Ok(self.finish());
        }

        self.reopen_scopes();
        loop {
            self.iterations += 1;
            if self.resume {
                self.resume = false;
            } else {
                self.state.consider_all();
            }

            let top = self.top_mode();
            let found = top
                .matcher
                .exec(&mut self.state, self.code, self.index)
                .map_err(ScanError::Regex)?;
            let Some(found) = found else {
                break;
            };

            if self.iterations > self.options.max_iterations
                && self.iterations > found.index * 3
            {
                return Err(ScanError::Runaway {
                    iterations: self.iterations,
                });
            }

            let code = self.code;
            let before = &code[self.index..found.index];
            let advance = self.process_lexeme(before, &found)?;
            self.index = found.index + advance;
        }

        let rest = self.code.get(self.index..).unwrap_or_default();
        self.buffer.push_str(rest);
        self.process_buffer()?;
        Ok(self.finish())
    }

    fn finish(mut self) -> ScanOutput {
        self.emitter.finalize();
        log::trace!(
            "scan of '{}' done: relevance {} after {} iterations",
            self.grammar.name,
            self.relevance,
            self.iterations
        );
        ScanOutput {
            tree: self.emitter,
            relevance: self.relevance,
            continuation: Continuation {
                grammar: Arc::clone(self.grammar),
                stack: self.stack,
            },
        }
    }

    fn grammar(&self) -> &'a CompiledGrammar {
        self.grammar
    }

    fn top_id(&self) -> ModeId {
        self.stack.last().map_or(ROOT, |frame| frame.mode)
    }

    fn top_mode(&self) -> &'a CompiledMode {
        self.grammar().mode(self.top_id())
    }

    /// Scopes of a resumed stack are open again in the new tree
    fn reopen_scopes(&mut self) {
        let grammar = self.grammar();
        for frame in self.stack.iter().skip(1) {
            if let Some(scope) = &grammar.mode(frame.mode).scope {
                self.emitter.start_scope(grammar.alias_scope(scope));
            }
        }
    }

    /// Move past the character at `at`, keeping it as plain text; returns the
    /// bytes consumed (one past the end when there is nothing left)
    fn consume_next_char(&mut self, at: usize) -> usize {
        match self.code.get(at..).and_then(|rest| rest.chars().next()) {
            Some(c) => {
                self.buffer.push(c);
                c.len_utf8()
            }
            None => 1,
        }
    }

    fn process_lexeme(&mut self, before: &str, found: &RuleMatch) -> Result<usize, ScanError> {
        self.buffer.push_str(before);
        let lexeme = found.lexeme(self.code);
        log::trace!("{:?} at {}: {:?}", found.kind, found.index, lexeme);

        if let Some(LastMatch {
            kind: RuleKind::Begin(opened),
            index,
        }) = self.last_match
        {
            if found.kind == RuleKind::End && index == found.index && lexeme.is_empty() {
                if !self.options.safe_mode {
                    return Err(ScanError::ZeroWidth {
                        rule: self.grammar().mode(opened).display_name().to_string(),
                    });
                }
                return Ok(self.consume_next_char(found.index));
            }
        }
        self.last_match = Some(LastMatch {
            kind: found.kind,
            index: found.index,
        });

        match found.kind {
            RuleKind::Begin(mode) => return self.do_begin_match(mode, found),
            RuleKind::Illegal if !self.options.ignore_illegals => {
                let mode = self.top_mode().display_name().to_string();
                return Err(ScanError::Illegal {
                    message: format!("Illegal lexeme \"{lexeme}\" for mode \"{mode}\""),
                    index: found.index,
                    mode,
                });
            }
            RuleKind::End => {
                if let Some(advance) = self.do_end_match(found)? {
                    return Ok(advance);
                }
            }
            RuleKind::Illegal => {}
        }

        // An ignored illegal or an end that did not hold: keep the text as is
        if lexeme.is_empty() {
            return Ok(self.consume_next_char(found.index));
        }
        self.buffer.push_str(lexeme);
        Ok(lexeme.len())
    }

    fn do_begin_match(&mut self, id: ModeId, found: &RuleMatch) -> Result<usize, ScanError> {
        let mode = self.grammar().mode(id);
        let lexeme = found.lexeme(self.code);

        let mut data = ScratchData::new();
        let m = MatchData::new(self.code, found.groups.clone());
        for callback in [&mode.before_begin, &mode.on_begin].into_iter().flatten() {
            let mut response = Response::new(&mut data);
            callback.call(&m, &mut response);
            if response.is_ignored() {
                return Ok(self.do_ignore(found.index));
            }
        }

        if mode.skip {
            self.buffer.push_str(lexeme);
        } else {
            if mode.exclude_begin {
                self.buffer.push_str(lexeme);
            }
            self.process_buffer()?;
            if !mode.return_begin && !mode.exclude_begin {
                self.buffer = lexeme.to_string();
            }
        }
        self.start_new_mode(id, &found.groups, data);
        Ok(if mode.return_begin { 0 } else { lexeme.len() })
    }

    /// A callback rejected the match: retry the remaining rules here, or step
    /// over one character when none are left
    fn do_ignore(&mut self, at: usize) -> usize {
        if self.state.is_resuming() {
            self.resume = true;
            0
        } else {
            self.consume_next_char(at)
        }
    }

    fn start_new_mode(
        &mut self,
        id: ModeId,
        groups: &[Option<(usize, usize)>],
        data: ScratchData,
    ) {
        let grammar = self.grammar();
        let mode = grammar.mode(id);
        if let Some(scope) = &mode.scope {
            self.emitter.start_scope(grammar.alias_scope(scope));
        }
        match &mode.begin_scope {
            Some(ScopeEmit::Wrap(scope)) => {
                let text = std::mem::take(&mut self.buffer);
                self.emit_keyword(&text, grammar.alias_scope(scope));
            }
            Some(ScopeEmit::Multi(parts)) => {
                self.emit_multi_class(parts, groups);
                self.buffer.clear();
            }
            None => {}
        }
        self.stack.push(Frame::new(id, data));
    }

    fn do_end_match(&mut self, found: &RuleMatch) -> Result<Option<usize>, ScanError> {
        let Some(end_depth) = self.end_of_mode(found) else {
            return Ok(None);
        };
        let grammar = self.grammar();
        let lexeme = found.lexeme(self.code);
        let origin = self.top_mode();

        match &origin.end_scope {
            Some(ScopeEmit::Wrap(scope)) => {
                self.process_buffer()?;
                self.emit_keyword(lexeme, grammar.alias_scope(scope));
            }
            Some(ScopeEmit::Multi(parts)) => {
                self.process_buffer()?;
                self.emit_multi_class(parts, &found.groups);
            }
            None if origin.skip => self.buffer.push_str(lexeme),
            None => {
                if !(origin.return_end || origin.exclude_end) {
                    self.buffer.push_str(lexeme);
                }
                self.process_buffer()?;
                if origin.exclude_end {
                    self.buffer = lexeme.to_string();
                }
            }
        }

        let ending = grammar.mode(self.stack[end_depth].mode);
        while self.stack.len() > end_depth {
            let Some(frame) = self.stack.pop() else {
                break;
            };
            let closed = grammar.mode(frame.mode);
            if closed.scope.is_some() {
                self.emitter.end_scope();
            }
            if !closed.skip && closed.sub_language.is_none() {
                self.relevance += closed.relevance;
            }
        }

        if let Some(next) = ending.starts {
            self.start_new_mode(next, &found.groups, ScratchData::new());
        }
        Ok(Some(if origin.return_end { 0 } else { lexeme.len() }))
    }

    /// Stack depth of the mode this end match closes, if any
    ///
    /// The top mode ends when its own end matches here and its `on:end` agrees;
    /// otherwise an `endsWithParent` mode defers to its parent. `endsParent`
    /// climbs further up, but never to the root.
    fn end_of_mode(&mut self, found: &RuleMatch) -> Option<usize> {
        let grammar = self.grammar();
        let code = self.code;
        let mut depth = self.stack.len() - 1;
        loop {
            let mode = grammar.mode(self.stack[depth].mode);
            let mut matched = mode
                .end_re
                .as_ref()
                .is_some_and(|re| re.matches_at(code, found.index));
            if matched {
                if let Some(on_end) = &mode.on_end {
                    let m = MatchData::new(code, found.groups.clone());
                    let mut response = Response::new(&mut self.stack[depth].data);
                    on_end.call(&m, &mut response);
                    matched = !response.is_ignored();
                }
            }
            if matched {
                let mut end = depth;
                while end > 1 && grammar.mode(self.stack[end].mode).ends_parent {
                    end -= 1;
                }
                return Some(end);
            }
            if mode.ends_with_parent && depth > 1 {
                depth -= 1;
                continue;
            }
            return None;
        }
    }

    fn emit_keyword(&mut self, text: &str, scope: &str) {
        if text.is_empty() {
            return;
        }
        self.emitter.start_scope(scope);
        self.emitter.add_text(text);
        self.emitter.end_scope();
    }

    fn emit_multi_class(&mut self, parts: &[(usize, Option<String>)], groups: &[Option<(usize, usize)>]) {
        let grammar = self.grammar();
        let code = self.code;
        for (group, scope) in parts {
            let Some((start, end)) = groups.get(*group).copied().flatten() else {
                continue;
            };
            let text = &code[start..end];
            match scope {
                Some(scope) => self.emit_keyword(text, grammar.alias_scope(scope)),
                None => self.process_keywords(text),
            }
        }
    }

    fn process_buffer(&mut self) -> Result<(), ScanError> {
        let text = std::mem::take(&mut self.buffer);
        let mode = self.top_mode();
        match &mode.sub_language {
            Some(sub) => self.process_sub_language(sub, &text, mode.relevance),
            None => {
                self.process_keywords(&text);
                Ok(())
            }
        }
    }

    fn process_keywords(&mut self, text: &str) {
        let grammar = self.grammar();
        let mode = self.top_mode();
        let (Some(table), Some(pattern)) = (&mode.keywords, &mode.keyword_pattern) else {
            self.emitter.add_text(text);
            return;
        };

        let mut last = 0;
        let mut plain = String::new();
        for (start, end) in pattern.find_iter(text) {
            plain.push_str(&text[last..start]);
            last = end;
            let word = &text[start..end];
            let Some(keyword) = table.lookup(word) else {
                plain.push_str(word);
                continue;
            };

            self.emitter.add_text(&plain);
            plain.clear();
            let key = if grammar.case_insensitive {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            let hits = {
                let hits = self.keyword_hits.entry(key).or_insert(0);
                *hits += 1;
                *hits
            };
            if hits <= self.options.max_keyword_hits {
                self.relevance += keyword.relevance;
            }
            // `_`-prefixed scopes score without being tagged
            if keyword.scope.starts_with('_') {
                plain.push_str(word);
            } else {
                self.emit_keyword(word, grammar.alias_scope(&keyword.scope));
            }
        }
        plain.push_str(&text[last..]);
        self.emitter.add_text(&plain);
    }

    fn process_sub_language(
        &mut self,
        sub: &SubLanguage,
        text: &str,
        mode_relevance: u32,
    ) -> Result<(), ScanError> {
        if text.is_empty() {
            return Ok(());
        }
        let result: HighlightResult = match sub {
            SubLanguage::Fixed(name) => {
                if !self.highlighter.registry().has_language(name) {
                    self.emitter.add_text(text);
                    return Ok(());
                }
                // A block that falls back leaves the previous continuation in place
                let continuation = self.continuations.get(name).cloned();
                let mut result = self
                    .highlighter
                    .highlight_with(name, text, true, continuation)
                    .map_err(ScanError::Sublanguage)?;
                if let Some(next) = result.continuation.take() {
                    self.continuations.insert(name.clone(), next);
                }
                result
            }
            SubLanguage::Candidates(names) => {
                let subset = (!names.is_empty()).then_some(names.as_slice());
                self.highlighter
                    .highlight_auto(text, subset)
                    .map_err(ScanError::Sublanguage)?
            }
        };

        if mode_relevance > 0 {
            self.relevance += result.relevance;
        }
        let HighlightResult { tree, language, .. } = result;
        self.emitter.add_sublanguage(tree, language.as_deref());
        Ok(())
    }
}
