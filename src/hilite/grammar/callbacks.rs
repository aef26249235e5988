//! Code hooks a grammar can attach to its data
//!
//! These are the parts of a grammar that cannot come from a data file: mode
//! lifecycle callbacks (`on:begin` / `on:end`), compiler extensions and the
//! low-level token emission override. Each wraps an `Arc`'d closure so grammars
//! stay cheap to clone and can be shared between threads.

use crate::hilite::emitter::Emitter;
use crate::hilite::error::GrammarError;
use crate::hilite::grammar::mode::Mode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Scratch space that lives on one mode's stack frame, from its begin to its end
pub type ScratchData = HashMap<String, String>;

/// A regex match handed to mode callbacks
///
/// Group positions are byte offsets into the whole input, so callbacks can look
/// at the text around the match as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchData<'t> {
    input: &'t str,
    groups: Vec<Option<(usize, usize)>>,
}

impl<'t> MatchData<'t> {
    pub fn new(input: &'t str, groups: Vec<Option<(usize, usize)>>) -> Self {
        Self { input, groups }
    }

    /// Where the whole match starts
    pub fn index(&self) -> usize {
        self.range(0).map_or(0, |(start, _)| start)
    }

    /// Byte range of group `i`, if it participated
    pub fn range(&self, i: usize) -> Option<(usize, usize)> {
        self.groups.get(i).copied().flatten()
    }

    /// Text of group `i`, if it participated
    pub fn get(&self, i: usize) -> Option<&'t str> {
        self.range(i).map(|(start, end)| &self.input[start..end])
    }

    /// The whole matched text
    pub fn as_str(&self) -> &'t str {
        self.get(0).unwrap_or("")
    }

    /// Number of group slots, the whole match included
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn input(&self) -> &'t str {
        self.input
    }

    /// Character right before the match
    pub fn preceding_char(&self) -> Option<char> {
        self.input[..self.index()].chars().next_back()
    }
}

/// What a callback can do about a match
#[derive(Debug)]
pub struct Response<'a> {
    data: &'a mut ScratchData,
    ignored: bool,
}

impl<'a> Response<'a> {
    pub fn new(data: &'a mut ScratchData) -> Self {
        Self {
            data,
            ignored: false,
        }
    }

    /// Reject the match; the scanner retries the remaining rules at the same spot
    pub fn ignore_match(&mut self) {
        self.ignored = true;
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn data(&self) -> &ScratchData {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut ScratchData {
        &mut *self.data
    }
}

type CallbackFn = dyn Fn(&MatchData<'_>, &mut Response<'_>) + Send + Sync;

/// `on:begin` / `on:end` hook of a mode
#[derive(Clone)]
pub struct ModeCallback(Arc<CallbackFn>);

impl ModeCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&MatchData<'_>, &mut Response<'_>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, m: &MatchData<'_>, response: &mut Response<'_>) {
        (self.0)(m, response)
    }
}

impl fmt::Debug for ModeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModeCallback")
    }
}

type ExtensionFn = dyn Fn(&mut Mode, Option<&Mode>) -> Result<(), GrammarError> + Send + Sync;

/// Grammar-supplied rewrite applied to every mode before compilation
///
/// Receives the mode being compiled and its parent (`None` for the root).
#[derive(Clone)]
pub struct CompilerExtension(Arc<ExtensionFn>);

impl CompilerExtension {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Mode, Option<&Mode>) -> Result<(), GrammarError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, mode: &mut Mode, parent: Option<&Mode>) -> Result<(), GrammarError> {
        (self.0)(mode, parent)
    }
}

impl fmt::Debug for CompilerExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompilerExtension")
    }
}

type EmitFn = dyn Fn(&str, &mut dyn Emitter) + Send + Sync;

/// Replaces the whole scanner for a grammar: the closure drives the emitter itself
#[derive(Clone)]
pub struct EmitTokens(Arc<EmitFn>);

impl EmitTokens {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &mut dyn Emitter) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn emit(&self, code: &str, emitter: &mut dyn Emitter) {
        (self.0)(code, emitter)
    }
}

impl fmt::Debug for EmitTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EmitTokens")
    }
}
