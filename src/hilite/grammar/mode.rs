//! Raw modes
//!
//! A mode is one lexical construct: a string, a comment, a function header. It
//! is described by begin/end patterns, an optional scope to tag it with, keywords
//! and the child modes that may appear inside it. Modes are plain data: they
//! deserialize from JSON/YAML with camelCase keys and can also be assembled with
//! the builder methods below.
//!
//! ```text
//! Mode::new()
//!     .scope("string")
//!     .begin("\"")
//!     .end("\"")
//!     .contains([modes::backslash_escape()])
//! ```
//!
//! Raw modes are never modified by compilation. The compiler works on its own
//! copies and produces a separate compiled structure.

use crate::hilite::error::GrammarError;
use crate::hilite::grammar::callbacks::{MatchData, ModeCallback, Response};
use crate::hilite::keywords::Keywords;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Scope of a mode or of its begin/end match
///
/// `Captures` assigns a scope per capture group of a sequence pattern and is
/// written in data files as `{ "1": "keyword", "3": "title" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawScope")]
pub enum Scope {
    Name(String),
    Captures(BTreeMap<usize, String>),
}

impl Scope {
    pub fn captures<'a>(entries: impl IntoIterator<Item = (usize, &'a str)>) -> Self {
        Scope::Captures(
            entries
                .into_iter()
                .map(|(i, name)| (i, name.to_string()))
                .collect(),
        )
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Scope::Name(name.to_string())
    }
}

impl From<String> for Scope {
    fn from(name: String) -> Self {
        Scope::Name(name)
    }
}

impl From<BTreeMap<usize, String>> for Scope {
    fn from(map: BTreeMap<usize, String>) -> Self {
        Scope::Captures(map)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScope {
    Name(String),
    Captures(BTreeMap<CaptureKey, String>),
}

impl From<RawScope> for Scope {
    fn from(raw: RawScope) -> Self {
        match raw {
            RawScope::Name(name) => Scope::Name(name),
            RawScope::Captures(map) => {
                Scope::Captures(map.into_iter().map(|(k, v)| (k.0, v)).collect())
            }
        }
    }
}

/// Capture index key; JSON writes it as a string, YAML may write a bare integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CaptureKey(usize);

impl<'de> Deserialize<'de> for CaptureKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = CaptureKey;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a capture group index")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CaptureKey, E> {
                usize::try_from(v)
                    .map(CaptureKey)
                    .map_err(|_| E::custom("capture index out of range"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CaptureKey, E> {
                usize::try_from(v)
                    .map(CaptureKey)
                    .map_err(|_| E::custom("capture index must be positive"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CaptureKey, E> {
                v.parse()
                    .map(CaptureKey)
                    .map_err(|_| E::custom(format!("invalid capture index '{v}'")))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

/// A begin/end/match pattern: one regex, or a sequence of regexes matched back to
/// back (one per capture group, used with a `Captures` scope)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Source(String),
    Sequence(Vec<String>),
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Pattern::Source(source.to_string())
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::Source(source)
    }
}

impl From<Vec<String>> for Pattern {
    fn from(parts: Vec<String>) -> Self {
        Pattern::Sequence(parts)
    }
}

impl<const N: usize> From<[&str; N]> for Pattern {
    fn from(parts: [&str; N]) -> Self {
        Pattern::Sequence(parts.iter().map(|p| p.to_string()).collect())
    }
}

/// Text that must not appear inside a mode: one pattern or any of several
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Illegal {
    One(String),
    Any(Vec<String>),
}

impl From<&str> for Illegal {
    fn from(source: &str) -> Self {
        Illegal::One(source.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for Illegal {
    fn from(parts: [&str; N]) -> Self {
        Illegal::Any(parts.iter().map(|p| p.to_string()).collect())
    }
}

/// Embedded language of a mode's content
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SubLanguage {
    /// Always this language
    Fixed(String),
    /// Auto-detect among these; empty means every registered language
    Candidates(Vec<String>),
}

impl From<&str> for SubLanguage {
    fn from(name: &str) -> Self {
        SubLanguage::Fixed(name.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for SubLanguage {
    fn from(names: [&str; N]) -> Self {
        SubLanguage::Candidates(names.iter().map(|n| n.to_string()).collect())
    }
}

/// An entry of a mode's `contains` list
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawModeRef")]
pub enum ModeRef {
    /// The containing mode itself (`"self"` in data files)
    SelfRef,
    /// A mode from the grammar's named `modes` table (`{ "ref": "name" }`)
    Named(String),
    Inline(Arc<Mode>),
}

impl ModeRef {
    pub fn named(name: &str) -> Self {
        ModeRef::Named(name.to_string())
    }
}

impl From<Mode> for ModeRef {
    fn from(mode: Mode) -> Self {
        ModeRef::Inline(Arc::new(mode))
    }
}

impl From<Arc<Mode>> for ModeRef {
    fn from(mode: Arc<Mode>) -> Self {
        ModeRef::Inline(mode)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawModeRef {
    Marker(String),
    Named {
        #[serde(rename = "ref")]
        name: String,
    },
    Inline(Box<Mode>),
}

impl TryFrom<RawModeRef> for ModeRef {
    type Error = GrammarError;

    fn try_from(raw: RawModeRef) -> Result<Self, Self::Error> {
        match raw {
            RawModeRef::Marker(text) if text == "self" => Ok(ModeRef::SelfRef),
            RawModeRef::Marker(text) => Err(GrammarError::InvalidMarker(text)),
            RawModeRef::Named { name } => Ok(ModeRef::Named(name)),
            RawModeRef::Inline(mode) => Ok(ModeRef::Inline(Arc::new(*mode))),
        }
    }
}

/// One node of a grammar's mode tree
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Mode {
    pub scope: Option<Scope>,
    /// Legacy spelling of `scope`
    pub class_name: Option<String>,
    pub begin_scope: Option<Scope>,
    pub end_scope: Option<Scope>,
    pub begin: Option<Pattern>,
    pub end: Option<Pattern>,
    /// Single-pattern shorthand for a mode that begins and ends on one match
    #[serde(rename = "match")]
    pub r#match: Option<Pattern>,
    /// Qualifier that must come right before `match`/`begin`; it is matched but
    /// left unscoped
    pub before_match: Option<String>,
    pub begin_keywords: Option<String>,
    pub keywords: Option<Keywords>,
    pub illegal: Option<Illegal>,
    pub contains: Vec<ModeRef>,
    pub starts: Option<Arc<Mode>>,
    pub variants: Vec<Mode>,
    pub relevance: Option<u32>,
    pub exclude_begin: bool,
    pub exclude_end: bool,
    pub return_begin: bool,
    pub return_end: bool,
    pub ends_with_parent: bool,
    pub ends_parent: bool,
    pub skip: bool,
    pub sub_language: Option<SubLanguage>,
    #[serde(skip)]
    pub on_begin: Option<ModeCallback>,
    #[serde(skip)]
    pub on_end: Option<ModeCallback>,
}

impl Mode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn class_name(mut self, name: &str) -> Self {
        self.class_name = Some(name.to_string());
        self
    }

    pub fn begin_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.begin_scope = Some(scope.into());
        self
    }

    pub fn end_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.end_scope = Some(scope.into());
        self
    }

    pub fn begin(mut self, pattern: impl Into<Pattern>) -> Self {
        self.begin = Some(pattern.into());
        self
    }

    pub fn end(mut self, pattern: impl Into<Pattern>) -> Self {
        self.end = Some(pattern.into());
        self
    }

    pub fn match_pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.r#match = Some(pattern.into());
        self
    }

    pub fn before_match(mut self, pattern: &str) -> Self {
        self.before_match = Some(pattern.to_string());
        self
    }

    pub fn begin_keywords(mut self, words: &str) -> Self {
        self.begin_keywords = Some(words.to_string());
        self
    }

    pub fn keywords(mut self, keywords: Keywords) -> Self {
        self.keywords = Some(keywords);
        self
    }

    pub fn illegal(mut self, illegal: impl Into<Illegal>) -> Self {
        self.illegal = Some(illegal.into());
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

    pub fn contains_self(mut self) -> Self {
        self.contains.push(ModeRef::SelfRef);
        self
    }

    pub fn starts(mut self, next: Mode) -> Self {
        self.starts = Some(Arc::new(next));
        self
    }

    pub fn variants(mut self, variants: impl IntoIterator<Item = Mode>) -> Self {
        self.variants.extend(variants);
        self
    }

    pub fn relevance(mut self, relevance: u32) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn exclude_begin(mut self) -> Self {
        self.exclude_begin = true;
        self
    }

    pub fn exclude_end(mut self) -> Self {
        self.exclude_end = true;
        self
    }

    pub fn return_begin(mut self) -> Self {
        self.return_begin = true;
        self
    }

    pub fn return_end(mut self) -> Self {
        self.return_end = true;
        self
    }

    pub fn ends_with_parent(mut self) -> Self {
        self.ends_with_parent = true;
        self
    }

    pub fn ends_parent(mut self) -> Self {
        self.ends_parent = true;
        self
    }

    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn sub_language(mut self, sub: impl Into<SubLanguage>) -> Self {
        self.sub_language = Some(sub.into());
        self
    }

    pub fn on_begin<F>(mut self, f: F) -> Self
    where
        F: Fn(&MatchData<'_>, &mut Response<'_>) + Send + Sync + 'static,
    {
        self.on_begin = Some(ModeCallback::new(f));
        self
    }

    pub fn on_end<F>(mut self, f: F) -> Self
    where
        F: Fn(&MatchData<'_>, &mut Response<'_>) + Send + Sync + 'static,
    {
        self.on_end = Some(ModeCallback::new(f));
        self
    }

    /// Clone of `self` specialized by one of its variants
    ///
    /// Fields the variant sets win; everything else comes from `self`. Flags are
    /// set if either side sets them. The result has no variants of its own.
    pub fn inherit(&self, variant: &Mode) -> Mode {
        fn pick<T: Clone>(own: &Option<T>, base: &Option<T>) -> Option<T> {
            own.clone().or_else(|| base.clone())
        }
        fn pick_vec<T: Clone>(own: &[T], base: &[T]) -> Vec<T> {
            if own.is_empty() {
                base.to_vec()
            } else {
                own.to_vec()
            }
        }

        Mode {
            scope: pick(&variant.scope, &self.scope),
            class_name: pick(&variant.class_name, &self.class_name),
            begin_scope: pick(&variant.begin_scope, &self.begin_scope),
            end_scope: pick(&variant.end_scope, &self.end_scope),
            begin: pick(&variant.begin, &self.begin),
            end: pick(&variant.end, &self.end),
            r#match: pick(&variant.r#match, &self.r#match),
            before_match: pick(&variant.before_match, &self.before_match),
            begin_keywords: pick(&variant.begin_keywords, &self.begin_keywords),
            keywords: pick(&variant.keywords, &self.keywords),
            illegal: pick(&variant.illegal, &self.illegal),
            contains: pick_vec(&variant.contains, &self.contains),
            starts: pick(&variant.starts, &self.starts),
            variants: Vec::new(),
            relevance: pick(&variant.relevance, &self.relevance),
            exclude_begin: variant.exclude_begin || self.exclude_begin,
            exclude_end: variant.exclude_end || self.exclude_end,
            return_begin: variant.return_begin || self.return_begin,
            return_end: variant.return_end || self.return_end,
            ends_with_parent: variant.ends_with_parent || self.ends_with_parent,
            ends_parent: variant.ends_parent || self.ends_parent,
            skip: variant.skip || self.skip,
            sub_language: pick(&variant.sub_language, &self.sub_language),
            on_begin: pick(&variant.on_begin, &self.on_begin),
            on_end: pick(&variant.on_end, &self.on_end),
        }
    }
}
