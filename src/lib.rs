//! # hilite
//!
//! A syntax highlighting engine driven by declarative, regex-based grammars.
//!
//! File Layout
//!
//! The engine is split the same way data flows through it:
//! src/hilite
//!   ├── patterns      Regex combinators and backreference-safe concatenation
//!   ├── keywords      Keyword tables and relevance scoring
//!   ├── grammar       The raw grammar data model (modes, grammars, loading)
//!   ├── compiling     Raw grammar -> compiled, arena-addressed modes + matchers
//!   ├── highlighting  The streaming scanner and the auto-detection ranker
//!   ├── emitter       The token tree the scanner builds
//!   └── formats       Renderers walking the token tree (html, treeviz, json)
//!
//! Callers usually only need [`Highlighter`](hilite::highlighter::Highlighter):
//!
//! ```rust,ignore
//! use hilite::hilite::highlighter::{HighlightOptions, Highlighter};
//!
//! let highlighter = Highlighter::default();
//! highlighter.registry().register_grammar("mini", grammar)?;
//! let result = highlighter.highlight("say \"hi\"", HighlightOptions::language("mini"))?;
//! println!("{}", result.value);
//! ```

pub mod hilite;

pub use hilite::highlighter::{HighlightOptions, HighlightResult, Highlighter};
