//! Grammar compilation
//!
//! Raw grammars are compiled into [`CompiledGrammar`]s: every mode is desugared,
//! its patterns validated, and its rules glued into one resumable matcher.

pub mod compiled;
pub mod compiler;
pub mod multi_regex;
pub mod sugar;

pub use compiled::{CompiledGrammar, CompiledMode, ModeId, ROOT};
pub use compiler::{compile, CompileOptions};
pub use multi_regex::{MatcherState, ResumableMultiRegex, RuleKind, RuleMatch};
pub use sugar::{Prepared, ScopeEmit};
