//! Raw grammar data model
//!
//! Everything a grammar author writes: modes, grammars, callbacks and the loader
//! for grammar data files. Nothing here knows about regex compilation.

pub mod callbacks;
pub mod language;
pub mod loader;
pub mod mode;

pub use callbacks::{
    CompilerExtension, EmitTokens, MatchData, ModeCallback, Response, ScratchData,
};
pub use language::{Grammar, PLAINTEXT_NAME};
pub use loader::{GrammarFormat, GrammarLoader, LoaderError};
pub use mode::{Illegal, Mode, ModeRef, Pattern, Scope, SubLanguage};
