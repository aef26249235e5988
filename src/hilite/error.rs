//! Error types shared across the engine
//!
//! Two families exist. `GrammarError` describes a grammar that cannot be compiled:
//! it is a mistake in the grammar definition, raised once at compile time.
//! `HighlightError` is what a caller of the highlight entry points can see; most
//! scan-time failures never reach it because lenient (safe) mode turns them into
//! an unhighlighted result instead.

use std::fmt;

/// A grammar definition that cannot be compiled
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarError {
    /// `match` shorthand combined with an explicit `begin` or `end`
    MatchWithBeginEnd,
    /// `beforeMatch` on a mode that already declares `starts`
    BeforeMatchWithStarts,
    /// Invalid use of multi-capture scopes (`beginScope`/`endScope` maps)
    MultiCapture(String),
    /// The `self` marker used in the grammar's top-level `contains`
    SelfAtTopLevel,
    /// A `{ "ref": name }` entry naming a mode the grammar does not define
    UnknownModeRef(String),
    /// A string in `contains` other than the `self` marker
    InvalidMarker(String),
    /// A pattern the regex engine rejected
    InvalidPattern { pattern: String, message: String },
    /// The grammar factory passed to the registry failed
    FactoryFailed(String),
    /// A grammar-supplied compiler extension rejected a mode
    Extension(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::MatchWithBeginEnd => {
                write!(f, "begin & end are not supported with match")
            }
            GrammarError::BeforeMatchWithStarts => {
                write!(f, "beforeMatch cannot be used with starts")
            }
            GrammarError::MultiCapture(reason) => write!(f, "Invalid multi-capture scope: {reason}"),
            GrammarError::SelfAtTopLevel => write!(
                f,
                "contains `self` is not supported at the top-level of a language"
            ),
            GrammarError::UnknownModeRef(name) => write!(f, "Unknown mode reference '{name}'"),
            GrammarError::InvalidMarker(text) => {
                write!(f, "Unknown contains marker '{text}' (only 'self' is allowed)")
            }
            GrammarError::InvalidPattern { pattern, message } => {
                write!(f, "Invalid pattern /{pattern}/: {message}")
            }
            GrammarError::FactoryFailed(msg) => write!(f, "Grammar factory failed: {msg}"),
            GrammarError::Extension(msg) => write!(f, "Compiler extension failed: {msg}"),
        }
    }
}

impl std::error::Error for GrammarError {}

/// Failures visible to callers of the highlight entry points
#[derive(Debug, Clone, PartialEq)]
pub enum HighlightError {
    /// No grammar is registered under this name or alias
    UnknownLanguage(String),
    /// The grammar failed to compile and safe mode is off
    Grammar {
        language: String,
        source: GrammarError,
    },
    /// A rule matched an empty string right where its mode ended (safe mode off)
    ZeroWidthMatch { language: String, rule: String },
    /// The scan ran far more iterations than the input can justify (safe mode off)
    RunawayLoop { language: String, iterations: usize },
}

impl fmt::Display for HighlightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighlightError::UnknownLanguage(name) => write!(f, "Unknown language: \"{name}\""),
            HighlightError::Grammar { language, source } => {
                write!(f, "Language definition for '{language}' could not be compiled: {source}")
            }
            HighlightError::ZeroWidthMatch { language, rule } => {
                write!(f, "0 width match regex ({language}) in rule {rule}")
            }
            HighlightError::RunawayLoop {
                language,
                iterations,
            } => write!(
                f,
                "potential infinite loop in {language}, way more iterations than matches ({iterations})"
            ),
        }
    }
}

impl std::error::Error for HighlightError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HighlightError::Grammar { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_error_display() {
        let err = GrammarError::UnknownModeRef("string".to_string());
        assert_eq!(err.to_string(), "Unknown mode reference 'string'");
    }

    #[test]
    fn test_highlight_error_source_chain() {
        let err = HighlightError::Grammar {
            language: "mini".to_string(),
            source: GrammarError::MatchWithBeginEnd,
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("begin & end are not supported with match")
        );
    }
}
