//! Highlight entry points
//!
//! [`Highlighter`] owns a language [`Registry`] and the engine settings, and
//! turns a scan into a [`HighlightResult`]: the rendered value, the relevance
//! score and, when the scan could not finish, the fallback and its diagnostics.
//!
//! Failure handling at this boundary:
//!
//! - illegal text: an `illegal` result carrying the escaped input, always
//! - zero-width stalls, runaway loops, broken patterns: an unhighlighted result
//!   in safe mode, an error otherwise
//! - unknown language: always an error

use crate::hilite::emitter::TokenTree;
use crate::hilite::error::HighlightError;
use crate::hilite::formats::html::{escape_html, render_html};
use crate::hilite::highlighting::auto;
use crate::hilite::highlighting::session::{Continuation, ScanError, ScanOptions, Session};
use crate::hilite::registry::Registry;
use crate::hilite::settings::HighlightSettings;
use serde::Serialize;

/// Bytes of input kept on each side of an illegal match
const CONTEXT_RADIUS: usize = 100;

/// Options of an explicit-language highlight call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightOptions {
    pub language: String,
    pub ignore_illegals: bool,
}

impl HighlightOptions {
    pub fn language(name: &str) -> Self {
        Self {
            language: name.to_string(),
            ignore_illegals: false,
        }
    }

    pub fn ignore_illegals(mut self) -> Self {
        self.ignore_illegals = true;
        self
    }
}

/// Where and why an illegal match stopped the scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IllegalDiagnostics {
    pub message: String,
    /// Byte offset of the illegal match
    pub index: usize,
    /// Input around the match
    pub context: String,
    /// Scope of the mode that was open
    pub mode: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightResult {
    /// `None` for the plain text result of auto-detection
    pub language: Option<String>,
    pub relevance: u32,
    /// Rendered HTML
    pub value: String,
    pub illegal: bool,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub illegal_by: Option<IllegalDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_raised: Option<String>,
    #[serde(skip)]
    pub tree: TokenTree,
    #[serde(skip)]
    pub(crate) continuation: Option<Continuation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_best: Option<Box<HighlightResult>>,
}

impl HighlightResult {
    /// The input as one unscoped leaf
    pub fn plaintext(code: &str) -> Self {
        Self {
            language: None,
            relevance: 0,
            value: escape_html(code),
            illegal: false,
            code: code.to_string(),
            illegal_by: None,
            error_raised: None,
            tree: TokenTree::from_text(code),
            continuation: None,
            second_best: None,
        }
    }

    fn fallback(language: &str, code: &str) -> Self {
        Self {
            language: Some(language.to_string()),
            ..Self::plaintext(code)
        }
    }
}

fn context_window(code: &str, index: usize) -> String {
    let mut start = index.saturating_sub(CONTEXT_RADIUS);
    while !code.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = index.saturating_add(CONTEXT_RADIUS).min(code.len());
    while !code.is_char_boundary(end) {
        end += 1;
    }
    code[start..end].to_string()
}

pub struct Highlighter {
    registry: Registry,
    settings: HighlightSettings,
}

impl Highlighter {
    pub fn new(settings: HighlightSettings) -> Self {
        let registry = Registry::with_options(settings.safe_mode, settings.compile_options());
        Self { registry, settings }
    }

    pub fn with_registry(registry: Registry, settings: HighlightSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &HighlightSettings {
        &self.settings
    }

    /// Highlight with a named language
    pub fn highlight(
        &self,
        code: &str,
        options: HighlightOptions,
    ) -> Result<HighlightResult, HighlightError> {
        self.highlight_with(&options.language, code, options.ignore_illegals, None)
    }

    /// Highlight with whichever candidate language scores best
    ///
    /// Candidates are `subset` when given, else the configured default list,
    /// else every registered language. The runner-up is in `second_best`.
    pub fn highlight_auto(
        &self,
        code: &str,
        subset: Option<&[String]>,
    ) -> Result<HighlightResult, HighlightError> {
        let names = auto::candidates(&self.registry, subset, &self.settings.languages);
        let mut results = Vec::with_capacity(names.len() + 1);
        results.push(HighlightResult::plaintext(code));
        for name in &names {
            results.push(self.highlight_with(
                name,
                code,
                self.settings.autodetect_ignore_illegals,
                None,
            )?);
        }

        let mut ranked = auto::rank(results, |name| self.registry.superset_of(name)).into_iter();
        let Some(mut best) = ranked.next() else {
            return Ok(HighlightResult::plaintext(code));
        };
        best.second_best = ranked.next().map(Box::new);
        log::debug!(
            "Auto-detected {:?} (relevance {}) among {} candidates",
            best.language,
            best.relevance,
            names.len()
        );
        Ok(best)
    }

    pub(crate) fn highlight_with(
        &self,
        language: &str,
        code: &str,
        ignore_illegals: bool,
        continuation: Option<Continuation>,
    ) -> Result<HighlightResult, HighlightError> {
        let grammar = self.registry.compiled(language)?;
        let options = ScanOptions {
            ignore_illegals,
            safe_mode: self.settings.safe_mode,
            max_iterations: self.settings.max_iterations,
            max_keyword_hits: self.settings.max_keyword_hits,
        };

        let error = match Session::new(self, &grammar, code, options, continuation).run() {
            Ok(output) => {
                return Ok(HighlightResult {
                    language: Some(language.to_string()),
                    relevance: output.relevance,
                    value: render_html(output.tree.root(), &self.settings.class_prefix),
                    illegal: false,
                    code: code.to_string(),
                    illegal_by: None,
                    error_raised: None,
                    tree: output.tree,
                    continuation: Some(output.continuation),
                    second_best: None,
                });
            }
            Err(error) => error,
        };

        match error {
            ScanError::Illegal {
                message,
                index,
                mode,
            } => {
                log::warn!("{language}: {message} at byte {index}");
                Ok(HighlightResult {
                    illegal: true,
                    illegal_by: Some(IllegalDiagnostics {
                        context: context_window(code, index),
                        message,
                        index,
                        mode,
                    }),
                    ..HighlightResult::fallback(language, code)
                })
            }
            error if self.settings.safe_mode => {
                log::warn!("{language}: highlighting abandoned: {error}");
                Ok(HighlightResult {
                    error_raised: Some(error.to_string()),
                    ..HighlightResult::fallback(language, code)
                })
            }
            ScanError::ZeroWidth { rule } => Err(HighlightError::ZeroWidthMatch {
                language: language.to_string(),
                rule,
            }),
            ScanError::Runaway { iterations } => Err(HighlightError::RunawayLoop {
                language: language.to_string(),
                iterations,
            }),
            ScanError::Regex(source) => Err(HighlightError::Grammar {
                language: language.to_string(),
                source,
            }),
            ScanError::Sublanguage(err) => Err(err),
        }
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(HighlightSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_window_clamps_to_char_boundaries() {
        let code = format!("{}Xé{}", "é".repeat(80), "a".repeat(10));
        let index = code.find('X').unwrap();
        let context = context_window(&code, index);
        assert!(context.contains('X'));
        assert!(context.ends_with("aaaaaaaaaa"));
    }

    #[test]
    fn test_plaintext_result() {
        let result = HighlightResult::plaintext("<b>");
        assert_eq!(result.value, "&lt;b&gt;");
        assert_eq!(result.relevance, 0);
        assert!(result.language.is_none());
        assert_eq!(result.tree.text(), "<b>");
    }

    #[test]
    fn test_unknown_language() {
        let highlighter = Highlighter::default();
        let err = highlighter
            .highlight("x", HighlightOptions::language("nope"))
            .unwrap_err();
        assert_eq!(err, HighlightError::UnknownLanguage("nope".to_string()));
    }
}
