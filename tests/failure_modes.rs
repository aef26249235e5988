//! Scans that cannot finish normally
//!
//! Safe mode turns every failure except an illegal match into an unhighlighted
//! result carrying the error message; with safe mode off the error surfaces.

use hilite::hilite::error::{GrammarError, HighlightError};
use hilite::hilite::grammar::{Grammar, Mode};
use hilite::hilite::settings::HighlightSettings;
use hilite::hilite::testing::{highlighter_with, highlighter_with_settings, host_grammar, sexp};
use hilite::HighlightOptions;

fn strict() -> HighlightSettings {
    HighlightSettings {
        safe_mode: false,
        max_iterations: 10,
        ..HighlightSettings::default()
    }
}

fn lenient() -> HighlightSettings {
    HighlightSettings {
        max_iterations: 10,
        ..HighlightSettings::default()
    }
}

/// A look-ahead end right where a `returnBegin` mode opened
fn zero_width_grammar() -> Grammar {
    Grammar::new("zw").contains([Mode::new()
        .scope("word")
        .begin("a")
        .end("(?=a)")
        .return_begin()])
}

/// Opens and closes a mode without ever consuming input
fn looping_grammar() -> Grammar {
    Grammar::new("loop").contains([Mode::new()
        .scope("w")
        .begin("a")
        .end("a")
        .return_begin()
        .return_end()])
}

fn broken_grammar() -> Grammar {
    Grammar::new("broken").contains([Mode::new().begin("(")])
}

#[test]
fn test_zero_width_match_is_an_error_in_strict_mode() {
    let highlighter = highlighter_with_settings(strict(), [("zw", zero_width_grammar())]);
    let err = highlighter
        .highlight("ab", HighlightOptions::language("zw"))
        .unwrap_err();
    assert_eq!(
        err,
        HighlightError::ZeroWidthMatch {
            language: "zw".to_string(),
            rule: "word".to_string(),
        }
    );
}

#[test]
fn test_zero_width_match_steps_over_a_char_in_safe_mode() {
    let highlighter = highlighter_with([("zw", zero_width_grammar())]);
    let result = highlighter
        .highlight("ab", HighlightOptions::language("zw"))
        .unwrap();
    assert!(result.error_raised.is_none());
    assert_eq!(sexp(result.tree.root()), r#"(word "ab")"#);
}

#[test]
fn test_runaway_loop_is_an_error_in_strict_mode() {
    let highlighter = highlighter_with_settings(strict(), [("loop", looping_grammar())]);
    let err = highlighter
        .highlight("a", HighlightOptions::language("loop"))
        .unwrap_err();
    assert!(matches!(
        err,
        HighlightError::RunawayLoop { ref language, iterations } if language == "loop" && iterations > 10
    ));
}

#[test]
fn test_runaway_loop_falls_back_in_safe_mode() {
    let highlighter = highlighter_with_settings(lenient(), [("loop", looping_grammar())]);
    let result = highlighter
        .highlight("a", HighlightOptions::language("loop"))
        .unwrap();

    let message = result.error_raised.expect("error message");
    assert!(message.contains("infinite loop"));
    assert!(!result.illegal);
    assert_eq!(result.relevance, 0);
    assert_eq!(result.value, "a");
    assert_eq!(sexp(result.tree.root()), r#""a""#);
}

#[test]
fn test_invalid_pattern_is_an_error_in_strict_mode() {
    let highlighter = highlighter_with_settings(strict(), [("broken", broken_grammar())]);
    let err = highlighter
        .highlight("(x)", HighlightOptions::language("broken"))
        .unwrap_err();
    assert!(matches!(
        err,
        HighlightError::Grammar {
            ref language,
            source: GrammarError::InvalidPattern { .. },
        } if language == "broken"
    ));
}

#[test]
fn test_invalid_pattern_highlights_as_plain_text_in_safe_mode() {
    let highlighter = highlighter_with([("broken", broken_grammar())]);
    let result = highlighter
        .highlight("(x)", HighlightOptions::language("broken"))
        .unwrap();
    assert_eq!(result.language.as_deref(), Some("broken"));
    assert_eq!(result.relevance, 0);
    assert_eq!(sexp(result.tree.root()), r#""(x)""#);
}

#[test]
fn test_illegal_ignores_safe_mode() {
    let grammar = Grammar::new("strictest").illegal("X");
    let highlighter = highlighter_with_settings(strict(), [("strictest", grammar)]);
    let result = highlighter
        .highlight("aX", HighlightOptions::language("strictest"))
        .unwrap();
    assert!(result.illegal);
    assert_eq!(result.illegal_by.map(|d| d.index), Some(1));
}

#[test]
fn test_compiled_grammar_is_shared_between_calls() {
    let highlighter = highlighter_with([("loop", looping_grammar())]);
    let first = highlighter.registry().compiled("loop").unwrap();
    let second = highlighter.registry().compiled("LOOP").unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn test_failed_sublanguage_block_keeps_the_open_state() {
    // `!` opens and closes a mode without consuming anything
    let inner = Grammar::new("inner").contains([Mode::new()
        .scope("string")
        .begin("\"")
        .end("\"")
        .contains([Mode::new()
            .scope("w")
            .begin("!")
            .end("!")
            .return_begin()
            .return_end()])]);
    let highlighter =
        highlighter_with_settings(lenient(), [("host", host_grammar()), ("inner", inner)]);
    let result = highlighter
        .highlight(r#"a <%"x%> b <%!%> c <%y"%>"#, HighlightOptions::language("host"))
        .unwrap();

    // The middle block falls back; the string opened before it is still open after
    assert_eq!(
        sexp(result.tree.root()),
        r#""a <%" (language:inner (string "\"x")) "%> b <%" (language:inner "!") "%> c <%" (language:inner (string "y\"")) "%>""#
    );
    assert!(result.error_raised.is_none());
}
