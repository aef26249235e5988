//! Regex combinators and pattern compilation
//!
//! Grammars describe every construct as a regex source string. The helpers here
//! compose sources (concatenation, alternation, lookahead, ...) and, most
//! importantly, glue several independent patterns into one regex while keeping
//! each pattern's numbered backreferences pointing at its own groups.
//!
//! ## Backreference rewriting
//!
//! ```text
//! Patterns:  ["(a)\1", "(b)(c)\2"]
//! Joined:    "((a)\2)|((b)(c)\5)"
//! ```
//!
//! Each pattern is wrapped in its own capturing group, so a caller can tell which
//! pattern matched by looking at which wrapper group participated.
//!
//! Compiled patterns use Oniguruma (Ruby syntax), which supports lookaround and
//! backreferences. `^` and `$` match at line boundaries, `.` does not cross a
//! newline.

use crate::hilite::error::GrammarError;
use once_cell::sync::Lazy;
use onig::{Regex, RegexOptions, Region, SearchOptions, Syntax};
use std::fmt;

/// Tokenizes a pattern source into the pieces that matter for group counting:
/// character classes (skipped whole), `(` / `(?` openers, numbered backreferences
/// and any other escape.
static BACKREF_RE: Lazy<::regex::Regex> = Lazy::new(|| {
    ::regex::Regex::new(r"\[(?:[^\\\]]|\\.)*\]|\(\??|\\([1-9][0-9]*)|\\.").unwrap()
});

static ESCAPE_RE: Lazy<::regex::Regex> =
    Lazy::new(|| ::regex::Regex::new(r"[-/\\^$*+?.()|\[\]{}]").unwrap());

/// Matches nothing, anywhere.
pub const MATCH_NOTHING_RE: &str = r"\b\B";

/// Matches the empty string at any position.
pub const MATCH_ANYWHERE_RE: &str = r"\B|\b";

/// Anything with a textual regex source
pub trait Source {
    fn source(&self) -> &str;
}

impl Source for str {
    fn source(&self) -> &str {
        self
    }
}

impl Source for String {
    fn source(&self) -> &str {
        self
    }
}

impl<T: Source + ?Sized> Source for &T {
    fn source(&self) -> &str {
        (**self).source()
    }
}

impl Source for LangRegex {
    fn source(&self) -> &str {
        &self.source
    }
}

/// Textual source of a pattern, or `None` when there is no (or an empty) pattern
pub fn source<S: Source + ?Sized>(pattern: Option<&S>) -> Option<&str> {
    pattern.map(|p| p.source()).filter(|s| !s.is_empty())
}

/// Escape a literal string so it matches itself
pub fn escape(value: &str) -> String {
    ESCAPE_RE.replace_all(value, r"\$0").into_owned()
}

/// Join sources with no separator
pub fn concat<S: Source>(parts: &[S]) -> String {
    parts.iter().map(|p| p.source()).collect()
}

/// `(?=pattern)`
pub fn lookahead<S: Source + ?Sized>(pattern: &S) -> String {
    format!("(?={})", pattern.source())
}

/// `(?:pattern)?`
pub fn optional<S: Source + ?Sized>(pattern: &S) -> String {
    format!("(?:{})?", pattern.source())
}

/// `(?:pattern)*`
pub fn any_number_of_times<S: Source + ?Sized>(pattern: &S) -> String {
    format!("(?:{})*", pattern.source())
}

/// Options for [`either_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EitherOptions {
    /// Wrap the alternation in a capturing group instead of `(?:...)`
    pub capture: bool,
}

/// `(?:p1|p2|...)`
pub fn either<S: Source>(parts: &[S]) -> String {
    either_with(parts, EitherOptions::default())
}

/// `(?:p1|p2|...)`, or `(p1|p2|...)` when `capture` is set
pub fn either_with<S: Source>(parts: &[S], options: EitherOptions) -> String {
    let joined = parts
        .iter()
        .map(|p| p.source())
        .collect::<Vec<_>>()
        .join("|");
    if options.capture {
        format!("({joined})")
    } else {
        format!("(?:{joined})")
    }
}

/// Number of capturing groups in a pattern
///
/// The pattern is compiled with an empty alternative appended and run against the
/// empty string; the size of the resulting region, minus the whole-match slot,
/// is the group count.
pub fn count_match_groups<S: Source + ?Sized>(pattern: &S) -> Result<usize, GrammarError> {
    let probe = format!("{}|", pattern.source());
    let regex = compile_raw(&probe, RegexOptions::REGEX_OPTION_NONE)?;
    let mut region = Region::new();
    regex.search_with_options("", 0, 0, SearchOptions::SEARCH_OPTION_NONE, Some(&mut region));
    Ok(region.len().saturating_sub(1))
}

/// Whether the pattern matches with its first match starting at offset 0
pub fn starts_with(regex: Option<&LangRegex>, lexeme: &str) -> bool {
    regex
        .and_then(|re| re.find_at(lexeme, 0))
        .is_some_and(|(start, _)| start == 0)
}

/// Wrap each pattern in a capturing group and join them, renumbering every
/// `\N` backreference by the number of groups that precede its pattern.
///
/// Character classes are scanned over (parentheses inside `[...]` are literal),
/// and `(?` openers (non-capturing groups, lookarounds) do not take a slot.
pub fn rewrite_backreferences<S: Source>(patterns: &[S], join_with: &str) -> String {
    let mut num_captures = 0usize;
    patterns
        .iter()
        .map(|pattern| {
            num_captures += 1;
            let offset = num_captures;
            let mut re = pattern.source();
            let mut out = String::with_capacity(re.len() + 2);
            out.push('(');
            while !re.is_empty() {
                let Some(caps) = BACKREF_RE.captures(re) else {
                    out.push_str(re);
                    break;
                };
                let whole = caps.get(0).map_or(0..0, |m| m.range());
                out.push_str(&re[..whole.start]);
                let token = &re[whole.clone()];
                match caps.get(1) {
                    Some(number) if token.starts_with('\\') => {
                        let n: usize = number.as_str().parse().unwrap_or(0);
                        out.push('\\');
                        out.push_str(&(n + offset).to_string());
                    }
                    _ => {
                        out.push_str(token);
                        if token == "(" {
                            num_captures += 1;
                        }
                    }
                }
                re = &re[whole.end..];
            }
            out.push(')');
            out
        })
        .collect::<Vec<_>>()
        .join(join_with)
}

/// Grammar-wide compilation flags, applied uniformly to every pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LangFlags {
    pub case_insensitive: bool,
    /// Recorded for fidelity with grammar data. Oniguruma always compiles UTF-8
    /// patterns with Unicode-aware classes, so this does not change matching.
    pub unicode: bool,
}

impl LangFlags {
    fn options(self) -> RegexOptions {
        let mut options = RegexOptions::REGEX_OPTION_CAPTURE_GROUP;
        if self.case_insensitive {
            options |= RegexOptions::REGEX_OPTION_IGNORECASE;
        }
        options
    }
}

fn compile_raw(pattern: &str, options: RegexOptions) -> Result<Regex, GrammarError> {
    Regex::with_options(
        pattern,
        options | RegexOptions::REGEX_OPTION_CAPTURE_GROUP,
        Syntax::default(),
    )
    .map_err(|e| GrammarError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// A compiled grammar pattern that remembers its source
pub struct LangRegex {
    source: String,
    regex: Regex,
}

impl LangRegex {
    /// Compile a source with the grammar's flags
    pub fn new(source: &str, flags: LangFlags) -> Result<Self, GrammarError> {
        let regex = compile_raw(source, flags.options())?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Number of capturing groups
    pub fn captures_len(&self) -> usize {
        self.regex.captures_len()
    }

    /// First match at or after `from`, as a byte range
    pub fn find_at(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        if from > text.len() {
            return None;
        }
        let mut region = Region::new();
        self.regex.search_with_options(
            text,
            from,
            text.len(),
            SearchOptions::SEARCH_OPTION_NONE,
            Some(&mut region),
        )?;
        region.pos(0)
    }

    /// First match at or after `from`, with every group's byte range
    pub fn captures_at(&self, text: &str, from: usize) -> Option<Vec<Option<(usize, usize)>>> {
        if from > text.len() {
            return None;
        }
        let mut region = Region::new();
        self.regex.search_with_options(
            text,
            from,
            text.len(),
            SearchOptions::SEARCH_OPTION_NONE,
            Some(&mut region),
        )?;
        Some((0..region.len()).map(|i| region.pos(i)).collect())
    }

    /// Whether a match begins exactly at `at` (the text before `at` still counts
    /// as context for anchors and lookbehind)
    pub fn matches_at(&self, text: &str, at: usize) -> bool {
        if at > text.len() {
            return false;
        }
        self.regex
            .match_with_options(text, at, SearchOptions::SEARCH_OPTION_NONE, None)
            .is_some()
    }

    /// All non-overlapping matches in `text`
    pub fn find_iter<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.regex.find_iter(text)
    }
}

impl fmt::Debug for LangRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_filters_empty() {
        assert_eq!(source(Some("abc")), Some("abc"));
        assert_eq!(source(Some("")), None);
        assert_eq!(source::<str>(None), None);
    }

    #[test]
    fn test_combinators() {
        assert_eq!(concat(&["a", "b+", "c"]), "ab+c");
        assert_eq!(lookahead("x"), "(?=x)");
        assert_eq!(optional("x"), "(?:x)?");
        assert_eq!(any_number_of_times("x"), "(?:x)*");
        assert_eq!(either(&["a", "b"]), "(?:a|b)");
        assert_eq!(
            either_with(&["a", "b"], EitherOptions { capture: true }),
            "(a|b)"
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a.b*c"), r"a\.b\*c");
        assert_eq!(escape("(x)"), r"\(x\)");
    }

    #[test]
    fn test_count_match_groups() {
        assert_eq!(count_match_groups("abc").unwrap(), 0);
        assert_eq!(count_match_groups("(a)(b)").unwrap(), 2);
        assert_eq!(count_match_groups("(?:a)(?=b)(c)").unwrap(), 1);
        assert_eq!(count_match_groups("[(](x)").unwrap(), 1);
    }

    #[test]
    fn test_rewrite_without_groups() {
        assert_eq!(rewrite_backreferences(&["a", "b"], "|"), "(a)|(b)");
    }

    #[test]
    fn test_rewrite_shifts_backreferences() {
        let joined = rewrite_backreferences(&[r"(a)\1", r"(b)(c)\2"], "|");
        assert_eq!(joined, r"((a)\2)|((b)(c)\5)");
    }

    #[test]
    fn test_rewrite_ignores_non_capturing_and_classes() {
        let joined = rewrite_backreferences(&[r"(?:x)(?=y)[(]", r"(q)\1"], "|");
        assert_eq!(joined, r"((?:x)(?=y)[(])|((q)\3)");
    }

    #[test]
    fn test_rewrite_keeps_other_escapes() {
        let joined = rewrite_backreferences(&[r"\d+\.\(", r"\\1"], "");
        assert_eq!(joined, r"(\d+\.\()(\\1)");
    }

    #[test]
    fn test_rewritten_backreference_still_matches() {
        let joined = rewrite_backreferences(&[r"(a)\1", r"(['\x22])x\1"], "|");
        let re = LangRegex::new(&joined, LangFlags::default()).unwrap();
        let caps = re.captures_at("'x'", 0).unwrap();
        assert_eq!(caps[0], Some((0, 3)));
        assert_eq!(caps[3], Some((0, 3)));
        assert!(re.captures_at("'x\"", 0).is_none());
    }

    #[test]
    fn test_lang_regex_case_insensitive() {
        let flags = LangFlags {
            case_insensitive: true,
            unicode: false,
        };
        let re = LangRegex::new("select", flags).unwrap();
        assert_eq!(re.find_at("x SELECT", 0), Some((2, 8)));
    }

    #[test]
    fn test_matches_at_uses_full_context() {
        let re = LangRegex::new(r"\bfoo", LangFlags::default()).unwrap();
        assert!(re.matches_at("a foo", 2));
        assert!(!re.matches_at("afoo", 1));
    }

    #[test]
    fn test_invalid_pattern_reports_source() {
        let err = LangRegex::new("(abc", LangFlags::default()).unwrap_err();
        match err {
            GrammarError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(abc"),
            other => panic!("Expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn test_starts_with() {
        let re = LangRegex::new("ab", LangFlags::default()).unwrap();
        assert!(starts_with(Some(&re), "abc"));
        assert!(!starts_with(Some(&re), "cab"));
        assert!(!starts_with(None, "ab"));
    }
}
