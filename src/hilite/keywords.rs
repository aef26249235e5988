//! Keyword tables
//!
//! Grammars declare keywords in three shapes:
//!
//! ```text
//! "if else while"                       -> scope "keyword"
//! ["if", "else|2"]                      -> scope "keyword", "else" pinned to 2
//! { "keyword": "if else",
//!   "built_in": ["print"],
//!   "$pattern": "[a-z]+" }              -> per-scope words plus a word scanner
//! ```
//!
//! Compilation flattens any of them into a single `word -> (scope, relevance)`
//! table. An explicit `|N` suffix always sets the relevance; otherwise the word
//! scores 0 if it is one of the configured common words and 1 if not.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Scope given to words declared without a scope map
pub const DEFAULT_KEYWORD_SCOPE: &str = "keyword";

/// Word scanner used when a grammar gives no `$pattern`
pub const DEFAULT_KEYWORD_PATTERN: &str = r"\w+";

/// Key inside a scoped keyword map that carries the word scanner pattern
pub const PATTERN_KEY: &str = "$pattern";

/// Words too frequent in both prose and code to say anything about the language
pub const COMMON_KEYWORDS: [&str; 11] = [
    "of", "and", "for", "in", "not", "or", "if", "then", "parent", "list", "value",
];

/// Hits of one word that still add relevance within a single scan
pub const MAX_KEYWORD_HITS: usize = 7;

/// Words given as one whitespace-separated string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WordList {
    Words(String),
    List(Vec<String>),
}

impl WordList {
    pub fn words(&self) -> Vec<&str> {
        match self {
            WordList::Words(text) => text.split_whitespace().collect(),
            WordList::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// Raw keyword declaration as written in a grammar
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    Words(String),
    List(Vec<String>),
    Scoped(BTreeMap<String, WordList>),
}

impl Keywords {
    /// Plain `keyword`-scoped words
    pub fn words(words: &str) -> Self {
        Keywords::Words(words.to_string())
    }

    /// Scope map built from `(scope, words)` pairs
    pub fn scoped<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Keywords::Scoped(
            entries
                .into_iter()
                .map(|(scope, words)| (scope.to_string(), WordList::Words(words.to_string())))
                .collect(),
        )
    }

    /// Set the word scanner pattern, turning a flat declaration into a scope map
    pub fn with_pattern(self, pattern: &str) -> Self {
        let mut map = match self {
            Keywords::Scoped(map) => map,
            Keywords::Words(words) => {
                BTreeMap::from([(DEFAULT_KEYWORD_SCOPE.to_string(), WordList::Words(words))])
            }
            Keywords::List(list) => {
                BTreeMap::from([(DEFAULT_KEYWORD_SCOPE.to_string(), WordList::List(list))])
            }
        };
        map.insert(PATTERN_KEY.to_string(), WordList::Words(pattern.to_string()));
        Keywords::Scoped(map)
    }

    /// The `$pattern` entry, if any
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Keywords::Scoped(map) => match map.get(PATTERN_KEY) {
                Some(WordList::Words(pattern)) => Some(pattern.as_str()),
                Some(WordList::List(parts)) => parts.first().map(String::as_str),
                None => None,
            },
            _ => None,
        }
    }

    /// `(scope, words)` pairs, `$pattern` excluded
    fn groups(&self) -> Vec<(&str, Vec<&str>)> {
        match self {
            Keywords::Words(text) => {
                vec![(DEFAULT_KEYWORD_SCOPE, text.split_whitespace().collect())]
            }
            Keywords::List(items) => vec![(
                DEFAULT_KEYWORD_SCOPE,
                items.iter().map(String::as_str).collect(),
            )],
            Keywords::Scoped(map) => map
                .iter()
                .filter(|(scope, _)| scope.as_str() != PATTERN_KEY)
                .map(|(scope, words)| (scope.as_str(), words.words()))
                .collect(),
        }
    }
}

/// Tuning knobs for keyword relevance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordScoring {
    pub common_keywords: HashSet<String>,
    pub max_hits: usize,
}

impl Default for KeywordScoring {
    fn default() -> Self {
        Self {
            common_keywords: COMMON_KEYWORDS.iter().map(|w| w.to_string()).collect(),
            max_hits: MAX_KEYWORD_HITS,
        }
    }
}

impl KeywordScoring {
    pub fn new<I, S>(common_keywords: I, max_hits: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            common_keywords: common_keywords
                .into_iter()
                .map(|w| w.into().to_lowercase())
                .collect(),
            max_hits,
        }
    }

    /// Relevance of a word, honoring an explicit `|N` score
    pub fn score(&self, word: &str, provided: Option<&str>) -> u32 {
        if let Some(score) = provided.and_then(|s| s.parse::<u32>().ok()) {
            return score;
        }
        if self.common_keywords.contains(&word.to_lowercase()) {
            0
        } else {
            1
        }
    }
}

/// One compiled keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub scope: String,
    pub relevance: u32,
}

/// Flattened `word -> keyword` table of a mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    words: HashMap<String, Keyword>,
    case_insensitive: bool,
}

impl KeywordTable {
    pub fn compile(raw: &Keywords, case_insensitive: bool, scoring: &KeywordScoring) -> Self {
        let mut words = HashMap::new();
        for (scope, group) in raw.groups() {
            for entry in group {
                let entry = if case_insensitive {
                    entry.to_lowercase()
                } else {
                    entry.to_string()
                };
                let mut parts = entry.split('|');
                let word = parts.next().unwrap_or_default();
                if word.is_empty() {
                    continue;
                }
                let relevance = scoring.score(word, parts.next());
                words.insert(
                    word.to_string(),
                    Keyword {
                        scope: scope.to_string(),
                        relevance,
                    },
                );
            }
        }
        Self {
            words,
            case_insensitive,
        }
    }

    /// Look a scanned word up, folding case the same way compilation did
    pub fn lookup(&self, word: &str) -> Option<&Keyword> {
        if self.case_insensitive {
            self.words.get(&word.to_lowercase())
        } else {
            self.words.get(word)
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn compile(raw: &Keywords) -> KeywordTable {
        KeywordTable::compile(raw, false, &KeywordScoring::default())
    }

    #[test]
    fn test_plain_string_defaults_to_keyword_scope() {
        let table = compile(&Keywords::words("while return"));
        assert_eq!(table.len(), 2);
        let kw = table.lookup("while").unwrap();
        assert_eq!(kw.scope, "keyword");
        assert_eq!(kw.relevance, 1);
    }

    #[rstest]
    #[case("of", 0)]
    #[case("and", 0)]
    #[case("if", 0)]
    #[case("value", 0)]
    #[case("else", 1)]
    #[case("struct", 1)]
    fn test_default_scoring(#[case] word: &str, #[case] expected: u32) {
        let table = compile(&Keywords::words(word));
        assert_eq!(table.lookup(word).unwrap().relevance, expected);
    }

    #[test]
    fn test_explicit_score_wins() {
        let table = compile(&Keywords::List(vec!["if|3".into(), "loop|0".into()]));
        assert_eq!(table.lookup("if").unwrap().relevance, 3);
        assert_eq!(table.lookup("loop").unwrap().relevance, 0);
        assert!(table.lookup("if|3").is_none());
    }

    #[test]
    fn test_unparseable_score_falls_back() {
        let table = compile(&Keywords::words("fn|x"));
        assert_eq!(table.lookup("fn").unwrap().relevance, 1);
    }

    #[test]
    fn test_scoped_map_and_pattern() {
        let raw = Keywords::scoped([("keyword", "fn let"), ("literal", "true false")])
            .with_pattern("[a-z]+");
        assert_eq!(raw.pattern(), Some("[a-z]+"));
        let table = compile(&raw);
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup("true").unwrap().scope, "literal");
        assert!(table.lookup("$pattern").is_none());
    }

    #[test]
    fn test_case_insensitive_folds_both_sides() {
        let table =
            KeywordTable::compile(&Keywords::words("SELECT From"), true, &KeywordScoring::default());
        assert!(table.lookup("select").is_some());
        assert!(table.lookup("FROM").is_some());
    }

    #[test]
    fn test_custom_common_words() {
        let scoring = KeywordScoring::new(["Foo"], 3);
        let table = KeywordTable::compile(&Keywords::words("foo bar"), false, &scoring);
        assert_eq!(table.lookup("foo").unwrap().relevance, 0);
        assert_eq!(table.lookup("bar").unwrap().relevance, 1);
    }

    #[test]
    fn test_deserialize_shapes() {
        let flat: Keywords = serde_json::from_str(r#""a b""#).unwrap();
        assert_eq!(flat, Keywords::words("a b"));
        let list: Keywords = serde_json::from_str(r#"["a", "b|2"]"#).unwrap();
        assert_eq!(list, Keywords::List(vec!["a".into(), "b|2".into()]));
        let map: Keywords =
            serde_json::from_str(r#"{"keyword": "a", "type": ["i32"], "$pattern": "\\w+"}"#)
                .unwrap();
        assert_eq!(map.pattern(), Some(r"\w+"));
    }
}
