//! Auto-detection ranking
//!
//! Every candidate grammar scans the input; the results are ordered by relevance.
//! Equal relevance is settled by the superset rule: a grammar declared as a
//! superset of another tied candidate ranks below it. Otherwise candidates keep
//! their input order.

use crate::hilite::highlighter::HighlightResult;
use crate::hilite::registry::Registry;
use std::cmp::Ordering;

/// Languages to try, in order
///
/// An explicit subset wins over the configured default list, which wins over
/// every registered language. Unknown names and grammars that opt out of
/// auto-detection are dropped.
pub fn candidates(registry: &Registry, subset: Option<&[String]>, defaults: &[String]) -> Vec<String> {
    let names = match subset {
        Some(names) => names.to_vec(),
        None if !defaults.is_empty() => defaults.to_vec(),
        None => registry.list_languages(),
    };
    names
        .into_iter()
        .filter(|name| registry.auto_detection(name))
        .collect()
}

/// Order results best first; `superset_of` maps a language to the language it extends
pub fn rank<F>(mut results: Vec<HighlightResult>, superset_of: F) -> Vec<HighlightResult>
where
    F: Fn(&str) -> Option<String>,
{
    let compare = |a: &HighlightResult, b: &HighlightResult| -> Ordering {
        match b.relevance.cmp(&a.relevance) {
            Ordering::Equal => {}
            other => return other,
        }
        let (Some(a_name), Some(b_name)) = (a.language.as_deref(), b.language.as_deref()) else {
            return Ordering::Equal;
        };
        if extends(&superset_of, a_name, b_name) {
            Ordering::Greater
        } else if extends(&superset_of, b_name, a_name) {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    };

    // Insertion sort: stable, and tolerant of the superset rule not being a total order
    for i in 1..results.len() {
        let mut j = i;
        while j > 0 && compare(&results[j - 1], &results[j]) == Ordering::Greater {
            results.swap(j - 1, j);
            j -= 1;
        }
    }
    results
}

fn extends<F>(superset_of: &F, language: &str, base: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    superset_of(language).is_some_and(|declared| declared.eq_ignore_ascii_case(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(language: Option<&str>, relevance: u32) -> HighlightResult {
        let mut result = HighlightResult::plaintext("x");
        result.language = language.map(str::to_string);
        result.relevance = relevance;
        result
    }

    fn languages(results: &[HighlightResult]) -> Vec<Option<&str>> {
        results.iter().map(|r| r.language.as_deref()).collect()
    }

    fn no_supersets(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_rank_by_relevance() {
        let ranked = rank(
            vec![result(None, 0), result(Some("a"), 2), result(Some("b"), 5)],
            no_supersets,
        );
        assert_eq!(languages(&ranked), vec![Some("b"), Some("a"), None]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = rank(
            vec![result(None, 0), result(Some("a"), 3), result(Some("b"), 3)],
            no_supersets,
        );
        assert_eq!(languages(&ranked), vec![Some("a"), Some("b"), None]);
    }

    #[test]
    fn test_base_language_beats_its_superset() {
        let supersets = |name: &str| (name == "derived").then(|| "base".to_string());
        let ranked = rank(
            vec![
                result(None, 0),
                result(Some("derived"), 4),
                result(Some("base"), 4),
            ],
            supersets,
        );
        assert_eq!(
            languages(&ranked),
            vec![Some("base"), Some("derived"), None]
        );
    }

    #[test]
    fn test_plaintext_stays_first_on_zero() {
        let ranked = rank(vec![result(None, 0), result(Some("a"), 0)], no_supersets);
        assert_eq!(languages(&ranked), vec![None, Some("a")]);
    }
}
