//! Multi-Regex and Resumable Multi-Regex
//!
//! A mode has to ask one question at every step: which of my children begins
//! next, do I end, or does illegal text show up? All of those rules are glued
//! into a single alternation so one regex search answers it:
//!
//! ```text
//! rules:   begin(string)  begin(number)  end    illegal
//! regex:   (")|(\d+(\.\d+)?)|(\))|(X)
//! groups:  1   2  3           4    5
//! ```
//!
//! The first participating group tells which rule matched; groups after it are
//! that rule's own captures.
//!
//! When a callback rejects a begin match, the scanner must retry at the same
//! offset without that rule. [`ResumableMultiRegex`] keeps narrowed copies of
//! the alternation (rules `k..`) for that, built on first use.

use crate::hilite::compiling::compiled::ModeId;
use crate::hilite::error::GrammarError;
use crate::hilite::patterns::{count_match_groups, rewrite_backreferences, LangFlags, LangRegex};
use once_cell::sync::OnceCell;

/// What a rule does when it wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// A child mode begins
    Begin(ModeId),
    /// The current mode (or an ancestor it ends with) ends
    End,
    Illegal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub source: String,
    pub kind: RuleKind,
}

/// A search hit of a [`MultiRegex`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiMatch {
    /// Index of the winning rule among this matcher's rules
    pub position: usize,
    /// Byte offset of the match
    pub index: usize,
    /// Slot 0 is the whole match, then the rule's own groups
    pub groups: Vec<Option<(usize, usize)>>,
}

/// One alternation over a list of rule sources
#[derive(Debug)]
pub struct MultiRegex {
    regex: Option<LangRegex>,
    /// Group number of each rule's wrapper group, in rule order
    wrapper_groups: Vec<usize>,
}

impl MultiRegex {
    pub fn new<S: AsRef<str>>(sources: &[S], flags: LangFlags) -> Result<Self, GrammarError> {
        if sources.is_empty() {
            return Ok(Self {
                regex: None,
                wrapper_groups: Vec::new(),
            });
        }
        let mut wrapper_groups = Vec::with_capacity(sources.len());
        let mut match_at = 1;
        for source in sources {
            wrapper_groups.push(match_at);
            match_at += count_match_groups(source.as_ref())? + 1;
        }
        let parts: Vec<&str> = sources.iter().map(AsRef::as_ref).collect();
        let joined = rewrite_backreferences(&parts, "|");
        Ok(Self {
            regex: Some(LangRegex::new(&joined, flags)?),
            wrapper_groups,
        })
    }

    /// First match at or after `from`
    pub fn exec(&self, text: &str, from: usize) -> Option<MultiMatch> {
        let regex = self.regex.as_ref()?;
        let captures = regex.captures_at(text, from)?;
        let (position, group) = self
            .wrapper_groups
            .iter()
            .copied()
            .enumerate()
            .find(|&(_, group)| captures.get(group).copied().flatten().is_some())?;
        let (index, _) = captures[group]?;
        Some(MultiMatch {
            position,
            index,
            groups: captures[group..].to_vec(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }
}

/// Per-scan cursor over a [`ResumableMultiRegex`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatcherState {
    /// First rule still in play; 0 means all of them
    pub regex_index: usize,
}

impl MatcherState {
    pub fn consider_all(&mut self) {
        self.regex_index = 0;
    }

    pub fn is_resuming(&self) -> bool {
        self.regex_index != 0
    }
}

/// A matched rule, with its position resolved against the full rule list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: usize,
    pub kind: RuleKind,
    pub index: usize,
    pub groups: Vec<Option<(usize, usize)>>,
}

impl RuleMatch {
    pub fn lexeme<'t>(&self, text: &'t str) -> &'t str {
        match self.groups.first().copied().flatten() {
            Some((start, end)) => &text[start..end],
            None => "",
        }
    }
}

/// A mode's matcher: its rules plus lazily built narrowed alternations
#[derive(Debug)]
pub struct ResumableMultiRegex {
    rules: Vec<Rule>,
    begin_count: usize,
    flags: LangFlags,
    /// `matchers[k]` covers `rules[k..]`
    matchers: Vec<OnceCell<MultiRegex>>,
}

impl ResumableMultiRegex {
    pub fn new(rules: Vec<Rule>, flags: LangFlags) -> Result<Self, GrammarError> {
        let begin_count = rules
            .iter()
            .filter(|r| matches!(r.kind, RuleKind::Begin(_)))
            .count();
        let matchers = (0..rules.len().max(1)).map(|_| OnceCell::new()).collect();
        let resumable = Self {
            rules,
            begin_count,
            flags,
            matchers,
        };
        resumable.matcher(0)?;
        Ok(resumable)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn matcher(&self, start: usize) -> Result<Option<&MultiRegex>, GrammarError> {
        let Some(cell) = self.matchers.get(start) else {
            return Ok(None);
        };
        let matcher = cell.get_or_try_init(|| {
            let sources: Vec<&str> = self.rules[start..]
                .iter()
                .map(|r| r.source.as_str())
                .collect();
            MultiRegex::new(&sources, self.flags)
        })?;
        Ok(Some(matcher))
    }

    /// Next rule match at or after `last_index`
    ///
    /// When resuming after an ignored match, the narrowed alternation only counts
    /// if it matches exactly at `last_index`; otherwise the full alternation is
    /// run from one character later. Passing the last begin rule resets the state
    /// so every rule is considered again.
    pub fn exec(
        &self,
        state: &mut MatcherState,
        text: &str,
        last_index: usize,
    ) -> Result<Option<RuleMatch>, GrammarError> {
        let mut base = state.regex_index;
        let mut result = self
            .matcher(base)?
            .and_then(|m| m.exec(text, last_index));

        if state.is_resuming() && !matches!(&result, Some(m) if m.index == last_index) {
            base = 0;
            result = match next_char_boundary(text, last_index) {
                Some(next) => self.matcher(0)?.and_then(|m| m.exec(text, next)),
                None => None,
            };
        }

        let Some(found) = result else {
            return Ok(None);
        };
        let rule = base + found.position;
        state.regex_index = rule + 1;
        if state.regex_index == self.begin_count {
            state.consider_all();
        }
        Ok(Some(RuleMatch {
            rule,
            kind: self.rules[rule].kind,
            index: found.index,
            groups: found.groups,
        }))
    }
}

fn next_char_boundary(text: &str, index: usize) -> Option<usize> {
    text.get(index..)?
        .chars()
        .next()
        .map(|c| index + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begin(source: &str, id: ModeId) -> Rule {
        Rule {
            source: source.to_string(),
            kind: RuleKind::Begin(id),
        }
    }

    fn end(source: &str) -> Rule {
        Rule {
            source: source.to_string(),
            kind: RuleKind::End,
        }
    }

    #[test]
    fn test_multi_regex_picks_matching_rule() {
        let m = MultiRegex::new(&["\"", r"(\d+)(\.\d+)?", r"\)"], LangFlags::default()).unwrap();
        let hit = m.exec("x = 42)", 0).unwrap();
        assert_eq!(hit.position, 1);
        assert_eq!(hit.index, 4);
        assert_eq!(hit.groups[0], Some((4, 6)));
        assert_eq!(hit.groups[1], Some((4, 6)));

        let hit = m.exec("x = 42)", 6).unwrap();
        assert_eq!(hit.position, 2);
    }

    #[test]
    fn test_multi_regex_keeps_backreferences_local() {
        let m = MultiRegex::new(&[r"(a)\1", r"(['\x22]).*?\1"], LangFlags::default()).unwrap();
        let hit = m.exec("say 'hi'", 0).unwrap();
        assert_eq!(hit.position, 1);
        assert_eq!(hit.groups[0], Some((4, 8)));
    }

    #[test]
    fn test_empty_multi_regex_never_matches() {
        let m = MultiRegex::new::<&str>(&[], LangFlags::default()).unwrap();
        assert!(m.is_empty());
        assert!(m.exec("anything", 0).is_none());
    }

    #[test]
    fn test_resumable_narrows_after_ignore() {
        let matcher = ResumableMultiRegex::new(
            vec![begin("ab", 1), begin("a", 2), end("b")],
            LangFlags::default(),
        )
        .unwrap();
        let mut state = MatcherState::default();

        let first = matcher.exec(&mut state, "ab", 0).unwrap().unwrap();
        assert_eq!(first.kind, RuleKind::Begin(1));
        assert_eq!(state.regex_index, 1);

        // The scanner ignored rule 0 and resumes at the same offset
        let second = matcher.exec(&mut state, "ab", 0).unwrap().unwrap();
        assert_eq!(second.kind, RuleKind::Begin(2));
        assert_eq!(second.index, 0);
        assert_eq!(state.regex_index, 0);
    }

    #[test]
    fn test_resumable_falls_back_one_char_later() {
        let matcher = ResumableMultiRegex::new(
            vec![begin("x", 1), begin("y", 2)],
            LangFlags::default(),
        )
        .unwrap();
        let mut state = MatcherState { regex_index: 1 };
        // Rule 1 ("y") would match later, not at 0: the full matcher runs from 1
        let hit = matcher.exec(&mut state, "xxy", 0).unwrap().unwrap();
        assert_eq!(hit.kind, RuleKind::Begin(1));
        assert_eq!(hit.index, 1);
        assert_eq!(state.regex_index, 1);
    }

    #[test]
    fn test_lexeme() {
        let matcher =
            ResumableMultiRegex::new(vec![end(r"\s+")], LangFlags::default()).unwrap();
        let mut state = MatcherState::default();
        let hit = matcher.exec(&mut state, "a  b", 0).unwrap().unwrap();
        assert_eq!(hit.lexeme("a  b"), "  ");
        assert_eq!(hit.kind, RuleKind::End);
    }
}
