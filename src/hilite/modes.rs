//! Reusable building blocks for grammar authors
//!
//! Identifier and number patterns plus ready-made modes for the constructs most
//! languages share: quoted strings, C and hash comments, numbers and titles.
//! Each function returns a fresh `Mode`; wrap it in an `Arc` (or put it in the
//! grammar's `modes` table) to share one instance between several parents.

use crate::hilite::grammar::mode::Mode;
use crate::hilite::patterns::{concat, either};

pub use crate::hilite::patterns::MATCH_NOTHING_RE;

pub const IDENT_RE: &str = r"[a-zA-Z]\w*";
pub const UNDERSCORE_IDENT_RE: &str = r"[a-zA-Z_]\w*";
pub const NUMBER_RE: &str = r"\b\d+(\.\d+)?";
/// 0x..., 0..., decimal and exponent forms
pub const C_NUMBER_RE: &str =
    r"(-?)(\b0[xX][a-fA-F0-9]+|(\b\d+(\.\d*)?|\.\d+)([eE][-+]?\d+)?)";
pub const BINARY_NUMBER_RE: &str = r"\b(0b[01]+)";
/// Tokens after which a `/` starts a regex literal rather than a division
pub const RE_STARTERS_RE: &str = r"!|!=|!==|%|%=|&|&&|&=|\*|\*=|\+|\+=|,|-|-=|/=|/|:|;|<<|<<=|<=|<|===|==|=|>>>=|>>=|>=|>>>|>>|>|\?|\[|\{|\(|\^|\^=|\||\|=|\|\||~";

const DOCTAGS: &str = "(TODO|FIXME|NOTE|BUG|OPTIMIZE|HACK|XXX):";

/// Scratch key under which `end_same_as_begin` remembers the opening delimiter
const BEGIN_MATCH_KEY: &str = "_beginMatch";

/// `#!/usr/bin/env <binary>` on the very first line
pub fn shebang(binary: Option<&str>) -> Mode {
    let begin_shebang = r"^#![ ]*/";
    let begin = match binary {
        Some(binary) => concat(&[begin_shebang, r".*\b", binary, r"\b.*"]),
        None => begin_shebang.to_string(),
    };
    Mode::new()
        .scope("meta")
        .begin(begin)
        .end("$")
        .relevance(0)
        .on_begin(|m, resp| {
            if m.index() != 0 {
                resp.ignore_match();
            }
        })
}

pub fn backslash_escape() -> Mode {
    Mode::new().begin(r"\\[\s\S]").relevance(0)
}

pub fn apos_string_mode() -> Mode {
    Mode::new()
        .scope("string")
        .begin("'")
        .end("'")
        .illegal(r"\n")
        .contains([backslash_escape()])
}

pub fn quote_string_mode() -> Mode {
    Mode::new()
        .scope("string")
        .begin("\"")
        .end("\"")
        .illegal(r"\n")
        .contains([backslash_escape()])
}

/// Common English words; helps a comment or string swallow prose
pub fn phrasal_words_mode() -> Mode {
    Mode::new().begin(
        r"\b(a|an|the|are|I'm|isn't|don't|doesn't|won't|but|just|should|pretty|simply|enough|gonna|going|wtf|so|such|will|you|your|they|like|more)\b",
    )
}

/// A comment between `begin` and `end`
///
/// `extra` is layered on top of the defaults. The comment always gets two more
/// children: a `doctag` mode for markers such as `TODO:` and a mode that eats
/// runs of English words so they cannot be mistaken for code.
pub fn comment(begin: &str, end: &str, extra: Mode) -> Mode {
    let base = Mode::new().scope("comment").begin(begin).end(end);
    let mode = base.inherit(&extra);

    let doctag = Mode::new()
        .scope("doctag")
        .begin(format!("[ ]*(?={DOCTAGS})"))
        .end(DOCTAGS)
        .exclude_begin()
        .relevance(0);

    let english_word = either(&[
        "I",
        "a",
        "is",
        "so",
        "us",
        "to",
        "at",
        "if",
        "in",
        "it",
        "on",
        r"[A-Za-z]+['](d|ve|re|ll|t|s|n)",
        r"[A-Za-z]+[-][a-z]+",
        r"[A-Za-z][a-z]{2,}",
    ]);
    let prose = Mode::new().begin(concat(&[
        "[ ]+",
        "(",
        english_word.as_str(),
        r"[.]?[:]?([.][ ]|[ ])",
        "){3}",
    ]));

    mode.contains([doctag, prose])
}

pub fn c_line_comment_mode() -> Mode {
    comment("//", "$", Mode::new())
}

pub fn c_block_comment_mode() -> Mode {
    comment(r"/\*", r"\*/", Mode::new())
}

pub fn hash_comment_mode() -> Mode {
    comment("#", "$", Mode::new())
}

pub fn number_mode() -> Mode {
    Mode::new().scope("number").begin(NUMBER_RE).relevance(0)
}

pub fn c_number_mode() -> Mode {
    Mode::new().scope("number").begin(C_NUMBER_RE).relevance(0)
}

pub fn binary_number_mode() -> Mode {
    Mode::new().scope("number").begin(BINARY_NUMBER_RE).relevance(0)
}

pub fn title_mode() -> Mode {
    Mode::new().scope("title").begin(IDENT_RE).relevance(0)
}

pub fn underscore_title_mode() -> Mode {
    Mode::new()
        .scope("title")
        .begin(UNDERSCORE_IDENT_RE)
        .relevance(0)
}

/// `.name` after an expression; keeps method names from reading as keywords
pub fn method_guard() -> Mode {
    Mode::new()
        .begin(format!(r"\.\s*{UNDERSCORE_IDENT_RE}"))
        .relevance(0)
}

/// Make a mode's end match only when its first capture equals the one that
/// opened it (heredoc markers, raw string fences)
pub fn end_same_as_begin(mode: Mode) -> Mode {
    mode.on_begin(|m, resp| {
        let opened = m.get(1).unwrap_or_default().to_string();
        resp.data_mut().insert(BEGIN_MATCH_KEY.to_string(), opened);
    })
    .on_end(|m, resp| {
        let closing = m.get(1).unwrap_or_default();
        if resp.data().get(BEGIN_MATCH_KEY).map(String::as_str) != Some(closing) {
            resp.ignore_match();
        }
    })
}
