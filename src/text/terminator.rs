//! Clause terminator classification
//!
//! Maps the raw trailing punctuation a phonemizer reports for a unit onto a
//! small canonical set. The mapping is total: anything unrecognized is
//! [`Terminator::None`].

use serde::{Deserialize, Serialize};

/// Dot glyphs that form an ellipsis when repeated (CJK texts write `……`)
const ELLIPSIS_GLYPHS: &[char] = &['…', '⋯', '·', '‥'];

/// Canonical punctuation class closing a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminator {
    Comma,
    Exclamation,
    Colon,
    Question,
    Semicolon,
    Period,
    None,
}

impl Terminator {
    /// ASCII punctuation symbol for this terminator, if any
    pub fn symbol(&self) -> Option<char> {
        match self {
            Terminator::Comma => Some(','),
            Terminator::Exclamation => Some('!'),
            Terminator::Colon => Some(':'),
            Terminator::Question => Some('?'),
            Terminator::Semicolon => Some(';'),
            Terminator::Period => Some('.'),
            Terminator::None => None,
        }
    }

    /// True for [`Terminator::None`]
    pub fn is_none(&self) -> bool {
        matches!(self, Terminator::None)
    }
}

impl std::fmt::Display for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.symbol() {
            Some(c) => write!(f, "{}", c),
            None => write!(f, "none"),
        }
    }
}

/// Map a raw trailing punctuation run to its canonical terminator.
///
/// Surrounding whitespace is ignored. Ellipses (three or more ASCII periods,
/// `…`, doubled CJK dot glyphs) and the em dash read as a pause and map to
/// [`Terminator::Semicolon`].
pub fn classify(raw: &str) -> Terminator {
    let run = raw.trim();
    let mut chars = run.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return Terminator::None,
    };

    if chars.next().is_none() {
        return classify_single(first);
    }

    let count = run.chars().count();
    if count >= 3 && run.chars().all(|c| c == '.') {
        return Terminator::Semicolon;
    }
    if run.chars().all(|c| ELLIPSIS_GLYPHS.contains(&c)) {
        return Terminator::Semicolon;
    }

    Terminator::None
}

fn classify_single(c: char) -> Terminator {
    match c {
        '…' | '—' => Terminator::Semicolon,
        ',' | '，' | '、' => Terminator::Comma,
        '!' | '！' => Terminator::Exclamation,
        ':' | '：' => Terminator::Colon,
        '?' | '？' => Terminator::Question,
        ';' | '；' => Terminator::Semicolon,
        '.' | '。' => Terminator::Period,
        _ => Terminator::None,
    }
}
