//! Clause segmentation
//!
//! Groups phonemizer output into clauses, the unit of synthesis:
//! - Every non-`None` terminator closes the current clause
//! - Units without a terminator are merged into the clause that follows
//! - End of input closes whatever is pending

use super::phonemizer::PhonemeUnit;
use super::terminator::Terminator;
use crate::core::error::Result;

/// What closed a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseEnd {
    Terminator(Terminator),
    EndOfInput,
}

impl ClauseEnd {
    /// Terminator that closed the clause, `None` at end of input
    pub fn terminator(&self) -> Terminator {
        match self {
            ClauseEnd::Terminator(t) => *t,
            ClauseEnd::EndOfInput => Terminator::None,
        }
    }
}

/// Ordered phoneme tokens bounded by a terminator or end of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonemeClause {
    /// One token per Unicode scalar of the phoneme strings
    pub phonemes: Vec<String>,
    pub end: ClauseEnd,
    /// 0-based position within the call
    pub index: usize,
}

impl PhonemeClause {
    pub fn is_empty(&self) -> bool {
        self.phonemes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.phonemes.len()
    }
}

/// Split a phoneme string into per-scalar tokens
pub fn tokenize_phonemes(phonemes: &str) -> impl Iterator<Item = String> + '_ {
    phonemes.chars().map(String::from)
}

/// Lazy clause segmenter over a stream of phoneme units
pub struct ClauseSegmenter<I> {
    units: I,
    pending: Vec<String>,
    flushed: usize,
    finished: bool,
}

impl<I> ClauseSegmenter<I>
where
    I: Iterator<Item = Result<PhonemeUnit>>,
{
    pub fn new(units: I) -> Self {
        Self {
            units,
            pending: Vec::new(),
            flushed: 0,
            finished: false,
        }
    }

    fn flush(&mut self, end: ClauseEnd) -> PhonemeClause {
        let clause = PhonemeClause {
            phonemes: std::mem::take(&mut self.pending),
            end,
            index: self.flushed,
        };
        self.flushed += 1;
        clause
    }
}

impl<I> Iterator for ClauseSegmenter<I>
where
    I: Iterator<Item = Result<PhonemeUnit>>,
{
    type Item = Result<PhonemeClause>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.units.next() {
                Some(Ok(unit)) => {
                    self.pending.extend(tokenize_phonemes(&unit.phonemes));
                    if !unit.terminator.is_none() {
                        return Some(Ok(self.flush(ClauseEnd::Terminator(unit.terminator))));
                    }
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    // Empty input still yields one (empty) clause
                    if !self.pending.is_empty() || self.flushed == 0 {
                        return Some(Ok(self.flush(ClauseEnd::EndOfInput)));
                    }
                    return None;
                }
            }
        }
    }
}

impl<I> std::iter::FusedIterator for ClauseSegmenter<I> where I: Iterator<Item = Result<PhonemeUnit>> {}
