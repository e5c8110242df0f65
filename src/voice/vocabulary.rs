//! Phoneme vocabulary and id mapping

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TtsError};
use crate::text::segmenter::PhonemeClause;
use crate::text::terminator::Terminator;

/// Padding symbol placed between ids
pub const PAD: &str = "_";
/// Beginning-of-sentence symbol
pub const BOS: &str = "^";
/// End-of-sentence symbol
pub const EOS: &str = "$";

/// Phoneme to id table of a voice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    ids: HashMap<String, i64>,
}

impl Vocabulary {
    /// Build from a Piper `phoneme_id_map`.
    ///
    /// Each phoneme must map to exactly one non-negative id, and ids must be
    /// unique across phonemes.
    pub fn from_id_map(map: &BTreeMap<String, Vec<i64>>) -> Result<Self> {
        let mut ids = HashMap::with_capacity(map.len());
        let mut seen = HashSet::with_capacity(map.len());

        for (phoneme, values) in map {
            let id = match values.as_slice() {
                [id] => *id,
                _ => {
                    return Err(TtsError::config(
                        "phoneme_id_map",
                        format!(
                            "Phoneme {:?} maps to {} ids, expected exactly one",
                            phoneme,
                            values.len()
                        ),
                    ))
                }
            };
            if id < 0 {
                return Err(TtsError::config(
                    "phoneme_id_map",
                    format!("Phoneme {:?} has negative id {}", phoneme, id),
                ));
            }
            if !seen.insert(id) {
                return Err(TtsError::config(
                    "phoneme_id_map",
                    format!("Id {} is used by more than one phoneme", id),
                ));
            }
            ids.insert(phoneme.clone(), id);
        }

        Ok(Self { ids })
    }

    /// Build from `(phoneme, id)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let map: BTreeMap<String, Vec<i64>> = pairs
            .into_iter()
            .map(|(p, id)| (p.into(), vec![id]))
            .collect();
        Self::from_id_map(&map)
    }

    pub fn get(&self, phoneme: &str) -> Option<i64> {
        self.ids.get(phoneme).copied()
    }

    pub fn contains(&self, phoneme: &str) -> bool {
        self.ids.contains_key(phoneme)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the Piper framing symbols (`^`, `_`, `$`) are all present
    pub fn has_framing_symbols(&self) -> bool {
        self.contains(PAD) && self.contains(BOS) && self.contains(EOS)
    }
}

/// What to do with a phoneme missing from the vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPhonemePolicy {
    /// Fail the clause with `UnknownPhoneme`
    #[default]
    Abort,
    /// Drop the phoneme
    Skip,
    /// Replace the phoneme with another vocabulary symbol
    Substitute(String),
}

/// Result of mapping one clause
#[derive(Debug, Clone, Default)]
pub struct MappedClause {
    pub ids: Vec<i64>,
    /// Every unknown phoneme encountered, as recoverable errors
    pub unknown: Vec<TtsError>,
}

/// Map a clause strictly: the first unknown phoneme is an error
pub fn map(clause: &PhonemeClause, vocabulary: &Vocabulary) -> Result<Vec<i64>> {
    clause
        .phonemes
        .iter()
        .enumerate()
        .map(|(position, phoneme)| {
            vocabulary
                .get(phoneme)
                .ok_or_else(|| unknown(phoneme, clause.index, position))
        })
        .collect()
}

/// Map a clause under an unknown-phoneme policy
pub fn map_with_policy(
    clause: &PhonemeClause,
    vocabulary: &Vocabulary,
    policy: &UnknownPhonemePolicy,
) -> Result<MappedClause> {
    let substitute = match policy {
        UnknownPhonemePolicy::Substitute(symbol) => Some(vocabulary.get(symbol).ok_or_else(|| {
            TtsError::config(
                "unknown_phoneme_policy",
                format!("Substitute symbol {:?} is not in the vocabulary", symbol),
            )
        })?),
        _ => None,
    };

    let mut mapped = MappedClause {
        ids: Vec::with_capacity(clause.phonemes.len()),
        unknown: Vec::new(),
    };

    for (position, phoneme) in clause.phonemes.iter().enumerate() {
        match vocabulary.get(phoneme) {
            Some(id) => mapped.ids.push(id),
            None => {
                let err = unknown(phoneme, clause.index, position);
                match policy {
                    UnknownPhonemePolicy::Abort => return Err(err),
                    UnknownPhonemePolicy::Skip => {}
                    UnknownPhonemePolicy::Substitute(_) => {
                        if let Some(id) = substitute {
                            mapped.ids.push(id);
                        }
                    }
                }
                mapped.unknown.push(err);
            }
        }
    }

    Ok(mapped)
}

/// Apply Piper framing: `^ _ (id _)* [term _] $`.
///
/// The terminator's punctuation symbol is included when the vocabulary has
/// it. Vocabularies without the framing symbols get the ids unchanged.
pub fn frame(ids: &[i64], terminator: Terminator, vocabulary: &Vocabulary) -> Vec<i64> {
    let (pad, bos, eos) = match (vocabulary.get(PAD), vocabulary.get(BOS), vocabulary.get(EOS)) {
        (Some(pad), Some(bos), Some(eos)) => (pad, bos, eos),
        _ => return ids.to_vec(),
    };

    let term = terminator
        .symbol()
        .and_then(|c| vocabulary.get(c.encode_utf8(&mut [0u8; 4])));

    let mut framed = Vec::with_capacity(ids.len() * 2 + 5);
    framed.push(bos);
    framed.push(pad);
    for &id in ids.iter().chain(term.iter()) {
        framed.push(id);
        framed.push(pad);
    }
    framed.push(eos);
    framed
}

/// Maps clauses to model input ids under an unknown-phoneme policy
#[derive(Debug, Clone)]
pub struct VocabularyMapper {
    policy: UnknownPhonemePolicy,
    framing: bool,
}

impl Default for VocabularyMapper {
    fn default() -> Self {
        Self::new(UnknownPhonemePolicy::default())
    }
}

impl VocabularyMapper {
    pub fn new(policy: UnknownPhonemePolicy) -> Self {
        Self {
            policy,
            framing: true,
        }
    }

    /// Pass ids through without Piper framing
    pub fn without_framing(mut self) -> Self {
        self.framing = false;
        self
    }

    pub fn policy(&self) -> &UnknownPhonemePolicy {
        &self.policy
    }

    /// Map a clause to the ids fed to the model.
    ///
    /// A clause whose ids all vanish (empty, or every phoneme skipped) stays
    /// empty and is not framed.
    pub fn map_clause(&self, clause: &PhonemeClause, vocabulary: &Vocabulary) -> Result<MappedClause> {
        let mut mapped = map_with_policy(clause, vocabulary, &self.policy)?;
        if self.framing && !mapped.ids.is_empty() {
            mapped.ids = frame(&mapped.ids, clause.end.terminator(), vocabulary);
        }
        Ok(mapped)
    }
}

fn unknown(phoneme: &str, clause: usize, position: usize) -> TtsError {
    TtsError::UnknownPhoneme {
        phoneme: phoneme.to_string(),
        clause,
        position,
    }
}
