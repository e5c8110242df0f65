//! Text processing modules
//!
//! - Text cleaning (links, emoji, whitespace, glossary)
//! - Phonemization engines and the phonemizer bridge
//! - Terminator classification
//! - Clause segmentation

pub mod engine;
mod normalizer;
pub mod phonemizer;
pub mod segmenter;
pub mod terminator;

pub use engine::{
    create_engine, EspeakCommandEngine, PhonemeEngine, RawPhonemeUnit, TextPhonemeEngine,
};
pub use normalizer::TextCleaner;
pub use phonemizer::{PhonemeBridge, PhonemeStream, PhonemeUnit};
pub use segmenter::{ClauseEnd, ClauseSegmenter, PhonemeClause};
pub use terminator::{classify, Terminator};
