//! Phonemization bridge
//!
//! Wraps a [`PhonemeEngine`] and turns its raw output into a lazy stream of
//! [`PhonemeUnit`]s with classified terminators.

use tracing::{debug, warn};

use super::engine::PhonemeEngine;
use super::terminator::{classify, Terminator};
use crate::core::error::{Result, TtsError};

/// A phoneme string with the terminator that closed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonemeUnit {
    pub phonemes: String,
    pub terminator: Terminator,
}

/// Bridge between the pipeline and an external phonemization engine
pub struct PhonemeBridge<E: PhonemeEngine> {
    engine: E,
}

impl<E: PhonemeEngine> PhonemeBridge<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Engine name
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Access the wrapped engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Phonemize `text` in `locale`.
    ///
    /// Locale activation happens eagerly, so an unsupported locale is reported
    /// here as a configuration error before any unit is produced. The returned
    /// stream borrows the bridge; one text at a time.
    pub fn phonemize(&mut self, text: &str, locale: &str) -> Result<PhonemeStream<'_, E>> {
        self.engine.set_locale(locale)?;
        debug!(engine = self.engine.name(), locale, chars = text.chars().count(), "Phonemizing");

        let pending_error = match self.engine.begin(text) {
            Ok(()) => None,
            Err(e) => Some(self.engine_error(e)),
        };

        Ok(PhonemeStream {
            engine: &mut self.engine,
            pending_error,
            finished: false,
        })
    }

    fn engine_error(&self, err: anyhow::Error) -> TtsError {
        warn!(engine = self.engine.name(), error = %err, "Phonemizer failed");
        TtsError::Phonemization {
            engine: self.engine.name().to_string(),
            message: format!("{:#}", err),
        }
    }
}

/// Lazy, non-restartable sequence of phoneme units.
///
/// After an engine failure the stream yields one error and then ends.
pub struct PhonemeStream<'a, E: PhonemeEngine> {
    engine: &'a mut E,
    pending_error: Option<TtsError>,
    finished: bool,
}

impl<E: PhonemeEngine> Iterator for PhonemeStream<'_, E> {
    type Item = Result<PhonemeUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(err) = self.pending_error.take() {
            self.finished = true;
            return Some(Err(err));
        }

        match self.engine.next_unit() {
            Ok(Some(raw)) => Some(Ok(PhonemeUnit {
                terminator: classify(&raw.punctuation),
                phonemes: raw.phonemes,
            })),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                warn!(engine = self.engine.name(), error = %e, "Phonemizer failed");
                Some(Err(TtsError::Phonemization {
                    engine: self.engine.name().to_string(),
                    message: format!("{:#}", e),
                }))
            }
        }
    }
}

impl<E: PhonemeEngine> std::iter::FusedIterator for PhonemeStream<'_, E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::engine::{RawPhonemeUnit, TextPhonemeEngine};
    use anyhow::bail;

    /// Engine that fails after a fixed number of units
    struct FlakyEngine {
        produced: usize,
        fail_after: usize,
    }

    impl PhonemeEngine for FlakyEngine {
        fn name(&self) -> &str {
            "flaky"
        }

        fn set_locale(&mut self, _locale: &str) -> Result<()> {
            Ok(())
        }

        fn begin(&mut self, _text: &str) -> anyhow::Result<()> {
            self.produced = 0;
            Ok(())
        }

        fn next_unit(&mut self) -> anyhow::Result<Option<RawPhonemeUnit>> {
            if self.produced == self.fail_after {
                bail!("engine crashed");
            }
            self.produced += 1;
            Ok(Some(RawPhonemeUnit::new("a", ",")))
        }
    }

    fn terminators(text: &str) -> Vec<Terminator> {
        let mut bridge = PhonemeBridge::new(TextPhonemeEngine::new());
        bridge
            .phonemize(text, "en-us")
            .unwrap()
            .map(|u| u.unwrap().terminator)
            .collect()
    }

    #[test]
    fn test_english_terminators() {
        use Terminator::*;
        assert_eq!(
            terminators("Test 1, test2. Test, 3! Test: 4? Test 5; Test 6. Test 7"),
            vec![Comma, Period, Comma, Exclamation, Colon, Question, Semicolon, Period, None]
        );
    }

    #[test]
    fn test_cjk_terminators() {
        use Terminator::*;
        assert_eq!(
            terminators("你好，世界！省略号……一、二，三。问号？"),
            vec![Comma, Exclamation, Semicolon, Comma, Comma, Period, Question]
        );
    }

    #[test]
    fn test_unsupported_locale_is_configuration_error() {
        let mut bridge = PhonemeBridge::new(TextPhonemeEngine::with_locales(["en-us"]));
        let err = bridge.phonemize("Hello", "zz-zz").err().unwrap();
        assert!(matches!(err, TtsError::Configuration { .. }));
    }

    #[test]
    fn test_engine_failure_yields_one_error_then_ends() {
        let mut bridge = PhonemeBridge::new(FlakyEngine {
            produced: 0,
            fail_after: 2,
        });
        let items: Vec<_> = bridge.phonemize("ignored", "en").unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(matches!(items[2], Err(TtsError::Phonemization { .. })));
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(terminators("").is_empty());
    }
}
