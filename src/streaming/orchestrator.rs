//! Synthesis orchestrator
//!
//! Drives one synthesis call as a lazy state machine:
//!
//! ```text
//! Idle -> Segmenting -> Synthesizing(i) -> Emitting(i) -> ... -> Done
//!                                   \-> Failed | Cancelled
//! ```
//!
//! Each clause is mapped, synthesized and quantized into one speech chunk.
//! Consecutive clauses are separated by a silence chunk when
//! `sentence_silence > 0`. One clause of phonemization lookahead decides which
//! chunk carries the last flag; there is never trailing silence.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{AudioChunk, CancellationToken, ChunkKind, SynthesisStats};
use crate::audio::{encode_pcm, silence_samples};
use crate::config::SynthesisConfig;
use crate::core::error::{Result, TtsError};
use crate::inference::{InferenceAdapter, Prosody, VoiceRuntime};
use crate::text::engine::PhonemeEngine;
use crate::text::phonemizer::{PhonemeBridge, PhonemeStream};
use crate::text::segmenter::{ClauseSegmenter, PhonemeClause};
use crate::text::TextCleaner;
use crate::voice::{UnknownPhonemePolicy, Voice, VocabularyMapper};

/// Where a synthesis call is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestratorState {
    Idle,
    Segmenting,
    Synthesizing(usize),
    Emitting(usize),
    Done,
    Failed,
    Cancelled,
}

impl OrchestratorState {
    /// Whether the call has ended
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestratorState::Done | OrchestratorState::Failed | OrchestratorState::Cancelled
        )
    }
}

/// Streaming synthesizer for one voice.
///
/// Owns its phonemizer engine and neural runtime; one call at a time. Pool
/// several orchestrators sharing the same `Arc<Voice>` for concurrency.
pub struct SynthesisOrchestrator<E: PhonemeEngine, R: VoiceRuntime> {
    voice: Arc<Voice>,
    bridge: PhonemeBridge<E>,
    adapter: InferenceAdapter<R>,
    cleaner: TextCleaner,
    mapper: VocabularyMapper,
    locale: String,
    state: OrchestratorState,
    stats: SynthesisStats,
}

impl<E: PhonemeEngine, R: VoiceRuntime> SynthesisOrchestrator<E, R> {
    pub fn new(voice: Arc<Voice>, engine: E, runtime: R) -> Self {
        let adapter = InferenceAdapter::new(runtime, &voice);
        let locale = voice.locale().to_string();
        Self {
            voice,
            bridge: PhonemeBridge::new(engine),
            adapter,
            cleaner: TextCleaner::default(),
            mapper: VocabularyMapper::default(),
            locale,
            state: OrchestratorState::Idle,
            stats: SynthesisStats::default(),
        }
    }

    /// Replace the text cleaner
    pub fn with_cleaner(mut self, cleaner: TextCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Set how unknown phonemes are handled
    pub fn with_policy(mut self, policy: UnknownPhonemePolicy) -> Self {
        self.mapper = VocabularyMapper::new(policy);
        self
    }

    /// Replace the vocabulary mapper
    pub fn with_mapper(mut self, mapper: VocabularyMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Phonemize in a locale other than the voice's own
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn voice(&self) -> &Arc<Voice> {
        &self.voice
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// State of the current (or last) call
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Statistics of the current (or last) call
    pub fn stats(&self) -> &SynthesisStats {
        &self.stats
    }

    pub fn runtime(&self) -> &R {
        self.adapter.runtime()
    }

    pub fn engine(&self) -> &E {
        self.bridge.engine()
    }

    /// Start synthesizing `text`
    pub fn synthesize(&mut self, text: &str, config: &SynthesisConfig) -> Result<AudioStream<'_, E, R>> {
        self.synthesize_with_cancel(text, config, CancellationToken::new())
    }

    /// Start synthesizing `text`, stopping at the next clause boundary once
    /// `cancel` is triggered.
    ///
    /// Configuration problems (invalid fields, bad speaker, unsupported
    /// locale) are reported here, before any audio is produced.
    pub fn synthesize_with_cancel(
        &mut self,
        text: &str,
        config: &SynthesisConfig,
        cancel: CancellationToken,
    ) -> Result<AudioStream<'_, E, R>> {
        self.stats = SynthesisStats::default();
        self.state = OrchestratorState::Idle;

        if let Err(e) = config.validate() {
            self.state = OrchestratorState::Failed;
            return Err(e);
        }
        let speaker = match self.voice.resolve_speaker(config.speaker()) {
            Ok(s) => s,
            Err(e) => {
                self.state = OrchestratorState::Failed;
                return Err(e);
            }
        };

        let cleaned = self.cleaner.clean(text);
        info!(
            voice = %self.voice.name(),
            chars = cleaned.chars().count(),
            locale = %self.locale,
            "Starting synthesis"
        );

        let Self {
            voice,
            bridge,
            adapter,
            mapper,
            locale,
            state,
            stats,
            ..
        } = self;

        let units = match bridge.phonemize(&cleaned, locale.as_str()) {
            Ok(units) => units,
            Err(e) => {
                *state = OrchestratorState::Failed;
                return Err(e);
            }
        };
        *state = OrchestratorState::Segmenting;

        Ok(AudioStream {
            clauses: ClauseSegmenter::new(units),
            voice: &**voice,
            adapter,
            mapper,
            state,
            stats,
            speaker,
            prosody: config.prosody(),
            accelerate: config.use_accelerated_backend(),
            volume: config.volume(),
            silence: silence_samples(config.sentence_silence(), voice.sample_rate()),
            cancel,
            upcoming: VecDeque::new(),
            started: false,
            silence_due: false,
            finished: false,
            next_index: 0,
            started_at: Instant::now(),
        })
    }
}

/// Lazy ordered sequence of audio chunks for one call.
///
/// After an error the sequence yields that error once and ends; chunks
/// already yielded stay valid.
pub struct AudioStream<'a, E: PhonemeEngine, R: VoiceRuntime> {
    clauses: ClauseSegmenter<PhonemeStream<'a, E>>,
    voice: &'a Voice,
    adapter: &'a mut InferenceAdapter<R>,
    mapper: &'a VocabularyMapper,
    state: &'a mut OrchestratorState,
    stats: &'a mut SynthesisStats,
    speaker: Option<u32>,
    prosody: Prosody,
    accelerate: bool,
    volume: f32,
    /// Samples of silence between clauses
    silence: usize,
    cancel: CancellationToken,
    /// Lookahead: at most one segmented clause not yet synthesized
    upcoming: VecDeque<Result<PhonemeClause>>,
    started: bool,
    silence_due: bool,
    finished: bool,
    next_index: usize,
    started_at: Instant,
}

impl<E: PhonemeEngine, R: VoiceRuntime> AudioStream<'_, E, R> {
    pub fn state(&self) -> OrchestratorState {
        *self.state
    }

    pub fn stats(&self) -> &SynthesisStats {
        self.stats
    }

    pub fn sample_rate(&self) -> u32 {
        self.voice.sample_rate()
    }

    fn fail(&mut self, err: TtsError) -> Option<Result<AudioChunk>> {
        warn!(error = %err, chunks = self.next_index, "Synthesis failed");
        *self.state = OrchestratorState::Failed;
        self.finished = true;
        Some(Err(err))
    }

    fn cancelled(&mut self) -> Option<Result<AudioChunk>> {
        info!(chunks = self.next_index, "Synthesis cancelled");
        *self.state = OrchestratorState::Cancelled;
        self.finished = true;
        None
    }

    fn render(&mut self, clause: &PhonemeClause) -> Result<Vec<u8>> {
        let mapped = self.mapper.map_clause(clause, self.voice.vocabulary())?;
        for err in &mapped.unknown {
            warn!(clause = clause.index, error = %err, "Unknown phoneme");
        }
        self.stats.unknown_phonemes += mapped.unknown.len();
        let waveform = self
            .adapter
            .infer(&mapped.ids, self.speaker, &self.prosody, self.accelerate)?;
        debug!(
            clause = clause.index,
            phonemes = clause.len(),
            samples = waveform.samples.len(),
            "Clause synthesized"
        );
        Ok(encode_pcm(&waveform.samples, self.volume))
    }

    fn emit(&mut self, pcm: Vec<u8>, kind: ChunkKind, clause: Option<usize>, is_last: bool) -> AudioChunk {
        let chunk = AudioChunk {
            pcm,
            index: self.next_index,
            is_last,
            kind,
            sample_rate: self.voice.sample_rate(),
            clause,
            generated_at: Instant::now(),
        };
        self.next_index += 1;
        self.stats.update(&chunk, self.started_at);

        if is_last {
            *self.state = OrchestratorState::Done;
            self.finished = true;
            info!(
                chunks = self.stats.total_chunks,
                audio_secs = self.stats.total_audio_secs,
                rtf = self.stats.rtf,
                "Synthesis complete"
            );
        }
        chunk
    }
}

impl<E: PhonemeEngine, R: VoiceRuntime> Iterator for AudioStream<'_, E, R> {
    type Item = Result<AudioChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.silence_due {
            self.silence_due = false;
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }
            let pcm = vec![0u8; self.silence * 2];
            return Some(Ok(self.emit(pcm, ChunkKind::Silence, None, false)));
        }

        if !self.started {
            self.started = true;
            if let Some(first) = self.clauses.next() {
                self.upcoming.push_back(first);
            }
        }

        let clause = match self.upcoming.pop_front() {
            Some(Ok(clause)) => clause,
            Some(Err(e)) => return self.fail(e),
            None => {
                *self.state = OrchestratorState::Done;
                self.finished = true;
                return None;
            }
        };

        if self.cancel.is_cancelled() {
            return self.cancelled();
        }

        *self.state = OrchestratorState::Synthesizing(clause.index);
        let pcm = match self.render(&clause) {
            Ok(pcm) => pcm,
            Err(e) => return self.fail(e),
        };

        if let Some(next) = self.clauses.next() {
            let next_ok = next.is_ok();
            self.upcoming.push_back(next);
            self.silence_due = next_ok && self.silence > 0;
        }
        let is_last = self.upcoming.is_empty();

        *self.state = OrchestratorState::Emitting(clause.index);
        Some(Ok(self.emit(pcm, ChunkKind::Speech, Some(clause.index), is_last)))
    }
}

impl<E: PhonemeEngine, R: VoiceRuntime> std::iter::FusedIterator for AudioStream<'_, E, R> {}
