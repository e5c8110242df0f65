//! Streaming Synthesis Module
//!
//! Clause-by-clause synthesis with lazy, ordered chunk delivery:
//! - [`SynthesisOrchestrator`]: per-call state machine over the pipeline
//! - [`AudioChunk`]: int16 PCM unit handed to the caller
//! - [`CancellationToken`]: cooperative cancellation between clauses
//! - [`StreamHandle`]: synthesis on a worker thread

mod handle;
mod orchestrator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

pub use handle::{spawn_synthesis, StreamHandle, StreamIterator};
pub use orchestrator::{AudioStream, OrchestratorState, SynthesisOrchestrator};

/// What a chunk contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Synthesized audio of one clause
    Speech,
    /// Inter-clause pause
    Silence,
}

/// Audio chunk for streaming
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// PCM bytes: i16 little-endian, mono
    pub pcm: Vec<u8>,
    /// Position in the call, from 0
    pub index: usize,
    /// Last chunk of the call
    pub is_last: bool,
    pub kind: ChunkKind,
    pub sample_rate: u32,
    /// Clause index for speech chunks
    pub clause: Option<usize>,
    /// When the chunk was produced
    pub generated_at: Instant,
}

impl AudioChunk {
    /// Number of samples in the chunk
    pub fn num_samples(&self) -> usize {
        self.pcm.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    /// Decode the PCM bytes
    pub fn samples(&self) -> Vec<i16> {
        crate::audio::from_le_bytes(&self.pcm)
    }

    /// Get chunk duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.num_samples() as f64 / self.sample_rate as f64) * 1000.0
    }

    /// Get latency from generation to now
    pub fn latency(&self) -> Duration {
        self.generated_at.elapsed()
    }
}

/// Per-call statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SynthesisStats {
    /// Total chunks emitted
    pub total_chunks: usize,
    /// Speech chunks emitted (one per clause)
    pub speech_chunks: usize,
    /// Silence chunks emitted
    pub silence_chunks: usize,
    /// Total audio duration in seconds
    pub total_audio_secs: f64,
    /// Time from call start to the first chunk
    pub first_chunk_latency_ms: f64,
    /// Wall time since the call started
    pub elapsed_secs: f64,
    /// Real-time factor (wall time / audio time, below 1 is faster than real time)
    pub rtf: f64,
    /// Unknown phonemes skipped or substituted
    pub unknown_phonemes: usize,
}

impl SynthesisStats {
    /// Update statistics with a new chunk
    pub fn update(&mut self, chunk: &AudioChunk, call_start: Instant) {
        self.total_chunks += 1;
        match chunk.kind {
            ChunkKind::Speech => self.speech_chunks += 1,
            ChunkKind::Silence => self.silence_chunks += 1,
        }
        self.total_audio_secs += chunk.duration_ms() / 1000.0;

        if self.total_chunks == 1 {
            self.first_chunk_latency_ms = call_start.elapsed().as_secs_f64() * 1000.0;
        }

        self.elapsed_secs = call_start.elapsed().as_secs_f64();
        if self.total_audio_secs > 0.0 {
            self.rtf = self.elapsed_secs / self.total_audio_secs;
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a synthesis call
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next clause boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
