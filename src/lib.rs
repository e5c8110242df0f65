//! # SDKWork-Piper - Streaming Neural TTS
//!
//! Clause-by-clause text-to-speech for Piper/VITS voices. Text goes through
//! phonemization, clause segmentation, phoneme-id mapping and one neural
//! forward pass per clause; audio is delivered as an ordered stream of int16
//! PCM chunks while later clauses are still being synthesized.
//!
//! ## Features
//!
//! - **Streaming**: the first clause is audible before the rest is phonemized
//! - **Pluggable phonemizers**: `espeak-ng` subprocess or raw text graphemes
//! - **Pluggable runtimes**: any [`VoiceRuntime`], ONNX via candle (`onnx` feature)
//! - **GPU Acceleration**: CUDA and Metal support via Candle
//! - **Sinks**: streaming WAV encoder, raw PCM writer, WAV files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sdkwork_piper::{EspeakCommandEngine, SynthesisConfig, SynthesisOrchestrator, Voice};
//! use sdkwork_piper::inference::OnnxVoiceRuntime;
//!
//! let voice = Arc::new(Voice::load_for_model("en_US-lessac-medium.onnx")?);
//! let runtime = OnnxVoiceRuntime::load("en_US-lessac-medium.onnx", voice.sample_rate())?;
//! let mut tts = SynthesisOrchestrator::new(voice.clone(), EspeakCommandEngine::detect()?, runtime);
//!
//! let config = SynthesisConfig::builder_for(&voice).sentence_silence(0.2).build()?;
//! for chunk in tts.synthesize("Hello world. How are you?", &config)? {
//!     let chunk = chunk?;
//!     player.write(&chunk.pcm)?;
//! }
//! ```
//!
//! ## Environment configuration
//!
//! ```rust,ignore
//! use sdkwork_piper::config::{init_logging, SynthesisSettings};
//!
//! let settings = SynthesisSettings::from_env()?;
//! init_logging(&settings.logging());
//! let voice = settings.load_voice()?;
//! ```

pub mod audio;
pub mod config;
pub mod core;
pub mod inference;
pub mod streaming;
pub mod text;
pub mod voice;

// Core re-exports
pub use core::error::{AudioOperation, InferenceStage, Result, TtsError};

// Pipeline re-exports
pub use audio::{AudioOutput, WavStreamEncoder};
pub use config::{SynthesisConfig, SynthesisConfigBuilder, SynthesisSettings};
pub use inference::{InferenceAdapter, Prosody, VoiceRuntime, Waveform};
pub use streaming::{
    spawn_synthesis, AudioChunk, AudioStream, CancellationToken, ChunkKind, OrchestratorState,
    StreamHandle, SynthesisOrchestrator, SynthesisStats,
};
pub use text::{
    EspeakCommandEngine, PhonemeBridge, PhonemeClause, PhonemeEngine, TextCleaner, TextPhonemeEngine,
    Terminator,
};
pub use voice::{UnknownPhonemePolicy, Vocabulary, VocabularyMapper, Voice};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework name
pub const FRAMEWORK_NAME: &str = "SDKWork-Piper";

/// Default sample rate for output audio (22050 Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;
