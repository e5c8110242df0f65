//! Inference module
//!
//! - VoiceRuntime: capability interface of the neural runtime
//! - InferenceAdapter: ids + prosody in, waveform out
//! - OnnxVoiceRuntime: Piper `.onnx` models (feature `onnx`)

mod adapter;
mod runtime;

#[cfg(feature = "onnx")]
mod onnx;

pub use adapter::{InferenceAdapter, Prosody, Waveform};
pub use runtime::{ModelInputs, RuntimeOutput, VoiceRuntime};

#[cfg(feature = "onnx")]
pub use onnx::OnnxVoiceRuntime;
