//! Core abstractions
//!
//! - `error`: the crate error type, tagged by pipeline stage

pub mod error;

pub use error::{AudioOperation, InferenceStage, Result, TtsError};
