//! Audio output sinks
//!
//! Provides:
//! - WAV file saving (sizes patched on finalize)
//! - Raw PCM output (headerless i16 little-endian)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use super::pcm::from_le_bytes;
use crate::core::error::{AudioOperation, Result, TtsError};
use crate::streaming::AudioChunk;

/// What a sink wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    pub chunks: usize,
    pub samples: usize,
}

/// Audio output handler for saving chunk streams
pub struct AudioOutput;

impl AudioOutput {
    fn spec(sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Write a chunk stream to a WAV file (16-bit PCM).
    ///
    /// If the stream fails, the file is finalized with the audio delivered
    /// so far and the stream's error is returned.
    pub fn save_wav<I, P>(chunks: I, sample_rate: u32, path: P) -> Result<SinkSummary>
    where
        I: IntoIterator<Item = Result<AudioChunk>>,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let mut writer = hound::WavWriter::create(path, Self::spec(sample_rate)).map_err(|e| {
            TtsError::Audio {
                message: format!("Failed to create WAV file {:?}: {}", path, e),
                operation: AudioOperation::Saving,
            }
        })?;

        let mut summary = SinkSummary::default();
        let mut failure = None;

        for chunk in chunks {
            match chunk {
                Ok(chunk) => {
                    for sample in from_le_bytes(&chunk.pcm) {
                        writer.write_sample(sample)?;
                    }
                    summary.chunks += 1;
                    summary.samples += chunk.num_samples();
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Stream failed, finalizing partial WAV");
                    failure = Some(e);
                    break;
                }
            }
        }

        writer.finalize()?;

        match failure {
            Some(e) => Err(e),
            None => {
                info!(path = %path.display(), samples = summary.samples, "Saved WAV");
                Ok(summary)
            }
        }
    }

    /// Write a chunk stream as raw PCM; chunks are flushed as they arrive
    pub fn write_raw<I, W>(chunks: I, mut writer: W) -> Result<SinkSummary>
    where
        I: IntoIterator<Item = Result<AudioChunk>>,
        W: Write,
    {
        let mut summary = SinkSummary::default();
        for chunk in chunks {
            let chunk = chunk?;
            writer
                .write_all(&chunk.pcm)
                .and_then(|_| writer.flush())
                .map_err(|e| TtsError::Audio {
                    message: e.to_string(),
                    operation: AudioOperation::Writing,
                })?;
            summary.chunks += 1;
            summary.samples += chunk.num_samples();
        }
        Ok(summary)
    }

    /// Write a chunk stream as raw PCM to a file
    pub fn save_raw<I, P>(chunks: I, path: P) -> Result<SinkSummary>
    where
        I: IntoIterator<Item = Result<AudioChunk>>,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| TtsError::Io {
            message: e.to_string(),
            path: Some(path.to_path_buf()),
        })?;
        Self::write_raw(chunks, BufWriter::new(file))
    }
}
