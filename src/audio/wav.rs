//! RIFF/WAVE framing over a chunk stream
//!
//! Two modes:
//! - buffered: drain the stream, then emit a header with exact sizes. If
//!   the stream fails after some chunks, the header covers the audio
//!   delivered so far, that audio follows and the error comes last.
//! - streaming: emit the header with the first chunk, sizes set to
//!   `0xFFFFFFFF` ("until end of stream")

use std::collections::VecDeque;
use std::io::Write;

use tracing::debug;

use crate::core::error::{AudioOperation, Result, TtsError};
use crate::streaming::AudioChunk;

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_LEN: usize = 44;

/// Size placeholder for streams of unknown length
pub const UNKNOWN_SIZE: u32 = 0xFFFF_FFFF;

const BITS_PER_SAMPLE: u16 = 16;
const CHANNELS: u16 = 1;

/// Build a 44-byte mono 16-bit PCM header.
///
/// `data_len` is the data size in bytes, or `None` for an unknown length.
pub fn wav_header(sample_rate: u32, data_len: Option<u32>) -> [u8; WAV_HEADER_LEN] {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate.wrapping_mul(block_align as u32);
    let (riff_len, data_len) = match data_len {
        Some(len) => (len.saturating_add(36), len),
        None => (UNKNOWN_SIZE, UNKNOWN_SIZE),
    };

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_len.to_le_bytes());
    header[8..16].copy_from_slice(b"WAVEfmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Buffered,
    Streaming,
}

/// Encodes a chunk stream as WAV bytes, yielding byte blocks lazily
pub struct WavStreamEncoder<I> {
    chunks: I,
    sample_rate: u32,
    mode: Mode,
    pending: VecDeque<Vec<u8>>,
    /// Stream error held back until the buffered data is out
    failure: Option<TtsError>,
    header_sent: bool,
    finished: bool,
}

impl<I> WavStreamEncoder<I>
where
    I: Iterator<Item = Result<AudioChunk>>,
{
    /// Known-length mode: the whole stream is drained before any byte is emitted
    pub fn buffered(chunks: I, sample_rate: u32) -> Self {
        Self::new(chunks, sample_rate, Mode::Buffered)
    }

    /// Streaming mode: bytes follow the chunks as they arrive
    pub fn streaming(chunks: I, sample_rate: u32) -> Self {
        Self::new(chunks, sample_rate, Mode::Streaming)
    }

    fn new(chunks: I, sample_rate: u32, mode: Mode) -> Self {
        Self {
            chunks,
            sample_rate,
            mode,
            pending: VecDeque::new(),
            failure: None,
            header_sent: false,
            finished: false,
        }
    }

    /// Collect the encoded bytes
    pub fn encode_to_vec(self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for block in self {
            out.extend_from_slice(&block?);
        }
        Ok(out)
    }

    /// Write the encoded bytes to a writer, returning the byte count
    pub fn write_to<W: Write>(self, mut writer: W) -> Result<usize> {
        let mut written = 0;
        for block in self {
            let block = block?;
            writer.write_all(&block).map_err(|e| TtsError::Audio {
                message: e.to_string(),
                operation: AudioOperation::Writing,
            })?;
            written += block.len();
        }
        writer.flush().map_err(|e| TtsError::Audio {
            message: e.to_string(),
            operation: AudioOperation::Writing,
        })?;
        Ok(written)
    }

    fn drain(&mut self) -> Result<()> {
        let mut data = Vec::new();
        let mut delivered = 0usize;
        for chunk in self.chunks.by_ref() {
            match chunk {
                Ok(chunk) => {
                    delivered += 1;
                    data.push(chunk.pcm);
                }
                Err(e) => {
                    self.failure = Some(e);
                    break;
                }
            }
        }

        // Nothing was delivered: no output at all, only the error
        if delivered == 0 && self.failure.is_some() {
            return Ok(());
        }

        let total: usize = data.iter().map(Vec::len).sum();
        let data_len = u32::try_from(total)
            .ok()
            .filter(|len| len.checked_add(36).is_some())
            .ok_or_else(|| TtsError::Audio {
                message: format!("{} bytes of audio exceed the WAV size limit", total),
                operation: AudioOperation::Encoding,
            })?;

        debug!(bytes = total, truncated = self.failure.is_some(), "Buffered WAV stream");
        self.pending.push_back(wav_header(self.sample_rate, Some(data_len)).to_vec());
        self.pending.extend(data.into_iter().filter(|d| !d.is_empty()));
        self.header_sent = true;
        Ok(())
    }
}

impl<I> Iterator for WavStreamEncoder<I>
where
    I: Iterator<Item = Result<AudioChunk>>,
{
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(block) = self.pending.pop_front() {
            return Some(Ok(block));
        }
        if let Some(e) = self.failure.take() {
            self.finished = true;
            return Some(Err(e));
        }
        if self.finished {
            return None;
        }

        match self.mode {
            Mode::Buffered => {
                self.finished = true;
                if let Err(e) = self.drain() {
                    self.pending.clear();
                    self.failure = None;
                    return Some(Err(e));
                }
                if let Some(block) = self.pending.pop_front() {
                    return Some(Ok(block));
                }
                self.failure.take().map(Err)
            }
            Mode::Streaming => loop {
                match self.chunks.next() {
                    Some(Ok(chunk)) => {
                        if !self.header_sent {
                            self.header_sent = true;
                            if !chunk.pcm.is_empty() {
                                self.pending.push_back(chunk.pcm);
                            }
                            return Some(Ok(wav_header(self.sample_rate, None).to_vec()));
                        }
                        if !chunk.pcm.is_empty() {
                            return Some(Ok(chunk.pcm));
                        }
                    }
                    Some(Err(e)) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                    None => {
                        self.finished = true;
                        if !self.header_sent {
                            self.header_sent = true;
                            return Some(Ok(wav_header(self.sample_rate, Some(0)).to_vec()));
                        }
                        return None;
                    }
                }
            },
        }
    }
}
