//! Audio processing modules
//!
//! - Int16 PCM quantization
//! - WAV framing over chunk streams (buffered and streaming)
//! - Output sinks (WAV file, raw PCM)

mod output;
mod pcm;
mod wav;

pub use output::{AudioOutput, SinkSummary};
pub use pcm::{encode_pcm, from_le_bytes, quantize, quantize_sample, silence_samples, to_le_bytes};
pub use wav::{wav_header, WavStreamEncoder, UNKNOWN_SIZE, WAV_HEADER_LEN};
