//! Float to int16 PCM conversion

/// Quantize one float sample to int16.
///
/// The volume multiplier is applied first. Positive values scale by 32767,
/// negative by 32768, so both ends of `[-1, 1]` reach full scale. Results
/// are rounded and saturated; NaN becomes 0.
pub fn quantize_sample(sample: f32, volume: f32) -> i16 {
    let v = sample * volume;
    if v.is_nan() {
        return 0;
    }
    let scaled = if v >= 0.0 { v * 32767.0 } else { v * 32768.0 };
    scaled.round().clamp(-32768.0, 32767.0) as i16
}

/// Quantize a waveform
pub fn quantize(samples: &[f32], volume: f32) -> Vec<i16> {
    samples.iter().map(|&s| quantize_sample(s, volume)).collect()
}

/// Serialize samples as little-endian bytes
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

/// Parse little-endian bytes back into samples (a trailing odd byte is ignored)
pub fn from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Quantize and serialize in one pass
pub fn encode_pcm(samples: &[f32], volume: f32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        bytes.extend_from_slice(&quantize_sample(s, volume).to_le_bytes());
    }
    bytes
}

/// Number of samples in a pause of `seconds` at `sample_rate`
pub fn silence_samples(seconds: f32, sample_rate: u32) -> usize {
    if !(seconds.is_finite() && seconds > 0.0) {
        return 0;
    }
    (seconds as f64 * sample_rate as f64).round() as usize
}
