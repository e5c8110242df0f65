//! Voice configuration types matching the Piper `<voice>.onnx.json` structure

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Audio output parameters
    pub audio: AudioSection,

    /// espeak-ng voice used for phonemization
    #[serde(default)]
    pub espeak: Option<EspeakSection>,

    /// Default inference parameters
    #[serde(default)]
    pub inference: InferenceSection,

    /// How the voice expects text to be phonemized
    #[serde(default)]
    pub phoneme_type: PhonemeType,

    /// Phoneme to id map; every phoneme maps to exactly one id
    pub phoneme_id_map: BTreeMap<String, Vec<i64>>,

    /// Number of speakers (0 or 1 = single speaker)
    #[serde(default = "default_num_speakers")]
    pub num_speakers: u32,

    /// Speaker name to speaker index
    #[serde(default)]
    pub speaker_id_map: BTreeMap<String, u32>,

    /// Version of Piper the voice was exported with
    #[serde(default)]
    pub piper_version: Option<String>,
}

fn default_num_speakers() -> u32 {
    1
}

/// Audio section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSection {
    pub sample_rate: u32,

    /// Quality label (x_low, low, medium, high)
    #[serde(default)]
    pub quality: Option<String>,

    #[serde(default = "default_filter_length")]
    pub filter_length: u32,

    #[serde(default = "default_hop_length")]
    pub hop_length: u32,

    #[serde(default = "default_win_length")]
    pub win_length: u32,
}

fn default_filter_length() -> u32 {
    1024
}

fn default_hop_length() -> u32 {
    256
}

fn default_win_length() -> u32 {
    1024
}

/// espeak section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspeakSection {
    pub voice: String,
}

/// Inference defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceSection {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,

    #[serde(default = "default_length_scale")]
    pub length_scale: f32,

    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

/// Phoneme type of a voice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhonemeType {
    /// IPA phonemes from espeak-ng
    #[default]
    Espeak,
    /// Graphemes used directly as phonemes
    Text,
}

impl VoiceConfig {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read voice config: {:?}", path.as_ref()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to parse voice config: {:?}", path.as_ref()))
    }

    /// Parse configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid voice config JSON")
    }
}
