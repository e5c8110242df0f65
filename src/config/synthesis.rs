//! Per-call synthesis configuration

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TtsError};
use crate::inference::Prosody;
use crate::voice::{ProsodyDefaults, Voice};

/// Settings of one synthesis call. Immutable once built.
///
/// Only the builder and deserialization create one, and both validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSynthesisConfig")]
pub struct SynthesisConfig {
    speaker: Option<u32>,
    length_scale: f32,
    noise_scale: f32,
    noise_w_scale: f32,
    sentence_silence: f32,
    use_accelerated_backend: bool,
    volume: f32,
}

/// Wire form of [`SynthesisConfig`], checked before conversion
#[derive(Deserialize)]
struct RawSynthesisConfig {
    #[serde(default)]
    speaker: Option<u32>,
    length_scale: f32,
    noise_scale: f32,
    noise_w_scale: f32,
    #[serde(default)]
    sentence_silence: f32,
    #[serde(default)]
    use_accelerated_backend: bool,
    #[serde(default = "default_volume")]
    volume: f32,
}

impl TryFrom<RawSynthesisConfig> for SynthesisConfig {
    type Error = TtsError;

    fn try_from(raw: RawSynthesisConfig) -> Result<Self> {
        let config = Self {
            speaker: raw.speaker,
            length_scale: raw.length_scale,
            noise_scale: raw.noise_scale,
            noise_w_scale: raw.noise_w_scale,
            sentence_silence: raw.sentence_silence,
            use_accelerated_backend: raw.use_accelerated_backend,
            volume: raw.volume,
        };
        config.validate()?;
        Ok(config)
    }
}

fn default_volume() -> f32 {
    1.0
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self::from_prosody(&ProsodyDefaults::default())
    }
}

impl SynthesisConfig {
    fn from_prosody(prosody: &ProsodyDefaults) -> Self {
        Self {
            speaker: None,
            length_scale: prosody.length_scale,
            noise_scale: prosody.noise_scale,
            noise_w_scale: prosody.noise_w_scale,
            sentence_silence: 0.0,
            use_accelerated_backend: false,
            volume: default_volume(),
        }
    }

    /// Defaults of a voice
    pub fn for_voice(voice: &Voice) -> Self {
        Self::from_prosody(voice.prosody())
    }

    /// Builder starting from crate defaults
    pub fn builder() -> SynthesisConfigBuilder<'static> {
        SynthesisConfigBuilder::new()
    }

    /// Builder starting from a voice's defaults; speakers are checked against it
    pub fn builder_for(voice: &Voice) -> SynthesisConfigBuilder<'_> {
        SynthesisConfigBuilder::for_voice(voice)
    }

    /// Speaker index (multi-speaker voices)
    pub fn speaker(&self) -> Option<u32> {
        self.speaker
    }

    /// Duration multiplier, > 0
    pub fn length_scale(&self) -> f32 {
        self.length_scale
    }

    /// Generator noise, >= 0
    pub fn noise_scale(&self) -> f32 {
        self.noise_scale
    }

    /// Duration predictor noise, >= 0
    pub fn noise_w_scale(&self) -> f32 {
        self.noise_w_scale
    }

    /// Pause between clauses in seconds, >= 0
    pub fn sentence_silence(&self) -> f32 {
        self.sentence_silence
    }

    /// Run inference on CUDA/Metal when available
    pub fn use_accelerated_backend(&self) -> bool {
        self.use_accelerated_backend
    }

    /// Output gain applied before quantization, >= 0
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Prosody controls for the inference adapter
    pub fn prosody(&self) -> Prosody {
        Prosody {
            length_scale: self.length_scale,
            noise_scale: self.noise_scale,
            noise_w_scale: self.noise_w_scale,
        }
    }

    /// Check every field is in range
    pub fn validate(&self) -> Result<()> {
        self.prosody().validate()?;
        if !self.sentence_silence.is_finite() || self.sentence_silence < 0.0 {
            return Err(TtsError::config(
                "sentence_silence",
                format!("sentence_silence must be non-negative, got {}", self.sentence_silence),
            ));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(TtsError::config(
                "volume",
                format!("volume must be non-negative, got {}", self.volume),
            ));
        }
        Ok(())
    }
}

/// Synthesis configuration builder
pub struct SynthesisConfigBuilder<'a> {
    config: SynthesisConfig,
    voice: Option<&'a Voice>,
}

impl Default for SynthesisConfigBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SynthesisConfigBuilder<'a> {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: SynthesisConfig::default(),
            voice: None,
        }
    }

    /// Start from a voice's defaults
    pub fn for_voice(voice: &'a Voice) -> Self {
        Self {
            config: SynthesisConfig::for_voice(voice),
            voice: Some(voice),
        }
    }

    /// Set speaker index
    pub fn speaker(mut self, speaker: u32) -> Self {
        self.config.speaker = Some(speaker);
        self
    }

    /// Set or clear the speaker
    pub fn speaker_opt(mut self, speaker: Option<u32>) -> Self {
        self.config.speaker = speaker;
        self
    }

    pub fn length_scale(mut self, value: f32) -> Self {
        self.config.length_scale = value;
        self
    }

    pub fn noise_scale(mut self, value: f32) -> Self {
        self.config.noise_scale = value;
        self
    }

    pub fn noise_w_scale(mut self, value: f32) -> Self {
        self.config.noise_w_scale = value;
        self
    }

    /// Set the pause between clauses, in seconds
    pub fn sentence_silence(mut self, seconds: f32) -> Self {
        self.config.sentence_silence = seconds;
        self
    }

    /// Enable accelerated inference
    pub fn use_accelerated_backend(mut self, enable: bool) -> Self {
        self.config.use_accelerated_backend = enable;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.config.volume = volume;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<SynthesisConfig> {
        let mut config = self.config;
        config.validate()?;
        if let Some(voice) = self.voice {
            config.speaker = voice.resolve_speaker(config.speaker)?;
        }
        Ok(config)
    }
}
