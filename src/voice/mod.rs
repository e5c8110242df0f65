//! Voice Module
//!
//! A [`Voice`] is everything the pipeline needs to know about a trained
//! voice model: its sample rate, phoneme vocabulary, speakers and prosody
//! defaults. It is loaded once and shared read-only (`Arc<Voice>`) between
//! synthesis calls.

pub mod config;
pub mod vocabulary;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::{Result, TtsError};

pub use config::{PhonemeType, VoiceConfig};
pub use vocabulary::{MappedClause, UnknownPhonemePolicy, Vocabulary, VocabularyMapper};

/// Locale used when a voice names no espeak voice
pub const DEFAULT_LOCALE: &str = "en-us";

/// Default prosody of a voice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProsodyDefaults {
    pub length_scale: f32,
    pub noise_scale: f32,
    pub noise_w_scale: f32,
}

impl Default for ProsodyDefaults {
    fn default() -> Self {
        Self {
            length_scale: 1.0,
            noise_scale: 0.667,
            noise_w_scale: 0.8,
        }
    }
}

/// STFT framing of the model; carried for runtimes that need it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameParams {
    pub filter_length: u32,
    pub hop_length: u32,
    pub win_length: u32,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            filter_length: 1024,
            hop_length: 256,
            win_length: 1024,
        }
    }
}

/// A loaded voice
#[derive(Debug, Clone)]
pub struct Voice {
    name: String,
    sample_rate: u32,
    vocabulary: Vocabulary,
    num_speakers: u32,
    speakers: BTreeMap<String, u32>,
    prosody: ProsodyDefaults,
    frame: FrameParams,
    locale: String,
    phoneme_type: PhonemeType,
    quality: Option<String>,
    model_path: Option<PathBuf>,
}

impl Voice {
    /// Start building a voice by hand
    pub fn builder(sample_rate: u32, vocabulary: Vocabulary) -> VoiceBuilder {
        VoiceBuilder::new(sample_rate, vocabulary)
    }

    /// Load a voice from its `<voice>.onnx.json` file
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        let config = VoiceConfig::load(path).map_err(|e| TtsError::Configuration {
            message: format!("{:#}", e),
            field: Some("voice".to_string()),
        })?;
        let name = voice_name(path);
        let voice = Self::from_config(name, &config)?;

        info!(
            voice = %voice.name,
            sample_rate = voice.sample_rate,
            phonemes = voice.vocabulary.len(),
            speakers = voice.num_speakers,
            "Loaded voice"
        );
        Ok(voice)
    }

    /// Load the voice of a Piper model file (`<voice>.onnx` + `<voice>.onnx.json`)
    pub fn load_for_model<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model = model_path.as_ref();
        let voice = Self::load(config_path_for(model))?;
        Ok(voice.with_model_path(model))
    }

    /// Build a voice from a parsed configuration
    pub fn from_config(name: impl Into<String>, config: &VoiceConfig) -> Result<Self> {
        let vocabulary = Vocabulary::from_id_map(&config.phoneme_id_map)?;

        let mut builder = VoiceBuilder::new(config.audio.sample_rate, vocabulary)
            .name(name)
            .num_speakers(config.num_speakers)
            .prosody(ProsodyDefaults {
                length_scale: config.inference.length_scale,
                noise_scale: config.inference.noise_scale,
                noise_w_scale: config.inference.noise_w,
            })
            .frame(FrameParams {
                filter_length: config.audio.filter_length,
                hop_length: config.audio.hop_length,
                win_length: config.audio.win_length,
            })
            .phoneme_type(config.phoneme_type);

        if let Some(espeak) = &config.espeak {
            builder = builder.locale(espeak.voice.clone());
        }
        if let Some(quality) = &config.audio.quality {
            builder = builder.quality(quality.clone());
        }
        for (speaker, index) in &config.speaker_id_map {
            builder = builder.speaker(speaker.clone(), *index);
        }

        builder.build()
    }

    /// Attach the path of the model file
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Declared speaker count (0 or 1 = single speaker)
    pub fn num_speakers(&self) -> u32 {
        self.num_speakers
    }

    pub fn is_multi_speaker(&self) -> bool {
        self.num_speakers > 1
    }

    /// Look up a speaker index by name
    pub fn speaker_index(&self, name: &str) -> Option<u32> {
        self.speakers.get(name).copied()
    }

    /// Speaker names and indices
    pub fn speakers(&self) -> &BTreeMap<String, u32> {
        &self.speakers
    }

    pub fn prosody(&self) -> &ProsodyDefaults {
        &self.prosody
    }

    pub fn frame(&self) -> &FrameParams {
        &self.frame
    }

    /// espeak locale of the voice
    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn phoneme_type(&self) -> PhonemeType {
        self.phoneme_type
    }

    pub fn quality(&self) -> Option<&str> {
        self.quality.as_deref()
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// Validate a requested speaker against this voice.
    ///
    /// Single-speaker voices accept no speaker or speaker 0 and need no
    /// speaker input (`None`). Multi-speaker voices default to speaker 0.
    pub fn resolve_speaker(&self, speaker: Option<u32>) -> Result<Option<u32>> {
        if !self.is_multi_speaker() {
            return match speaker {
                None | Some(0) => Ok(None),
                Some(s) => Err(TtsError::config(
                    "speaker",
                    format!("Voice '{}' has a single speaker, got speaker {}", self.name, s),
                )),
            };
        }

        let index = speaker.unwrap_or(0);
        if index >= self.num_speakers {
            return Err(TtsError::config(
                "speaker",
                format!(
                    "Speaker {} out of range, voice '{}' has {} speakers",
                    index, self.name, self.num_speakers
                ),
            ));
        }
        Ok(Some(index))
    }
}

/// Voice builder
pub struct VoiceBuilder {
    voice: Voice,
}

impl VoiceBuilder {
    /// Create a new voice builder
    pub fn new(sample_rate: u32, vocabulary: Vocabulary) -> Self {
        Self {
            voice: Voice {
                name: "voice".to_string(),
                sample_rate,
                vocabulary,
                num_speakers: 1,
                speakers: BTreeMap::new(),
                prosody: ProsodyDefaults::default(),
                frame: FrameParams::default(),
                locale: DEFAULT_LOCALE.to_string(),
                phoneme_type: PhonemeType::default(),
                quality: None,
                model_path: None,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.voice.name = name.into();
        self
    }

    pub fn num_speakers(mut self, count: u32) -> Self {
        self.voice.num_speakers = count;
        self
    }

    /// Add a named speaker
    pub fn speaker(mut self, name: impl Into<String>, index: u32) -> Self {
        self.voice.speakers.insert(name.into(), index);
        self
    }

    pub fn prosody(mut self, prosody: ProsodyDefaults) -> Self {
        self.voice.prosody = prosody;
        self
    }

    pub fn frame(mut self, frame: FrameParams) -> Self {
        self.voice.frame = frame;
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.voice.locale = locale.into();
        self
    }

    pub fn phoneme_type(mut self, phoneme_type: PhonemeType) -> Self {
        self.voice.phoneme_type = phoneme_type;
        self
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.voice.quality = Some(quality.into());
        self
    }

    /// Validate and build the voice
    pub fn build(self) -> Result<Voice> {
        let voice = self.voice;

        if voice.sample_rate == 0 {
            return Err(TtsError::config("sample_rate", "Sample rate must be positive"));
        }
        if voice.vocabulary.is_empty() {
            return Err(TtsError::config("phoneme_id_map", "Vocabulary is empty"));
        }
        let p = &voice.prosody;
        if !(p.length_scale.is_finite() && p.length_scale > 0.0) {
            return Err(TtsError::config("length_scale", "Default length scale must be positive"));
        }
        if !(p.noise_scale.is_finite() && p.noise_scale >= 0.0)
            || !(p.noise_w_scale.is_finite() && p.noise_w_scale >= 0.0)
        {
            return Err(TtsError::config("noise_scale", "Default noise scales must be non-negative"));
        }
        let speaker_limit = voice.num_speakers.max(1);
        if let Some((name, index)) = voice.speakers.iter().find(|(_, i)| **i >= speaker_limit) {
            return Err(TtsError::config(
                "speaker_id_map",
                format!("Speaker '{}' has index {} beyond speaker count", name, index),
            ));
        }

        Ok(voice)
    }
}

/// Config file that accompanies a model file (`<model>.json`)
pub fn config_path_for(model_path: &Path) -> PathBuf {
    let mut config = model_path.as_os_str().to_owned();
    config.push(".json");
    PathBuf::from(config)
}

/// Voice name from a model or config path (`en_US-lessac-medium`)
fn voice_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = file
        .strip_suffix(".onnx.json")
        .or_else(|| file.strip_suffix(".json"))
        .or_else(|| file.strip_suffix(".onnx"))
        .unwrap_or(&file);
    name.to_string()
}
