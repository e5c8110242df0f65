//! Process-level settings
//!
//! Settings can come from `PIPER_*` environment variables or a YAML file.
//! They name the voice model and override its synthesis defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::logging::LoggingConfig;
use super::synthesis::SynthesisConfig;
use crate::core::error::{Result, TtsError};
use crate::voice::{config_path_for, Voice};

/// Prefix of every settings variable
pub const ENV_PREFIX: &str = "PIPER_";

const MODEL_EXTENSION: &str = "onnx";

/// Model selection and synthesis overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisSettings {
    /// Model path or voice name
    pub model: String,

    #[serde(default)]
    pub speaker: Option<u32>,

    #[serde(default)]
    pub length_scale: Option<f32>,

    #[serde(default)]
    pub noise_scale: Option<f32>,

    #[serde(default)]
    pub noise_w_scale: Option<f32>,

    /// Use an accelerated backend
    #[serde(default)]
    pub cuda: bool,

    /// Seconds of silence between clauses
    #[serde(default)]
    pub sentence_silence: f32,

    /// Directories searched for voices
    #[serde(default = "default_data_dirs")]
    pub data_dir: Vec<PathBuf>,

    /// Directory voices are downloaded to (also searched)
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    /// Debug logging
    #[serde(default)]
    pub debug: bool,
}

fn default_data_dirs() -> Vec<PathBuf> {
    vec![std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))]
}

impl SynthesisSettings {
    /// Settings for a model with everything else at defaults
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            speaker: None,
            length_scale: None,
            noise_scale: None,
            noise_w_scale: None,
            cuda: false,
            sentence_silence: 0.0,
            data_dir: default_data_dirs(),
            download_dir: None,
            debug: false,
        }
    }

    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Read settings through a variable lookup.
    ///
    /// `PIPER_MODEL` is required. Numeric variables must parse when present
    /// (an empty value is an error). Flags are on only for the exact value
    /// `True`. `PIPER_DATA_DIR` is a `:`-separated list and defaults to the
    /// current directory.
    pub fn from_env_with<F>(get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| get_env(&format!("{}{}", ENV_PREFIX, name));

        let model = var("MODEL").ok_or_else(|| {
            TtsError::config("PIPER_MODEL", "PIPER_MODEL must be set")
        })?;

        let data_dir: Vec<PathBuf> = var("DATA_DIR")
            .unwrap_or_default()
            .split(':')
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .collect();

        let settings = Self {
            model,
            speaker: parse_var("SPEAKER", var("SPEAKER"))?,
            length_scale: parse_var("LENGTH_SCALE", var("LENGTH_SCALE"))?,
            noise_scale: parse_var("NOISE_SCALE", var("NOISE_SCALE"))?,
            noise_w_scale: parse_var("NOISE_W_SCALE", var("NOISE_W_SCALE"))?,
            cuda: var("CUDA").as_deref() == Some("True"),
            sentence_silence: parse_var("SENTENCE_SILENCE", var("SENTENCE_SILENCE"))?.unwrap_or(0.0),
            data_dir: if data_dir.is_empty() { default_data_dirs() } else { data_dir },
            download_dir: var("DOWNLOAD_DIR").map(PathBuf::from),
            debug: var("DEBUG").as_deref() == Some("True"),
        };

        debug!(model = %settings.model, "Loaded settings from environment");
        Ok(settings)
    }

    /// Load settings from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read settings file: {:?}", path.as_ref()))?;

        let settings: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings YAML: {:?}", path.as_ref()))?;
        Ok(settings)
    }

    /// Find the model file.
    ///
    /// `model` may be a path or a voice name. Names are looked up as
    /// `<dir>/<name>` and `<dir>/<name>.onnx` in each data directory and then
    /// the download directory. A candidate counts only if its `.json` config
    /// sits next to it.
    pub fn resolve_model(&self) -> Result<PathBuf> {
        let direct = PathBuf::from(&self.model);
        if is_voice_pair(&direct) {
            return Ok(direct);
        }

        let file_name = if direct.extension().is_some_and(|e| e == MODEL_EXTENSION) {
            self.model.clone()
        } else {
            format!("{}.{}", self.model, MODEL_EXTENSION)
        };

        let found = self
            .search_dirs()
            .flat_map(|dir| [dir.join(&self.model), dir.join(&file_name)])
            .find(|candidate| is_voice_pair(candidate));

        match found {
            Some(path) => {
                debug!(model = %path.display(), "Resolved voice model");
                Ok(path)
            }
            None => Err(TtsError::Configuration {
                message: format!(
                    "Voice model '{}' not found in {:?}",
                    self.model,
                    self.search_dirs().collect::<Vec<_>>()
                ),
                field: Some("model".to_string()),
            }),
        }
    }

    fn search_dirs(&self) -> impl Iterator<Item = &Path> {
        self.data_dir
            .iter()
            .chain(self.download_dir.iter())
            .map(PathBuf::as_path)
    }

    /// Resolve and load the voice
    pub fn load_voice(&self) -> Result<Voice> {
        Voice::load_for_model(self.resolve_model()?)
    }

    /// Synthesis configuration for a voice with these overrides applied
    pub fn to_config(&self, voice: &Voice) -> Result<SynthesisConfig> {
        let mut builder = SynthesisConfig::builder_for(voice)
            .speaker_opt(self.speaker)
            .sentence_silence(self.sentence_silence)
            .use_accelerated_backend(self.cuda);

        if let Some(v) = self.length_scale {
            builder = builder.length_scale(v);
        }
        if let Some(v) = self.noise_scale {
            builder = builder.noise_scale(v);
        }
        if let Some(v) = self.noise_w_scale {
            builder = builder.noise_w_scale(v);
        }
        builder.build()
    }

    /// Logging configuration implied by the debug flag
    pub fn logging(&self) -> LoggingConfig {
        if self.debug {
            LoggingConfig::debug()
        } else {
            LoggingConfig::default()
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            TtsError::config(
                format!("{}{}", ENV_PREFIX, name),
                format!("Invalid value {:?} for {}{}: {}", raw, ENV_PREFIX, name, e),
            )
        }),
    }
}

fn is_voice_pair(model: &Path) -> bool {
    model.is_file() && config_path_for(model).is_file()
}
