//! ONNX runtime for Piper `.onnx` voice models, evaluated with candle-onnx

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_onnx::onnx::ModelProto;
use tracing::info;

use super::runtime::{ModelInputs, RuntimeOutput, VoiceRuntime};

/// Output name used by exported Piper models
const DEFAULT_OUTPUT: &str = "output";

/// A Piper voice model loaded into candle-onnx
pub struct OnnxVoiceRuntime {
    model: ModelProto,
    path: PathBuf,
    sample_rate: u32,
    output_name: String,
}

impl OnnxVoiceRuntime {
    /// Load a model file; `sample_rate` comes from the voice config
    pub fn load<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        let model = candle_onnx::read_file(path)
            .with_context(|| format!("Failed to load ONNX model: {}", path.display()))?;

        let output_name = model
            .graph
            .as_ref()
            .and_then(|g| g.output.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

        info!(model = %path.display(), output = %output_name, "Loaded ONNX voice model");

        Ok(Self {
            model,
            path: path.to_path_buf(),
            sample_rate,
            output_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VoiceRuntime for OnnxVoiceRuntime {
    fn name(&self) -> &str {
        "onnx"
    }

    fn run(&mut self, inputs: &ModelInputs) -> Result<RuntimeOutput> {
        let feeds: HashMap<String, candle_core::Tensor> = inputs
            .named()
            .into_iter()
            .map(|(name, tensor)| (name.to_string(), tensor.clone()))
            .collect();

        let mut outputs = candle_onnx::simple_eval(&self.model, feeds)
            .with_context(|| format!("Failed to evaluate {}", self.path.display()))?;

        let audio = outputs
            .remove(&self.output_name)
            .with_context(|| format!("Model produced no '{}' output", self.output_name))?;

        Ok(RuntimeOutput {
            audio,
            sample_rate: self.sample_rate,
        })
    }
}
