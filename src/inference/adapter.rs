//! Inference adapter
//!
//! Marshals phoneme ids, speaker and prosody controls into model inputs for a
//! [`VoiceRuntime`], and the waveform back out.

use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::runtime::{ModelInputs, VoiceRuntime};
use crate::core::error::{InferenceStage, Result, TtsError};
use crate::voice::{ProsodyDefaults, Voice};

/// Prosody controls for one inference call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prosody {
    /// Duration multiplier (> 1 is slower)
    pub length_scale: f32,
    /// Generator noise
    pub noise_scale: f32,
    /// Duration predictor noise
    pub noise_w_scale: f32,
}

impl Default for Prosody {
    fn default() -> Self {
        ProsodyDefaults::default().into()
    }
}

impl From<ProsodyDefaults> for Prosody {
    fn from(d: ProsodyDefaults) -> Self {
        Self {
            length_scale: d.length_scale,
            noise_scale: d.noise_scale,
            noise_w_scale: d.noise_w_scale,
        }
    }
}

impl Prosody {
    /// Check the controls are usable
    pub fn validate(&self) -> Result<()> {
        if !self.length_scale.is_finite() || self.length_scale <= 0.0 {
            return Err(TtsError::config(
                "length_scale",
                format!("length_scale must be positive, got {}", self.length_scale),
            ));
        }
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(TtsError::config(
                "noise_scale",
                format!("noise_scale must be non-negative, got {}", self.noise_scale),
            ));
        }
        if !self.noise_w_scale.is_finite() || self.noise_w_scale < 0.0 {
            return Err(TtsError::config(
                "noise_w_scale",
                format!("noise_w_scale must be non-negative, got {}", self.noise_w_scale),
            ));
        }
        Ok(())
    }

    /// The `scales` input: `[noise, length, noise_w]`
    pub fn scales(&self) -> [f32; 3] {
        [self.noise_scale, self.length_scale, self.noise_w_scale]
    }
}

/// Mono float waveform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn silent(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }
}

/// Adapter between the pipeline and a neural runtime
pub struct InferenceAdapter<R: VoiceRuntime> {
    runtime: R,
    sample_rate: u32,
    num_speakers: u32,
    accelerated: Option<Device>,
}

impl<R: VoiceRuntime> InferenceAdapter<R> {
    pub fn new(runtime: R, voice: &Voice) -> Self {
        Self {
            runtime,
            sample_rate: voice.sample_rate(),
            num_speakers: voice.num_speakers(),
            accelerated: None,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Run inference for one clause.
    ///
    /// Empty ids produce an empty waveform without calling the runtime.
    pub fn infer(
        &mut self,
        ids: &[i64],
        speaker: Option<u32>,
        prosody: &Prosody,
        accelerate: bool,
    ) -> Result<Waveform> {
        prosody.validate()?;

        let sid = if self.num_speakers > 1 {
            let index = speaker.unwrap_or(0);
            if index >= self.num_speakers {
                return Err(TtsError::config(
                    "speaker",
                    format!("Speaker {} out of range ({} speakers)", index, self.num_speakers),
                ));
            }
            Some(index)
        } else {
            match speaker {
                None | Some(0) => None,
                Some(s) => {
                    return Err(TtsError::config(
                        "speaker",
                        format!("Single-speaker voice cannot use speaker {}", s),
                    ))
                }
            }
        };

        if ids.is_empty() {
            return Ok(Waveform::silent(self.sample_rate));
        }

        let device = self.device(accelerate);
        let inputs = marshal(ids, sid, prosody, &device).map_err(|e| placement_error(&device, e))?;

        let start = Instant::now();
        let output = self.runtime.run(&inputs).map_err(|e| {
            warn!(runtime = self.runtime.name(), error = %e, "Forward pass failed");
            TtsError::synthesis(
                InferenceStage::ForwardPass,
                format!("{} failed: {:#}", self.runtime.name(), e),
            )
        })?;
        let elapsed = start.elapsed();

        if output.sample_rate != self.sample_rate {
            return Err(TtsError::synthesis(
                InferenceStage::Unmarshalling,
                format!(
                    "Runtime produced {} Hz audio, voice expects {} Hz",
                    output.sample_rate, self.sample_rate
                ),
            ));
        }

        let samples = output
            .audio
            .flatten_all()
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| {
                TtsError::synthesis(InferenceStage::Unmarshalling, format!("Failed to read waveform: {}", e))
            })?;

        debug!(
            ids = ids.len(),
            samples = samples.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Forward pass complete"
        );

        Ok(Waveform {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    /// CPU, or the first accelerator found (cached) when requested
    fn device(&mut self, accelerate: bool) -> Device {
        if !accelerate {
            return Device::Cpu;
        }
        if let Some(device) = &self.accelerated {
            return device.clone();
        }

        let device = select_accelerator();
        self.accelerated = Some(device.clone());
        device
    }
}

fn select_accelerator() -> Device {
    match Device::cuda_if_available(0) {
        Ok(device) if device.is_cuda() => {
            info!("Using CUDA device");
            return device;
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "CUDA device unavailable"),
    }
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            info!("Using Metal device");
            return device;
        }
        Err(e) => warn!(error = %e, "Metal device unavailable"),
    }
    warn!("No accelerator available, falling back to CPU");
    Device::Cpu
}

/// Input placement failures on an accelerator are device faults
fn placement_error(device: &Device, e: candle_core::Error) -> TtsError {
    if device.is_cpu() {
        TtsError::synthesis(InferenceStage::Marshalling, format!("Failed to build inputs: {}", e))
    } else {
        TtsError::synthesis(
            InferenceStage::Device,
            format!("Failed to place inputs on {:?}: {}", device.location(), e),
        )
    }
}

fn marshal(
    ids: &[i64],
    sid: Option<u32>,
    prosody: &Prosody,
    device: &Device,
) -> candle_core::Result<ModelInputs> {
    let input = Tensor::from_slice(ids, (1, ids.len()), device)?;
    let input_lengths = Tensor::new(&[ids.len() as i64], device)?;
    let scales = Tensor::new(&prosody.scales(), device)?;
    let sid = match sid {
        Some(s) => Some(Tensor::new(&[s as i64], device)?),
        None => None,
    };
    Ok(ModelInputs {
        input,
        input_lengths,
        scales,
        sid,
    })
}
