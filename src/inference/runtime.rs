//! Neural runtime capability interface
//!
//! The vocoder math lives in an external runtime. It receives the Piper model
//! inputs as candle tensors and returns the waveform tensor.

use candle_core::Tensor;

/// Named model inputs of a Piper/VITS voice
#[derive(Debug, Clone)]
pub struct ModelInputs {
    /// Phoneme ids, `[1, N]` i64
    pub input: Tensor,
    /// Sequence length, `[1]` i64
    pub input_lengths: Tensor,
    /// `[noise_scale, length_scale, noise_w_scale]`, `[3]` f32
    pub scales: Tensor,
    /// Speaker id, `[1]` i64 (multi-speaker voices only)
    pub sid: Option<Tensor>,
}

impl ModelInputs {
    /// Input names and tensors in model order
    pub fn named(&self) -> Vec<(&'static str, &Tensor)> {
        let mut named = vec![
            ("input", &self.input),
            ("input_lengths", &self.input_lengths),
            ("scales", &self.scales),
        ];
        if let Some(sid) = &self.sid {
            named.push(("sid", sid));
        }
        named
    }
}

/// Waveform produced by a runtime
#[derive(Debug, Clone)]
pub struct RuntimeOutput {
    /// Float samples in `[-1, 1]`, any shape (flattened on read)
    pub audio: Tensor,
    pub sample_rate: u32,
}

/// An inference runtime able to evaluate a voice model.
///
/// Calls take `&mut self`: one forward pass in flight per instance.
pub trait VoiceRuntime: Send {
    /// Runtime name for logs and errors
    fn name(&self) -> &str;

    /// Run one forward pass
    fn run(&mut self, inputs: &ModelInputs) -> anyhow::Result<RuntimeOutput>;
}

impl<R: VoiceRuntime + ?Sized> VoiceRuntime for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&mut self, inputs: &ModelInputs) -> anyhow::Result<RuntimeOutput> {
        (**self).run(inputs)
    }
}
