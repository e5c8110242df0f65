//! Integration tests for SDKWork-Piper
//!
//! Runs the full pipeline from text to PCM chunks with the grapheme
//! phonemizer and a constant-output runtime.

use std::sync::{Arc, Mutex};

use candle_core::{Device, Tensor};

use sdkwork_piper::audio::{AudioOutput, WavStreamEncoder, UNKNOWN_SIZE, WAV_HEADER_LEN};
use sdkwork_piper::config::{SynthesisConfig, SynthesisSettings};
use sdkwork_piper::inference::{ModelInputs, RuntimeOutput, VoiceRuntime};
use sdkwork_piper::streaming::{
    spawn_synthesis, AudioChunk, CancellationToken, ChunkKind, OrchestratorState, SynthesisOrchestrator,
};
use sdkwork_piper::text::{ClauseSegmenter, PhonemeBridge, TextPhonemeEngine, Terminator};
use sdkwork_piper::voice::{UnknownPhonemePolicy, Vocabulary, VocabularyMapper, Voice};
use sdkwork_piper::{InferenceStage, TtsError};

const RATE: u32 = 16000;

/// Ids and speaker of every forward pass
#[derive(Clone, Default)]
struct Calls(Arc<Mutex<Vec<(Vec<i64>, Option<i64>)>>>);

impl Calls {
    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    fn ids(&self, call: usize) -> Vec<i64> {
        self.0.lock().unwrap()[call].0.clone()
    }

    fn speaker(&self, call: usize) -> Option<i64> {
        self.0.lock().unwrap()[call].1
    }
}

/// Runtime producing a fixed block of samples per clause
struct ConstRuntime {
    samples: usize,
    amplitude: f32,
    sample_rate: u32,
    fail_on_call: Option<usize>,
    calls: Calls,
}

impl ConstRuntime {
    fn new(samples: usize) -> (Self, Calls) {
        let calls = Calls::default();
        let runtime = Self {
            samples,
            amplitude: 0.5,
            sample_rate: RATE,
            fail_on_call: None,
            calls: calls.clone(),
        };
        (runtime, calls)
    }
}

impl VoiceRuntime for ConstRuntime {
    fn name(&self) -> &str {
        "const"
    }

    fn run(&mut self, inputs: &ModelInputs) -> anyhow::Result<RuntimeOutput> {
        let ids = inputs.input.flatten_all()?.to_vec1::<i64>()?;
        let sid = match &inputs.sid {
            Some(t) => Some(t.to_vec1::<i64>()?[0]),
            None => None,
        };
        let call = {
            let mut calls = self.calls.0.lock().unwrap();
            calls.push((ids, sid));
            calls.len()
        };
        if Some(call) == self.fail_on_call {
            anyhow::bail!("device lost");
        }
        let audio = vec![self.amplitude; self.samples];
        Ok(RuntimeOutput {
            audio: Tensor::from_vec(audio, (1, 1, self.samples), &Device::Cpu)?,
            sample_rate: self.sample_rate,
        })
    }
}

/// `_ ^ $`, space, ASCII punctuation and lowercase letters
fn vocabulary() -> Vocabulary {
    let mut pairs: Vec<(String, i64)> = vec![
        ("_".to_string(), 0),
        ("^".to_string(), 1),
        ("$".to_string(), 2),
        (" ".to_string(), 3),
    ];
    for (i, p) in [".", ",", "!", "?", ";", ":"].iter().enumerate() {
        pairs.push((p.to_string(), 4 + i as i64));
    }
    for (i, c) in ('a'..='z').enumerate() {
        pairs.push((c.to_string(), 10 + i as i64));
    }
    Vocabulary::from_pairs(pairs).unwrap()
}

fn voice(speakers: u32) -> Arc<Voice> {
    Arc::new(
        Voice::builder(RATE, vocabulary())
            .name("test-voice")
            .num_speakers(speakers)
            .build()
            .unwrap(),
    )
}

fn orchestrator(samples: usize) -> (SynthesisOrchestrator<TextPhonemeEngine, ConstRuntime>, Calls) {
    let (runtime, calls) = ConstRuntime::new(samples);
    (SynthesisOrchestrator::new(voice(1), TextPhonemeEngine::new(), runtime), calls)
}

fn silence(seconds: f32) -> SynthesisConfig {
    SynthesisConfig::builder().sentence_silence(seconds).build().unwrap()
}

fn collect(chunks: impl Iterator<Item = sdkwork_piper::Result<AudioChunk>>) -> Vec<AudioChunk> {
    chunks.collect::<sdkwork_piper::Result<Vec<_>>>().unwrap()
}

/// Clause terminators reported for mixed punctuation
#[test]
fn test_terminator_sequence() {
    let mut bridge = PhonemeBridge::new(TextPhonemeEngine::new());
    let units = bridge.phonemize("one, two! three? four; five: six.", "en-us").unwrap();
    let ends: Vec<Terminator> = ClauseSegmenter::new(units)
        .map(|c| c.unwrap().end.terminator())
        .collect();

    assert_eq!(
        ends,
        vec![
            Terminator::Comma,
            Terminator::Exclamation,
            Terminator::Question,
            Terminator::Semicolon,
            Terminator::Colon,
            Terminator::Period,
        ]
    );
}

fn terminators(text: &str, locale: &str) -> Vec<Terminator> {
    let mut bridge = PhonemeBridge::new(TextPhonemeEngine::new());
    let units = bridge.phonemize(text, locale).unwrap();
    ClauseSegmenter::new(units)
        .map(|c| c.unwrap().end.terminator())
        .collect()
}

/// Terminators of a sentence using every ASCII clause mark
#[test]
fn test_literal_ascii_terminators() {
    assert_eq!(
        terminators("Hello, world! Colons: important? Maybe; maybe not.", "en-us"),
        vec![
            Terminator::Comma,
            Terminator::Exclamation,
            Terminator::Colon,
            Terminator::Question,
            Terminator::Semicolon,
            Terminator::Period,
        ]
    );
}

/// Ellipsis glyph and ASCII dot runs all read as a pause
#[test]
fn test_literal_ellipsis_terminators() {
    for text in [
        "An ellipsis… Could it be true?",
        "An ellipsis... Could it be true?",
        "An ellipsis.... Could it be true?",
    ] {
        assert_eq!(
            terminators(text, "en-us"),
            vec![Terminator::Semicolon, Terminator::Question],
            "{}",
            text
        );
    }
}

/// Every CJK clause mark, ending in a doubled ellipsis
#[test]
fn test_literal_cjk_terminators() {
    assert_eq!(
        terminators("你好，世界！冒号：重要？可能；与否。一、二、三……", "cmn"),
        vec![
            Terminator::Comma,
            Terminator::Exclamation,
            Terminator::Colon,
            Terminator::Question,
            Terminator::Semicolon,
            Terminator::Period,
            Terminator::Comma,
            Terminator::Comma,
            Terminator::Semicolon,
        ]
    );
}

/// Mixed marks close one clause, not merge two
#[test]
fn test_mixed_marks_split_clauses() {
    assert_eq!(
        terminators("Really?! Yes.", "en-us"),
        vec![Terminator::Question, Terminator::Period]
    );
    assert_eq!(
        terminators("Stop!!! Now.", "en-us"),
        vec![Terminator::Exclamation, Terminator::Period]
    );
}

/// Full-width CJK punctuation closes clauses too
#[test]
fn test_cjk_terminator_sequence() {
    let mut bridge = PhonemeBridge::new(TextPhonemeEngine::new());
    let units = bridge.phonemize("你好，世界！今天好吗？", "cmn").unwrap();
    let ends: Vec<Terminator> = ClauseSegmenter::new(units)
        .map(|c| c.unwrap().end.terminator())
        .collect();

    assert_eq!(
        ends,
        vec![Terminator::Comma, Terminator::Exclamation, Terminator::Question]
    );
}

/// Two sentences: speech, silence, speech
#[test]
fn test_two_sentences_with_silence() {
    let (mut tts, calls) = orchestrator(100);
    let chunks = collect(tts.synthesize("hello world. how are you?", &silence(0.1)).unwrap());

    assert_eq!(chunks.len(), 3);
    assert_eq!(calls.len(), 2);

    assert_eq!(chunks[0].kind, ChunkKind::Speech);
    assert_eq!(chunks[0].clause, Some(0));
    assert_eq!(chunks[0].num_samples(), 100);

    assert_eq!(chunks[1].kind, ChunkKind::Silence);
    assert_eq!(chunks[1].num_samples(), 1600);
    assert!(chunks[1].samples().iter().all(|&s| s == 0));

    assert_eq!(chunks[2].kind, ChunkKind::Speech);
    assert_eq!(chunks[2].clause, Some(1));

    let flags: Vec<bool> = chunks.iter().map(|c| c.is_last).collect();
    assert_eq!(flags, vec![false, false, true]);
    let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    assert_eq!(tts.state(), OrchestratorState::Done);
    let stats = tts.stats();
    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.speech_chunks, 2);
    assert_eq!(stats.silence_chunks, 1);
    assert!((stats.total_audio_secs - 1800.0 / RATE as f64).abs() < 1e-9);
}

/// N clauses without silence give exactly N chunks
#[test]
fn test_no_silence_chunks_when_disabled() {
    let (mut tts, _) = orchestrator(10);
    let chunks = collect(tts.synthesize("one. two. three. four.", &silence(0.0)).unwrap());

    assert_eq!(chunks.len(), 4);
    assert!(chunks.iter().all(|c| c.kind == ChunkKind::Speech));
    assert_eq!(chunks.iter().filter(|c| c.is_last).count(), 1);
    assert!(chunks[3].is_last);
}

/// Silence length is rounded to whole samples
#[test]
fn test_silence_rounding() {
    let (mut tts, _) = orchestrator(10);
    let chunks = collect(tts.synthesize("a. b.", &silence(0.00003)).unwrap());
    // 0.00003 s * 16000 Hz = 0.48 samples, rounds to nothing
    assert_eq!(chunks.len(), 2);

    let chunks = collect(tts.synthesize("a. b.", &silence(0.0001)).unwrap());
    // 1.6 samples rounds to 2
    assert_eq!(chunks[1].kind, ChunkKind::Silence);
    assert_eq!(chunks[1].num_samples(), 2);
}

/// Empty text gives one empty chunk flagged last and no forward pass
#[test]
fn test_empty_text() {
    let (mut tts, calls) = orchestrator(100);
    let chunks = collect(tts.synthesize("", &silence(0.5)).unwrap());

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_empty());
    assert!(chunks[0].is_last);
    assert_eq!(chunks[0].kind, ChunkKind::Speech);
    assert_eq!(calls.len(), 0);
    assert_eq!(tts.state(), OrchestratorState::Done);
}

/// Clause ids carry the Piper framing and the terminator symbol
#[test]
fn test_clause_framing() {
    let (mut tts, calls) = orchestrator(10);
    collect(tts.synthesize("ab. ba?", &silence(0.0)).unwrap());

    assert_eq!(calls.ids(0), vec![1, 0, 10, 0, 11, 0, 4, 0, 2]);
    assert_eq!(calls.ids(1), vec![1, 0, 11, 0, 10, 0, 7, 0, 2]);
}

/// A clause with no phonemes still gets a speech slot and its gaps
#[test]
fn test_empty_clause_keeps_gaps() {
    let (mut tts, calls) = orchestrator(10);
    let chunks = collect(tts.synthesize("one. ! two.", &silence(0.01)).unwrap());

    let kinds: Vec<ChunkKind> = chunks.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ChunkKind::Speech,
            ChunkKind::Silence,
            ChunkKind::Speech,
            ChunkKind::Silence,
            ChunkKind::Speech,
        ]
    );
    assert!(chunks[2].is_empty());
    assert_eq!(calls.len(), 2);
}

/// Unknown phonemes abort the call by default
#[test]
fn test_unknown_phoneme_aborts() {
    let (mut tts, calls) = orchestrator(10);
    let mut stream = tts.synthesize("жa.", &silence(0.0)).unwrap();

    match stream.next() {
        Some(Err(TtsError::UnknownPhoneme { phoneme, clause, position })) => {
            assert_eq!(phoneme, "ж");
            assert_eq!(clause, 0);
            assert_eq!(position, 0);
        }
        other => panic!("expected unknown phoneme error, got {:?}", other.map(|r| r.map(|c| c.index))),
    }
    assert!(stream.next().is_none());
    drop(stream);

    assert_eq!(tts.state(), OrchestratorState::Failed);
    assert_eq!(calls.len(), 0);
}

/// The skip policy drops unknown phonemes and counts them
#[test]
fn test_unknown_phoneme_skip() {
    let (runtime, calls) = ConstRuntime::new(10);
    let mut tts = SynthesisOrchestrator::new(voice(1), TextPhonemeEngine::new(), runtime)
        .with_policy(UnknownPhonemePolicy::Skip);

    let chunks = collect(tts.synthesize("жa.", &silence(0.0)).unwrap());
    assert_eq!(chunks.len(), 1);
    assert_eq!(calls.ids(0), vec![1, 0, 10, 0, 4, 0, 2]);
    assert_eq!(tts.stats().unknown_phonemes, 1);
}

/// Log output captured from a closure
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn logged<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (out, text)
}

/// Mapping stays silent; the orchestrator reports unknown phonemes
#[test]
fn test_unknown_phoneme_logged_by_orchestrator() {
    let mut bridge = PhonemeBridge::new(TextPhonemeEngine::new());
    let clause = ClauseSegmenter::new(bridge.phonemize("жa.", "en-us").unwrap())
        .next()
        .unwrap()
        .unwrap();
    let mapper = VocabularyMapper::new(UnknownPhonemePolicy::Skip);
    let (mapped, mapper_log) = logged(|| mapper.map_clause(&clause, &vocabulary()).unwrap());
    assert_eq!(mapped.unknown.len(), 1);
    assert!(mapper_log.is_empty(), "{}", mapper_log);

    let (runtime, _) = ConstRuntime::new(10);
    let mut tts = SynthesisOrchestrator::new(voice(1), TextPhonemeEngine::new(), runtime)
        .with_policy(UnknownPhonemePolicy::Skip);
    let (chunks, log) = logged(|| collect(tts.synthesize("жa.", &silence(0.0)).unwrap()));
    assert_eq!(chunks.len(), 1);
    let warnings: Vec<&str> = log.lines().filter(|l| l.contains("WARN")).collect();
    assert_eq!(warnings.len(), 1, "{}", log);
    assert!(warnings[0].contains("Unknown phoneme"));
}

/// Cancelling drops the pending silence and stops before the next clause
#[test]
fn test_cancel_between_clauses() {
    let (mut tts, calls) = orchestrator(10);
    let cancel = CancellationToken::new();
    let mut stream = tts
        .synthesize_with_cancel("one. two. three.", &silence(0.1), cancel.clone())
        .unwrap();

    let first = stream.next().unwrap().unwrap();
    assert!(!first.is_last);
    cancel.cancel();
    assert!(stream.next().is_none());
    assert!(stream.next().is_none());
    drop(stream);

    assert_eq!(tts.state(), OrchestratorState::Cancelled);
    assert_eq!(tts.stats().total_chunks, 1);
    assert_eq!(calls.len(), 1);
}

/// A runtime failure ends the stream after the chunks already produced
#[test]
fn test_runtime_failure_mid_stream() {
    let (mut runtime, calls) = ConstRuntime::new(10);
    runtime.fail_on_call = Some(2);
    let mut tts = SynthesisOrchestrator::new(voice(1), TextPhonemeEngine::new(), runtime);

    let items: Vec<_> = tts.synthesize("one. two. three.", &silence(0.0)).unwrap().collect();
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    match &items[1] {
        Err(TtsError::Synthesis { stage, .. }) => assert_eq!(*stage, InferenceStage::ForwardPass),
        other => panic!("expected synthesis error, got ok={}", other.is_ok()),
    }
    assert_eq!(calls.len(), 2);
    assert_eq!(tts.state(), OrchestratorState::Failed);
}

/// A wrong sample rate from the runtime is reported, not resampled
#[test]
fn test_sample_rate_mismatch() {
    let (mut runtime, _) = ConstRuntime::new(10);
    runtime.sample_rate = 22050;
    let mut tts = SynthesisOrchestrator::new(voice(1), TextPhonemeEngine::new(), runtime);

    let items: Vec<_> = tts.synthesize("one.", &silence(0.0)).unwrap().collect();
    assert!(matches!(
        items[0],
        Err(TtsError::Synthesis {
            stage: InferenceStage::Unmarshalling,
            ..
        })
    ));
}

/// Invalid settings are rejected before any audio
#[test]
fn test_invalid_call_rejected_up_front() {
    let (mut tts, calls) = orchestrator(10);

    assert!(matches!(
        SynthesisConfig::builder().length_scale(0.0).build(),
        Err(TtsError::Configuration { .. })
    ));
    assert!(serde_yaml::from_str::<SynthesisConfig>(
        "length_scale: -1.0\nnoise_scale: -2.0\nnoise_w_scale: 0.8\n"
    )
    .is_err());

    // Built without a voice, so the speaker is only checked by the call
    let wrong_speaker = SynthesisConfig::builder().speaker(3).build().unwrap();
    assert!(matches!(
        tts.synthesize("hello.", &wrong_speaker),
        Err(TtsError::Configuration { .. })
    ));

    assert_eq!(tts.state(), OrchestratorState::Failed);
    assert_eq!(calls.len(), 0);
}

/// Unsupported locales fail when the call starts
#[test]
fn test_unsupported_locale() {
    let (runtime, _) = ConstRuntime::new(10);
    let mut tts = SynthesisOrchestrator::new(voice(1), TextPhonemeEngine::with_locales(["en-us"]), runtime)
        .with_locale("de");

    let err = tts.synthesize("hallo.", &SynthesisConfig::default()).err().unwrap();
    assert!(matches!(err, TtsError::Configuration { .. }));
}

/// Multi-speaker voices pass the speaker id to the model
#[test]
fn test_multi_speaker_sid() {
    let (runtime, calls) = ConstRuntime::new(10);
    let voice = voice(3);
    let mut tts = SynthesisOrchestrator::new(voice.clone(), TextPhonemeEngine::new(), runtime);

    let config = SynthesisConfig::builder_for(&voice).speaker(2).build().unwrap();
    collect(tts.synthesize("hi.", &config).unwrap());
    collect(tts.synthesize("hi.", &SynthesisConfig::default()).unwrap());

    assert_eq!(calls.speaker(0), Some(2));
    assert_eq!(calls.speaker(1), Some(0));
}

/// Volume is applied before quantization and clipped
#[test]
fn test_volume_clipping() {
    let (mut runtime, _) = ConstRuntime::new(4);
    runtime.amplitude = -0.75;
    let mut tts = SynthesisOrchestrator::new(voice(1), TextPhonemeEngine::new(), runtime);

    let loud = SynthesisConfig::builder().volume(2.0).build().unwrap();
    let chunks = collect(tts.synthesize("a.", &loud).unwrap());
    assert_eq!(chunks[0].samples(), vec![-32768; 4]);

    let quiet = SynthesisConfig::builder().volume(0.0).build().unwrap();
    let chunks = collect(tts.synthesize("a.", &quiet).unwrap());
    assert_eq!(chunks[0].samples(), vec![0; 4]);
}

/// Streaming WAV: placeholder sizes, then every PCM byte in order
#[test]
fn test_wav_streaming_sink() {
    let (mut tts, _) = orchestrator(50);
    let stream = tts.synthesize("one. two.", &silence(0.01)).unwrap();
    let bytes = WavStreamEncoder::streaming(stream, RATE).encode_to_vec().unwrap();

    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), UNKNOWN_SIZE);
    assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), UNKNOWN_SIZE);
    assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), RATE);
    assert_eq!(bytes.len(), WAV_HEADER_LEN + (50 + 160 + 50) * 2);
}

/// Buffered WAV: exact sizes
#[test]
fn test_wav_buffered_sink() {
    let (mut tts, _) = orchestrator(50);
    let stream = tts.synthesize("one. two.", &silence(0.0)).unwrap();
    let bytes = WavStreamEncoder::buffered(stream, RATE).encode_to_vec().unwrap();

    assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 200);
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 236);
    assert_eq!(bytes.len(), WAV_HEADER_LEN + 200);
}

/// WAV file sink round trip through hound
#[test]
fn test_save_wav_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.wav");

    let (mut tts, _) = orchestrator(30);
    let stream = tts.synthesize("one. two. three.", &silence(0.001)).unwrap();
    let summary = AudioOutput::save_wav(stream, RATE, &path).unwrap();
    assert_eq!(summary.chunks, 5);

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, RATE);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len() as usize, summary.samples);
    assert_eq!(summary.samples, 30 * 3 + 16 * 2);
}

/// Raw PCM sink writes the chunks back to back
#[test]
fn test_raw_sink() {
    let (mut tts, _) = orchestrator(8);
    let stream = tts.synthesize("a. b.", &silence(0.0)).unwrap();
    let mut out = Vec::new();
    let summary = AudioOutput::write_raw(stream, &mut out).unwrap();

    assert_eq!(summary.chunks, 2);
    assert_eq!(out.len(), 32);
    // 0.5 * 32767 rounded
    assert_eq!(i16::from_le_bytes([out[0], out[1]]), 16384);
}

/// Worker-thread synthesis delivers the same chunks in order
#[test]
fn test_spawned_synthesis() {
    let (tts, calls) = orchestrator(20);
    let handle = spawn_synthesis(tts, "one. two. three.", silence(0.01));

    let mut iter = handle.into_iter();
    let chunks = collect(iter.by_ref());
    assert_eq!(chunks.len(), 5);
    assert!(chunks[4].is_last);
    assert!(iter.handle().is_finished());
    assert_eq!(iter.handle().stats().total_chunks, 5);

    let tts = iter.finish().unwrap();
    assert_eq!(tts.state(), OrchestratorState::Done);
    assert_eq!(calls.len(), 3);
}

/// Runtime whose forward pass panics
struct PanickingRuntime;

impl VoiceRuntime for PanickingRuntime {
    fn name(&self) -> &str {
        "panicking"
    }

    fn run(&mut self, _inputs: &ModelInputs) -> anyhow::Result<RuntimeOutput> {
        panic!("kernel fault")
    }
}

/// A worker that dies is reported as an internal fault, not a model error
#[test]
fn test_spawned_synthesis_worker_panic() {
    let tts = SynthesisOrchestrator::new(voice(1), TextPhonemeEngine::new(), PanickingRuntime);
    let mut handle = spawn_synthesis(tts, "one. two.", silence(0.0));

    assert!(handle.next_chunk().is_none());
    assert!(handle.is_finished());

    match handle.finish() {
        Err(TtsError::Internal { message, location }) => {
            assert!(message.contains("kernel fault"));
            assert_eq!(location.as_deref(), Some("synthesis worker"));
        }
        other => panic!("expected internal error, got {:?}", other.err()),
    }
}

/// Cancelling a spawned call stops it at a clause boundary
#[test]
fn test_spawned_synthesis_cancel() {
    let (tts, _) = orchestrator(20);
    let text = "one. two. three. four. five. six. seven. eight. nine. ten.";
    let mut handle = spawn_synthesis(tts, text, silence(0.01));

    let first = handle.next_chunk().unwrap().unwrap();
    assert_eq!(first.index, 0);
    handle.cancel();

    let tts = handle.finish().unwrap();
    assert_eq!(tts.state(), OrchestratorState::Cancelled);
    assert!(tts.stats().total_chunks < 19);
}

/// Environment settings flow into the call configuration
#[test]
fn test_settings_to_config() {
    let vars = [
        ("PIPER_MODEL", "voice.onnx"),
        ("PIPER_LENGTH_SCALE", "1.5"),
        ("PIPER_SENTENCE_SILENCE", "0.25"),
        ("PIPER_CUDA", "True"),
    ];
    let settings = SynthesisSettings::from_env_with(|name| {
        vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    })
    .unwrap();

    let config = settings.to_config(&voice(1)).unwrap();
    assert_eq!(config.length_scale(), 1.5);
    assert_eq!(config.noise_scale(), 0.667);
    assert_eq!(config.sentence_silence(), 0.25);
    assert!(config.use_accelerated_backend());
    assert_eq!(config.speaker(), None);
}
