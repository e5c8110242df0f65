//! Phonemization engines
//!
//! The grapheme-to-phoneme work is owned by an external engine. The pipeline
//! talks to it through [`PhonemeEngine`]: activate a locale, start on a text,
//! then pull raw units (phonemes plus the punctuation that trailed them) one at
//! a time.
//!
//! Two engines are provided:
//! - [`TextPhonemeEngine`]: graphemes are the phonemes (voices trained with
//!   `phoneme_type: text`)
//! - [`EspeakCommandEngine`]: IPA from the `espeak-ng` command-line tool

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};

use crate::core::error::{Result, TtsError};
use crate::voice::PhonemeType;

/// Punctuation that may close a clause
const CLAUSE_PUNCTUATION: &[char] = &[
    ',', '!', ':', '?', ';', '.', '，', '！', '：', '？', '；', '。', '、', '…', '⋯', '·', '‥',
    '—',
];

/// Punctuation that does not break between two alphanumerics (3.5, 10:30, 1,000, l·l)
const INFIX_PUNCTUATION: &[char] = &['.', ',', ':', '·'];

/// One unit as reported by an engine, before terminator classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPhonemeUnit {
    /// Phoneme string for the unit
    pub phonemes: String,
    /// Raw punctuation run that followed the unit (may be empty)
    pub punctuation: String,
}

impl RawPhonemeUnit {
    pub fn new(phonemes: impl Into<String>, punctuation: impl Into<String>) -> Self {
        Self {
            phonemes: phonemes.into(),
            punctuation: punctuation.into(),
        }
    }
}

/// Capability interface of an external phonemization engine.
///
/// Engines are stateful: `begin` resets the unit cursor, `next_unit` advances
/// it. A `None` from `next_unit` ends the text.
pub trait PhonemeEngine: Send {
    /// Engine name for logs and errors
    fn name(&self) -> &str;

    /// Activate a locale. Unsupported locales are a configuration error.
    fn set_locale(&mut self, locale: &str) -> Result<()>;

    /// Start phonemizing a new text
    fn begin(&mut self, text: &str) -> anyhow::Result<()>;

    /// Produce the next unit
    fn next_unit(&mut self) -> anyhow::Result<Option<RawPhonemeUnit>>;
}

impl<E: PhonemeEngine + ?Sized> PhonemeEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn set_locale(&mut self, locale: &str) -> Result<()> {
        (**self).set_locale(locale)
    }

    fn begin(&mut self, text: &str) -> anyhow::Result<()> {
        (**self).begin(text)
    }

    fn next_unit(&mut self) -> anyhow::Result<Option<RawPhonemeUnit>> {
        (**self).next_unit()
    }
}

/// Create the engine matching a voice's phoneme type
pub fn create_engine(phoneme_type: PhonemeType) -> Result<Box<dyn PhonemeEngine>> {
    match phoneme_type {
        PhonemeType::Text => Ok(Box::new(TextPhonemeEngine::new())),
        PhonemeType::Espeak => {
            let engine = EspeakCommandEngine::detect().map_err(|e| TtsError::Configuration {
                message: format!("{:#}", e),
                field: Some("phoneme_type".to_string()),
            })?;
            Ok(Box::new(engine))
        }
    }
}

/// Split text into clause units at runs of clause punctuation.
///
/// The text before each run is trimmed and becomes the unit's phonemes; the
/// run becomes the unit's punctuation (see [`collapse_run`]). Trailing text
/// without punctuation forms a final unit with empty punctuation.
pub fn split_clauses(text: &str) -> Vec<RawPhonemeUnit> {
    let chars: Vec<char> = text.chars().collect();
    let mut units = Vec::new();
    let mut pending = String::new();
    let mut i = 0;

    while i < chars.len() {
        if is_clause_break(&chars, i) {
            let mut run = String::new();
            while i < chars.len() && is_clause_break(&chars, i) {
                run.push(chars[i]);
                i += 1;
            }
            units.push(RawPhonemeUnit::new(pending.trim(), collapse_run(&run)));
            pending.clear();
        } else {
            pending.push(chars[i]);
            i += 1;
        }
    }

    let rest = pending.trim();
    if !rest.is_empty() {
        units.push(RawPhonemeUnit::new(rest, ""));
    }

    units
}

/// Dot runs (`...`, `……`) are kept whole; any other run such as `?!` or `!!!`
/// closes the clause with its first mark.
fn collapse_run(run: &str) -> String {
    let dotted = run.chars().all(|c| matches!(c, '.' | '…' | '⋯' | '·' | '‥'));
    if dotted {
        return run.to_string();
    }
    run.chars().next().map(String::from).unwrap_or_default()
}

fn is_clause_break(chars: &[char], i: usize) -> bool {
    let c = chars[i];
    if !CLAUSE_PUNCTUATION.contains(&c) {
        return false;
    }
    if INFIX_PUNCTUATION.contains(&c) && i > 0 {
        if let Some(next) = chars.get(i + 1) {
            if chars[i - 1].is_alphanumeric() && next.is_alphanumeric() {
                return false;
            }
        }
    }
    true
}

/// Check a locale tag is well formed (`en`, `en-us`, `cmn`, `pt_BR`, `zh-yue`)
pub fn is_well_formed_locale(locale: &str) -> bool {
    let mut parts = locale.split(['-', '_']);
    let primary = match parts.next() {
        Some(p) => p,
        None => return false,
    };
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Engine whose phonemes are the graphemes of the text itself
#[derive(Debug, Clone, Default)]
pub struct TextPhonemeEngine {
    /// Accepted locales (None = any well-formed tag)
    allowed: Option<Vec<String>>,
    /// Active locale
    locale: Option<String>,
    /// Units of the current text
    queue: VecDeque<RawPhonemeUnit>,
}

impl TextPhonemeEngine {
    /// Create an engine accepting any well-formed locale
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the engine to an explicit set of locales
    pub fn with_locales<I, S>(locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(
                locales
                    .into_iter()
                    .map(|l| l.into().to_ascii_lowercase())
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Currently active locale
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}

impl PhonemeEngine for TextPhonemeEngine {
    fn name(&self) -> &str {
        "text"
    }

    fn set_locale(&mut self, locale: &str) -> Result<()> {
        let normalized = locale.trim().to_ascii_lowercase();
        let supported = match &self.allowed {
            Some(allowed) => allowed.iter().any(|l| *l == normalized),
            None => is_well_formed_locale(&normalized),
        };
        if !supported {
            return Err(TtsError::config(
                "locale",
                format!("Unsupported locale '{}' for text phonemes", locale),
            ));
        }
        self.locale = Some(normalized);
        Ok(())
    }

    fn begin(&mut self, text: &str) -> anyhow::Result<()> {
        if self.locale.is_none() {
            bail!("no locale selected");
        }
        self.queue = split_clauses(text).into();
        Ok(())
    }

    fn next_unit(&mut self) -> anyhow::Result<Option<RawPhonemeUnit>> {
        Ok(self.queue.pop_front())
    }
}

/// Engine that converts clause text to IPA with the `espeak-ng` program
#[derive(Debug, Clone)]
pub struct EspeakCommandEngine {
    /// Program to run (`espeak-ng` or `espeak`)
    program: String,
    /// espeak-ng-data directory (`--path`)
    data_path: Option<PathBuf>,
    /// Active voice
    voice: Option<String>,
    /// Cached `--voices` listing
    known_voices: Option<Vec<String>>,
    /// Units of the current text, not yet converted
    queue: VecDeque<RawPhonemeUnit>,
}

impl EspeakCommandEngine {
    /// Create an engine around the given program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            data_path: std::env::var_os("ESPEAK_DATA_PATH").map(PathBuf::from),
            voice: None,
            known_voices: None,
            queue: VecDeque::new(),
        }
    }

    /// Use an explicit espeak-ng-data directory
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Find `espeak-ng` (or `espeak`) on PATH
    pub fn detect() -> anyhow::Result<Self> {
        for program in ["espeak-ng", "espeak"] {
            let found = Command::new(program)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if found {
                return Ok(Self::new(program));
            }
        }
        bail!("no espeak phonemizer found on PATH (tried: espeak-ng, espeak)")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(path) = &self.data_path {
            cmd.arg(format!("--path={}", path.display()));
        }
        cmd
    }

    fn list_voices(&self) -> anyhow::Result<Vec<String>> {
        let output = self
            .command()
            .arg("--voices")
            .output()
            .with_context(|| format!("failed to execute '{}'", self.program))?;
        if !output.status.success() {
            bail!(
                "'{} --voices' failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    /// `-q --ipa -v <voice> -- <text>`; text starting with `-` stays text
    fn ipa_command(&self, voice: &str, text: &str) -> Command {
        let mut cmd = self.command();
        cmd.args(["-q", "--ipa", "-v", voice, "--"]).arg(text);
        cmd
    }

    fn to_ipa(&self, text: &str) -> anyhow::Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        let voice = self.voice.as_deref().context("no locale selected")?;
        let output = self
            .ipa_command(voice, text)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to execute phonemizer program '{}'", self.program))?;

        if !output.status.success() {
            bail!(
                "phonemizer '{}' failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8(output.stdout).context("phonemizer emitted non-utf8 output")?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

impl PhonemeEngine for EspeakCommandEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn set_locale(&mut self, locale: &str) -> Result<()> {
        if self.known_voices.is_none() {
            let voices = self.list_voices().map_err(|e| TtsError::Configuration {
                message: format!("{:#}", e),
                field: Some("locale".to_string()),
            })?;
            self.known_voices = Some(voices);
        }

        let normalized = locale.trim().to_ascii_lowercase();
        let known = self
            .known_voices
            .as_ref()
            .is_some_and(|voices| voices.iter().any(|v| *v == normalized));
        if !known {
            return Err(TtsError::config(
                "locale",
                format!("Unsupported locale '{}' for {}", locale, self.program),
            ));
        }

        self.voice = Some(normalized);
        Ok(())
    }

    fn begin(&mut self, text: &str) -> anyhow::Result<()> {
        if self.voice.is_none() {
            bail!("no locale selected");
        }
        self.queue = split_clauses(text).into();
        Ok(())
    }

    fn next_unit(&mut self) -> anyhow::Result<Option<RawPhonemeUnit>> {
        match self.queue.pop_front() {
            Some(unit) => {
                let phonemes = self.to_ipa(&unit.phonemes)?;
                Ok(Some(RawPhonemeUnit::new(phonemes, unit.punctuation)))
            }
            None => Ok(None),
        }
    }
}

/// Parse `espeak-ng --voices` output into lowercase language codes and voice file names
fn parse_voice_list(output: &str) -> Vec<String> {
    let mut voices = Vec::new();
    for line in output.lines().skip(1) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 5 {
            continue;
        }
        voices.push(cols[1].to_ascii_lowercase());
        if let Some(file) = cols[4].rsplit('/').next() {
            voices.push(file.to_ascii_lowercase());
        }
    }
    voices.sort();
    voices.dedup();
    voices
}
