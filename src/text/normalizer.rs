//! Text cleaning
//!
//! Prepares raw input text before it reaches the phonemizer:
//! - Glossary-based replacements
//! - Link removal (`http://`, `https://`, `www.`)
//! - Emoji removal
//! - Zero-width non-joiner to space
//! - Whitespace normalization

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://|www\.)[^\s]+").expect("link pattern is a valid regex")
});

/// Emoji and pictograph code point ranges
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F), // emoticons
    (0x1F300, 0x1F5FF), // symbols & pictographs
    (0x1F680, 0x1F6FF), // transport & map
    (0x1F700, 0x1F77F), // alchemical
    (0x1F780, 0x1F7FF), // geometric shapes extended
    (0x1F800, 0x1F8FF), // supplemental arrows-c
    (0x1F900, 0x1F9FF), // supplemental symbols & pictographs
    (0x1FA00, 0x1FAFF), // chess, symbols & pictographs extended-a
    (0x1F1E6, 0x1F1FF), // regional indicators
    (0x2600, 0x26FF),   // misc symbols
    (0x2700, 0x27BF),   // dingbats
    (0x2B50, 0x2B55),   // stars and circles
];

const ZERO_WIDTH_NON_JOINER: char = '\u{200C}';

fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

/// Cleans input text for phonemization
#[derive(Debug, Clone)]
pub struct TextCleaner {
    /// Glossary for custom term replacements
    glossary: HashMap<String, String>,
    /// Whether glossary is enabled
    enable_glossary: bool,
    /// Whether links are stripped
    strip_links: bool,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TextCleaner {
    /// Create a new TextCleaner
    pub fn new(enable_glossary: bool) -> Self {
        Self {
            glossary: HashMap::new(),
            enable_glossary,
            strip_links: true,
        }
    }

    /// Keep links in the text
    pub fn keep_links(mut self) -> Self {
        self.strip_links = false;
        self
    }

    /// Add a single glossary entry
    pub fn with_entry(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.glossary.insert(from.into(), to.into());
        self.enable_glossary = true;
        self
    }

    /// Load glossary from a YAML file
    pub fn load_glossary<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read glossary: {}", path.display()))?;
        let glossary: HashMap<String, String> = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse glossary: {}", path.display()))?;
        self.glossary = glossary;
        self.enable_glossary = true;
        Ok(())
    }

    /// Number of glossary entries
    pub fn glossary_len(&self) -> usize {
        self.glossary.len()
    }

    /// Clean input text
    pub fn clean(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.enable_glossary {
            // Longest keys first so overlapping entries resolve deterministically
            let mut entries: Vec<_> = self.glossary.iter().collect();
            entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
            for (from, to) in entries {
                result = result.replace(from.as_str(), to);
            }
        }

        if self.strip_links {
            result = LINK_PATTERN.replace_all(&result, "").into_owned();
        }

        result = result
            .chars()
            .filter(|c| !is_emoji(*c))
            .map(|c| if c == ZERO_WIDTH_NON_JOINER { ' ' } else { c })
            .collect();

        self.normalize_whitespace(&result)
    }

    /// Collapse whitespace runs to one space and trim
    fn normalize_whitespace(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut prev_was_space = true;

        for c in text.chars() {
            if c.is_whitespace() {
                if !prev_was_space {
                    result.push(' ');
                    prev_was_space = true;
                }
            } else {
                result.push(c);
                prev_was_space = false;
            }
        }

        if result.ends_with(' ') {
            result.pop();
        }

        result
    }
}
