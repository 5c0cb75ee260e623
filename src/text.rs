//! Input canonicalization and tone detection.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Words that mark the user as sad or stressed.
const SADNESS_WORDS: &[&str] = &["sad", "down", "depressed", "upset", "anxious", "stress"];

/// Words that mark the user as joking around.
const HUMOR_WORDS: &[&str] = &["joke", "roast", "funny", "meme", "lol"];

/// Canonicalize raw input for robust pattern matching.
///
/// Applies NFC unicode normalization, folds curly quotes and backticks to
/// straight apostrophes, lowercases, replaces anything that is not a
/// letter/digit/whitespace/apostrophe with a space, collapses runs of
/// whitespace, and trims. Idempotent.
pub fn normalize_text(raw: &str) -> String {
    let recomposed: String = raw.nfc().collect();

    let mut out = String::with_capacity(recomposed.len());
    let mut last_was_space = true; // drops leading whitespace
    for ch in recomposed.chars() {
        let ch = match ch {
            '\u{2018}' | '\u{2019}' | '`' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        };
        if ch.is_alphanumeric() || ch == '\'' {
            for lowered in ch.to_lowercase() {
                out.push(lowered);
            }
            last_was_space = false;
        } else if !last_was_space {
            // Punctuation and whitespace both collapse to a single space
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Coarse tone classification used to steer replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Supportive,
    Playful,
    Formal,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tone::Supportive => "supportive",
            Tone::Playful => "playful",
            Tone::Formal => "formal",
        };
        write!(f, "{}", label)
    }
}

/// Classify the raw message by keyword membership. Sadness words win over
/// humor words; everything else is formal.
pub fn detect_tone(raw: &str) -> Tone {
    let lowered = raw.to_lowercase();
    if SADNESS_WORDS.iter().any(|w| lowered.contains(w)) {
        return Tone::Supportive;
    }
    if HUMOR_WORDS.iter().any(|w| lowered.contains(w)) {
        return Tone::Playful;
    }
    Tone::Formal
}

/// The trailing `limit` characters of `s`, sliced on a char boundary.
pub fn tail_chars(s: &str, limit: usize) -> &str {
    let count = s.chars().count();
    if count <= limit {
        return s;
    }
    let start = s
        .char_indices()
        .nth(count - limit)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}
