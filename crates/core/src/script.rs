//! Binary Latin/Japanese script tagging.
//!
//! A line is "japanese" as soon as one of its characters is a CJK unified
//! ideograph, hiragana or katakana (the characters whose Unicode names contain
//! `CJK UNIFIED`, `HIRAGANA` or `KATAKANA`). Everything else is "latin". This
//! is a feature for the classifier, not language identification.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Japanese,
}

impl Script {
    pub fn as_str(&self) -> &'static str {
        match self {
            Script::Latin => "latin",
            Script::Japanese => "japanese",
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `text` by its first Japanese-named character, if any.
pub fn detect_script(text: &str) -> Script {
    if text.chars().any(is_japanese_named_char) {
        Script::Japanese
    } else {
        Script::Latin
    }
}

/// `true` for code points whose Unicode character name contains
/// `CJK UNIFIED`, `HIRAGANA` or `KATAKANA`.
pub fn is_japanese_named_char(c: char) -> bool {
    matches!(
        c as u32,
        // CJK Unified Ideographs and extensions A..I
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2EE5F
        | 0x30000..=0x323AF
        // Hiragana, including the combining voiced sound marks
        | 0x3041..=0x3096
        | 0x3099..=0x309F
        // Katakana and Katakana Phonetic Extensions
        | 0x30A0..=0x30FF
        | 0x31F0..=0x31FF
        // CIRCLED KATAKANA A..WO
        | 0x32D0..=0x32FE
        // HALFWIDTH KATAKANA ...
        | 0xFF65..=0xFF9F
        // Kana Extended-B
        | 0x1AFF0..=0x1AFFF
        // Archaic and small kana; HENTAIGANA LETTERs in between are neither
        | 0x1B000..=0x1B001
        | 0x1B11F..=0x1B122
        | 0x1B132
        | 0x1B150..=0x1B152
        | 0x1B155
        | 0x1B164..=0x1B167
        // SQUARE HIRAGANA HOKA, SQUARED KATAKANA KOKO / SA
        | 0x1F200..=0x1F202
    )
}
