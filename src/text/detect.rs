//! Language type and heuristic Spanish/Kichwa detection.
//!
//! Detection is a cheap character-and-word heuristic, not a statistical
//! classifier. With no signal at all it answers Spanish.

use super::{normalize, tokenize};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One of the two languages of the lexicon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "qu")]
    Kichwa,
}

impl Language {
    /// Parse a language code such as `es`, `es-EC`, `qu` or `qu-EC`.
    ///
    /// Regional variants are accepted by prefix, so `es-ES` is Spanish.
    ///
    /// # Example
    /// ```ignore
    /// let kichwa = Language::from_code("qu-EC")?;
    /// ```
    pub fn from_code(code: &str) -> Result<Language> {
        let code = code.trim().to_lowercase();
        if code.starts_with("es") {
            Ok(Language::Spanish)
        } else if code.starts_with("qu") {
            Ok(Language::Kichwa)
        } else {
            bail!("Unknown language code: '{}'", code)
        }
    }

    /// Parse a source selection where `auto` (or an empty code) means "detect".
    pub fn from_selection(code: &str) -> Result<Option<Language>> {
        match code.trim() {
            "" | "auto" => Ok(None),
            other => Language::from_code(other).map(Some),
        }
    }

    /// ISO 639 code used on the wire and by external translators.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::Kichwa => "qu",
        }
    }

    /// English name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Spanish => "Spanish",
            Language::Kichwa => "Kichwa",
        }
    }

    /// The other language of the pair.
    pub fn opposite(&self) -> Language {
        match self {
            Language::Spanish => Language::Kichwa,
            Language::Kichwa => Language::Spanish,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of [`detect`]: the decision plus both raw scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub language: Language,
    pub score_qu: f64,
    pub score_es: f64,
}

/// Letters that hint at Kichwa orthography. `s` and `h` are counted
/// separately, so the `sh` of `mashi` scores twice.
const KICHWA_HINT_CHARS: &[char] = &['k', 'q', 's', 'h', 'ñ'];

/// Vowels with an acute accent only appear in Spanish orthography
const SPANISH_HINT_CHARS: &[char] = &['á', 'é', 'í', 'ó', 'ú'];

/// Frequent Kichwa words
const KICHWA_COMMON_TOKENS: &[&str] = &[
    "ñuka",
    "kan",
    "pay",
    "kanka",
    "mashi",
    "alli",
    "shuk",
    "wasi",
    "yachay",
    "mikuy",
    "kawsay",
    "kawsankichu",
    "rimay",
    "mikhuna",
    "yakuk",
];

/// Score text as Spanish or Kichwa.
///
/// `score_qu = hints + 2 * common words` and `score_es = accented vowels`.
/// Kichwa wins when `score_qu >= max(1.0, score_es)`; the 1.0 floor is the
/// tie-break that makes signal-free text Spanish.
pub fn detect(text: &str) -> Detection {
    if text.trim().is_empty() {
        return Detection {
            language: Language::Spanish,
            score_qu: 0.0,
            score_es: 0.0,
        };
    }

    let normalized = normalize(text);
    let hints_qu = normalized
        .chars()
        .filter(|c| KICHWA_HINT_CHARS.contains(c))
        .count();

    // Accents are gone after normalization, so count them on the raw text.
    let hints_es = text
        .to_lowercase()
        .chars()
        .filter(|c| SPANISH_HINT_CHARS.contains(c))
        .count();

    let tokens: HashSet<String> = tokenize(&normalized).into_iter().collect();
    let common_qu = KICHWA_COMMON_TOKENS
        .iter()
        .filter(|word| tokens.contains(**word))
        .count();

    let score_qu = hints_qu as f64 + common_qu as f64 * 2.0;
    let score_es = hints_es as f64;
    let language = if score_qu >= score_es.max(1.0) {
        Language::Kichwa
    } else {
        Language::Spanish
    };

    Detection {
        language,
        score_qu,
        score_es,
    }
}
