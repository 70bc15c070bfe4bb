//! Text normalization: the comparison key shared by lexicon keys and input.
//!
//! Normalization lowercases, strips diacritics (but never the `ñ`), and
//! collapses hyphen-like separators so that `"Ñuka__wasi"`, `"ñuka-wasi"` and
//! `" ÑUKA·•WASI "` all compare equal.

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Runs of hyphen, underscore, middle dot and bullet
static DASH_RUNS: OnceLock<Regex> = OnceLock::new();

fn dash_runs() -> &'static Regex {
    DASH_RUNS.get_or_init(|| Regex::new(r"[-_·•]+").expect("dash pattern is valid"))
}

/// Remove diacritical marks while keeping `ñ`/`Ñ` intact.
///
/// Input is composed first so that a decomposed `n` + combining tilde is
/// recognised as `ñ` before the marks are dropped.
pub fn remove_diacritics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.nfc() {
        if ch == 'ñ' || ch == 'Ñ' {
            out.push(ch);
            continue;
        }
        out.extend(std::iter::once(ch).nfd().filter(|c| !is_combining_mark(*c)));
    }
    out.nfc().collect()
}

/// Canonicalize a token or phrase into its comparison key.
///
/// Total and idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(token: &str) -> String {
    let lowered = token.trim().to_lowercase();
    let stripped = remove_diacritics(&lowered);
    let collapsed = dash_runs().replace_all(&stripped, "-");
    collapsed
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}
