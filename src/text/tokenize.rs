//! Tokenization with heuristic Kichwa morpheme splitting.
//!
//! This is not a morphological analyzer: suffixes come from a fixed list and
//! are stripped whenever a token ends with one, so a suffixed form such as
//! `allimi` also yields the probable root `alli`.

use super::normalize;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Known Kichwa suffix morphemes, tried in this order.
pub const KICHWA_SUFFIXES: &[&str] = &[
    "-mi", "-m", "-shi", "-sh", "-ka", "-k", "-ta", "-n", "-pak", "-paj", "-sapa", "-kuna",
];

/// Anything that is not a letter, combining mark or hyphen separates tokens
static SEPARATORS: OnceLock<Regex> = OnceLock::new();

fn separators() -> &'static Regex {
    SEPARATORS.get_or_init(|| Regex::new(r"[^\p{L}\p{M}-]+").expect("separator pattern is valid"))
}

/// Split text into normalized tokens plus morpheme candidates.
///
/// Output is deduplicated and keeps first-occurrence order. For every token
/// the full form comes first, then its hyphen-delimited parts, then the bases
/// left after stripping each matching suffix.
pub fn tokenize(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let cleaned = separators().replace_all(text, " ");
    let mut candidates = Vec::new();

    for raw in cleaned.split_whitespace() {
        let token = normalize(raw);
        if token.is_empty() {
            continue;
        }

        let parts: Vec<String> = token
            .split('-')
            .filter(|part| !part.is_empty() && *part != token)
            .map(str::to_string)
            .collect();
        let bases = strip_suffixes(&token);

        candidates.push(token);
        candidates.extend(parts);
        candidates.extend(bases);
    }

    dedup_in_order(candidates)
}

/// Bases obtained by removing each listed suffix the token ends with.
fn strip_suffixes(token: &str) -> Vec<String> {
    KICHWA_SUFFIXES
        .iter()
        .filter_map(|suffix| {
            let suffix = suffix.trim_start_matches('-');
            let base = token.strip_suffix(suffix)?.trim_end_matches('-');
            (!base.is_empty()).then(|| base.to_string())
        })
        .collect()
}

fn dedup_in_order(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
