//! Lexicon matching heuristics.
//!
//! Both directions work on a snapshot handed in by the caller and never touch
//! the store. They always return normalized text; callers detect a match by
//! comparing the output with `normalize(input)`.
//!
//! Spanish to Kichwa is a greedy substring rewrite, longest key first. Text
//! injected by an earlier replacement can be matched again by a later,
//! shorter key. That is an accepted trade-off of the heuristic.

use crate::store::Lexicon;
use crate::text::{normalize, tokenize};
use std::collections::HashMap;

/// Rewrite Spanish text with Kichwa values, longest phrase first.
///
/// Keys are tried in descending order of normalized length (ties broken by
/// key) so `casa grande` wins over `casa`. Every occurrence of a key found in
/// the working text is replaced before the next key is tried.
pub fn best_match(lexicon: &Lexicon, text: &str) -> String {
    let working = normalize(text);
    if working.is_empty() {
        return working;
    }

    let mut by_key: HashMap<String, &str> = HashMap::with_capacity(lexicon.len());
    for (spanish, kichwa) in lexicon {
        let key = normalize(spanish);
        if !key.is_empty() {
            by_key.insert(key, kichwa);
        }
    }

    let mut keys: Vec<&String> = by_key.keys().collect();
    keys.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });

    let mut out = working;
    for key in keys {
        if out.contains(key.as_str()) {
            out = out.replace(key.as_str(), &normalize(by_key[key]));
        }
    }
    out
}

/// Rewrite Kichwa text token by token with Spanish keys.
///
/// The reverse map is keyed by normalized Kichwa value; when two Spanish keys
/// share a value the last one in lexicon order wins. Tokens without an exact
/// match are kept as they are.
pub fn reverse_match(lexicon: &Lexicon, text: &str) -> String {
    let reverse: HashMap<String, &str> = lexicon
        .iter()
        .map(|(spanish, kichwa)| (normalize(kichwa), spanish.as_str()))
        .collect();

    tokenize(text)
        .into_iter()
        .map(|token| match reverse.get(&token) {
            Some(spanish) => (*spanish).to_string(),
            None => token,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon(pairs: &[(&str, &str)]) -> Lexicon {
        pairs
            .iter()
            .map(|(es, qu)| (es.to_string(), qu.to_string()))
            .collect()
    }

    // ==================== Spanish to Kichwa Tests ====================

    #[test]
    fn test_best_match_substitutes_word() {
        let lex = lexicon(&[("casa", "wasi")]);
        assert_eq!(best_match(&lex, "mi casa es grande"), "mi wasi es grande");
    }

    #[test]
    fn test_best_match_normalizes_rest_of_text() {
        let lex = lexicon(&[("casa", "wasi")]);
        assert_eq!(best_match(&lex, "Mi CASA está aquí"), "mi wasi esta aqui");
    }

    #[test]
    fn test_best_match_longest_phrase_wins() {
        let lex = lexicon(&[("casa", "wasi"), ("casa grande", "wasi hatun")]);
        assert_eq!(best_match(&lex, "casa grande"), "wasi hatun");
    }

    #[test]
    fn test_best_match_replaces_all_occurrences() {
        let lex = lexicon(&[("casa", "wasi")]);
        assert_eq!(best_match(&lex, "casa y casa"), "wasi y wasi");
    }

    #[test]
    fn test_best_match_normalizes_keys_and_values() {
        let lex = lexicon(&[("Canción", "Taki")]);
        assert_eq!(best_match(&lex, "una cancion"), "una taki");
    }

    #[test]
    fn test_best_match_no_match_returns_normalized_input() {
        let lex = lexicon(&[("perro", "allku")]);
        let input = "Mi Casa";
        assert_eq!(best_match(&lex, input), normalize(input));
    }

    #[test]
    fn test_best_match_rescans_injected_text() {
        // "agua" becomes "yaku", which "yaku" then rewrites again
        let lex = lexicon(&[("agua", "yaku"), ("yaku", "x")]);
        assert_eq!(best_match(&lex, "agua"), "x");
    }

    #[test]
    fn test_best_match_empty_inputs() {
        assert_eq!(best_match(&Lexicon::new(), "hola"), "hola");
        assert_eq!(best_match(&lexicon(&[("casa", "wasi")]), "   "), "");
    }

    // ==================== Kichwa to Spanish Tests ====================

    #[test]
    fn test_reverse_match_substitutes_tokens() {
        let lex = lexicon(&[("casa", "wasi"), ("yo", "ñuka")]);
        let out = reverse_match(&lex, "Ñuka wasi");
        assert!(out.starts_with("yo"));
        assert!(out.contains("casa"));
    }

    #[test]
    fn test_reverse_match_keeps_unknown_tokens() {
        let lex = lexicon(&[("casa", "wasi")]);
        assert_eq!(reverse_match(&lex, "allpa wasi"), "allpa casa");
    }

    #[test]
    fn test_reverse_match_recovers_root_from_suffix() {
        let lex = lexicon(&[("bueno", "alli")]);
        assert_eq!(reverse_match(&lex, "allimi"), "allimi bueno");
    }

    #[test]
    fn test_reverse_match_last_writer_wins_on_shared_value() {
        // BTreeMap order: "hogar" comes after "casa"
        let lex = lexicon(&[("casa", "wasi"), ("hogar", "wasi")]);
        assert_eq!(reverse_match(&lex, "wasi"), "hogar");
    }

    #[test]
    fn test_reverse_match_empty_text() {
        assert_eq!(reverse_match(&lexicon(&[("casa", "wasi")]), ""), "");
    }
}
