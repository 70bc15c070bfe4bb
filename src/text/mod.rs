//! Text processing for lexicon lookups.
//!
//! Everything here is a pure function over arbitrary strings: no I/O, no
//! shared state, safe to call from any number of threads.
//!
//! # Architecture
//!
//! - `normalize`: comparison key (case, diacritics except `ñ`, dash runs)
//! - `tokenize`: normalized tokens plus heuristic Kichwa morpheme candidates
//! - `detect`: `Language` and the Spanish/Kichwa scoring heuristic
//!
//! # Example
//!
//! ```rust,ignore
//! use kichwa_lexicon::text::{detect, normalize, tokenize, Language};
//!
//! assert_eq!(normalize("Ñuka  WASI"), "ñuka  wasi");
//! assert!(tokenize("allimi").contains(&"alli".to_string()));
//! assert_eq!(detect("ñuka wasi").language, Language::Kichwa);
//! ```

mod detect;
mod normalize;
mod tokenize;

pub use detect::{detect, Detection, Language};
pub use normalize::{normalize, remove_diacritics};
pub use tokenize::{tokenize, KICHWA_SUFFIXES};
