//! Versioned Spanish-Kichwa lexicon with phrase matching and a translation API.
//!
//! The [`store`] keeps the lexicon on disk with backups and an edit history,
//! [`editor`] implements the curation operations on top of it, and
//! [`translator`] answers translation requests from the lexicon before
//! falling back to an external service. [`server`] exposes all of it over HTTP.

pub mod config;
pub mod csv_io;
pub mod editor;
pub mod error;
pub mod matching;
pub mod retry;
pub mod security;
pub mod server;
pub mod store;
pub mod text;
pub mod translator;
