//! Integration tests for the Spanish-Kichwa lexicon service
//!
//! These tests drive the public API end to end: editing through
//! `LexiconEditor`, persistence through `LexiconStore`, and translation
//! through `Translator` with a mocked fallback service.

use kichwa_lexicon::editor::LexiconEditor;
use kichwa_lexicon::error::StoreError;
use kichwa_lexicon::matching::{best_match, reverse_match};
use kichwa_lexicon::retry::RetryConfig;
use kichwa_lexicon::store::history::Action;
use kichwa_lexicon::store::{Lexicon, LexiconStore};
use kichwa_lexicon::text::{detect, normalize, tokenize, Language};
use kichwa_lexicon::translator::{OpenAiTranslator, TranslationMethod, Translator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

// ==================== Test Helpers ====================

fn create_test_editor() -> (LexiconEditor, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = LexiconStore::open(temp_dir.path()).expect("Failed to open store");
    (LexiconEditor::new(Arc::new(store)), temp_dir)
}

fn lexicon(pairs: &[(&str, &str)]) -> Lexicon {
    pairs
        .iter()
        .map(|(es, qu)| (es.to_string(), qu.to_string()))
        .collect()
}

fn backup_count(editor: &LexiconEditor) -> usize {
    editor.store().list_backups().expect("Should list backups").len()
}

// ==================== End-to-End Scenarios ====================

#[test]
fn test_scenario_substitutes_single_word() {
    let lexicon = lexicon(&[("casa", "wasi")]);
    let out = best_match(&lexicon, "Mi Casa es GRANDE");

    assert_eq!(out, "mi wasi es grande");
}

#[test]
fn test_scenario_longest_key_wins() {
    let lexicon = lexicon(&[("casa", "wasi"), ("casa grande", "wasi hatun")]);

    assert_eq!(best_match(&lexicon, "casa grande"), "wasi hatun");
}

#[test]
fn test_scenario_detects_kichwa() {
    let detection = detect("ñuka wasi");

    assert_eq!(detection.language, Language::Kichwa);
    assert!(detection.score_qu > detection.score_es);
    assert_eq!(detection.score_es, 0.0);
}

#[test]
fn test_detect_counts_every_hint_letter() {
    // `s` in "casa" and "es" counts toward Kichwa, so this reads as Kichwa
    let detection = detect("mi casa es grande");

    assert_eq!(detection.language, Language::Kichwa);
    assert_eq!(detection.score_qu, 2.0);
    assert_eq!(detect("hola").language, Language::Kichwa);
}

#[test]
fn test_scenario_delete_missing_word_leaves_no_trace() {
    let (editor, _dir) = create_test_editor();
    editor.add("casa", "wasi").unwrap();
    let backups_before = backup_count(&editor);
    let history_before = editor.store().history().len();

    let result = editor.delete("perro");

    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert_eq!(backup_count(&editor), backups_before);
    assert_eq!(editor.store().history().len(), history_before);
    assert_eq!(editor.store().metadata().unwrap().current_version, 1);
}

#[test]
fn test_scenario_import_counts_duplicate_rows_once() {
    let (editor, _dir) = create_test_editor();

    let outcome = editor.import_csv(b"casa,wasi\ncasa,wasi\n").unwrap();

    assert_eq!(outcome.stats.added, 1);
    assert_eq!(outcome.stats.skipped_duplicates, 1);
    assert_eq!(outcome.stats.total_rows, 2);
    assert_eq!(editor.store().snapshot(), lexicon(&[("casa", "wasi")]));
}

// ==================== Store Invariant Tests ====================

#[test]
fn test_each_edit_adds_one_version_two_backups_one_history_entry() {
    let (editor, _dir) = create_test_editor();

    editor.add("casa", "wasi").unwrap();
    editor.update("casa", "wasi hatun", Some("casona")).unwrap();
    editor.delete("casona").unwrap();

    let store = editor.store();
    let metadata = store.metadata().unwrap();
    assert_eq!(metadata.current_version, 3);
    assert_eq!(metadata.entry_count, 0);
    assert_eq!(backup_count(&editor), 6);

    let actions: Vec<Action> = store.history().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![Action::Add, Action::Rename, Action::Delete]);
}

#[test]
fn test_double_restore_keeps_content_and_advances_version() {
    let (editor, _dir) = create_test_editor();
    editor.add("casa", "wasi").unwrap();
    editor.add("agua", "yaku").unwrap();

    // The post-image of version 1 holds only "casa"
    let backup = editor
        .store()
        .list_backups()
        .unwrap()
        .into_iter()
        .find(|b| b.file.contains("_v1_") && b.file.ends_with("_postsave.json"))
        .expect("Should have a v1 post-image");

    let first = editor.restore(&backup.file).unwrap();
    let after_first = editor.store().snapshot();
    let second = editor.restore(&backup.file).unwrap();

    assert_eq!(after_first, lexicon(&[("casa", "wasi")]));
    assert_eq!(editor.store().snapshot(), after_first);
    assert_eq!(first.version, 3);
    assert_eq!(second.version, 4);
}

#[test]
fn test_restore_rejects_path_traversal() {
    let (editor, _dir) = create_test_editor();
    editor.add("casa", "wasi").unwrap();

    let result = editor.restore("../dictionary_es_qu.json");

    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert_eq!(editor.store().metadata().unwrap().current_version, 1);
}

#[test]
fn test_store_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = Arc::new(LexiconStore::open(temp_dir.path()).unwrap());
        let editor = LexiconEditor::new(store);
        editor.import_csv("niño,wawa\ncasa,wasi\n".as_bytes()).unwrap();
    }

    let reopened = LexiconStore::open(temp_dir.path()).unwrap();
    let metadata = reopened.metadata().unwrap();

    assert_eq!(metadata.current_version, 1);
    assert_eq!(metadata.entry_count, 2);
    assert_eq!(reopened.snapshot().get("niño").map(String::as_str), Some("wawa"));
}

#[test]
fn test_export_matches_import() {
    let (editor, _dir) = create_test_editor();
    editor.import_csv(b"perro,allku\ncasa,wasi\n").unwrap();

    assert_eq!(editor.export_csv().unwrap(), "casa,wasi\nperro,allku\n");
}

// ==================== Text Processing Tests ====================

#[test]
fn test_normalize_keeps_enye_and_strips_accents() {
    assert_eq!(normalize("  NIÑO Pájaro "), "niño pajaro");
    assert_eq!(normalize(&normalize("Árbol")), normalize("Árbol"));
}

#[test]
fn test_tokenize_strips_kichwa_suffixes() {
    let tokens = tokenize("allimi");

    assert!(tokens.contains(&"allimi".to_string()));
    assert!(tokens.contains(&"alli".to_string()));
}

#[test]
fn test_reverse_match_substitutes_kichwa_tokens() {
    let lexicon = lexicon(&[("casa", "wasi"), ("agua", "yaku")]);

    assert_eq!(reverse_match(&lexicon, "yaku wasi"), "agua casa");
}

// ==================== Translation Flow Tests ====================

#[tokio::test]
async fn test_translation_prefers_lexicon_then_falls_back() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-openai-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "allku" } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (editor, _dir) = create_test_editor();
    editor.add("casa", "wasi").unwrap();

    let openai = OpenAiTranslator::new(
        reqwest::Client::new(),
        "test-openai-key",
        "gpt-4o-mini",
        &format!("{}/v1/chat/completions", mock_server.uri()),
    )
    .with_retry(RetryConfig::new(2, Duration::from_millis(5)));
    let translator = Translator::new(editor.store().clone(), Some(Arc::new(openai)));

    let local = translator
        .translate("casa", Some(Language::Spanish), Language::Kichwa)
        .await;
    assert_eq!(local.translation, "wasi");
    assert_eq!(local.method, TranslationMethod::Lexicon);

    // "wasi" is detected as Kichwa, so the Kichwa target flips to Spanish
    let detected = translator.translate("wasi", None, Language::Kichwa).await;
    assert_eq!(detected.source, Language::Kichwa);
    assert_eq!(detected.translation, "casa");
    assert_eq!(detected.method, TranslationMethod::Lexicon);

    let remote = translator
        .translate("perro", Some(Language::Spanish), Language::Kichwa)
        .await;
    assert_eq!(remote.translation, "allku");
    assert_eq!(remote.method, TranslationMethod::Fallback);
}

#[tokio::test]
async fn test_translation_sees_edits_immediately() {
    let (editor, _dir) = create_test_editor();
    let translator = Translator::new(editor.store().clone(), None);

    let before = translator
        .translate("agua", Some(Language::Spanish), Language::Kichwa)
        .await;
    assert_eq!(before.method, TranslationMethod::Untranslated);

    editor.add("agua", "yaku").unwrap();
    let after = translator
        .translate("agua", Some(Language::Spanish), Language::Kichwa)
        .await;
    assert_eq!(after.translation, "yaku");
}
