//! Phrase translation: lexicon first, external translator as fallback.
//!
//! `Translator::translate` resolves an `auto` source with the language
//! detector, tries the lexicon matching heuristics against a store snapshot
//! and only then calls the configured [`FallbackTranslator`].

use crate::config::Config;
use crate::matching::{best_match, reverse_match};
use crate::retry::{with_retry_if, RetryConfig};
use crate::store::{Lexicon, LexiconStore};
use crate::text::{detect, normalize, Detection, Language};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// External translation service used when the lexicon has no match.
#[async_trait]
pub trait FallbackTranslator: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String>;
}

/// How a translation was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationMethod {
    /// Source and target are the same language
    Unchanged,
    /// Substituted from the local lexicon
    Lexicon,
    /// Returned by the fallback translator
    Fallback,
    /// Nothing could translate the text; it is returned as given
    Untranslated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationOutcome {
    pub translation: String,
    pub method: TranslationMethod,
    pub source: Language,
    pub target: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected: Option<Detection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct Translator {
    store: Arc<LexiconStore>,
    fallback: Option<Arc<dyn FallbackTranslator>>,
}

impl Translator {
    pub fn new(store: Arc<LexiconStore>, fallback: Option<Arc<dyn FallbackTranslator>>) -> Self {
        Self { store, fallback }
    }

    /// Translate `text` from `source` (`None` = detect) into `target`.
    ///
    /// With a detected source equal to `target`, the target flips to the
    /// other language, since the caller evidently wants the opposite side.
    pub async fn translate(
        &self,
        text: &str,
        source: Option<Language>,
        target: Language,
    ) -> TranslationOutcome {
        let (source, target, detected) = match source {
            Some(source) => (source, target, None),
            None => {
                let detection = detect(text);
                let target = if detection.language == target {
                    target.opposite()
                } else {
                    target
                };
                (detection.language, target, Some(detection))
            }
        };

        let outcome = |translation: String, method: TranslationMethod, error: Option<String>| {
            TranslationOutcome {
                translation,
                method,
                source,
                target,
                detected,
                error,
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return outcome(String::new(), TranslationMethod::Unchanged, None);
        }
        if source == target {
            return outcome(text.to_string(), TranslationMethod::Unchanged, None);
        }

        let lexicon = self.snapshot().await;
        if let Some(local) = translate_with_lexicon(&lexicon, text, source) {
            debug!("Lexicon match for '{}' ({} -> {})", text, source, target);
            return outcome(local, TranslationMethod::Lexicon, None);
        }

        let Some(fallback) = &self.fallback else {
            return outcome(
                text.to_string(),
                TranslationMethod::Untranslated,
                Some("no fallback translator configured".to_string()),
            );
        };

        match fallback.translate(text, source, target).await {
            Ok(translation) => outcome(translation, TranslationMethod::Fallback, None),
            Err(e) => {
                warn!("Fallback translation failed ({} -> {}): {:#}", source, target, e);
                outcome(
                    text.to_string(),
                    TranslationMethod::Untranslated,
                    Some(format!("{:#}", e)),
                )
            }
        }
    }

    /// Read the lexicon on the blocking pool; file I/O stays off the runtime.
    async fn snapshot(&self) -> Lexicon {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.snapshot()).await {
            Ok(lexicon) => lexicon,
            Err(e) => {
                warn!("Lexicon snapshot task failed: {}", e);
                Lexicon::new()
            }
        }
    }
}

/// Apply the matching heuristic for `source`; `None` when nothing matched.
pub fn translate_with_lexicon(lexicon: &Lexicon, text: &str, source: Language) -> Option<String> {
    if lexicon.is_empty() {
        return None;
    }
    let out = match source {
        Language::Spanish => best_match(lexicon, text),
        Language::Kichwa => reverse_match(lexicon, text),
    };
    (normalize(&out) != normalize(text)).then_some(out)
}

// ==================== OpenAI fallback ====================

/// OpenAI Chat Completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Reasoning models reject `temperature` and need a larger token budget
fn is_reasoning_model(model: &str) -> bool {
    ["gpt-5", "o1", "o3", "o4"]
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

fn build_system_prompt(source: Language, target: Language) -> String {
    format!(
        r#"You translate short phrases from {} to {}.
Kichwa means the Kichwa (Quichua) language of Ecuador, written in the unified alphabet.

Rules:
- Reply with the translation only, no quotes, notes or alternatives
- Keep proper names as they are
- Keep the register and punctuation of the original"#,
        source.name(),
        target.name()
    )
}

/// Fallback translator backed by an OpenAI-compatible chat completions API.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
    retry: RetryConfig,
}

impl OpenAiTranslator {
    pub fn new(client: reqwest::Client, api_key: &str, model: &str, api_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_url: api_url.to_string(),
            retry: RetryConfig::fallback_translation(),
        }
    }

    /// Build from configuration; `None` when no API key is set.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Option<Self> {
        let api_key = config.openai_api_key.as_deref()?;
        Some(Self::new(
            client,
            api_key,
            &config.openai_model,
            &config.openai_api_url,
        ))
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl FallbackTranslator for OpenAiTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        let is_reasoning = is_reasoning_model(&self.model);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(source, target),
                },
                Message {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            max_completion_tokens: if is_reasoning { 4000 } else { 400 },
            temperature: if is_reasoning { None } else { Some(0.2) },
            reasoning_effort: is_reasoning.then(|| "low".to_string()),
        };

        let translated = with_retry_if(
            &self.retry,
            &format!("Translation {} -> {}", source, target),
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&request)
                    .send()
                    .await
                    .context("Failed to send translation request")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    anyhow::bail!("Translation API error ({}): {}", status, body);
                }

                let chat: ChatResponse = response
                    .json()
                    .await
                    .context("Failed to parse translation response")?;

                chat.choices
                    .first()
                    .map(|c| c.message.content.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .context("Translation response contained no text")
            },
            is_retryable_error,
        )
        .await?;

        Ok(translated)
    }
}

/// 429 and 5xx responses and transport failures are retried; other 4xx are not.
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let message = error.to_string();
    let Some(rest) = message.strip_prefix("Translation API error (") else {
        return true;
    };
    match rest.split_whitespace().next().and_then(|s| s.parse::<u16>().ok()) {
        Some(status) => status == 429 || status >= 500,
        None => true,
    }
}
