use anyhow::{Context, Result};
use kichwa_lexicon::config::Config;
use kichwa_lexicon::editor::LexiconEditor;
use kichwa_lexicon::server::{router, AppState};
use kichwa_lexicon::store::LexiconStore;
use kichwa_lexicon::translator::{FallbackTranslator, OpenAiTranslator, Translator};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kichwa_lexicon=info".parse()?),
        )
        .init();

    info!("Starting Spanish-Kichwa lexicon service");

    let config = Config::from_env()?;

    let store = LexiconStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open lexicon store at {}", config.data_dir.display()))?;
    let store = Arc::new(store);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;
    let fallback: Option<Arc<dyn FallbackTranslator>> =
        match OpenAiTranslator::from_config(client, &config) {
            Some(openai) => {
                info!("Fallback translator: OpenAI ({})", config.openai_model);
                Some(Arc::new(openai))
            }
            None => {
                warn!("OPENAI_API_KEY not set, translations are lexicon-only");
                None
            }
        };

    if config.api_key.is_none() {
        warn!("API_KEY not set, dictionary edits are unauthenticated");
    }

    let state = AppState::new(
        LexiconEditor::new(store.clone()),
        Translator::new(store, fallback),
        &config,
    );
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
