//! HTTP surface over the editor, the store and the translator.
//!
//! Store work is synchronous file I/O, so every store or editor call runs on
//! the blocking pool via [`blocking`].

use crate::config::Config;
use crate::editor::LexiconEditor;
use crate::error::{StoreError, StoreResult};
use crate::security::is_authorized;
use crate::store::history::tail;
use crate::text::Language;
use crate::translator::Translator;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub editor: LexiconEditor,
    pub translator: Translator,
    pub api_key: Option<Arc<str>>,
    pub history_limit: usize,
}

impl AppState {
    pub fn new(editor: LexiconEditor, translator: Translator, config: &Config) -> Self {
        Self {
            editor,
            translator,
            api_key: config.api_key.as_deref().map(Arc::from),
            history_limit: config.history_limit,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error rendered as `{"error": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::Validation(_) | StoreError::CorruptBackup { .. } => {
                StatusCode::BAD_REQUEST
            }
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Storage { .. } => {
                error!("Storage failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Serialize `value` as a JSON object with `"ok": true` added.
fn ok_json<T: Serialize>(value: &T) -> ApiResult<Json<Value>> {
    let mut body = serde_json::to_value(value).map_err(|e| {
        error!("Failed to serialize response: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?;
    if let Value::Object(map) = &mut body {
        map.insert("ok".to_string(), Value::Bool(true));
    }
    Ok(Json(body))
}

/// Run a store operation on the blocking pool.
async fn blocking<T, F>(operation: F) -> ApiResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| {
            error!("Store task failed: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        })?
        .map_err(ApiError::from)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    if is_authorized(headers, state.api_key.as_deref()) {
        Ok(())
    } else {
        Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "missing or invalid X-API-Key",
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/translate", post(translate))
        .route("/api/dictionary", get(get_dictionary))
        .route("/api/dictionary/add", post(add_entry))
        .route("/api/dictionary/update", post(update_entry))
        .route("/api/dictionary/delete", post(delete_entry))
        .route("/api/dictionary/import", post(import_csv))
        .route("/api/dictionary/export", get(export_dictionary))
        .route("/api/dictionary/meta", get(get_meta))
        .route("/api/dictionary/history", get(get_history))
        .route("/api/dictionary/backups", get(get_backups))
        .route("/api/dictionary/restore", post(restore_backup))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==================== Translation ====================

fn default_source() -> String {
    "auto".to_string()
}

fn default_target() -> String {
    Language::Spanish.code().to_string()
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default = "default_source")]
    pub src: String,
    #[serde(default = "default_target")]
    pub dest: String,
}

async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> ApiResult<impl IntoResponse> {
    let bad_request = |e: anyhow::Error| ApiError::new(StatusCode::BAD_REQUEST, e.to_string());
    let source = Language::from_selection(&request.src).map_err(bad_request)?;
    let target = Language::from_code(&request.dest).map_err(bad_request)?;

    let outcome = state
        .translator
        .translate(&request.text, source, target)
        .await;
    Ok(Json(outcome))
}

async fn health(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let store = state.editor.store().clone();
    let metadata = blocking(move || store.metadata()).await?;
    Ok(Json(json!({
        "status": "ok",
        "version": metadata.current_version,
        "entries": metadata.entry_count,
    })))
}

// ==================== Dictionary reads ====================

async fn get_dictionary(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let store = state.editor.store().clone();
    let lexicon = blocking(move || Ok(store.snapshot())).await?;
    Ok(Json(json!({ "dictionary": lexicon })))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

async fn export_dictionary(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    match query.format.as_deref().unwrap_or("json") {
        "json" => {
            let store = state.editor.store().clone();
            let lexicon = blocking(move || Ok(store.snapshot())).await?;
            Ok((
                [(
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"dictionary_es_qu.json\"",
                )],
                Json(json!({ "dictionary": lexicon })),
            )
                .into_response())
        }
        "csv" => {
            let editor = state.editor.clone();
            let body = blocking(move || editor.export_csv()).await?;
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"dictionary_es_qu.csv\"",
                    ),
                ],
                body,
            )
                .into_response())
        }
        other => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("unsupported export format '{}'", other),
        )),
    }
}

async fn get_meta(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let store = state.editor.store().clone();
    let (metadata, backups) =
        blocking(move || Ok((store.metadata()?, store.list_backups()?))).await?;
    let backups: Vec<_> = backups
        .into_iter()
        .map(|b| json!({ "file": b.file, "bytes": b.bytes }))
        .collect();
    Ok(Json(json!({
        "meta": metadata,
        "backups": backups,
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(state.history_limit);
    let store = state.editor.store().clone();
    let history = blocking(move || Ok(store.history())).await?;
    Ok(Json(json!({ "history": tail(&history, limit) })))
}

async fn get_backups(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let store = state.editor.store().clone();
    let backups = blocking(move || store.list_backups()).await?;
    Ok(Json(json!({ "files": backups })))
}

// ==================== Dictionary edits ====================

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    #[serde(default)]
    pub spanish: String,
    #[serde(default)]
    pub kichwa: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub spanish: String,
    #[serde(default)]
    pub kichwa: String,
    pub spanish_new: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub spanish: String,
}

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    #[serde(default)]
    pub file: String,
}

async fn add_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AddRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    let editor = state.editor.clone();
    let outcome = blocking(move || editor.add(&request.spanish, &request.kichwa)).await?;
    ok_json(&outcome)
}

async fn update_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    let editor = state.editor.clone();
    let outcome = blocking(move || {
        editor.update(
            &request.spanish,
            &request.kichwa,
            request.spanish_new.as_deref(),
        )
    })
    .await?;
    ok_json(&outcome)
}

async fn delete_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DeleteRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    let editor = state.editor.clone();
    let outcome = blocking(move || editor.delete(&request.spanish)).await?;
    ok_json(&outcome)
}

/// Accepts a `multipart/form-data` upload with a `file` field, or the CSV
/// itself as the request body.
async fn import_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    let body = read_csv_upload(&headers, request).await?;
    if body.is_empty() {
        return Err(StoreError::Validation("CSV body is empty".to_string()).into());
    }
    let editor = state.editor.clone();
    let outcome = blocking(move || editor.import_csv(&body)).await?;
    info!("Import via API: {} rows", outcome.stats.total_rows);
    ok_json(&outcome)
}

async fn read_csv_upload(headers: &HeaderMap, request: Request) -> ApiResult<Bytes> {
    let bad_request = |e: String| ApiError::new(StatusCode::BAD_REQUEST, e);
    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        return Bytes::from_request(request, &())
            .await
            .map_err(|e| bad_request(e.body_text()));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| bad_request(e.body_text()))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() == Some("file") {
            return field.bytes().await.map_err(|e| bad_request(e.body_text()));
        }
    }
    Err(bad_request("file required".to_string()))
}

async fn restore_backup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RestoreRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    let editor = state.editor.clone();
    let outcome = blocking(move || editor.restore(&request.file)).await?;
    ok_json(&outcome)
}
