// src/api.rs
//! HTTP surface: single-review analysis, CSV batch runs, lexicon editing.
//!
//! Pipeline work is CPU-bound and the scorer may block on the network, so
//! every analysis runs on the blocking pool under the lexicon read lock.
//! Lexicon reads and edits take the same lock and run there too.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::batch::{self, FailurePolicy};
use crate::error::AbsaError;
use crate::lang::Language;
use crate::lexicon::LexiconHandle;
use crate::pipeline::{AnalysisResult, AnalysisTrace, Analyzer};
use crate::report::BatchReport;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub lexicon: LexiconHandle,
    pub failure_policy: FailurePolicy,
    pub top_triggers: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", post(analyze))
        .route("/batch", post(analyze_batch))
        .route("/batch/csv", post(export_batch_csv))
        .route("/lexicon", get(get_lexicon))
        .route("/lexicon/export", get(export_lexicon))
        .route("/lexicon/keyword", post(add_keyword))
        .route("/lexicon/aspect", post(add_aspect))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug)]
pub enum ApiError {
    Absa(AbsaError),
    BadRequest(String),
    Internal(String),
}

impl From<AbsaError> for ApiError {
    fn from(e: AbsaError) -> Self {
        ApiError::Absa(e)
    }
}

fn status_for(e: &AbsaError) -> StatusCode {
    match e {
        AbsaError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AbsaError::ScorerInvocation { .. } => StatusCode::BAD_GATEWAY,
        AbsaError::UnreadableFile { .. } | AbsaError::InvalidKeyword { .. } => {
            StatusCode::BAD_REQUEST
        }
        AbsaError::NoTextColumnFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AbsaError::UnknownAspect { .. } => StatusCode::NOT_FOUND,
        AbsaError::DuplicateAspect { .. } => StatusCode::CONFLICT,
        AbsaError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AbsaError::Config(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Absa(e) => (status_for(&e), e.kind(), e.to_string()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m),
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_language(raw: Option<&str>) -> ApiResult<Option<Language>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None | Some("auto") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(ApiError::BadRequest),
    }
}

async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("worker failed: {e}")))?
}

/* ----------------------------
Analyze
---------------------------- */

#[derive(Deserialize)]
struct AnalyzeReq {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    trace: bool,
}

#[derive(Serialize)]
struct AnalyzeResp {
    #[serde(flatten)]
    result: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<AnalysisTrace>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> ApiResult<Json<AnalyzeResp>> {
    let lang = parse_language(body.language.as_deref())?;
    let resp = blocking(move || {
        state.lexicon.read(|lex| -> ApiResult<AnalyzeResp> {
            let (result, trace) = state.analyzer.analyze_traced(lex, &body.text, lang)?;
            Ok(AnalyzeResp {
                result,
                trace: body.trace.then_some(trace),
            })
        })
    })
    .await?;
    Ok(Json(resp))
}

/* ----------------------------
Batch (CSV request body)
---------------------------- */

#[derive(Serialize)]
struct FailureOut {
    index: usize,
    error: &'static str,
    message: String,
}

#[derive(Serialize)]
struct BatchResp {
    text_column: String,
    rows: Vec<batch::BatchRow>,
    failures: Vec<FailureOut>,
    summary: BatchReport,
}

async fn analyze_batch(State(state): State<AppState>, body: String) -> ApiResult<Json<BatchResp>> {
    let resp = blocking(move || {
        let table = batch::read_reviews(body.as_bytes(), "request body")?;
        let outcome = state.lexicon.read(|lex| {
            batch::run_batch(&state.analyzer, lex, &table.texts, state.failure_policy)
        })?;
        let summary = BatchReport::from_outcome(&outcome, state.top_triggers);
        let failures = outcome
            .failures
            .iter()
            .map(|f| FailureOut {
                index: f.index,
                error: f.error.kind(),
                message: f.error.to_string(),
            })
            .collect();
        Ok(BatchResp {
            text_column: table.text_column,
            rows: outcome.rows,
            failures,
            summary,
        })
    })
    .await?;
    Ok(Json(resp))
}

async fn export_batch_csv(State(state): State<AppState>, body: String) -> ApiResult<Response> {
    let csv_bytes = blocking(move || {
        let table = batch::read_reviews(body.as_bytes(), "request body")?;
        let outcome = state.lexicon.read(|lex| {
            batch::run_batch(&state.analyzer, lex, &table.texts, state.failure_policy)
        })?;
        let mut out = Vec::new();
        batch::write_csv(&mut out, &outcome.rows)?;
        Ok(out)
    })
    .await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        batch::export_file_name(chrono::Utc::now())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv_bytes,
    )
        .into_response())
}

/* ----------------------------
Lexicon
---------------------------- */

#[derive(Deserialize)]
struct LexiconQuery {
    #[serde(default)]
    language: Option<String>,
}

async fn get_lexicon(
    State(state): State<AppState>,
    Query(q): Query<LexiconQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let lang = parse_language(q.language.as_deref())?;
    let file = blocking(move || Ok(state.lexicon.read(|lex| lex.to_file()))).await?;
    let body = match lang {
        None => serde_json::to_value(&file),
        Some(Language::Id) => serde_json::to_value(&file.id),
        Some(Language::En) => serde_json::to_value(&file.en),
    }
    .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(body))
}

async fn export_lexicon(State(state): State<AppState>) -> ApiResult<Response> {
    let toml = blocking(move || Ok(state.lexicon.read(|lex| lex.to_toml_string())?)).await?;
    Ok(([(header::CONTENT_TYPE, "application/toml")], toml).into_response())
}

#[derive(Deserialize)]
struct KeywordReq {
    language: String,
    aspect: String,
    keyword: String,
}

async fn add_keyword(
    State(state): State<AppState>,
    Json(body): Json<KeywordReq>,
) -> ApiResult<Json<serde_json::Value>> {
    let lang = required_language(&body.language)?;
    // The write lock waits for in-flight batches; keep that off the runtime.
    let added = blocking(move || {
        Ok(state.lexicon.add_keyword(lang, &body.aspect, &body.keyword)?)
    })
    .await?;
    Ok(Json(json!({ "added": added })))
}

async fn add_aspect(
    State(state): State<AppState>,
    Json(body): Json<KeywordReq>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let lang = required_language(&body.language)?;
    let aspect = body.aspect.trim().to_string();
    blocking(move || Ok(state.lexicon.add_aspect(lang, &body.aspect, &body.keyword)?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "language": lang, "aspect": aspect })),
    ))
}

fn required_language(raw: &str) -> ApiResult<Language> {
    raw.parse().map_err(ApiError::BadRequest)
}
