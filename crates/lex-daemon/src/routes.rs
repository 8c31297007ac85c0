//! Axum router and all HTTP handlers for lex-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are thin: decode, call one engine operation,
//! encode. Every engine error maps onto one status code through [`ApiError`].

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use lex_engine::{
    DictError, HeadwordEdit, NewExampleSentence, NewHeadword, NewTranslation, RecordId,
    SentenceEdit, TranslationEdit,
};
use tracing::{error, info, warn};

use crate::{
    api_types::{ErrorResponse, HeadwordQuery, HealthResponse},
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/headwords", get(list_headwords).post(add_headword))
        .route(
            "/v1/headword",
            get(get_headword)
                .patch(update_headword)
                .delete(delete_headword),
        )
        .route(
            "/v1/headword/translations",
            get(list_translations).post(add_translation),
        )
        .route(
            "/v1/translations/:id",
            get(get_translation)
                .patch(update_translation)
                .delete(delete_translation),
        )
        .route(
            "/v1/translations/:id/sentences",
            get(list_sentences).post(add_sentence),
        )
        .route(
            "/v1/sentences/:id",
            get(get_sentence)
                .patch(update_sentence)
                .delete(delete_sentence),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Uniform error response: `{ "error": <message>, "kind": <kind> }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: msg.into(),
                kind: "invalid_input".to_string(),
            },
        }
    }
}

impl From<DictError> for ApiError {
    fn from(err: DictError) -> Self {
        let status = match &err {
            DictError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DictError::NotFound { .. } => StatusCode::NOT_FOUND,
            DictError::VersionConflict { .. } => StatusCode::CONFLICT,
            DictError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match &err {
            DictError::Storage { .. } => error!(error = ?err, "storage failure"),
            DictError::VersionConflict { .. } => warn!(error = %err, "request lost a version race"),
            _ => {}
        }
        Self {
            status,
            body: ErrorResponse {
                error: err.to_string(),
                kind: err.kind().to_string(),
            },
        }
    }
}

impl From<lex_engine::SelectorError> for ApiError {
    fn from(err: lex_engine::SelectorError) -> Self {
        DictError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rej: JsonRejection) -> Self {
        Self::bad_request(format!("invalid json body: {}", rej.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rej: QueryRejection) -> Self {
        Self::bad_request(format!("invalid query: {}", rej.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rej: PathRejection) -> Self {
        Self::bad_request(format!("invalid path: {}", rej.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            backend: st.store.backend_name().to_string(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Headwords
// ---------------------------------------------------------------------------

pub(crate) async fn list_headwords(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let all = lex_engine::list_headwords(st.store.as_ref()).await?;
    Ok(Json(all).into_response())
}

pub(crate) async fn add_headword(
    State(st): State<Arc<AppState>>,
    body: Result<Json<NewHeadword>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(new) = body?;
    let created = lex_engine::add_headword(st.store.as_ref(), &new).await?;
    info!(headword_id = created.id, "headwords/add");
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub(crate) async fn get_headword(
    State(st): State<Arc<AppState>>,
    query: Result<Query<HeadwordQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(q) = query?;
    let selector = q.into_selector()?;
    let found = lex_engine::get_headword(st.store.as_ref(), &selector).await?;
    Ok(Json(found).into_response())
}

pub(crate) async fn update_headword(
    State(st): State<Arc<AppState>>,
    query: Result<Query<HeadwordQuery>, QueryRejection>,
    body: Result<Json<HeadwordEdit>, JsonRejection>,
) -> ApiResult<Response> {
    // Selector is validated before the body so a bad key never reaches storage.
    let Query(q) = query?;
    let selector = q.into_selector()?;
    let Json(edit) = body?;
    let updated = lex_engine::update_headword(st.store.as_ref(), &selector, Some(&edit)).await?;
    info!(headword_id = updated.id, version = updated.version, "headword/update");
    Ok(Json(updated).into_response())
}

pub(crate) async fn delete_headword(
    State(st): State<Arc<AppState>>,
    query: Result<Query<HeadwordQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(q) = query?;
    let selector = q.into_selector()?;
    let snapshot = lex_engine::delete_headword(st.store.as_ref(), &selector).await?;
    info!(headword_id = snapshot.id, "headword/delete");
    Ok(Json(snapshot).into_response())
}

// ---------------------------------------------------------------------------
// Translations
// ---------------------------------------------------------------------------

pub(crate) async fn list_translations(
    State(st): State<Arc<AppState>>,
    query: Result<Query<HeadwordQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(q) = query?;
    let selector = q.into_selector()?;
    let translations = lex_engine::list_translations(st.store.as_ref(), &selector).await?;
    Ok(Json(translations).into_response())
}

pub(crate) async fn add_translation(
    State(st): State<Arc<AppState>>,
    query: Result<Query<HeadwordQuery>, QueryRejection>,
    body: Result<Json<NewTranslation>, JsonRejection>,
) -> ApiResult<Response> {
    let Query(q) = query?;
    let selector = q.into_selector()?;
    let Json(new) = body?;
    let created = lex_engine::add_translation(st.store.as_ref(), &selector, &new).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub(crate) async fn get_translation(
    State(st): State<Arc<AppState>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let found = lex_engine::get_translation(st.store.as_ref(), id).await?;
    Ok(Json(found).into_response())
}

pub(crate) async fn update_translation(
    State(st): State<Arc<AppState>>,
    path: Result<Path<RecordId>, PathRejection>,
    body: Result<Json<TranslationEdit>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let Json(edit) = body?;
    let updated = lex_engine::update_translation(st.store.as_ref(), id, &edit).await?;
    Ok(Json(updated).into_response())
}

pub(crate) async fn delete_translation(
    State(st): State<Arc<AppState>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let snapshot = lex_engine::delete_translation(st.store.as_ref(), id).await?;
    Ok(Json(snapshot).into_response())
}

// ---------------------------------------------------------------------------
// Example sentences
// ---------------------------------------------------------------------------

pub(crate) async fn list_sentences(
    State(st): State<Arc<AppState>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(translation_id) = path?;
    let sentences = lex_engine::list_sentences(st.store.as_ref(), translation_id).await?;
    Ok(Json(sentences).into_response())
}

pub(crate) async fn add_sentence(
    State(st): State<Arc<AppState>>,
    path: Result<Path<RecordId>, PathRejection>,
    body: Result<Json<NewExampleSentence>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(translation_id) = path?;
    let Json(new) = body?;
    let created = lex_engine::add_sentence(st.store.as_ref(), translation_id, &new).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub(crate) async fn get_sentence(
    State(st): State<Arc<AppState>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let found = lex_engine::get_sentence(st.store.as_ref(), id).await?;
    Ok(Json(found).into_response())
}

pub(crate) async fn update_sentence(
    State(st): State<Arc<AppState>>,
    path: Result<Path<RecordId>, PathRejection>,
    body: Result<Json<SentenceEdit>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let Json(edit) = body?;
    let updated = lex_engine::update_sentence(st.store.as_ref(), id, &edit).await?;
    Ok(Json(updated).into_response())
}

pub(crate) async fn delete_sentence(
    State(st): State<Arc<AppState>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let snapshot = lex_engine::delete_sentence(st.store.as_ref(), id).await?;
    Ok(Json(snapshot).into_response())
}
