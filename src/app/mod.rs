pub mod model;
pub mod page;

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

use crate::digest::render_markdown;
use crate::docx::DOCX_MIME;
use crate::error::{DigestError, ErrorKind};
use crate::formats::DigestRecord;
use crate::openai::ApiKey;
use crate::pipeline::{DigestPipeline, validate_source};
use model::{
    DigestRequest, DigestResponse, DocumentLink, ErrorBody, ErrorDetail, FetchRequest,
    FetchResponse, PREVIEW_CHARS,
};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<DigestPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<DigestPipeline>) -> Self {
        Self { pipeline }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Html(page::INDEX_HTML) }))
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/fetch", post(fetch_handler))
        .route("/api/digest", post(digest_handler))
        .route("/api/digests", get(list_handler))
        .route("/documents/:name", get(download_document))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A request failure rendered as `{"error": {"kind", "message"}}`.
#[derive(Debug)]
pub struct AppError(DigestError);

impl From<DigestError> for AppError {
    fn from(err: DigestError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DigestError::Input(rejection.body_text()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Fetch | ErrorKind::Api => StatusCode::BAD_GATEWAY,
        ErrorKind::Persist => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(?kind, err = %self.0, "request failed");
        } else {
            tracing::warn!(?kind, err = %self.0, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                kind,
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

async fn fetch_handler(
    State(state): State<AppState>,
    payload: Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Json<FetchResponse>, AppError> {
    let Json(request) = payload?;
    if request.url.trim().is_empty() {
        return Err(DigestError::Input("paper URL is empty".to_owned()).into());
    }
    let fetched = state.pipeline.fetcher().fetch(&request.url).await?;

    Ok(Json(FetchResponse {
        kind: fetched.kind,
        pages: fetched.pages,
        chars: fetched.text.chars().count(),
        preview: model::preview(&fetched.text, PREVIEW_CHARS),
    }))
}

async fn digest_handler(
    State(state): State<AppState>,
    payload: Result<Json<DigestRequest>, JsonRejection>,
) -> Result<Json<DigestResponse>, AppError> {
    let Json(request) = payload?;
    let source = request.source();
    validate_source(&source)?;
    let api_key = ApiKey::resolve(request.api_key.as_deref())?;
    drop(request);

    let outcome = state.pipeline.run(source, &api_key).await?;
    let document = outcome.saved.document_name().map(|name| DocumentLink {
        download_url: format!("/documents/{name}"),
        name,
    });

    Ok(Json(DigestResponse {
        note_markdown: render_markdown(&outcome.record),
        digest: outcome.record,
        truncated: outcome.truncated,
        original_chars: outcome.original_chars,
        kept_chars: outcome.kept_chars,
        content_kind: outcome.content_kind,
        warnings: outcome.warnings,
        document,
    }))
}

async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<DigestRecord>>, AppError> {
    let path = state.pipeline.store().log_path().to_path_buf();
    let records = tokio::task::spawn_blocking(move || crate::store::read_log(&path))
        .await
        .map_err(|err| DigestError::Persist(anyhow::anyhow!("read digest log task: {err}")))?
        .map_err(DigestError::Persist)?;
    Ok(Json(records))
}

async fn download_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, StatusCode> {
    let Some(path) = state.pipeline.store().document_path(&name) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let body = axum::body::Body::from_stream(ReaderStream::new(file));

    let mut resp = Response::new(body);
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(DOCX_MIME));
    resp.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    );
    Ok(resp)
}
