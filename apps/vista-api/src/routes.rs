use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use vista_index::IndexError;
use vista_service::{SearchRequest, ServiceError};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/search", post(search))
		.route("/index/start", post(index_start))
		.route("/index/reindex/{external_id}", post(reindex))
		.route("/index/status", get(index_status))
		.route("/stats", get(stats))
		.route("/image/{image_id}", get(image_detail))
		.with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
	Json(state.service.health().await)
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.search(payload).await?;
	Ok(Json(response).into_response())
}

#[derive(Debug, Serialize)]
struct IndexStartResponse {
	status: &'static str,
}

async fn index_start(State(state): State<AppState>) -> impl IntoResponse {
	if !state.progress.start(time::OffsetDateTime::now_utc()) {
		return Json(IndexStartResponse { status: "already_running" });
	}
	let pipeline = state.pipeline.clone();
	tokio::spawn(async move {
		// Run-level failures are already logged and recorded in the tracker.
		let _ = pipeline.run().await;
	});
	Json(IndexStartResponse { status: "started" })
}

async fn reindex(
	State(state): State<AppState>,
	Path(external_id): Path<String>,
) -> Result<Response, ApiError> {
	match state.pipeline.reindex_one(&external_id).await? {
		Some(summary) => Ok(Json(summary).into_response()),
		None => Err(ApiError::not_found(format!("external_id {external_id} is not indexed"))),
	}
}

async fn index_status(State(state): State<AppState>) -> impl IntoResponse {
	Json(state.progress.snapshot())
}

async fn stats(State(state): State<AppState>) -> Result<Response, ApiError> {
	let response = state.service.stats().await?;
	Ok(Json(response).into_response())
}

async fn image_detail(
	State(state): State<AppState>,
	Path(image_id): Path<Uuid>,
) -> Result<Response, ApiError> {
	match state.service.image_detail(image_id).await? {
		Some(detail) => Ok(Json(detail).into_response()),
		None => Err(ApiError::not_found(format!("image {image_id} not found"))),
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
	kind: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	kind: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, kind: kind.into(), message: message.into() }
	}

	fn not_found(message: impl Into<String>) -> Self {
		Self::new(StatusCode::NOT_FOUND, "NotFound", message)
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let status = match &err {
			ServiceError::Input { .. } => StatusCode::BAD_REQUEST,
			ServiceError::Auth { .. } => StatusCode::UNAUTHORIZED,
			ServiceError::TransientUpstream { .. } | ServiceError::Parse { .. } =>
				StatusCode::BAD_GATEWAY,
			ServiceError::Partial { .. } => StatusCode::OK,
			ServiceError::Fatal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		};
		Self::new(status, err.kind(), err.message())
	}
}

impl From<IndexError> for ApiError {
	fn from(err: IndexError) -> Self {
		let (status, kind) = match &err {
			IndexError::SourceAuth(_) => (StatusCode::UNAUTHORIZED, "AuthError"),
			IndexError::SourceUnreachable(_) => (StatusCode::SERVICE_UNAVAILABLE, "TransientUpstream"),
			IndexError::Storage(_) => (StatusCode::BAD_GATEWAY, "TransientUpstream"),
			IndexError::Fatal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Fatal"),
		};
		Self::new(status, kind, err.to_string())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error: ErrorDetail { kind: self.kind, message: self.message } };
		(self.status, Json(body)).into_response()
	}
}
