use std::sync::Arc;

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use vista_api::{routes, state::AppState};
use vista_providers::vlm::{VerifyRequest, VerifyResponse, VlmEvidence, VlmVerdict};
use vista_service::{BoxFuture, EmbeddingProvider, Providers, VlmProvider};

const TEST_DIM: u32 = 3;

fn test_config(dsn: String) -> vista_config::Config {
	vista_config::Config {
		service: vista_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: vista_config::Storage { db_url: dsn, pool_size: 2, db_timeout_ms: 5_000 },
		source: vista_config::Source {
			api_url: "http://127.0.0.1:1".to_string(),
			root_id: "root".to_string(),
			api_key: None,
			fetch_timeout_ms: 1_000,
		},
		providers: vista_config::Providers {
			detector: vista_config::DetectorConfig {
				url: "http://127.0.0.1:1/detect".to_string(),
				api_key: None,
				timeout_ms: 1_000,
			},
			embedding: vista_config::EmbeddingConfig {
				url: "http://127.0.0.1:1/embed".to_string(),
				model: "test-embed".to_string(),
				api_key: None,
				dimensions: TEST_DIM,
				timeout_ms: 1_000,
			},
			vlm: vista_config::VlmConfig {
				url: "http://127.0.0.1:1/vlm".to_string(),
				model: "test-vlm".to_string(),
				api_key: "test-key".to_string(),
				timeout_ms: 1_000,
			},
		},
		search: vista_config::Search {
			top_k: 120,
			batch_size: 12,
			cutoff: 0.7,
			final_limit: 24,
			alpha: 0.75,
			cache_ttl_days: 7,
			cache_max_entries: 1_000,
			vlm_concurrency: 4,
			vlm_rate_per_minute: 6_000,
			deadline_ms: 30_000,
		},
		indexing: vista_config::Indexing { max_image_px: 1_024, incremental: true },
	}
}

struct StubEmbedding;

impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a vista_config::EmbeddingConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let vectors = texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect();
		Box::pin(async move { Ok(vectors) })
	}
}

struct StubVlm;

impl VlmProvider for StubVlm {
	fn verify<'a>(
		&'a self,
		_cfg: &'a vista_config::VlmConfig,
		request: &'a VerifyRequest,
	) -> BoxFuture<'a, color_eyre::Result<VerifyResponse>> {
		let verdicts = request
			.images
			.iter()
			.map(|image| VlmVerdict {
				image_id: image.image_id.clone(),
				matches: true,
				confidence: 0.9,
				room: Some("kitchen".to_string()),
				evidence: VlmEvidence::default(),
				notes: "stub".to_string(),
			})
			.collect();
		Box::pin(async move { Ok(VerifyResponse::Verdicts(verdicts)) })
	}
}

async fn test_state() -> Option<AppState> {
	let Ok(dsn) = std::env::var("VISTA_PG_DSN") else {
		eprintln!("Skipping HTTP tests; set VISTA_PG_DSN to run this test.");
		return None;
	};
	let providers = Providers::new(Arc::new(StubEmbedding), Arc::new(StubVlm));
	let state = AppState::with_providers(test_config(dsn), providers)
		.await
		.expect("Failed to initialize app state.");
	Some(state)
}

#[tokio::test]
async fn health_reports_components() {
	let Some(state) = test_state().await else {
		return;
	};
	let app = routes::router(state);
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
	assert!(json["components"]["db"].is_string());
	assert_eq!(json["components"]["vlm"], "configured");
}

#[tokio::test]
async fn search_rejects_an_empty_query() {
	let Some(state) = test_state().await else {
		return;
	};
	let app = routes::router(state);
	let payload = serde_json::json!({ "query": "  " });
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/search")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("request"),
		)
		.await
		.expect("Failed to call /search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
	assert_eq!(json["error"]["kind"], "InputError");
	assert!(json["error"]["message"].is_string());
}

#[tokio::test]
async fn index_status_reports_the_snapshot_shape() {
	let Some(state) = test_state().await else {
		return;
	};
	let app = routes::router(state);
	let response = app
		.oneshot(Request::builder().uri("/index/status").body(Body::empty()).expect("request"))
		.await
		.expect("Failed to call /index/status.");

	assert_eq!(response.status(), StatusCode::OK);
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
	assert_eq!(json["is_running"], false);
	assert!(json["processed_count"].is_number());
	assert!(json["progress_pct"].is_number());
	assert!(json["errors"].is_array());
}

#[tokio::test]
async fn unknown_image_detail_is_not_found() {
	let Some(state) = test_state().await else {
		return;
	};
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri(format!("/image/{}", uuid::Uuid::new_v4()))
				.body(Body::empty())
				.expect("request"),
		)
		.await
		.expect("Failed to call /image.");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
	assert_eq!(json["error"]["kind"], "NotFound");
}
