#![allow(dead_code)]

use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use sqlx::Connection;
use tokio::sync::Mutex;
use vista_providers::vlm::{VerifyRequest, VerifyResponse, VlmEvidence, VlmVerdict};
use vista_service::{EmbeddingProvider, Providers, VistaService, VlmProvider};
use vista_storage::{
	db::Db,
	writer::{NewImage, NewObject},
};

static TEST_LOCK: Mutex<()> = Mutex::const_new(());
const TEST_DB_LOCK_KEY: i64 = 0x56495354;

pub const TEST_DIM: u32 = 3;

pub fn test_dsn() -> Option<String> {
	std::env::var("VISTA_PG_DSN").ok()
}

pub fn test_config(dsn: String) -> vista_config::Config {
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

pub struct DbLock {
	_guard: tokio::sync::MutexGuard<'static, ()>,
	_conn: sqlx::PgConnection,
}

pub async fn test_lock(dsn: &str) -> color_eyre::Result<DbLock> {
	let guard = TEST_LOCK.lock().await;
	let mut conn = sqlx::PgConnection::connect(dsn).await?;
	sqlx::query("SELECT pg_advisory_lock($1)").bind(TEST_DB_LOCK_KEY).execute(&mut conn).await?;
	Ok(DbLock { _guard: guard, _conn: conn })
}

pub async fn build_service(
	cfg: vista_config::Config,
	providers: Providers,
) -> color_eyre::Result<VistaService> {
	let db = Db::connect(&cfg.storage).await?;
	db.ensure_schema(cfg.providers.embedding.dimensions).await?;
	Ok(VistaService::with_providers(cfg, db, providers))
}

pub async fn reset_db(pool: &sqlx::PgPool) -> color_eyre::Result<()> {
	sqlx::query("TRUNCATE images CASCADE").execute(pool).await?;
	sqlx::query("TRUNCATE index_progress").execute(pool).await?;
	sqlx::query("DELETE FROM index_meta").execute(pool).await?;
	Ok(())
}

/// Embedding stub answering a fixed vector for every text.
pub struct StubEmbedding {
	pub vector: Vec<f32>,
}

impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a vista_config::EmbeddingConfig,
		texts: &'a [String],
	) -> vista_service::BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let vectors = texts.iter().map(|_| self.vector.clone()).collect();
		Box::pin(async move { Ok(vectors) })
	}
}

/// VLM stub accepting every image, with canned evidence and a call counter.
pub struct MatchAllVlm {
	pub confidence: f32,
	pub room: Option<String>,
	pub evidence: VlmEvidence,
	pub calls: Arc<AtomicUsize>,
}

impl MatchAllVlm {
	pub fn new(confidence: f32, room: &str) -> Self {
		Self {
			confidence,
			room: Some(room.to_string()),
			evidence: VlmEvidence::default(),
			calls: Arc::new(AtomicUsize::new(0)),
		}
	}
}

impl VlmProvider for MatchAllVlm {
	fn verify<'a>(
		&'a self,
		_cfg: &'a vista_config::VlmConfig,
		request: &'a VerifyRequest,
	) -> vista_service::BoxFuture<'a, color_eyre::Result<VerifyResponse>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let verdicts = request
			.images
			.iter()
			.map(|image| VlmVerdict {
				image_id: image.image_id.clone(),
				matches: true,
				confidence: self.confidence,
				room: self.room.clone(),
				evidence: self.evidence.clone(),
				notes: "stub accepted".to_string(),
			})
			.collect();
		Box::pin(async move { Ok(VerifyResponse::Verdicts(verdicts)) })
	}
}

/// VLM stub rejecting every image.
pub struct RejectAllVlm;

impl VlmProvider for RejectAllVlm {
	fn verify<'a>(
		&'a self,
		_cfg: &'a vista_config::VlmConfig,
		request: &'a VerifyRequest,
	) -> vista_service::BoxFuture<'a, color_eyre::Result<VerifyResponse>> {
		let verdicts = request
			.images
			.iter()
			.map(|image| VlmVerdict {
				image_id: image.image_id.clone(),
				matches: false,
				confidence: 0.2,
				room: None,
				evidence: VlmEvidence::default(),
				notes: "stub rejected".to_string(),
			})
			.collect();
		Box::pin(async move { Ok(VerifyResponse::Verdicts(verdicts)) })
	}
}

/// VLM stub whose output never parses, even after the reformat follow-up.
pub struct UnparseableVlm;

impl VlmProvider for UnparseableVlm {
	fn verify<'a>(
		&'a self,
		_cfg: &'a vista_config::VlmConfig,
		_request: &'a VerifyRequest,
	) -> vista_service::BoxFuture<'a, color_eyre::Result<VerifyResponse>> {
		Box::pin(async move { Ok(VerifyResponse::Unparseable) })
	}
}

pub fn providers_with(embedding: StubEmbedding, vlm: Arc<dyn VlmProvider>) -> Providers {
	Providers::new(Arc::new(embedding), vlm)
}

/// Seed one fully-populated image row with its children.
pub async fn seed_image(
	db: &Db,
	external_id: &str,
	room: &str,
	objects: Vec<NewObject>,
	embed: Vec<f32>,
) -> color_eyre::Result<uuid::Uuid> {
	let image = NewImage {
		external_id: external_id.to_string(),
		file_name: format!("{external_id}.jpg"),
		folder_path: "/test".to_string(),
		width: 800,
		height: 600,
		phash: external_id.len() as u64,
		captured_at: None,
		room: room.to_string(),
		room_confidence: 0.8,
		style_tags: Vec::new(),
		objects,
		room_scores: vec![(room.to_string(), 0.8)],
		caption_en: format!("{room} test image."),
		facts: serde_json::json!({ "room": room }),
		embed_en: Some(embed),
		indexed_at: time::OffsetDateTime::now_utc(),
	};
	Ok(vista_storage::writer::upsert_image(db, &image).await?)
}

pub fn object(label: &str, color: &str, material: &str) -> NewObject {
	NewObject {
		label: label.to_string(),
		label_confidence: 0.9,
		bbox: vista_domain::bbox::BBox { x: 0, y: 0, w: 100, h: 80 },
		color_name: color.to_string(),
		color_lab: vista_domain::palette::Lab::new(50.0, 0.0, 0.0),
		secondary_colors: serde_json::json!([]),
		material: material.to_string(),
		material_confidence: 0.6,
		area_pixels: 8_000,
	}
}
