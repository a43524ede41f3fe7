pub mod cache;
pub mod health;
pub mod rank;
pub mod search;
pub mod stats;
pub mod verify;

use std::{future::Future, pin::Pin, sync::Arc};

use vista_config::{Config, EmbeddingConfig, VlmConfig};
use vista_providers::{limiter::TokenBucket, vlm::{VerifyRequest, VerifyResponse}};
use vista_storage::db::Db;

use crate::cache::VerdictCache;

pub use search::{SearchRequest, SearchResponse, SearchResult};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// The error taxonomy. Only `Fatal` ever aborts a run; everything else is
/// logged with its query/image context and surfaced through the HTTP layer.
#[derive(Debug)]
pub enum ServiceError {
	Input { message: String },
	Auth { message: String },
	TransientUpstream { message: String },
	Parse { message: String },
	Partial { message: String },
	Fatal { message: String },
}

impl ServiceError {
	/// Wire name of the taxonomy kind.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Input { .. } => "InputError",
			Self::Auth { .. } => "AuthError",
			Self::TransientUpstream { .. } => "TransientUpstream",
			Self::Parse { .. } => "ParseError",
			Self::Partial { .. } => "Partial",
			Self::Fatal { .. } => "Fatal",
		}
	}

	pub fn message(&self) -> &str {
		match self {
			Self::Input { message }
			| Self::Auth { message }
			| Self::TransientUpstream { message }
			| Self::Parse { message }
			| Self::Partial { message }
			| Self::Fatal { message } => message,
		}
	}
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.kind(), self.message())
	}
}

impl std::error::Error for ServiceError {}

impl From<sqlx::Error> for ServiceError {
	fn from(err: sqlx::Error) -> Self {
		Self::TransientUpstream { message: err.to_string() }
	}
}

impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		classify_provider_error(&err.to_string())
	}
}

/// Provider failures carrying an auth status are operator problems, not
/// retries.
pub fn classify_provider_error(message: &str) -> ServiceError {
	if message.contains("401") || message.contains("403") {
		ServiceError::Auth { message: message.to_string() }
	} else {
		ServiceError::TransientUpstream { message: message.to_string() }
	}
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider: Send + Sync {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait VlmProvider: Send + Sync {
	fn verify<'a>(
		&'a self,
		cfg: &'a VlmConfig,
		request: &'a VerifyRequest,
	) -> BoxFuture<'a, color_eyre::Result<VerifyResponse>>;
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(vista_providers::embedding::embed(cfg, texts))
	}
}

impl VlmProvider for DefaultProviders {
	fn verify<'a>(
		&'a self,
		cfg: &'a VlmConfig,
		request: &'a VerifyRequest,
	) -> BoxFuture<'a, color_eyre::Result<VerifyResponse>> {
		Box::pin(vista_providers::vlm::verify(cfg, request))
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub vlm: Arc<dyn VlmProvider>,
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, vlm: Arc<dyn VlmProvider>) -> Self {
		Self { embedding, vlm }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self { embedding: provider.clone(), vlm: provider }
	}
}

/// The search engine: owns the provider clients, verdict cache, rate limiter
/// and DB pool. Constructed once and shared by reference; the progress
/// tracker is the only other process-wide state.
pub struct VistaService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
	pub cache: Arc<VerdictCache>,
	pub limiter: Arc<TokenBucket>,
	pub vlm_slots: Arc<tokio::sync::Semaphore>,
}

impl VistaService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_providers(cfg, db, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		let cache = Arc::new(VerdictCache::new(
			cfg.search.cache_ttl_days,
			cfg.search.cache_max_entries as usize,
		));
		let limiter = Arc::new(TokenBucket::new(cfg.search.vlm_rate_per_minute));
		let vlm_slots = Arc::new(tokio::sync::Semaphore::new(cfg.search.vlm_concurrency as usize));
		Self { cfg, db, providers, cache, limiter, vlm_slots }
	}
}
