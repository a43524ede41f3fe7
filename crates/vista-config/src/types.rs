use color_eyre::{Result, eyre::eyre};

#[derive(Debug, Clone)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub source: Source,
	pub providers: Providers,
	pub search: Search,
	pub indexing: Indexing,
}

#[derive(Debug, Clone)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct Storage {
	pub db_url: String,
	pub pool_size: u32,
	pub db_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Source {
	pub api_url: String,
	pub root_id: String,
	pub api_key: Option<String>,
	pub fetch_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Providers {
	pub detector: DetectorConfig,
	pub embedding: EmbeddingConfig,
	pub vlm: VlmConfig,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
	pub url: String,
	pub api_key: Option<String>,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
	pub url: String,
	pub model: String,
	pub api_key: Option<String>,
	pub dimensions: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct VlmConfig {
	pub url: String,
	pub model: String,
	pub api_key: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Search {
	pub top_k: u32,
	pub batch_size: u32,
	pub cutoff: f32,
	pub final_limit: u32,
	pub alpha: f32,
	pub cache_ttl_days: u32,
	pub cache_max_entries: u32,
	pub vlm_concurrency: u32,
	pub vlm_rate_per_minute: u32,
	pub deadline_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Indexing {
	pub max_image_px: u32,
	pub incremental: bool,
}

impl Config {
	pub fn from_env() -> Result<Self> {
		Ok(Self {
			service: Service {
				http_bind: optional("HTTP_BIND").unwrap_or_else(|| "127.0.0.1:8000".to_string()),
				log_level: optional("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
			},
			storage: Storage {
				db_url: required("DB_URL")?,
				pool_size: parsed("DB_POOL_SIZE", 20)?,
				db_timeout_ms: parsed("DB_TIMEOUT_MS", 5_000)?,
			},
			source: Source {
				api_url: required("SOURCE_API_URL")?,
				root_id: required("SOURCE_ROOT_ID")?,
				api_key: optional("SOURCE_API_KEY"),
				fetch_timeout_ms: parsed("FETCH_TIMEOUT_MS", 30_000)?,
			},
			providers: Providers {
				detector: DetectorConfig {
					url: required("DETECTOR_URL")?,
					api_key: optional("DETECTOR_API_KEY"),
					timeout_ms: parsed("DETECTOR_TIMEOUT_MS", 30_000)?,
				},
				embedding: EmbeddingConfig {
					url: required("EMBED_MODEL_URL")?,
					model: optional("EMBED_MODEL")
						.unwrap_or_else(|| "text-embedding-3-small".to_string()),
					api_key: optional("EMBED_API_KEY"),
					dimensions: parsed("EMBED_DIM", 1_536)?,
					timeout_ms: parsed("EMBED_TIMEOUT_MS", 10_000)?,
				},
				vlm: VlmConfig {
					url: required("VLM_MODEL_URL")?,
					model: optional("VLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
					api_key: required("VLM_API_KEY")?,
					timeout_ms: parsed("VLM_TIMEOUT_MS", 45_000)?,
				},
			},
			search: Search {
				top_k: parsed("TOP_K", 120)?,
				batch_size: parsed("BATCH_SIZE", 12)?,
				cutoff: parsed("CUTOFF", 0.7)?,
				final_limit: parsed("FINAL_LIMIT", 24)?,
				alpha: parsed("ALPHA", 0.75)?,
				cache_ttl_days: parsed("CACHE_TTL_DAYS", 7)?,
				cache_max_entries: parsed("CACHE_MAX_ENTRIES", 100_000)?,
				vlm_concurrency: parsed("VLM_CONCURRENCY", 4)?,
				vlm_rate_per_minute: parsed("VLM_RATE_PER_MINUTE", 120)?,
				deadline_ms: parsed("SEARCH_DEADLINE_MS", 30_000)?,
			},
			indexing: Indexing {
				max_image_px: parsed("MAX_IMAGE_PX", 1_024)?,
				incremental: parsed("INCREMENTAL", true)?,
			},
		})
	}
}

fn optional(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &str) -> Result<String> {
	optional(name).ok_or_else(|| eyre!("{name} must be set."))
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
	match optional(name) {
		Some(raw) => raw.parse().map_err(|_| eyre!("{name} has an invalid value: {raw}.")),
		None => Ok(default),
	}
}
