mod types;

pub use types::*;

use color_eyre::{Result, eyre::eyre};

/// Load configuration from the process environment and validate it.
/// Any failure here is Fatal; binaries exit with code 2.
pub fn load() -> Result<Config> {
	let cfg = Config::from_env()?;
	validate(&cfg)?;
	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.db_url.trim().is_empty() {
		return Err(eyre!("DB_URL must be non-empty."));
	}
	if cfg.source.root_id.trim().is_empty() {
		return Err(eyre!("SOURCE_ROOT_ID must be non-empty."));
	}
	if cfg.source.api_url.trim().is_empty() {
		return Err(eyre!("SOURCE_API_URL must be non-empty."));
	}
	if cfg.providers.detector.url.trim().is_empty() {
		return Err(eyre!("DETECTOR_URL must be non-empty."));
	}
	if cfg.providers.embedding.url.trim().is_empty() {
		return Err(eyre!("EMBED_MODEL_URL must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(eyre!("EMBED_DIM must be greater than zero."));
	}
	if cfg.providers.vlm.url.trim().is_empty() {
		return Err(eyre!("VLM_MODEL_URL must be non-empty."));
	}
	if cfg.providers.vlm.api_key.trim().is_empty() {
		return Err(eyre!("VLM_API_KEY must be non-empty."));
	}
	if !(0.0..=1.0).contains(&cfg.search.cutoff) {
		return Err(eyre!("CUTOFF must be within [0, 1]."));
	}
	if !(0.0..=1.0).contains(&cfg.search.alpha) {
		return Err(eyre!("ALPHA must be within [0, 1]."));
	}
	if cfg.search.batch_size == 0 {
		return Err(eyre!("BATCH_SIZE must be greater than zero."));
	}
	if cfg.search.vlm_concurrency == 0 {
		return Err(eyre!("VLM_CONCURRENCY must be greater than zero."));
	}
	if cfg.indexing.max_image_px == 0 {
		return Err(eyre!("MAX_IMAGE_PX must be greater than zero."));
	}
	Ok(())
}
