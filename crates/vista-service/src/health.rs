use serde::Serialize;
use tracing::warn;

use crate::VistaService;

#[derive(Debug, Serialize)]
pub struct Health {
	pub status: String,
	pub components: Components,
}

#[derive(Debug, Serialize)]
pub struct Components {
	pub db: String,
	pub embedder: String,
	pub vlm: String,
	pub source_store: String,
}

impl VistaService {
	/// Component health. The database is probed for real; provider and source
	/// checks report configuration presence so health polling never spends
	/// provider quota.
	pub async fn health(&self) -> Health {
		let db = match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.db.pool).await {
			Ok(_) => "ok".to_string(),
			Err(err) => {
				warn!(error = %err, "Health probe failed to reach the database.");
				format!("error: {err}")
			},
		};
		let components = Components {
			db,
			embedder: configured(!self.cfg.providers.embedding.url.is_empty()),
			vlm: configured(!self.cfg.providers.vlm.api_key.is_empty()),
			source_store: configured(!self.cfg.source.api_url.is_empty()),
		};
		let status = if components.db == "ok"
			&& components.embedder == "configured"
			&& components.vlm == "configured"
			&& components.source_store == "configured"
		{
			"ok".to_string()
		} else {
			"degraded".to_string()
		};
		Health { status, components }
	}
}

fn configured(present: bool) -> String {
	if present { "configured".to_string() } else { "missing".to_string() }
}
