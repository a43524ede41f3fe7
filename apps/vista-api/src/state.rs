use std::sync::Arc;

use vista_index::{pipeline::IndexPipeline, progress::ProgressTracker, source::HttpSourceStore};
use vista_service::{Providers, VistaService};
use vista_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<VistaService>,
	pub pipeline: Arc<IndexPipeline>,
	pub progress: Arc<ProgressTracker>,
}

impl AppState {
	pub async fn new(cfg: vista_config::Config) -> color_eyre::Result<Self> {
		Self::with_providers(cfg, Providers::default()).await
	}

	/// Startup order matters: schema bootstrap, then the embedding-dimension
	/// pin — a drifted dimension refuses to serve (Fatal).
	pub async fn with_providers(
		cfg: vista_config::Config,
		providers: Providers,
	) -> color_eyre::Result<Self> {
		let db = Db::connect(&cfg.storage).await?;
		db.ensure_schema(cfg.providers.embedding.dimensions).await?;
		db.ensure_embedding_dimension(cfg.providers.embedding.dimensions).await?;

		let source = Arc::new(
			HttpSourceStore::new(cfg.source.clone())
				.map_err(|err| color_eyre::eyre::eyre!(err.to_string()))?,
		);
		let progress = Arc::new(ProgressTracker::new());
		progress.restore(&db).await;

		let pipeline = Arc::new(IndexPipeline::new(
			cfg.clone(),
			Arc::new(db.clone()),
			source,
			progress.clone(),
		));
		let service = Arc::new(VistaService::with_providers(cfg, db, providers));
		Ok(Self { service, pipeline, progress })
	}
}
