use std::sync::Arc;

use time::OffsetDateTime;
use tokio::{
	sync::{Mutex, mpsc},
	task::JoinSet,
};
use tracing::{error, info, warn};
use vista_config::Config;
use vista_storage::{db::Db, retrieve, writer};

use crate::{
	IndexError,
	analyze::{self, Analyzed},
	caption,
	crawl::{self, WorkItem},
	fetch::{self, Fetched},
	progress::ProgressTracker,
	source::{SourceError, SourceStore},
};

const CRAWL_QUEUE: usize = 256;
const FETCH_QUEUE: usize = 64;
const ANALYZE_QUEUE: usize = 32;
const PERSIST_QUEUE: usize = 64;
const FETCHER_POOL: usize = 8;
const EMBED_POOL: usize = 2;
const PERSISTER_POOL: usize = 2;
/// Persist the progress snapshot every this many images.
const PROGRESS_PERSIST_EVERY: u64 = 25;

/// The indexing pipeline: long-lived worker pools connected by bounded
/// queues. Crawler → fetchers → analyzers → caption/embed → persisters.
pub struct IndexPipeline {
	pub cfg: Config,
	pub db: Arc<Db>,
	pub source: Arc<dyn SourceStore>,
	pub progress: Arc<ProgressTracker>,
}

impl IndexPipeline {
	pub fn new(
		cfg: Config,
		db: Arc<Db>,
		source: Arc<dyn SourceStore>,
		progress: Arc<ProgressTracker>,
	) -> Self {
		Self { cfg, db, source, progress }
	}

	/// One full crawl-and-index run. The caller owns the `progress.start()`
	/// claim; this finishes the tracker on every exit path.
	pub async fn run(&self) -> Result<(), IndexError> {
		let result = self.run_inner().await;
		self.progress.finish();
		self.progress.persist(&self.db).await;
		if let Err(err) = &result {
			error!(error = %err, "Indexing run aborted.");
		}
		result
	}

	async fn run_inner(&self) -> Result<(), IndexError> {
		let analyzer_pool =
			std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(4);
		info!(analyzers = analyzer_pool, "Indexing run started.");

		let (work_tx, work_rx) = mpsc::channel::<WorkItem>(CRAWL_QUEUE);
		let (fetched_tx, fetched_rx) = mpsc::channel::<Fetched>(FETCH_QUEUE);
		let (analyzed_tx, analyzed_rx) = mpsc::channel::<Analyzed>(ANALYZE_QUEUE);
		let (ready_tx, ready_rx) = mpsc::channel::<writer::NewImage>(PERSIST_QUEUE);

		let mut workers = JoinSet::new();

		let work_rx = Arc::new(Mutex::new(work_rx));
		for _ in 0..FETCHER_POOL {
			let rx = work_rx.clone();
			let tx = fetched_tx.clone();
			let source = self.source.clone();
			let db = self.db.clone();
			let progress = self.progress.clone();
			let max_px = self.cfg.indexing.max_image_px;
			workers.spawn(async move {
				while let Some(item) = next(&rx).await {
					progress.set_current_file(&item.name);
					let name = item.name.clone();
					match fetch::fetch_stage(max_px, source.as_ref(), &db, item).await {
						Ok(Some(fetched)) =>
							if tx.send(fetched).await.is_err() {
								break;
							},
						Ok(None) => {
							progress.push_error(format!("decode {name}: dropped"));
							progress.inc_processed();
						},
						Err(SourceError::Auth(message)) =>
							return Err(IndexError::SourceAuth(message)),
						Err(SourceError::Transient(message)) => {
							warn!(file = %name, error = %message, "Fetch failed.");
							progress.push_error(format!("fetch {name}: {message}"));
							progress.inc_processed();
						},
					}
				}
				Ok(())
			});
		}
		drop(fetched_tx);

		let fetched_rx = Arc::new(Mutex::new(fetched_rx));
		for _ in 0..analyzer_pool {
			let rx = fetched_rx.clone();
			let tx = analyzed_tx.clone();
			let cfg = self.cfg.clone();
			workers.spawn(async move {
				while let Some(fetched) = next(&rx).await {
					let analyzed = analyze::analyze_stage(&cfg, fetched).await;
					if tx.send(analyzed).await.is_err() {
						break;
					}
				}
				Ok(())
			});
		}
		drop(analyzed_tx);

		let analyzed_rx = Arc::new(Mutex::new(analyzed_rx));
		for _ in 0..EMBED_POOL {
			let rx = analyzed_rx.clone();
			let tx = ready_tx.clone();
			let embed_cfg = self.cfg.providers.embedding.clone();
			let progress = self.progress.clone();
			workers.spawn(async move {
				while let Some(analyzed) = next(&rx).await {
					let name = analyzed.item.name.clone();
					let (image, embed_failed) =
						caption::caption_stage(&embed_cfg, analyzed, OffsetDateTime::now_utc())
							.await;
					if embed_failed {
						progress.push_error(format!("embed {name}: stored without vector"));
					}
					if tx.send(image).await.is_err() {
						break;
					}
				}
				Ok(())
			});
		}
		drop(ready_tx);

		let ready_rx = Arc::new(Mutex::new(ready_rx));
		for _ in 0..PERSISTER_POOL {
			let rx = ready_rx.clone();
			let db = self.db.clone();
			let progress = self.progress.clone();
			workers.spawn(async move {
				while let Some(image) = next(&rx).await {
					let name = image.file_name.clone();
					match writer::upsert_image(&db, &image).await {
						Ok(image_id) => {
							info!(file = %name, image_id = %image_id, room = %image.room, "Indexed.");
						},
						Err(err) => {
							warn!(file = %name, error = %err, "Persist failed.");
							progress.push_error(format!("persist {name}: {err}"));
						},
					}
					progress.inc_processed();
					let processed = progress.snapshot().processed_count;
					if processed % PROGRESS_PERSIST_EVERY == 0 {
						progress.persist(&db).await;
					}
				}
				Ok(())
			});
		}

		let crawl_result = crawl::crawl(
			self.source.as_ref(),
			&self.db,
			&self.cfg.source.root_id,
			"",
			self.cfg.indexing.incremental,
			&self.progress,
			&work_tx,
		)
		.await;
		drop(work_tx);

		let mut failure: Option<IndexError> = None;
		while let Some(joined) = workers.join_next().await {
			match joined {
				Ok(Ok(())) => {},
				Ok(Err(err)) =>
					if failure.is_none() {
						failure = Some(err);
					},
				Err(err) => {
					error!(error = %err, "Pipeline worker panicked.");
					if failure.is_none() {
						failure = Some(IndexError::Fatal(format!("worker panicked: {err}")));
					}
				},
			}
		}

		crawl_result?;
		if let Some(err) = failure {
			return Err(err);
		}
		info!("Indexing run completed.");
		Ok(())
	}

	/// Re-run the full per-image pipeline for one known external id.
	/// Returns `None` when the id has never been indexed.
	pub async fn reindex_one(
		&self,
		external_id: &str,
	) -> Result<Option<serde_json::Value>, IndexError> {
		let Some(existing) = retrieve::image_by_external_id(&self.db, external_id)
			.await
			.map_err(IndexError::storage)?
		else {
			return Ok(None);
		};

		let item = WorkItem {
			external_id: external_id.to_string(),
			folder_path: existing.folder_path,
			name: existing.file_name,
			mime: "image/jpeg".to_string(),
			mtime: None,
		};
		let fetched = fetch::fetch_stage(
			self.cfg.indexing.max_image_px,
			self.source.as_ref(),
			&self.db,
			item,
		)
		.await
		.map_err(IndexError::from)?
		.ok_or_else(|| IndexError::Fatal("image failed to decode".to_string()))?;

		let analyzed = analyze::analyze_stage(&self.cfg, fetched).await;
		let (image, _embed_failed) = caption::caption_stage(
			&self.cfg.providers.embedding,
			analyzed,
			OffsetDateTime::now_utc(),
		)
		.await;
		let image_id = writer::upsert_image(&self.db, &image).await.map_err(IndexError::storage)?;

		Ok(Some(serde_json::json!({
			"status": "reindexed",
			"image_id": image_id,
			"room": image.room,
			"objects_count": image.objects.len(),
			"caption": image.caption_en,
		})))
	}
}

async fn next<T>(rx: &Arc<Mutex<mpsc::Receiver<T>>>) -> Option<T> {
	rx.lock().await.recv().await
}
