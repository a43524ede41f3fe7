use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use vista_index::{
	IndexError, pipeline::IndexPipeline, progress::ProgressTracker, source::HttpSourceStore,
};
use vista_storage::db::Db;

const EXIT_CONFIG: u8 = 2;
const EXIT_AUTH: u8 = 3;
const EXIT_DB: u8 = 4;
const EXIT_SOURCE: u8 = 5;

#[derive(Debug, Parser)]
#[command(about = "Run one full VISTA indexing crawl to completion")]
struct Args {
	/// Re-index everything, ignoring stored mtimes.
	#[arg(long)]
	full: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
	if let Err(err) = color_eyre::install() {
		eprintln!("{err}");
		return ExitCode::FAILURE;
	}
	let args = Args::parse();

	let mut config = match vista_config::load() {
		Ok(config) => config,
		Err(err) => {
			eprintln!("Configuration error: {err}");
			return ExitCode::from(EXIT_CONFIG);
		},
	};
	if args.full {
		config.indexing.incremental = false;
	}
	let filter = tracing_subscriber::EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = match Db::connect(&config.storage).await {
		Ok(db) => db,
		Err(err) => {
			error!(error = %err, "Database is unreachable.");
			return ExitCode::from(EXIT_DB);
		},
	};
	if let Err(err) = db.ensure_schema(config.providers.embedding.dimensions).await {
		error!(error = %err, "Schema bootstrap failed.");
		return ExitCode::from(EXIT_DB);
	}
	if let Err(err) = db.ensure_embedding_dimension(config.providers.embedding.dimensions).await {
		error!(error = %err, "Embedding dimension check failed.");
		return ExitCode::from(EXIT_CONFIG);
	}

	let source = match HttpSourceStore::new(config.source.clone()) {
		Ok(source) => Arc::new(source),
		Err(err) => {
			error!(error = %err, "Source store client could not be built.");
			return ExitCode::from(EXIT_SOURCE);
		},
	};

	let progress = Arc::new(ProgressTracker::new());
	progress.restore(&db).await;
	progress.start(time::OffsetDateTime::now_utc());
	let pipeline = IndexPipeline::new(config, Arc::new(db), source, progress.clone());

	match pipeline.run().await {
		Ok(()) => {
			let snapshot = progress.snapshot();
			info!(
				processed = snapshot.processed_count,
				total = snapshot.total_count,
				errors = snapshot.errors.len(),
				"Indexing finished."
			);
			ExitCode::SUCCESS
		},
		Err(IndexError::SourceAuth(message)) => {
			error!(%message, "Source store rejected our credentials.");
			ExitCode::from(EXIT_AUTH)
		},
		Err(IndexError::SourceUnreachable(message)) => {
			error!(%message, "Source store is unreachable.");
			ExitCode::from(EXIT_SOURCE)
		},
		Err(IndexError::Storage(message)) => {
			error!(%message, "Storage failure aborted the run.");
			ExitCode::from(EXIT_DB)
		},
		Err(IndexError::Fatal(message)) => {
			error!(%message, "Fatal failure aborted the run.");
			ExitCode::FAILURE
		},
	}
}
