use std::net::SocketAddr;

use clap::Parser;

use vista_api::{routes, state};

#[derive(Debug, Parser)]
#[command(about = "VISTA visual search API server")]
struct Args {
	/// Run schema bootstrap and exit.
	#[arg(long)]
	migrate_only: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	let config = vista_config::load()?;
	init_tracing(&config)?;

	let state = state::AppState::new(config).await?;
	if args.migrate_only {
		tracing::info!("Schema bootstrap completed.");
		return Ok(());
	}

	let http_addr: SocketAddr = state.service.cfg.service.http_bind.parse()?;
	let app = routes::router(state);
	let listener = tokio::net::TcpListener::bind(http_addr).await?;
	tracing::info!(%http_addr, "HTTP server listening.");
	axum::serve(listener, app).await?;
	Ok(())
}

fn init_tracing(config: &vista_config::Config) -> color_eyre::Result<()> {
	let filter = tracing_subscriber::EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
	Ok(())
}
