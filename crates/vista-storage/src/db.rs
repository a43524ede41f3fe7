use color_eyre::{Result, eyre::eyre};

#[derive(Clone)]
pub struct Db {
	pub pool: sqlx::PgPool,
}

impl Db {
	pub async fn connect(cfg: &vista_config::Storage) -> Result<Self> {
		let pool = sqlx::postgres::PgPoolOptions::new()
			.max_connections(cfg.pool_size)
			.acquire_timeout(std::time::Duration::from_millis(cfg.db_timeout_ms))
			.connect(&cfg.db_url)
			.await?;
		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self, vector_dim: u32) -> Result<()> {
		let sql = crate::schema::render_schema(vector_dim);
		let lock_id: i64 = 7_619_712;
		sqlx::query("SELECT pg_advisory_lock($1)").bind(lock_id).execute(&self.pool).await?;

		let mut failure: Option<color_eyre::Report> = None;
		for statement in sql.split(';') {
			let trimmed = statement.trim();
			if trimmed.is_empty() {
				continue;
			}
			if let Err(err) = sqlx::query(trimmed).execute(&self.pool).await {
				failure = Some(err.into());
				break;
			}
		}
		let _ =
			sqlx::query("SELECT pg_advisory_unlock($1)").bind(lock_id).execute(&self.pool).await;
		if let Some(err) = failure {
			return Err(err);
		}
		Ok(())
	}

	/// Pin the embedding dimension for the lifetime of the deployment.
	/// A mismatch against the recorded value is Fatal; swapping models with a
	/// different dimension forces a rebuild from an empty store.
	pub async fn ensure_embedding_dimension(&self, vector_dim: u32) -> Result<()> {
		let recorded: Option<String> =
			sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'embed_dim'")
				.fetch_optional(&self.pool)
				.await?;
		match recorded {
			Some(value) if value != vector_dim.to_string() => Err(eyre!(
				"Embedding dimension drift: store was built with {value}, configured {vector_dim}. \
				 Rebuild the index before serving."
			)),
			Some(_) => Ok(()),
			None => {
				sqlx::query(
					"INSERT INTO index_meta (key, value) VALUES ('embed_dim', $1) \
					 ON CONFLICT (key) DO NOTHING",
				)
				.bind(vector_dim.to_string())
				.execute(&self.pool)
				.await?;
				Ok(())
			},
		}
	}
}
