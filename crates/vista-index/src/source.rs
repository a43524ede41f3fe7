use std::{future::Future, pin::Pin};

use serde::Deserialize;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source-store failures. Auth failures abort the crawl; everything else is
/// retried with backoff.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("auth: {0}")]
	Auth(String),
	#[error("{0}")]
	Transient(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FolderEntry {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub mime: String,
	#[serde(default)]
	pub is_folder: bool,
	/// Seconds since the Unix epoch, when the store reports one.
	#[serde(default)]
	pub mtime: Option<i64>,
}

#[derive(Debug)]
pub struct FileBytes {
	pub bytes: Vec<u8>,
	pub mtime: Option<i64>,
}

/// The external image store. The engine never writes through this interface.
pub trait SourceStore: Send + Sync {
	fn list_folder<'a>(
		&'a self,
		folder_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<FolderEntry>, SourceError>>;
	fn fetch_bytes<'a>(
		&'a self,
		file_id: &'a str,
	) -> BoxFuture<'a, Result<FileBytes, SourceError>>;
}

/// Thin HTTP adapter for a drive-style listing API:
/// `GET {base}/folders/{id}/children` and `GET {base}/files/{id}/content`.
pub struct HttpSourceStore {
	cfg: vista_config::Source,
	client: reqwest::Client,
}

impl HttpSourceStore {
	pub fn new(cfg: vista_config::Source) -> Result<Self, SourceError> {
		let client = reqwest::Client::builder()
			.timeout(std::time::Duration::from_millis(cfg.fetch_timeout_ms))
			.build()
			.map_err(|err| SourceError::Transient(err.to_string()))?;
		Ok(Self { cfg, client })
	}

	fn request(&self, url: String) -> reqwest::RequestBuilder {
		let mut builder = self.client.get(url);
		if let Some(key) = self.cfg.api_key.as_deref() {
			builder = builder.bearer_auth(key);
		}
		builder
	}
}

impl SourceStore for HttpSourceStore {
	fn list_folder<'a>(
		&'a self,
		folder_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<FolderEntry>, SourceError>> {
		Box::pin(async move {
			let url = format!("{}/folders/{folder_id}/children", self.cfg.api_url.trim_end_matches('/'));
			let res = self.request(url).send().await.map_err(transport_error)?;
			let res = check_status(res)?;
			res.json::<Vec<FolderEntry>>()
				.await
				.map_err(|err| SourceError::Transient(format!("Listing body was malformed: {err}.")))
		})
	}

	fn fetch_bytes<'a>(
		&'a self,
		file_id: &'a str,
	) -> BoxFuture<'a, Result<FileBytes, SourceError>> {
		Box::pin(async move {
			let url = format!("{}/files/{file_id}/content", self.cfg.api_url.trim_end_matches('/'));
			let res = self.request(url).send().await.map_err(transport_error)?;
			let res = check_status(res)?;
			let mtime = res
				.headers()
				.get("x-mtime")
				.and_then(|value| value.to_str().ok())
				.and_then(|value| value.parse().ok());
			let bytes = res
				.bytes()
				.await
				.map_err(|err| SourceError::Transient(err.to_string()))?;
			Ok(FileBytes { bytes: bytes.to_vec(), mtime })
		})
	}
}

fn transport_error(err: reqwest::Error) -> SourceError {
	SourceError::Transient(err.to_string())
}

fn check_status(res: reqwest::Response) -> Result<reqwest::Response, SourceError> {
	let status = res.status();
	if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
		return Err(SourceError::Auth(format!("Source store answered {status}.")));
	}
	if !status.is_success() {
		return Err(SourceError::Transient(format!("Source store answered {status}.")));
	}
	Ok(res)
}
