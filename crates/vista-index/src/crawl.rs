use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{info, warn};
use vista_providers::backoff::listing_backoff;
use vista_storage::{db::Db, writer};

use crate::{
	IndexError,
	progress::ProgressTracker,
	source::{FolderEntry, SourceError, SourceStore},
};

const LISTING_ATTEMPTS: u32 = 5;
const IMAGE_MIMES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/heic"];

#[derive(Debug, Clone)]
pub struct WorkItem {
	pub external_id: String,
	pub folder_path: String,
	pub name: String,
	pub mime: String,
	pub mtime: Option<i64>,
}

/// Depth-first traversal of the source tree, emitting work items over a
/// bounded channel so downstream backpressure throttles listing. Only auth
/// errors abort the crawl; a folder that keeps failing transiently is logged
/// and skipped.
pub async fn crawl(
	source: &dyn SourceStore,
	db: &Db,
	root_id: &str,
	root_path: &str,
	incremental: bool,
	progress: &ProgressTracker,
	tx: &mpsc::Sender<WorkItem>,
) -> Result<(), IndexError> {
	let mut stack = vec![(root_id.to_string(), root_path.to_string())];
	while let Some((folder_id, folder_path)) = stack.pop() {
		let entries = match list_with_retry(source, &folder_id).await {
			Ok(entries) => entries,
			Err(SourceError::Auth(message)) => return Err(IndexError::SourceAuth(message)),
			Err(SourceError::Transient(message)) => {
				warn!(folder = %folder_path, error = %message, "Folder listing kept failing; skipping.");
				progress.push_error(format!("listing {folder_path}: {message}"));
				continue;
			},
		};
		info!(folder = %folder_path, entries = entries.len(), "Crawled folder.");

		for entry in entries {
			if entry.is_folder {
				stack.push((entry.id.clone(), format!("{folder_path}/{}", entry.name)));
				continue;
			}
			if !wants_mime(&entry.mime) {
				continue;
			}
			if incremental {
				let indexed_at = writer::indexed_at(db, &entry.id)
					.await
					.map_err(IndexError::storage)?;
				if should_skip(indexed_at, entry.mtime) {
					continue;
				}
			}
			progress.add_total(1);
			let item = WorkItem {
				external_id: entry.id,
				folder_path: folder_path.clone(),
				name: entry.name,
				mime: entry.mime,
				mtime: entry.mtime,
			};
			if tx.send(item).await.is_err() {
				// Downstream shut down; nothing left to feed.
				return Ok(());
			}
		}
	}
	Ok(())
}

async fn list_with_retry(
	source: &dyn SourceStore,
	folder_id: &str,
) -> Result<Vec<FolderEntry>, SourceError> {
	let mut attempt = 1;
	loop {
		match source.list_folder(folder_id).await {
			Ok(entries) => return Ok(entries),
			Err(SourceError::Auth(message)) => return Err(SourceError::Auth(message)),
			Err(SourceError::Transient(message)) if attempt < LISTING_ATTEMPTS => {
				warn!(folder_id, attempt, error = %message, "Folder listing failed; backing off.");
				tokio::time::sleep(listing_backoff(attempt)).await;
				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}

pub(crate) fn wants_mime(mime: &str) -> bool {
	IMAGE_MIMES.contains(&mime)
}

/// Incremental mode skips files whose source mtime is not newer than the
/// stored `indexed_at`. Files with no reported mtime are always re-indexed.
pub(crate) fn should_skip(indexed_at: Option<OffsetDateTime>, mtime: Option<i64>) -> bool {
	match (indexed_at, mtime) {
		(Some(indexed_at), Some(mtime)) => match OffsetDateTime::from_unix_timestamp(mtime) {
			Ok(modified) => modified <= indexed_at,
			Err(_) => false,
		},
		_ => false,
	}
}
