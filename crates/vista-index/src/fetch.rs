use tracing::{info, warn};
use vista_storage::{db::Db, writer};
use vista_vision::{phash, raster::Raster};

use crate::{
	crawl::WorkItem,
	source::{SourceError, SourceStore},
};

/// Hamming budget for the same-folder near-duplicate hint.
const NEAR_DUPLICATE_DISTANCE: u32 = 6;

#[derive(Debug)]
pub struct Fetched {
	pub item: WorkItem,
	pub bytes: Vec<u8>,
	pub raster: Raster,
	pub phash: u64,
	pub near_duplicate_of: Option<String>,
}

/// Download and decode one work item. Decode failures drop the item
/// (`Ok(None)`); auth failures bubble up and halt the run. A same-folder
/// phash neighbor is recorded as a hint, never a reason to skip.
pub async fn fetch_stage(
	max_image_px: u32,
	source: &dyn SourceStore,
	db: &Db,
	item: WorkItem,
) -> Result<Option<Fetched>, SourceError> {
	let file = source.fetch_bytes(&item.external_id).await?;
	let bytes = file.bytes;

	let decode_bytes = bytes.clone();
	let decoded = tokio::task::spawn_blocking(move || {
		let raster = vista_vision::raster::decode(&decode_bytes, max_image_px)?;
		let hash = phash::compute(&raster.image);
		Ok::<_, color_eyre::Report>((raster, hash))
	})
	.await
	.map_err(|err| SourceError::Transient(format!("Decode task failed: {err}.")))?;

	let (raster, hash) = match decoded {
		Ok(value) => value,
		Err(err) => {
			warn!(file = %item.name, error = %err, "Image failed to decode; dropping.");
			return Ok(None);
		},
	};

	let near_duplicate_of = match writer::find_near_duplicate(
		db,
		&item.folder_path,
		&item.external_id,
		hash,
		NEAR_DUPLICATE_DISTANCE,
	)
	.await
	{
		Ok(Some(other)) => {
			info!(file = %item.name, duplicate_of = %other, "Near-duplicate phash in folder.");
			Some(other)
		},
		Ok(None) => None,
		Err(err) => {
			warn!(file = %item.name, error = %err, "Near-duplicate lookup failed.");
			None
		},
	};

	Ok(Some(Fetched { item, bytes, raster, phash: hash, near_duplicate_of }))
}
