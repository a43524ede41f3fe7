use time::OffsetDateTime;
use tracing::warn;
use vista_domain::caption::{self, CaptionFact};
use vista_providers::embedding;
use vista_storage::writer::NewImage;

use crate::analyze::{Analyzed, build_facts};

/// Retry delays after a failed embedding request.
const EMBED_RETRY_DELAYS_MS: &[u64] = &[1_000, 4_000];

/// Render the caption and request its embedding. On exhausted retries the
/// image is persisted without a vector (reachable by SQL filters only); the
/// returned flag tells the caller to record the error.
pub async fn caption_stage(
	cfg: &vista_config::EmbeddingConfig,
	analyzed: Analyzed,
	indexed_at: OffsetDateTime,
) -> (NewImage, bool) {
	let facts = build_facts(&analyzed);
	let caption_facts: Vec<CaptionFact> = analyzed
		.objects
		.iter()
		.map(|object| CaptionFact {
			label: object.label.clone(),
			color: Some(object.color_name.clone()),
			material: Some(object.material.clone()),
			area_pixels: object.area_pixels,
		})
		.collect();
	let caption_en = caption::render(analyzed.room.room, &caption_facts, &[]);

	let (embed_en, embed_failed) = embed_with_retries(cfg, &caption_en).await;

	let image = NewImage {
		external_id: analyzed.item.external_id,
		file_name: analyzed.item.name,
		folder_path: analyzed.item.folder_path,
		width: analyzed.width,
		height: analyzed.height,
		phash: analyzed.phash,
		captured_at: None,
		room: analyzed.room.room.to_string(),
		room_confidence: analyzed.room.confidence,
		style_tags: Vec::new(),
		objects: analyzed.objects,
		room_scores: analyzed
			.room
			.scores
			.iter()
			.map(|(room, score)| ((*room).to_string(), *score))
			.collect(),
		caption_en,
		facts,
		embed_en,
		indexed_at,
	};
	(image, embed_failed)
}

async fn embed_with_retries(
	cfg: &vista_config::EmbeddingConfig,
	caption: &str,
) -> (Option<Vec<f32>>, bool) {
	let texts = [caption.to_string()];
	let mut delays = EMBED_RETRY_DELAYS_MS.iter();
	loop {
		match embedding::embed(cfg, &texts).await {
			Ok(mut vectors) if !vectors.is_empty() => {
				let vector = vectors.remove(0);
				if vector.len() == cfg.dimensions as usize {
					return (Some(vector), false);
				}
				warn!(
					got = vector.len(),
					expected = cfg.dimensions,
					"Embedding dimension mismatch; storing without vector."
				);
				return (None, true);
			},
			Ok(_) => {
				warn!("Embedding provider returned no vectors.");
				return (None, true);
			},
			Err(err) => match delays.next() {
				Some(delay_ms) => {
					warn!(error = %err, "Embedding failed; retrying.");
					tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
				},
				None => {
					warn!(error = %err, "Embedding failed after retries; storing without vector.");
					return (None, true);
				},
			},
		}
	}
}
