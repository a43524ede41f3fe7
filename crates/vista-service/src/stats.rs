use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{ServiceError, ServiceResult, VistaService};

#[derive(Debug, Serialize)]
pub struct StatsResponse {
	pub tables: TableCounts,
	pub distributions: Distributions,
}

#[derive(Debug, Serialize)]
pub struct TableCounts {
	pub images: i64,
	pub objects: i64,
	pub captions: i64,
	pub tags: i64,
	pub room_scores: i64,
}

#[derive(Debug, Serialize)]
pub struct Distributions {
	pub rooms: BTreeMap<String, i64>,
	pub objects: BTreeMap<String, i64>,
	pub colors: BTreeMap<String, i64>,
}

impl VistaService {
	pub async fn stats(&self) -> ServiceResult<StatsResponse> {
		let stats = vista_storage::stats::collect(&self.db)
			.await
			.map_err(|err| ServiceError::TransientUpstream { message: err.to_string() })?;
		Ok(StatsResponse {
			tables: TableCounts {
				images: stats.images,
				objects: stats.objects,
				captions: stats.captions,
				tags: stats.tags,
				room_scores: stats.room_scores,
			},
			distributions: Distributions {
				rooms: stats.rooms,
				objects: stats.object_labels,
				colors: stats.colors,
			},
		})
	}

	pub async fn image_detail(&self, image_id: Uuid) -> ServiceResult<Option<serde_json::Value>> {
		let detail = vista_storage::retrieve::image_detail(&self.db, image_id)
			.await
			.map_err(|err| ServiceError::TransientUpstream { message: err.to_string() })?;
		let Some(detail) = detail else {
			return Ok(None);
		};

		let objects: Vec<serde_json::Value> = detail
			.objects
			.iter()
			.map(|object| {
				serde_json::json!({
					"id": object.id,
					"label": object.label,
					"label_confidence": object.label_confidence,
					"bbox": object.bbox,
					"color_name": object.color_name,
					"color_lab": object.color_lab,
					"secondary_colors": object.secondary_colors,
					"material": object.material,
					"material_confidence": object.material_confidence,
					"area_pixels": object.area_pixels,
				})
			})
			.collect();

		Ok(Some(serde_json::json!({
			"image": {
				"id": detail.image.id,
				"external_id": detail.image.external_id,
				"file_name": detail.image.file_name,
				"folder_path": detail.image.folder_path,
				"width": detail.image.width,
				"height": detail.image.height,
				"room": detail.image.room,
				"room_confidence": detail.image.room_confidence,
				"style_tags": detail.image.style_tags,
			},
			"objects": objects,
			"caption": detail.caption.map(|caption| serde_json::json!({
				"caption_en": caption.caption_en,
				"facts": caption.facts,
			})),
			"tags": detail.tags,
		})))
	}
}
