use serde_json::json;
use tracing::warn;
use vista_domain::{
	bbox::BBox,
	rooms::{self, RoomVote},
	vocab,
};
use vista_providers::detector::{self, Detection};
use vista_storage::writer::NewObject;
use vista_vision::{color, material};

use crate::fetch::Fetched;

const MIN_DETECTION_SCORE: f32 = 0.25;
const IOU_DEDUP_THRESHOLD: f32 = 0.6;

#[derive(Debug)]
pub struct Analyzed {
	pub item: crate::crawl::WorkItem,
	pub width: u32,
	pub height: u32,
	pub phash: u64,
	pub near_duplicate_of: Option<String>,
	pub objects: Vec<NewObject>,
	pub room: RoomVote,
	pub partial: bool,
}

/// Passes A–D for one image. Pass A consults the detector; B–D are local and
/// deterministic. A failed pass leaves whatever facts exist and marks the
/// analysis partial instead of aborting the image.
pub async fn analyze_stage(cfg: &vista_config::Config, fetched: Fetched) -> Analyzed {
	let Fetched { item, bytes, raster, phash, near_duplicate_of } = fetched;

	let (detections, partial) = match detector::detect(&cfg.providers.detector, bytes).await {
		Ok(raw) => (dedupe_detections(raw), false),
		Err(err) => {
			warn!(file = %item.name, error = %err, "Object detection failed; persisting partial facts.");
			(Vec::new(), true)
		},
	};

	let scale = raster.image.width() as f32 / raster.original_width.max(1) as f32;
	let objects = tokio::task::spawn_blocking({
		let image = raster.image.clone();
		move || {
			detections
				.into_iter()
				.map(|(label, detection)| describe_object(&image, scale, label, detection))
				.collect::<Vec<_>>()
		}
	})
	.await
	.unwrap_or_default();

	let votes: Vec<(&str, f32)> =
		objects.iter().map(|object| (object.label.as_str(), object.label_confidence)).collect();
	let room = rooms::classify_room(&votes);

	Analyzed {
		width: raster.original_width,
		height: raster.original_height,
		item,
		phash,
		near_duplicate_of,
		objects,
		room,
		partial,
	}
}

/// Pass A post-processing: score floor, canonical labels, IoU dedup per
/// label keeping the higher score.
pub fn dedupe_detections(raw: Vec<Detection>) -> Vec<(&'static str, Detection)> {
	let mut canonical: Vec<(&'static str, Detection)> = raw
		.into_iter()
		.filter(|detection| detection.score >= MIN_DETECTION_SCORE)
		.filter_map(|detection| {
			vocab::canonicalize_label(&detection.label).map(|label| (label, detection))
		})
		.collect();
	canonical.sort_by(|a, b| {
		b.1.score.partial_cmp(&a.1.score).unwrap_or(std::cmp::Ordering::Equal)
	});

	let mut kept: Vec<(&'static str, Detection)> = Vec::new();
	for (label, detection) in canonical {
		let overlaps = kept.iter().any(|(kept_label, kept_detection)| {
			*kept_label == label && kept_detection.bbox.iou(&detection.bbox) > IOU_DEDUP_THRESHOLD
		});
		if !overlaps {
			kept.push((label, detection));
		}
	}
	kept
}

/// Passes B and C for one detection: dominant colors and material.
fn describe_object(
	image: &image::RgbImage,
	scale: f32,
	label: &'static str,
	detection: Detection,
) -> NewObject {
	let scaled = scale_bbox(&detection.bbox, scale);
	let clusters = color::extract(image, &scaled);
	let (color_name, color_lab) = clusters
		.first()
		.map(|cluster| (cluster.name.to_string(), cluster.lab))
		.unwrap_or_else(|| ("unknown".to_string(), vista_domain::palette::Lab::new(0.0, 0.0, 0.0)));
	let secondary_colors = json!(
		clusters
			.iter()
			.skip(1)
			.filter(|cluster| cluster.share >= 0.10)
			.map(|cluster| json!({ "name": cluster.name, "lab": cluster.lab, "ratio": cluster.share }))
			.collect::<Vec<_>>()
	);
	let (material, material_confidence) = material::infer(image, &scaled, label);

	NewObject {
		label: label.to_string(),
		label_confidence: detection.score,
		bbox: detection.bbox,
		color_name,
		color_lab,
		secondary_colors,
		material: material.to_string(),
		material_confidence,
		area_pixels: detection.bbox.area(),
	}
}

fn scale_bbox(bbox: &BBox, scale: f32) -> BBox {
	if (scale - 1.0).abs() < f32::EPSILON {
		return *bbox;
	}
	BBox {
		x: (bbox.x as f32 * scale) as u32,
		y: (bbox.y as f32 * scale) as u32,
		w: ((bbox.w as f32 * scale) as u32).max(1),
		h: ((bbox.h as f32 * scale) as u32).max(1),
	}
}

/// The structured facts blob persisted with the caption.
pub fn build_facts(analyzed: &Analyzed) -> serde_json::Value {
	let objects: Vec<serde_json::Value> = analyzed
		.objects
		.iter()
		.map(|object| {
			json!({
				"label": object.label,
				"color": object.color_name,
				"material": object.material,
			})
		})
		.collect();
	let mut colors: Vec<&str> = analyzed
		.objects
		.iter()
		.map(|object| object.color_name.as_str())
		.filter(|name| *name != "unknown")
		.collect();
	colors.sort_unstable();
	colors.dedup();
	let mut materials: Vec<&str> = analyzed
		.objects
		.iter()
		.map(|object| object.material.as_str())
		.filter(|name| *name != "unknown")
		.collect();
	materials.sort_unstable();
	materials.dedup();

	let mut facts = json!({
		"room": analyzed.room.room,
		"room_confidence": analyzed.room.confidence,
		"objects": objects,
		"colors": colors,
		"materials": materials,
		"style": [],
	});
	if analyzed.partial {
		facts["analysis_partial"] = json!(true);
	}
	if let Some(other) = &analyzed.near_duplicate_of {
		facts["near_duplicate_of"] = json!(other);
	}
	facts
}

#[cfg(test)]
mod tests {
	use super::*;

	fn detection(label: &str, score: f32, x: u32) -> Detection {
		Detection { label: label.to_string(), score, bbox: BBox { x, y: 0, w: 100, h: 100 } }
	}

	#[test]
	fn low_scores_are_filtered() {
		let kept = dedupe_detections(vec![detection("sofa", 0.2, 0), detection("sofa", 0.5, 200)]);
		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].1.score, 0.5);
	}

	#[test]
	fn unknown_labels_are_dropped() {
		let kept = dedupe_detections(vec![detection("person", 0.9, 0)]);
		assert!(kept.is_empty());
	}

	#[test]
	fn overlapping_same_label_keeps_higher_score() {
		let kept = dedupe_detections(vec![
			detection("couch", 0.6, 0),
			detection("sofa", 0.9, 10),
		]);
		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].0, "sofa");
		assert_eq!(kept[0].1.score, 0.9);
	}

	#[test]
	fn overlapping_different_labels_both_survive() {
		let kept = dedupe_detections(vec![
			detection("sofa", 0.9, 0),
			detection("chair", 0.8, 10),
		]);
		assert_eq!(kept.len(), 2);
	}

	#[test]
	fn disjoint_same_label_both_survive() {
		let kept = dedupe_detections(vec![
			detection("chair", 0.9, 0),
			detection("chair", 0.8, 500),
		]);
		assert_eq!(kept.len(), 2);
	}

	#[test]
	fn bbox_scaling_rounds_down_but_never_to_zero() {
		let scaled = scale_bbox(&BBox { x: 100, y: 50, w: 3, h: 3 }, 0.5);
		assert_eq!(scaled, BBox { x: 50, y: 25, w: 1, h: 1 });
	}
}
