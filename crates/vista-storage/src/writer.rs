use std::collections::BTreeSet;

use color_eyre::Result;
use time::OffsetDateTime;
use uuid::Uuid;
use vista_domain::{bbox::BBox, palette::Lab};

use crate::{db::Db, vector_to_pg};

/// Everything the pipeline produced for one image, persisted atomically.
#[derive(Debug, Clone)]
pub struct NewImage {
	pub external_id: String,
	pub file_name: String,
	pub folder_path: String,
	pub width: u32,
	pub height: u32,
	pub phash: u64,
	pub captured_at: Option<OffsetDateTime>,
	pub room: String,
	pub room_confidence: f32,
	pub style_tags: Vec<String>,
	pub objects: Vec<NewObject>,
	pub room_scores: Vec<(String, f32)>,
	pub caption_en: String,
	pub facts: serde_json::Value,
	pub embed_en: Option<Vec<f32>>,
	pub indexed_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewObject {
	pub label: String,
	pub label_confidence: f32,
	pub bbox: BBox,
	pub color_name: String,
	pub color_lab: Lab,
	pub secondary_colors: serde_json::Value,
	pub material: String,
	pub material_confidence: f32,
	pub area_pixels: u64,
}

/// The denormalized tag set for an image. This is the defining equation of
/// the `image_tags` table: `room:` always, `obj:`/`col:`/`mat:` per object
/// attribute that is known, `style:` per style tag.
pub fn derive_tags(image: &NewImage) -> BTreeSet<String> {
	let mut tags = BTreeSet::new();
	tags.insert(format!("room:{}", image.room));
	for object in &image.objects {
		tags.insert(format!("obj:{}", object.label));
		if object.color_name != "unknown" {
			tags.insert(format!("col:{}", object.color_name));
		}
		if object.material != "unknown" {
			tags.insert(format!("mat:{}", object.material));
		}
	}
	for style in &image.style_tags {
		tags.insert(format!("style:{style}"));
	}
	tags
}

/// Upsert one image and fully replace its children in a single transaction.
/// Re-running with identical inputs leaves identical rows (the image keeps
/// its id across re-indexing).
pub async fn upsert_image(db: &Db, image: &NewImage) -> Result<Uuid> {
	let mut tx = db.pool.begin().await?;

	let image_id: Uuid = sqlx::query_scalar(
		"INSERT INTO images \
		 (id, external_id, file_name, folder_path, width, height, phash, captured_at, room, \
		  room_confidence, style_tags, indexed_at) \
		 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12) \
		 ON CONFLICT (external_id) DO UPDATE SET \
		 file_name = EXCLUDED.file_name, folder_path = EXCLUDED.folder_path, \
		 width = EXCLUDED.width, height = EXCLUDED.height, phash = EXCLUDED.phash, \
		 captured_at = EXCLUDED.captured_at, room = EXCLUDED.room, \
		 room_confidence = EXCLUDED.room_confidence, style_tags = EXCLUDED.style_tags, \
		 indexed_at = EXCLUDED.indexed_at \
		 RETURNING id",
	)
	.bind(Uuid::new_v4())
	.bind(&image.external_id)
	.bind(&image.file_name)
	.bind(&image.folder_path)
	.bind(image.width as i32)
	.bind(image.height as i32)
	.bind(image.phash as i64)
	.bind(image.captured_at)
	.bind(&image.room)
	.bind(image.room_confidence)
	.bind(serde_json::json!(image.style_tags))
	.bind(image.indexed_at)
	.fetch_one(&mut *tx)
	.await?;

	for table in ["image_objects", "image_room_scores", "image_captions", "image_tags"] {
		sqlx::query(&format!("DELETE FROM {table} WHERE image_id = $1"))
			.bind(image_id)
			.execute(&mut *tx)
			.await?;
	}

	if !image.objects.is_empty() {
		let mut builder = sqlx::QueryBuilder::new(
			"INSERT INTO image_objects \
			 (id, image_id, label, label_confidence, bbox, color_name, color_lab, \
			  secondary_colors, material, material_confidence, area_pixels) ",
		);
		builder.push_values(&image.objects, |mut b, object| {
			b.push_bind(Uuid::new_v4())
				.push_bind(image_id)
				.push_bind(&object.label)
				.push_bind(object.label_confidence)
				.push_bind(serde_json::json!(object.bbox))
				.push_bind(&object.color_name)
				.push_bind(serde_json::json!(object.color_lab))
				.push_bind(&object.secondary_colors)
				.push_bind(&object.material)
				.push_bind(object.material_confidence)
				.push_bind(object.area_pixels as i64);
		});
		builder.build().execute(&mut *tx).await?;
	}

	if !image.room_scores.is_empty() {
		let mut builder =
			sqlx::QueryBuilder::new("INSERT INTO image_room_scores (image_id, room, score) ");
		builder.push_values(&image.room_scores, |mut b, (room, score)| {
			b.push_bind(image_id).push_bind(room).push_bind(score);
		});
		builder.build().execute(&mut *tx).await?;
	}

	sqlx::query(
		"INSERT INTO image_captions (image_id, caption_en, facts, embed_en) \
		 VALUES ($1, $2, $3, $4::vector)",
	)
	.bind(image_id)
	.bind(&image.caption_en)
	.bind(&image.facts)
	.bind(image.embed_en.as_deref().map(vector_to_pg))
	.execute(&mut *tx)
	.await?;

	let tags = derive_tags(image);
	if !tags.is_empty() {
		let mut builder = sqlx::QueryBuilder::new("INSERT INTO image_tags (image_id, tag) ");
		builder.push_values(&tags, |mut b, tag| {
			b.push_bind(image_id).push_bind(tag);
		});
		builder.build().execute(&mut *tx).await?;
	}

	tx.commit().await?;
	Ok(image_id)
}

/// `indexed_at` for an already-indexed external id, used by incremental mode.
pub async fn indexed_at(db: &Db, external_id: &str) -> Result<Option<OffsetDateTime>> {
	let value = sqlx::query_scalar("SELECT indexed_at FROM images WHERE external_id = $1")
		.bind(external_id)
		.fetch_optional(&db.pool)
		.await?;
	Ok(value)
}

/// Nearest same-folder phash neighbor within the given Hamming budget.
/// Near-duplicates are a hint: callers log them and index anyway.
pub async fn find_near_duplicate(
	db: &Db,
	folder_path: &str,
	external_id: &str,
	phash: u64,
	max_distance: u32,
) -> Result<Option<String>> {
	let rows: Vec<(String, i64)> =
		sqlx::query_as("SELECT external_id, phash FROM images WHERE folder_path = $1 AND external_id <> $2")
			.bind(folder_path)
			.bind(external_id)
			.fetch_all(&db.pool)
			.await?;

	let mut best: Option<(String, u32)> = None;
	for (candidate, candidate_phash) in rows {
		let distance = (phash ^ candidate_phash as u64).count_ones();
		if distance <= max_distance
			&& best.as_ref().map(|(_, seen)| distance < *seen).unwrap_or(true)
		{
			best = Some((candidate, distance));
		}
	}
	Ok(best.map(|(candidate, _)| candidate))
}

/// Persist the progress tracker snapshot into the single-row table.
pub async fn save_progress(
	db: &Db,
	is_running: bool,
	started_at: Option<OffsetDateTime>,
	processed_count: u64,
	total_count: u64,
	current_file: Option<&str>,
	errors: &[String],
) -> Result<()> {
	sqlx::query(
		"INSERT INTO index_progress \
		 (id, is_running, started_at, processed_count, total_count, current_file, errors, updated_at) \
		 VALUES (1, $1, $2, $3, $4, $5, $6, now()) \
		 ON CONFLICT (id) DO UPDATE SET \
		 is_running = EXCLUDED.is_running, started_at = EXCLUDED.started_at, \
		 processed_count = EXCLUDED.processed_count, total_count = EXCLUDED.total_count, \
		 current_file = EXCLUDED.current_file, errors = EXCLUDED.errors, updated_at = now()",
	)
	.bind(is_running)
	.bind(started_at)
	.bind(processed_count as i64)
	.bind(total_count as i64)
	.bind(current_file)
	.bind(serde_json::json!(errors))
	.execute(&db.pool)
	.await?;
	Ok(())
}

/// Indexed-image count, the boot-time source of truth for `processed_count`.
pub async fn count_images(db: &Db) -> Result<i64> {
	Ok(sqlx::query_scalar("SELECT COUNT(*) FROM images").fetch_one(&db.pool).await?)
}
