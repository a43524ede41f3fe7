use color_eyre::Result;
use sqlx::Postgres;
use uuid::Uuid;
use vista_domain::query::ParsedQuery;

use crate::{
	db::Db,
	models::{CaptionRecord, ImageRecord, ObjectRecord},
	vector_to_pg,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
	pub image_id: Uuid,
	pub external_id: String,
	pub file_name: String,
	pub folder_path: String,
	pub room: String,
	pub phash: i64,
	pub retrieval_score: f32,
	pub facts: serde_json::Value,
}

/// Stage A hybrid query: structured predicates plus cosine ordering against
/// the caption embedding, in one statement. Ordering is deterministic for a
/// fixed snapshot; ties break on `external_id` ascending. Images without an
/// embedding are reachable only through the SQL predicates, so they are
/// excluded here by the vector join.
pub async fn candidates(
	db: &Db,
	parsed: &ParsedQuery,
	embedding: &[f32],
	k: u32,
) -> Result<Vec<CandidateRow>> {
	if k == 0 {
		return Ok(Vec::new());
	}

	let mut builder = sqlx::QueryBuilder::<Postgres>::new(
		"SELECT i.id AS image_id, i.external_id, i.file_name, i.folder_path, i.room, i.phash, \
		 (1 - (c.embed_en <=> ",
	);
	let vector = vector_to_pg(embedding);
	builder.push_bind(vector.clone());
	builder.push(
		"::vector))::real AS retrieval_score, c.facts \
		 FROM images i \
		 JOIN image_captions c ON c.image_id = i.id \
		 WHERE c.embed_en IS NOT NULL",
	);

	if let Some(room) = &parsed.room {
		builder.push(" AND i.room = ");
		builder.push_bind(room.clone());
	}
	for object in &parsed.objects {
		builder.push(
			" AND EXISTS (SELECT 1 FROM image_objects o WHERE o.image_id = i.id AND o.label = ",
		);
		builder.push_bind(object.label.clone());
		if let Some(color) = &object.color {
			builder.push(" AND o.color_name = ");
			builder.push_bind(color.clone());
		}
		if let Some(material) = &object.material {
			builder.push(" AND o.material = ");
			builder.push_bind(material.clone());
		}
		builder.push(")");
	}
	for color in &parsed.free_colors {
		builder.push(" AND EXISTS (SELECT 1 FROM image_tags t WHERE t.image_id = i.id AND t.tag = ");
		builder.push_bind(format!("col:{color}"));
		builder.push(")");
	}
	for material in &parsed.free_materials {
		builder.push(" AND EXISTS (SELECT 1 FROM image_tags t WHERE t.image_id = i.id AND t.tag = ");
		builder.push_bind(format!("mat:{material}"));
		builder.push(")");
	}

	builder.push(" ORDER BY c.embed_en <=> ");
	builder.push_bind(vector);
	builder.push("::vector ASC, i.external_id ASC LIMIT ");
	builder.push_bind(k as i64);

	Ok(builder.build_query_as::<CandidateRow>().fetch_all(&db.pool).await?)
}

pub async fn image_by_external_id(db: &Db, external_id: &str) -> Result<Option<ImageRecord>> {
	let image = sqlx::query_as::<_, ImageRecord>(
		"SELECT id, external_id, file_name, folder_path, width, height, phash, captured_at, \
		 room, room_confidence, style_tags, indexed_at FROM images WHERE external_id = $1",
	)
	.bind(external_id)
	.fetch_optional(&db.pool)
	.await?;
	Ok(image)
}

#[derive(Debug)]
pub struct ImageDetail {
	pub image: ImageRecord,
	pub objects: Vec<ObjectRecord>,
	pub caption: Option<CaptionRecord>,
	pub tags: Vec<String>,
}

pub async fn image_detail(db: &Db, image_id: Uuid) -> Result<Option<ImageDetail>> {
	let image = sqlx::query_as::<_, ImageRecord>(
		"SELECT id, external_id, file_name, folder_path, width, height, phash, captured_at, \
		 room, room_confidence, style_tags, indexed_at FROM images WHERE id = $1",
	)
	.bind(image_id)
	.fetch_optional(&db.pool)
	.await?;
	let Some(image) = image else {
		return Ok(None);
	};

	let objects = sqlx::query_as::<_, ObjectRecord>(
		"SELECT id, image_id, label, label_confidence, bbox, color_name, color_lab, \
		 secondary_colors, material, material_confidence, area_pixels \
		 FROM image_objects WHERE image_id = $1 ORDER BY area_pixels DESC",
	)
	.bind(image_id)
	.fetch_all(&db.pool)
	.await?;

	let caption = sqlx::query_as::<_, CaptionRecord>(
		"SELECT image_id, caption_en, facts FROM image_captions WHERE image_id = $1",
	)
	.bind(image_id)
	.fetch_optional(&db.pool)
	.await?;

	let tags: Vec<String> =
		sqlx::query_scalar("SELECT tag FROM image_tags WHERE image_id = $1 ORDER BY tag")
			.bind(image_id)
			.fetch_all(&db.pool)
			.await?;

	Ok(Some(ImageDetail { image, objects, caption, tags }))
}
