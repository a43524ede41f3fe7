#[derive(Debug, sqlx::FromRow)]
pub struct ImageRecord {
	pub id: uuid::Uuid,
	pub external_id: String,
	pub file_name: String,
	pub folder_path: String,
	pub width: i32,
	pub height: i32,
	pub phash: i64,
	pub captured_at: Option<time::OffsetDateTime>,
	pub room: String,
	pub room_confidence: f32,
	pub style_tags: serde_json::Value,
	pub indexed_at: time::OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ObjectRecord {
	pub id: uuid::Uuid,
	pub image_id: uuid::Uuid,
	pub label: String,
	pub label_confidence: f32,
	pub bbox: serde_json::Value,
	pub color_name: String,
	pub color_lab: serde_json::Value,
	pub secondary_colors: serde_json::Value,
	pub material: String,
	pub material_confidence: f32,
	pub area_pixels: i64,
}

/// Caption row without the vector column; `embed_en` is only ever touched
/// through the `::vector` binds in `writer`/`retrieve`.
#[derive(Debug, sqlx::FromRow)]
pub struct CaptionRecord {
	pub image_id: uuid::Uuid,
	pub caption_en: String,
	pub facts: serde_json::Value,
}

#[derive(Debug, sqlx::FromRow)]
pub struct RoomScoreRecord {
	pub image_id: uuid::Uuid,
	pub room: String,
	pub score: f32,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProgressRecord {
	pub is_running: bool,
	pub started_at: Option<time::OffsetDateTime>,
	pub processed_count: i64,
	pub total_count: i64,
	pub current_file: Option<String>,
	pub errors: serde_json::Value,
}
