use std::collections::BTreeMap;

use color_eyre::Result;

use crate::db::Db;

#[derive(Debug, Default)]
pub struct StoreStats {
	pub images: i64,
	pub objects: i64,
	pub captions: i64,
	pub tags: i64,
	pub room_scores: i64,
	pub rooms: BTreeMap<String, i64>,
	pub object_labels: BTreeMap<String, i64>,
	pub colors: BTreeMap<String, i64>,
}

pub async fn collect(db: &Db) -> Result<StoreStats> {
	let mut stats = StoreStats {
		images: count(db, "images").await?,
		objects: count(db, "image_objects").await?,
		captions: count(db, "image_captions").await?,
		tags: count(db, "image_tags").await?,
		room_scores: count(db, "image_room_scores").await?,
		..Default::default()
	};

	for (room, total) in
		grouped(db, "SELECT room, COUNT(*) FROM images GROUP BY room").await?
	{
		stats.rooms.insert(room, total);
	}
	for (label, total) in
		grouped(db, "SELECT label, COUNT(*) FROM image_objects GROUP BY label").await?
	{
		stats.object_labels.insert(label, total);
	}
	for (color, total) in grouped(
		db,
		"SELECT color_name, COUNT(*) FROM image_objects WHERE color_name <> 'unknown' GROUP BY color_name",
	)
	.await?
	{
		stats.colors.insert(color, total);
	}

	Ok(stats)
}

async fn count(db: &Db, table: &str) -> Result<i64> {
	Ok(sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(&db.pool).await?)
}

async fn grouped(db: &Db, sql: &str) -> Result<Vec<(String, i64)>> {
	Ok(sqlx::query_as(sql).fetch_all(&db.pool).await?)
}
