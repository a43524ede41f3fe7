use std::collections::BTreeSet;

use vista_storage::{db::Db, writer};

use crate::support::{self, object, seed_image, test_config, test_dsn, test_lock};

/// Comparable dump of every table touched by an upsert.
async fn snapshot(
	db: &Db,
) -> (Vec<(String, String, i32, i32, i64, String)>, Vec<String>, Vec<String>, Vec<String>) {
	let images = sqlx::query_as(
		"SELECT external_id, file_name, width, height, phash, room FROM images ORDER BY external_id",
	)
	.fetch_all(&db.pool)
	.await
	.expect("Failed to read images.");
	let objects = sqlx::query_scalar(
		"SELECT label || ':' || color_name || ':' || material FROM image_objects ORDER BY 1",
	)
	.fetch_all(&db.pool)
	.await
	.expect("Failed to read objects.");
	let captions = sqlx::query_scalar("SELECT caption_en FROM image_captions ORDER BY 1")
		.fetch_all(&db.pool)
		.await
		.expect("Failed to read captions.");
	let tags = sqlx::query_scalar("SELECT tag FROM image_tags ORDER BY tag")
		.fetch_all(&db.pool)
		.await
		.expect("Failed to read tags.");
	(images, objects, captions, tags)
}

async fn connect(dsn: String) -> Db {
	let cfg = test_config(dsn);
	let db = Db::connect(&cfg.storage).await.expect("Failed to connect.");
	db.ensure_schema(cfg.providers.embedding.dimensions).await.expect("Failed to bootstrap schema.");
	db
}

#[tokio::test]
async fn reindexing_the_same_image_is_idempotent() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");
	let db = connect(dsn).await;
	support::reset_db(&db.pool).await.expect("Failed to reset database.");

	let objects = vec![object("dining_table", "black", "marble"), object("chair", "brown", "wood")];
	let first_id =
		seed_image(&db, "ext-1", "kitchen", objects.clone(), vec![0.1, 0.2, 0.3]).await.unwrap();
	let first = snapshot(&db).await;

	let second_id =
		seed_image(&db, "ext-1", "kitchen", objects, vec![0.1, 0.2, 0.3]).await.unwrap();
	let second = snapshot(&db).await;

	assert_eq!(first_id, second_id, "image id changed across re-index");
	assert_eq!(first, second, "re-index produced different rows");
}

#[tokio::test]
async fn tag_rows_equal_the_derived_tag_set() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");
	let db = connect(dsn).await;
	support::reset_db(&db.pool).await.expect("Failed to reset database.");

	let image_id = seed_image(
		&db,
		"ext-1",
		"kitchen",
		vec![object("dining_table", "black", "marble"), object("mirror", "unknown", "unknown")],
		vec![0.1, 0.2, 0.3],
	)
	.await
	.unwrap();

	let stored: BTreeSet<String> =
		sqlx::query_scalar::<_, String>("SELECT tag FROM image_tags WHERE image_id = $1")
			.bind(image_id)
			.fetch_all(&db.pool)
			.await
			.expect("Failed to read tags.")
			.into_iter()
			.collect();

	let expected: BTreeSet<String> =
		["room:kitchen", "obj:dining_table", "obj:mirror", "col:black", "mat:marble"]
			.into_iter()
			.map(str::to_string)
			.collect();
	assert_eq!(stored, expected);
}

#[tokio::test]
async fn near_duplicates_are_flagged_within_a_folder() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");
	let db = connect(dsn).await;
	support::reset_db(&db.pool).await.expect("Failed to reset database.");

	// seed_image derives phash from the external id length; "abc" → 3.
	seed_image(&db, "abc", "kitchen", Vec::new(), vec![0.1, 0.2, 0.3]).await.unwrap();

	let close = writer::find_near_duplicate(&db, "/test", "other", 0b0111, 6)
		.await
		.expect("Lookup failed.");
	assert_eq!(close.as_deref(), Some("abc"));

	let far = writer::find_near_duplicate(&db, "/test", "other", 0xFFFF_FFFF, 6)
		.await
		.expect("Lookup failed.");
	assert!(far.is_none());

	let other_folder = writer::find_near_duplicate(&db, "/elsewhere", "other", 0b0111, 6)
		.await
		.expect("Lookup failed.");
	assert!(other_folder.is_none());
}

#[tokio::test]
async fn embedding_dimension_drift_refuses_to_serve() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");
	let db = connect(dsn).await;
	support::reset_db(&db.pool).await.expect("Failed to reset database.");

	db.ensure_embedding_dimension(3).await.expect("First pin failed.");
	db.ensure_embedding_dimension(3).await.expect("Same dimension must pass.");
	assert!(db.ensure_embedding_dimension(4).await.is_err(), "drift must refuse to serve");
}

#[tokio::test]
async fn progress_snapshot_round_trips_through_the_store() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");
	let db = connect(dsn).await;
	support::reset_db(&db.pool).await.expect("Failed to reset database.");

	writer::save_progress(
		&db,
		true,
		Some(time::OffsetDateTime::UNIX_EPOCH),
		7,
		10,
		Some("current.jpg"),
		&["a failure".to_string()],
	)
	.await
	.expect("Failed to save progress.");

	let row: (bool, i64, i64, Option<String>) = sqlx::query_as(
		"SELECT is_running, processed_count, total_count, current_file FROM index_progress WHERE id = 1",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to read progress.");
	assert_eq!(row, (true, 7, 10, Some("current.jpg".to_string())));

	seed_image(&db, "ext-1", "kitchen", Vec::new(), vec![0.1, 0.2, 0.3]).await.unwrap();
	assert_eq!(writer::count_images(&db).await.expect("Count failed."), 1);
}
