use std::sync::{Arc, atomic::Ordering};

use vista_domain::query::Language;
use vista_providers::vlm::VlmEvidence;
use vista_service::SearchRequest;

use crate::support::{
	self, MatchAllVlm, RejectAllVlm, StubEmbedding, UnparseableVlm, object, providers_with,
	seed_image, test_config, test_dsn, test_lock,
};

fn request(query: &str) -> SearchRequest {
	SearchRequest { query: query.to_string(), lang: Language::Auto, limit: None }
}

#[tokio::test]
async fn kitchen_black_table_returns_verified_results() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	let mut evidence = VlmEvidence::default();
	evidence.objects.push("dining table".to_string());
	evidence.colors.insert("dining table".to_string(), "black".to_string());
	let vlm = Arc::new(MatchAllVlm {
		confidence: 0.92,
		room: Some("kitchen".to_string()),
		evidence,
		calls: Default::default(),
	});
	let providers = providers_with(StubEmbedding { vector: vec![1.0, 0.0, 0.0] }, vlm);
	let service =
		support::build_service(test_config(dsn), providers).await.expect("Failed to build service.");
	support::reset_db(&service.db.pool).await.expect("Failed to reset database.");

	seed_image(
		&service.db,
		"kitchen-1",
		"kitchen",
		vec![object("dining_table", "black", "marble"), object("chair", "brown", "wood")],
		vec![1.0, 0.0, 0.0],
	)
	.await
	.expect("Failed to seed kitchen image.");
	seed_image(&service.db, "bedroom-1", "bedroom", vec![object("bed", "white", "fabric")], vec![
		0.0, 1.0, 0.0,
	])
	.await
	.expect("Failed to seed bedroom image.");

	let response =
		service.search(request("kitchen with black table")).await.expect("Search failed.");

	assert!(response.total_results >= 1);
	for result in &response.results {
		assert_eq!(result.room, "kitchen");
		assert!(result.evidence.objects.iter().any(|name| name.contains("table")));
		assert_eq!(
			result.evidence.colors.get("dining table").map(String::as_str),
			Some("black")
		);
		assert!(result.confidence_badge == "green" || result.confidence_badge == "yellow");
	}
	assert_eq!(response.results[0].external_id, "kitchen-1");
}

#[tokio::test]
async fn hebrew_query_matches_english_results() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	let vlm = Arc::new(MatchAllVlm::new(0.9, "kitchen"));
	let providers = providers_with(StubEmbedding { vector: vec![1.0, 0.0, 0.0] }, vlm);
	let service =
		support::build_service(test_config(dsn), providers).await.expect("Failed to build service.");
	support::reset_db(&service.db.pool).await.expect("Failed to reset database.");

	seed_image(
		&service.db,
		"kitchen-1",
		"kitchen",
		vec![object("table", "black", "wood")],
		vec![1.0, 0.0, 0.0],
	)
	.await
	.expect("Failed to seed image.");

	let english =
		service.search(request("kitchen with black table")).await.expect("English search failed.");
	let hebrew =
		service.search(request("מטבח עם שולחן שחור")).await.expect("Hebrew search failed.");

	assert_eq!(hebrew.translated_query, "kitchen with table black");
	assert_eq!(
		hebrew.results.first().map(|result| result.external_id.clone()),
		english.results.first().map(|result| result.external_id.clone())
	);
}

#[tokio::test]
async fn unmatched_query_returns_empty_without_error() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	// The strict predicate finds nothing and relaxation recalls candidates;
	// the verifier is what rejects nonsense queries.
	let providers =
		providers_with(StubEmbedding { vector: vec![1.0, 0.0, 0.0] }, Arc::new(RejectAllVlm));
	let service =
		support::build_service(test_config(dsn), providers).await.expect("Failed to build service.");
	support::reset_db(&service.db.pool).await.expect("Failed to reset database.");

	seed_image(&service.db, "kitchen-1", "kitchen", vec![object("table", "black", "wood")], vec![
		1.0, 0.0, 0.0,
	])
	.await
	.expect("Failed to seed image.");

	let response = service.search(request("purple spaceship")).await.expect("Search failed.");
	assert_eq!(response.total_results, 0);
	assert!(response.results.is_empty());
	assert!(response.partial.is_none());
}

#[tokio::test]
async fn warm_cache_issues_no_vlm_calls() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	let vlm = Arc::new(MatchAllVlm::new(0.9, "kitchen"));
	let calls = vlm.calls.clone();
	let providers = providers_with(StubEmbedding { vector: vec![1.0, 0.0, 0.0] }, vlm);
	let service =
		support::build_service(test_config(dsn), providers).await.expect("Failed to build service.");
	support::reset_db(&service.db.pool).await.expect("Failed to reset database.");

	for i in 0..3 {
		seed_image(
			&service.db,
			&format!("kitchen-{i}"),
			"kitchen",
			vec![object("table", "black", "wood")],
			vec![1.0, 0.1 * i as f32, 0.0],
		)
		.await
		.expect("Failed to seed image.");
	}

	let first = service.search(request("kitchen with black table")).await.expect("Search failed.");
	let calls_after_first = calls.load(Ordering::SeqCst);
	assert!(calls_after_first > 0);
	assert!(first.total_results >= 1);

	let second = service.search(request("kitchen with black table")).await.expect("Search failed.");
	assert_eq!(calls.load(Ordering::SeqCst), calls_after_first, "second search hit the VLM");
	assert_eq!(second.total_results, first.total_results);
}

#[tokio::test]
async fn room_filter_binds_every_result() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	let providers = providers_with(
		StubEmbedding { vector: vec![1.0, 0.0, 0.0] },
		Arc::new(MatchAllVlm::new(0.9, "kitchen")),
	);
	let service =
		support::build_service(test_config(dsn), providers).await.expect("Failed to build service.");
	support::reset_db(&service.db.pool).await.expect("Failed to reset database.");

	seed_image(&service.db, "kitchen-1", "kitchen", vec![object("sofa", "gray", "fabric")], vec![
		1.0, 0.0, 0.0,
	])
	.await
	.expect("Failed to seed image.");
	seed_image(&service.db, "living-1", "living_room", vec![object("sofa", "gray", "fabric")], vec![
		1.0, 0.0, 0.0,
	])
	.await
	.expect("Failed to seed image.");

	let response = service.search(request("kitchen with sofa")).await.expect("Search failed.");
	for result in &response.results {
		assert_eq!(result.room, "kitchen");
		assert_ne!(result.external_id, "living-1");
	}
}

#[tokio::test]
async fn rejected_candidates_yield_empty_results() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	let providers =
		providers_with(StubEmbedding { vector: vec![1.0, 0.0, 0.0] }, Arc::new(RejectAllVlm));
	let service =
		support::build_service(test_config(dsn), providers).await.expect("Failed to build service.");
	support::reset_db(&service.db.pool).await.expect("Failed to reset database.");

	seed_image(&service.db, "kitchen-1", "kitchen", vec![object("table", "black", "wood")], vec![
		1.0, 0.0, 0.0,
	])
	.await
	.expect("Failed to seed image.");

	let response = service.search(request("kitchen with black table")).await.expect("Search failed.");
	assert_eq!(response.total_results, 0);
}

#[tokio::test]
async fn unparseable_vlm_recovers_locally() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	let providers =
		providers_with(StubEmbedding { vector: vec![1.0, 0.0, 0.0] }, Arc::new(UnparseableVlm));
	let service =
		support::build_service(test_config(dsn), providers).await.expect("Failed to build service.");
	support::reset_db(&service.db.pool).await.expect("Failed to reset database.");

	seed_image(&service.db, "kitchen-1", "kitchen", vec![object("table", "black", "wood")], vec![
		1.0, 0.0, 0.0,
	])
	.await
	.expect("Failed to seed image.");

	let response = service.search(request("kitchen with black table")).await.expect("Search failed.");
	assert_eq!(response.total_results, 0);
}

#[tokio::test]
async fn zero_top_k_returns_empty() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	let mut cfg = test_config(dsn);
	cfg.search.top_k = 0;
	let providers = providers_with(
		StubEmbedding { vector: vec![1.0, 0.0, 0.0] },
		Arc::new(MatchAllVlm::new(0.9, "kitchen")),
	);
	let service = support::build_service(cfg, providers).await.expect("Failed to build service.");
	support::reset_db(&service.db.pool).await.expect("Failed to reset database.");

	let response = service.search(request("kitchen")).await.expect("Search failed.");
	assert_eq!(response.total_results, 0);
}

#[tokio::test]
async fn empty_query_is_an_input_error() {
	let Some(dsn) = test_dsn() else {
		eprintln!("Skipping; set VISTA_PG_DSN to run this test.");
		return;
	};
	let _lock = test_lock(&dsn).await.expect("Failed to lock test database.");

	let providers = providers_with(
		StubEmbedding { vector: vec![1.0, 0.0, 0.0] },
		Arc::new(MatchAllVlm::new(0.9, "kitchen")),
	);
	let service =
		support::build_service(test_config(dsn), providers).await.expect("Failed to build service.");

	let err = service.search(request("   ")).await.expect_err("expected an input error");
	assert_eq!(err.kind(), "InputError");

	let err = service
		.search(SearchRequest {
			query: "kitchen".to_string(),
			lang: Language::En,
			limit: Some(0),
		})
		.await
		.expect_err("expected an input error");
	assert_eq!(err.kind(), "InputError");
}
