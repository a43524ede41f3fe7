use serde::{Deserialize, Serialize};
use tracing::info;
use vista_domain::query::{self, Language, ParsedQuery};
use vista_storage::retrieve;

pub use crate::rank::SearchResult;
use crate::{ServiceError, ServiceResult, VistaService, rank, verify};

/// Request limits beyond this are operator mistakes, not queries.
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub lang: Language,
	pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
	pub query: String,
	pub translated_query: String,
	pub results: Vec<SearchResult>,
	pub total_results: usize,
	pub processing_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub partial: Option<bool>,
}

impl VistaService {
	/// The three-stage search: parse → hybrid retrieval → VLM verification →
	/// blended re-rank. The overall deadline bounds Stage B; expiry returns
	/// whatever passed Stage C with `partial = true`.
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		let started = std::time::Instant::now();
		let deadline = tokio::time::Instant::now()
			+ std::time::Duration::from_millis(self.cfg.search.deadline_ms);

		let query_text = req.query.trim();
		if query_text.is_empty() {
			return Err(ServiceError::Input { message: "query must be non-empty.".to_string() });
		}
		let limit = req.limit.unwrap_or(self.cfg.search.final_limit);
		if limit == 0 || limit > MAX_LIMIT {
			return Err(ServiceError::Input {
				message: format!("limit must be within 1..={MAX_LIMIT}."),
			});
		}

		let parsed = query::parse(query_text, req.lang);
		info!(
			query = query_text,
			translated = %parsed.normalized_text,
			room = parsed.room.as_deref().unwrap_or("-"),
			objects = parsed.objects.len(),
			"Search parsed."
		);

		let candidates = self.retrieve_candidates(&parsed).await?;
		if candidates.is_empty() {
			return Ok(SearchResponse {
				query: req.query.clone(),
				translated_query: parsed.normalized_text,
				results: Vec::new(),
				total_results: 0,
				processing_ms: started.elapsed().as_millis() as u64,
				partial: None,
			});
		}

		let outcome =
			verify::verify_candidates(self, query_text, &parsed.normalized_text, candidates, deadline)
				.await;
		let results = rank::rank(
			outcome.pairs,
			self.cfg.search.cutoff,
			self.cfg.search.alpha,
			limit as usize,
		);

		info!(
			results = results.len(),
			partial = outcome.partial,
			elapsed_ms = started.elapsed().as_millis() as u64,
			"Search completed."
		);
		Ok(SearchResponse {
			query: req.query,
			translated_query: parsed.normalized_text,
			total_results: results.len(),
			results,
			processing_ms: started.elapsed().as_millis() as u64,
			partial: outcome.partial.then_some(true),
		})
	}

	/// Stage A with the recall guarantee: when the structured predicates
	/// return fewer than K/2 rows, re-issue keeping only the room filter.
	async fn retrieve_candidates(
		&self,
		parsed: &ParsedQuery,
	) -> ServiceResult<Vec<retrieve::CandidateRow>> {
		let k = self.cfg.search.top_k;
		if k == 0 {
			return Ok(Vec::new());
		}

		let embedding = self.embed_query(&parsed.normalized_text).await?;
		let candidates = retrieve::candidates(&self.db, parsed, &embedding, k)
			.await
			.map_err(ServiceError::from)?;

		let has_structured = !parsed.objects.is_empty()
			|| !parsed.free_colors.is_empty()
			|| !parsed.free_materials.is_empty();
		if has_structured && (candidates.len() as u32) < k / 2 {
			let relaxed = ParsedQuery {
				room: parsed.room.clone(),
				objects: Vec::new(),
				free_colors: Vec::new(),
				free_materials: Vec::new(),
				normalized_text: parsed.normalized_text.clone(),
			};
			info!(strict = candidates.len(), "Stage A relaxation re-issued without object predicates.");
			return retrieve::candidates(&self.db, &relaxed, &embedding, k)
				.await
				.map_err(ServiceError::from);
		}
		Ok(candidates)
	}

	async fn embed_query(&self, text: &str) -> ServiceResult<Vec<f32>> {
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, std::slice::from_ref(&text.to_string()))
			.await?;
		let Some(embedding) = embeddings.into_iter().next() else {
			return Err(ServiceError::TransientUpstream {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		if embedding.len() != self.cfg.providers.embedding.dimensions as usize {
			return Err(ServiceError::TransientUpstream {
				message: format!(
					"Embedding dimension {} does not match configured {}.",
					embedding.len(),
					self.cfg.providers.embedding.dimensions
				),
			});
		}
		Ok(embedding)
	}
}
