use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};
use vista_providers::{
	backoff::provider_backoff,
	vlm::{ImageRef, VerifyRequest, VerifyResponse, VlmEvidence, VlmVerdict},
};
use vista_storage::retrieve::CandidateRow;

use crate::{VistaService, cache::VerdictCache};

/// Initial call plus four retries per batch.
const MAX_BATCH_ATTEMPTS: u32 = 5;

pub struct VerifyOutcome {
	pub pairs: Vec<(CandidateRow, VlmVerdict)>,
	/// True when the search deadline expired with batches still in flight.
	pub partial: bool,
}

/// Stage B: verify candidates against the query in VLM batches.
///
/// Cache hits never reach the provider. Misses are grouped into batches of
/// `BATCH_SIZE`, dispatched up to `VLM_CONCURRENCY` at a time behind the
/// process-global rate limiter. Whatever has completed when `deadline`
/// passes is returned with `partial = true`; aborted batches keep their
/// already-cached verdicts.
pub async fn verify_candidates(
	service: &VistaService,
	query: &str,
	translated_query: &str,
	candidates: Vec<CandidateRow>,
	deadline: tokio::time::Instant,
) -> VerifyOutcome {
	let model_id = service.cfg.providers.vlm.model.clone();
	let mut pairs = Vec::with_capacity(candidates.len());
	let mut misses = Vec::new();
	for candidate in candidates {
		let key = VerdictCache::key(
			translated_query,
			&model_id,
			candidate.image_id,
			candidate.phash as u64,
		);
		match service.cache.get(&key) {
			Some(verdict) => pairs.push((candidate, verdict)),
			None => misses.push(candidate),
		}
	}
	debug!(hits = pairs.len(), misses = misses.len(), "Verdict cache partitioned candidates.");

	if misses.is_empty() {
		return VerifyOutcome { pairs, partial: false };
	}

	let batch_size = service.cfg.search.batch_size.max(1) as usize;
	let mut join_set = JoinSet::new();
	for batch in misses.chunks(batch_size) {
		let batch: Vec<CandidateRow> = batch.to_vec();
		let providers = service.providers.clone();
		let vlm_cfg = service.cfg.providers.vlm.clone();
		let source_api = service.cfg.source.api_url.clone();
		let cache = service.cache.clone();
		let limiter = service.limiter.clone();
		let slots = service.vlm_slots.clone();
		let query = query.to_string();
		let translated = translated_query.to_string();
		let model_id = model_id.clone();

		join_set.spawn(async move {
			let Ok(_permit) = slots.acquire_owned().await else {
				return fallback_verdicts(&batch, "cancelled");
			};
			limiter.acquire().await;

			let request = VerifyRequest {
				query,
				translated_query: translated.clone(),
				images: batch
					.iter()
					.map(|candidate| ImageRef {
						image_id: candidate.image_id.to_string(),
						url: signed_fetch_url(&source_api, &candidate.external_id),
					})
					.collect(),
			};

			let mut attempt = 1;
			loop {
				match providers.vlm.verify(&vlm_cfg, &request).await {
					Ok(VerifyResponse::Verdicts(verdicts)) =>
						return align_verdicts(&batch, verdicts, &cache, &translated, &model_id),
					Ok(VerifyResponse::Unparseable) => {
						warn!(batch_len = batch.len(), "VLM batch stayed unparseable after reformat.");
						return fallback_verdicts(&batch, "parse_error");
					},
					Err(err) if attempt < MAX_BATCH_ATTEMPTS => {
						warn!(error = %err, attempt, "VLM batch failed; backing off.");
						tokio::time::sleep(provider_backoff(attempt)).await;
						attempt += 1;
					},
					Err(err) => {
						warn!(error = %err, "VLM batch exhausted its retries.");
						return fallback_verdicts(&batch, "upstream_error");
					},
				}
			}
		});
	}

	let mut partial = false;
	loop {
		tokio::select! {
			_ = tokio::time::sleep_until(deadline) => {
				join_set.abort_all();
				partial = true;
				break;
			},
			joined = join_set.join_next() => {
				match joined {
					Some(Ok(batch_pairs)) => pairs.extend(batch_pairs),
					Some(Err(err)) => {
						if !err.is_cancelled() {
							warn!(error = %err, "VLM batch task panicked.");
						}
					},
					None => break,
				}
			},
		}
	}

	VerifyOutcome { pairs, partial }
}

/// Pair every batch candidate with its verdict. Genuine verdicts are cached;
/// images the model skipped are rejected without caching.
fn align_verdicts(
	batch: &[CandidateRow],
	verdicts: Vec<VlmVerdict>,
	cache: &VerdictCache,
	translated_query: &str,
	model_id: &str,
) -> Vec<(CandidateRow, VlmVerdict)> {
	batch
		.iter()
		.map(|candidate| {
			let id = candidate.image_id.to_string();
			match verdicts.iter().find(|verdict| verdict.image_id == id) {
				Some(verdict) => {
					let key = VerdictCache::key(
						translated_query,
						model_id,
						candidate.image_id,
						candidate.phash as u64,
					);
					cache.put(key, verdict.clone());
					(candidate.clone(), verdict.clone())
				},
				None => (candidate.clone(), rejected(&id, "missing_verdict")),
			}
		})
		.collect()
}

/// Local recovery for a failed batch: every image is rejected with the given
/// note and nothing is cached.
fn fallback_verdicts(batch: &[CandidateRow], notes: &str) -> Vec<(CandidateRow, VlmVerdict)> {
	batch
		.iter()
		.map(|candidate| {
			(candidate.clone(), rejected(&candidate.image_id.to_string(), notes))
		})
		.collect()
}

fn rejected(image_id: &str, notes: &str) -> VlmVerdict {
	VlmVerdict {
		image_id: image_id.to_string(),
		matches: false,
		confidence: 0.0,
		room: None,
		evidence: VlmEvidence::default(),
		notes: notes.to_string(),
	}
}

/// Fetch URL the VLM uses to read the image through the source store.
pub fn signed_fetch_url(api_url: &str, external_id: &str) -> String {
	format!("{}/files/{external_id}/content", api_url.trim_end_matches('/'))
}
