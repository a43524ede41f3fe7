use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vista_providers::vlm::{VlmEvidence, VlmVerdict};
use vista_storage::retrieve::CandidateRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
	pub image_id: Uuid,
	pub external_id: String,
	pub file_name: String,
	pub folder_path: String,
	pub room: String,
	pub vlm_confidence: f32,
	pub final_score: f32,
	pub retrieval_score: f32,
	pub evidence: VlmEvidence,
	pub match_reasons: Vec<String>,
	pub ai_notes: String,
	pub confidence_badge: String,
}

/// Stage C: drop candidates the VLM rejected or scored below the cutoff,
/// blend `α·vlm + (1−α)·retrieval`, sort descending with `external_id`
/// breaking ties, truncate.
pub fn rank(
	pairs: Vec<(CandidateRow, VlmVerdict)>,
	cutoff: f32,
	alpha: f32,
	limit: usize,
) -> Vec<SearchResult> {
	let mut results: Vec<SearchResult> = pairs
		.into_iter()
		.filter(|(_, verdict)| verdict.matches && verdict.confidence >= cutoff)
		.map(|(candidate, verdict)| {
			let final_score = alpha * verdict.confidence + (1.0 - alpha) * candidate.retrieval_score;
			let room = verdict.room.clone().unwrap_or_else(|| candidate.room.clone());
			SearchResult {
				image_id: candidate.image_id,
				external_id: candidate.external_id,
				file_name: candidate.file_name,
				folder_path: candidate.folder_path,
				room,
				vlm_confidence: verdict.confidence,
				final_score,
				retrieval_score: candidate.retrieval_score,
				match_reasons: match_reasons(&verdict),
				confidence_badge: confidence_badge(verdict.confidence).to_string(),
				ai_notes: verdict.notes,
				evidence: verdict.evidence,
			}
		})
		.collect();

	results.sort_by(|a, b| {
		b.final_score
			.partial_cmp(&a.final_score)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| a.external_id.cmp(&b.external_id))
	});
	results.truncate(limit);
	results
}

/// Human-readable reasons synthesized from the verdict evidence.
pub fn match_reasons(verdict: &VlmVerdict) -> Vec<String> {
	let mut reasons = Vec::new();
	if let Some(room) = verdict.room.as_deref().filter(|room| !room.is_empty()) {
		reasons.push(format!("Room: {room}"));
	}
	if !verdict.evidence.objects.is_empty() {
		reasons.push(format!("Objects: {}", verdict.evidence.objects.join(", ")));
	}
	if !verdict.evidence.colors.is_empty() {
		let parts: Vec<String> = verdict
			.evidence
			.colors
			.iter()
			.map(|(object, color)| format!("{object}={color}"))
			.collect();
		reasons.push(format!("Colors: {}", parts.join(", ")));
	}
	if !verdict.evidence.materials.is_empty() {
		let parts: Vec<String> = verdict
			.evidence
			.materials
			.iter()
			.map(|(object, material)| format!("{object}={material}"))
			.collect();
		reasons.push(format!("Materials: {}", parts.join(", ")));
	}
	reasons
}

pub fn confidence_badge(confidence: f32) -> &'static str {
	if confidence >= 0.9 {
		"green"
	} else if confidence >= 0.7 {
		"yellow"
	} else {
		"red"
	}
}
