use std::collections::BTreeMap;

use color_eyre::{Result, eyre::eyre};
use serde::{Deserialize, Serialize};

use crate::auth_headers;

const SYSTEM_PROMPT: &str = "You are a careful visual verifier. For each image, decide if it \
satisfies the user's request using only what is visible. Be strict: if uncertain, say it does \
NOT match. Output only JSON by the schema.\n\nSchema:\n{\n  \"verdicts\": [\n    {\n      \
\"image_id\": \"string\",\n      \"matches\": true,\n      \"confidence\": 0.0,\n      \
\"room\": \"string or null\",\n      \"evidence\": {\n        \"objects\": [\"string\"],\n        \
\"colors\": {\"object\": \"color\"},\n        \"materials\": {\"object\": \"material\"}\n      },\n      \
\"notes\": \"string\"\n    }\n  ]\n}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VlmEvidence {
	#[serde(default)]
	pub objects: Vec<String>,
	#[serde(default)]
	pub colors: BTreeMap<String, String>,
	#[serde(default)]
	pub materials: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlmVerdict {
	pub image_id: String,
	pub matches: bool,
	pub confidence: f32,
	#[serde(default)]
	pub room: Option<String>,
	#[serde(default)]
	pub evidence: VlmEvidence,
	#[serde(default)]
	pub notes: String,
}

#[derive(Debug, Clone)]
pub struct ImageRef {
	pub image_id: String,
	pub url: String,
}

#[derive(Debug, Clone)]
pub struct VerifyRequest {
	/// The user's query as typed.
	pub query: String,
	/// The post-translation query; equals `query` for English input.
	pub translated_query: String,
	pub images: Vec<ImageRef>,
}

#[derive(Debug)]
pub enum VerifyResponse {
	Verdicts(Vec<VlmVerdict>),
	/// Both the original answer and the reformat follow-up failed strict
	/// parsing. The caller downgrades the batch, never the request.
	Unparseable,
}

/// One VLM verification call for a batch of images. Malformed JSON is retried
/// once with a reformat follow-up; HTTP failures bubble up for the caller's
/// backoff loop.
pub async fn verify(cfg: &vista_config::VlmConfig, request: &VerifyRequest) -> Result<VerifyResponse> {
	let client = reqwest::Client::builder()
		.timeout(std::time::Duration::from_millis(cfg.timeout_ms))
		.build()?;
	let mut messages = vec![
		serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user_content(request) }),
	];

	for round in 0..2 {
		let body = serde_json::json!({
			"model": cfg.model,
			"temperature": 0,
			"response_format": { "type": "json_object" },
			"messages": messages,
		});
		let res = client
			.post(&cfg.url)
			.headers(auth_headers(Some(&cfg.api_key))?)
			.json(&body)
			.send()
			.await?;
		let json: serde_json::Value = res.error_for_status()?.json().await?;

		let content = extract_content(&json)?;
		match parse_verdicts(&content) {
			Ok(verdicts) => return Ok(VerifyResponse::Verdicts(verdicts)),
			Err(_) if round == 0 => {
				messages.push(serde_json::json!({ "role": "assistant", "content": content }));
				messages.push(serde_json::json!({
					"role": "user",
					"content": "Reformat your previous answer as valid JSON matching the schema. \
					            Output only the JSON object."
				}));
			},
			Err(_) => return Ok(VerifyResponse::Unparseable),
		}
	}
	Ok(VerifyResponse::Unparseable)
}

fn user_content(request: &VerifyRequest) -> serde_json::Value {
	let mut content = vec![serde_json::json!({
		"type": "text",
		"text": format!(
			"Query: {}\nTranslated query: {}\nReturn an array 'verdicts' following the schema.",
			request.query, request.translated_query
		)
	})];
	for image in &request.images {
		content.push(serde_json::json!({ "type": "text", "text": format!("ImageID: {}", image.image_id) }));
		content.push(serde_json::json!({ "type": "image_url", "image_url": { "url": image.url } }));
	}
	serde_json::Value::Array(content)
}

fn extract_content(json: &serde_json::Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| eyre!("VLM response is missing message content."))
}

/// Strict verdict parsing: the content must be a JSON object with a
/// `verdicts` array and every verdict must carry the required fields.
/// Confidence values are clamped into [0, 1].
fn parse_verdicts(content: &str) -> Result<Vec<VlmVerdict>> {
	let value: serde_json::Value = serde_json::from_str(content)
		.map_err(|err| eyre!("VLM content is not valid JSON: {err}."))?;
	let verdicts = value
		.get("verdicts")
		.ok_or_else(|| eyre!("VLM content is missing the verdicts array."))?;
	let mut parsed: Vec<VlmVerdict> = serde_json::from_value(verdicts.clone())
		.map_err(|err| eyre!("VLM verdict is malformed: {err}."))?;
	for verdict in &mut parsed {
		verdict.confidence = verdict.confidence.clamp(0.0, 1.0);
	}
	Ok(parsed)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_full_verdict() {
		let content = serde_json::json!({
			"verdicts": [{
				"image_id": "img-1",
				"matches": true,
				"confidence": 0.92,
				"room": "kitchen",
				"evidence": {
					"objects": ["dining table"],
					"colors": { "dining table": "black" },
					"materials": { "dining table": "marble" }
				},
				"notes": "Black marble table visible."
			}]
		})
		.to_string();
		let verdicts = parse_verdicts(&content).expect("parse failed");
		assert_eq!(verdicts.len(), 1);
		assert!(verdicts[0].matches);
		assert_eq!(verdicts[0].room.as_deref(), Some("kitchen"));
		assert_eq!(verdicts[0].evidence.colors.get("dining table").map(String::as_str), Some("black"));
	}

	#[test]
	fn clamps_out_of_range_confidence() {
		let content = serde_json::json!({
			"verdicts": [{ "image_id": "a", "matches": false, "confidence": 1.7 }]
		})
		.to_string();
		let verdicts = parse_verdicts(&content).expect("parse failed");
		assert_eq!(verdicts[0].confidence, 1.0);
	}

	#[test]
	fn rejects_missing_verdicts_key() {
		assert!(parse_verdicts("{\"results\": []}").is_err());
	}

	#[test]
	fn rejects_invalid_json() {
		assert!(parse_verdicts("verdicts: yes").is_err());
	}

	#[test]
	fn user_content_interleaves_ids_and_images() {
		let request = VerifyRequest {
			query: "kitchen".to_string(),
			translated_query: "kitchen".to_string(),
			images: vec![
				ImageRef { image_id: "a".to_string(), url: "http://x/a".to_string() },
				ImageRef { image_id: "b".to_string(), url: "http://x/b".to_string() },
			],
		};
		let content = user_content(&request);
		let parts = content.as_array().expect("array");
		assert_eq!(parts.len(), 5);
		assert_eq!(parts[1]["text"], "ImageID: a");
		assert_eq!(parts[2]["image_url"]["url"], "http://x/a");
	}
}
