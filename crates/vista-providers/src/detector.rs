use color_eyre::{Result, eyre::eyre};
use serde::Deserialize;
use vista_domain::bbox::BBox;

use crate::auth_headers;

#[derive(Debug, Clone, Deserialize)]
pub struct Detection {
	pub label: String,
	pub score: f32,
	pub bbox: BBox,
}

/// Object detection over raw image bytes. The detector is a black box that
/// answers `{"detections": [{label, score, bbox}]}` (a bare array is also
/// accepted).
pub async fn detect(cfg: &vista_config::DetectorConfig, image_bytes: Vec<u8>) -> Result<Vec<Detection>> {
	let client = reqwest::Client::builder()
		.timeout(std::time::Duration::from_millis(cfg.timeout_ms))
		.build()?;
	let res = client
		.post(&cfg.url)
		.headers(auth_headers(cfg.api_key.as_deref())?)
		.header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
		.body(image_bytes)
		.send()
		.await?;
	let json: serde_json::Value = res.error_for_status()?.json().await?;
	parse_detector_response(json)
}

fn parse_detector_response(json: serde_json::Value) -> Result<Vec<Detection>> {
	let items = json
		.get("detections")
		.cloned()
		.or_else(|| json.as_array().map(|_| json.clone()))
		.ok_or_else(|| eyre!("Detector response is missing the detections array."))?;
	let detections: Vec<Detection> = serde_json::from_value(items)
		.map_err(|err| eyre!("Detector response has a malformed detection: {err}."))?;
	Ok(detections)
}
