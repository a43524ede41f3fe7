pub mod backoff;
pub mod detector;
pub mod embedding;
pub mod limiter;
pub mod vlm;

use color_eyre::Result;

pub fn auth_headers(api_key: Option<&str>) -> Result<reqwest::header::HeaderMap> {
	let mut headers = reqwest::header::HeaderMap::new();
	if let Some(key) = api_key.filter(|key| !key.is_empty()) {
		headers.insert(reqwest::header::AUTHORIZATION, format!("Bearer {key}").parse()?);
	}
	Ok(headers)
}
