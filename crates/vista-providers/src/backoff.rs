use std::time::Duration;

/// Exponential backoff: `base × 2^(attempt-1)` capped at `cap`. Attempt
/// numbering starts at 1.
pub fn backoff_with(base_ms: u64, cap_ms: u64, attempt: u32) -> Duration {
	let exp = attempt.max(1).saturating_sub(1).min(16);
	let raw = base_ms.saturating_mul(1 << exp);
	Duration::from_millis(raw.min(cap_ms))
}

/// Provider-call schedule: 1 s, 2 s, 4 s, 8 s.
pub fn provider_backoff(attempt: u32) -> Duration {
	backoff_with(1_000, 8_000, attempt)
}

/// Folder-listing schedule: 500 ms base, 30 s cap.
pub fn listing_backoff(attempt: u32) -> Duration {
	backoff_with(500, 30_000, attempt)
}
