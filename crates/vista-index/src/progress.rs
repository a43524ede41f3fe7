use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;
use vista_storage::{db::Db, writer};

const MAX_ERRORS: usize = 100;

/// Process-wide indexing progress. One mutex around the whole struct;
/// readers copy a snapshot out under the lock.
pub struct ProgressTracker {
	inner: Mutex<State>,
}

#[derive(Default)]
struct State {
	is_running: bool,
	started_at: Option<OffsetDateTime>,
	processed_count: u64,
	total_count: u64,
	current_file: Option<String>,
	errors: VecDeque<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
	pub is_running: bool,
	#[serde(with = "time::serde::rfc3339::option")]
	pub started_at: Option<OffsetDateTime>,
	pub processed_count: u64,
	pub total_count: u64,
	pub progress_pct: f32,
	pub current_file: Option<String>,
	pub errors: Vec<String>,
}

impl ProgressTracker {
	pub fn new() -> Self {
		Self { inner: Mutex::new(State::default()) }
	}

	/// Mark a run as started. Returns false when one is already running.
	pub fn start(&self, now: OffsetDateTime) -> bool {
		let mut state = self.inner.lock();
		if state.is_running {
			return false;
		}
		*state = State {
			is_running: true,
			started_at: Some(now),
			..State::default()
		};
		true
	}

	pub fn finish(&self) {
		let mut state = self.inner.lock();
		state.is_running = false;
		state.current_file = None;
	}

	pub fn add_total(&self, count: u64) {
		self.inner.lock().total_count += count;
	}

	pub fn inc_processed(&self) {
		self.inner.lock().processed_count += 1;
	}

	pub fn set_current_file(&self, name: &str) {
		self.inner.lock().current_file = Some(name.to_string());
	}

	/// Record an error, keeping only the most recent 100.
	pub fn push_error(&self, message: String) {
		let mut state = self.inner.lock();
		if state.errors.len() == MAX_ERRORS {
			state.errors.pop_front();
		}
		state.errors.push_back(message);
	}

	pub fn snapshot(&self) -> ProgressSnapshot {
		let state = self.inner.lock();
		let progress_pct = if state.total_count > 0 {
			(state.processed_count as f32 / state.total_count as f32) * 100.0
		} else {
			0.0
		};
		ProgressSnapshot {
			is_running: state.is_running,
			started_at: state.started_at,
			processed_count: state.processed_count,
			total_count: state.total_count,
			progress_pct,
			current_file: state.current_file.clone(),
			errors: state.errors.iter().cloned().collect(),
		}
	}

	/// Persist the current snapshot; failures are logged, never fatal.
	pub async fn persist(&self, db: &Db) {
		let snapshot = self.snapshot();
		if let Err(err) = writer::save_progress(
			db,
			snapshot.is_running,
			snapshot.started_at,
			snapshot.processed_count,
			snapshot.total_count,
			snapshot.current_file.as_deref(),
			&snapshot.errors,
		)
		.await
		{
			warn!(error = %err, "Failed to persist indexing progress.");
		}
	}

	/// Boot-time restore: `processed_count` is recomputed from the images
	/// table, not trusted from the persisted snapshot.
	pub async fn restore(&self, db: &Db) {
		match writer::count_images(db).await {
			Ok(count) => {
				let mut state = self.inner.lock();
				state.processed_count = count as u64;
			},
			Err(err) => warn!(error = %err, "Failed to recompute processed count on boot."),
		}
	}
}

impl Default for ProgressTracker {
	fn default() -> Self {
		Self::new()
	}
}
