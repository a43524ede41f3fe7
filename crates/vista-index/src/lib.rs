pub mod analyze;
pub mod caption;
pub mod crawl;
pub mod fetch;
pub mod pipeline;
pub mod progress;
pub mod source;

/// Indexing failures that abort a run, mapped onto the CLI exit codes by the
/// indexer binary. Per-image problems never reach this type; they land in the
/// progress tracker's capped error list instead.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
	#[error("Source store authentication failed: {0}")]
	SourceAuth(String),
	#[error("Source store unreachable: {0}")]
	SourceUnreachable(String),
	#[error("Storage failure: {0}")]
	Storage(String),
	#[error("{0}")]
	Fatal(String),
}

impl IndexError {
	pub fn storage(err: impl std::fmt::Display) -> Self {
		Self::Storage(err.to_string())
	}
}

impl From<crate::source::SourceError> for IndexError {
	fn from(err: crate::source::SourceError) -> Self {
		match err {
			crate::source::SourceError::Auth(message) => Self::SourceAuth(message),
			crate::source::SourceError::Transient(message) => Self::SourceUnreachable(message),
		}
	}
}
