//! Error kinds that cross the library/HTTP boundary. A plain hand-written enum rather than
//! `thiserror` — it leans on `anyhow` everywhere outward-facing code doesn't need a typed enum.
//! `TileError` is the one place that *does* need a typed enum, since the request router maps
//! each variant to a distinct HTTP status.

use std::fmt;

/// A tile-pipeline failure, tagged with enough context to map to an HTTP status and to a log
/// line.
#[derive(Debug)]
pub enum TileError {
	/// Malformed or out-of-range request: invalid `z/x/y`, zoom outside the supported range.
	InvalidRequest(String),
	/// A source DEM file failed its sidecar/size/decompression checks.
	CorruptSource { dem_id: String, reason: String },
	/// Filesystem or network I/O failure unrelated to the data's validity.
	IoFailure(String),
	/// Bad or missing configuration.
	ConfigurationError(String),
	/// The operation did not complete within its allotted deadline.
	DeadlineExceeded,
}

impl fmt::Display for TileError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TileError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
			TileError::CorruptSource { dem_id, reason } => {
				write!(f, "corrupt source DEM {dem_id}: {reason}")
			}
			TileError::IoFailure(msg) => write!(f, "I/O failure: {msg}"),
			TileError::ConfigurationError(msg) => write!(f, "configuration error: {msg}"),
			TileError::DeadlineExceeded => write!(f, "deadline exceeded"),
		}
	}
}

impl std::error::Error for TileError {}

impl TileError {
	/// The HTTP status code the request router should answer with.
	pub fn status_code(&self) -> u16 {
		match self {
			TileError::InvalidRequest(_) => 400,
			TileError::CorruptSource { .. } => 502,
			TileError::IoFailure(_) => 500,
			TileError::ConfigurationError(_) => 500,
			TileError::DeadlineExceeded => 503,
		}
	}
}

impl From<std::io::Error> for TileError {
	fn from(err: std::io::Error) -> Self {
		TileError::IoFailure(err.to_string())
	}
}
