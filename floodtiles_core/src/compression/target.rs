use super::goal::CompressionGoal;
use super::TileCompression;
use enumset::EnumSet;
use std::fmt::{self, Debug};

/// The set of compressions a caller is willing to accept, plus what it's optimizing for.
#[derive(PartialEq)]
pub struct TargetCompression {
	pub compressions: EnumSet<TileCompression>,
	pub compression_goal: CompressionGoal,
}

impl TargetCompression {
	#[must_use]
	pub fn from_set(compressions: EnumSet<TileCompression>) -> Self {
		TargetCompression {
			compressions,
			compression_goal: CompressionGoal::UseBestCompression,
		}
	}

	#[must_use]
	pub fn from(compression: TileCompression) -> Self {
		Self::from_set(EnumSet::only(compression))
	}

	#[must_use]
	pub fn from_none() -> Self {
		Self::from(TileCompression::Uncompressed)
	}

	pub fn set_fast_compression(&mut self) {
		self.compression_goal = CompressionGoal::UseFastCompression;
	}

	pub fn set_incompressible(&mut self) {
		self.compression_goal = CompressionGoal::IsIncompressible;
	}

	#[must_use]
	pub fn contains(&self, compression: TileCompression) -> bool {
		self.compressions.contains(compression)
	}

	pub fn insert(&mut self, compression: TileCompression) {
		self.compressions.insert(compression);
	}

	/// Parses an HTTP `Accept-Encoding` header value into a target, preferring Brotli over
	/// Gzip over the uncompressed fallback, which is always accepted.
	#[must_use]
	pub fn from_accept_encoding(header: &str) -> Self {
		let mut compressions = EnumSet::only(TileCompression::Uncompressed);
		for token in header.split(',') {
			match token.split(';').next().unwrap_or("").trim() {
				"br" => {
					compressions.insert(TileCompression::Brotli);
				}
				"gzip" => {
					compressions.insert(TileCompression::Gzip);
				}
				_ => {}
			}
		}
		Self::from_set(compressions)
	}

	/// Picks the best compression this target accepts, preferring Brotli, then Gzip, then raw.
	#[must_use]
	pub fn best_available(&self) -> TileCompression {
		if self.contains(TileCompression::Brotli) {
			TileCompression::Brotli
		} else if self.contains(TileCompression::Gzip) {
			TileCompression::Gzip
		} else {
			TileCompression::Uncompressed
		}
	}
}

impl Debug for TargetCompression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TargetCompression")
			.field("allowed_compressions", &self.compressions)
			.field("compression_goal", &self.compression_goal)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_none_allows_only_uncompressed() {
		let tc = TargetCompression::from_none();
		assert!(tc.contains(TileCompression::Uncompressed));
		assert_eq!(tc.compressions.len(), 1);
	}

	#[test]
	fn accept_encoding_prefers_brotli() {
		let tc = TargetCompression::from_accept_encoding("gzip, br, deflate");
		assert_eq!(tc.best_available(), TileCompression::Brotli);
	}

	#[test]
	fn accept_encoding_falls_back_to_gzip() {
		let tc = TargetCompression::from_accept_encoding("gzip, deflate");
		assert_eq!(tc.best_available(), TileCompression::Gzip);
	}

	#[test]
	fn accept_encoding_falls_back_to_raw() {
		let tc = TargetCompression::from_accept_encoding("deflate");
		assert_eq!(tc.best_available(), TileCompression::Uncompressed);
	}

	#[test]
	fn empty_accept_encoding_header_is_uncompressed() {
		let tc = TargetCompression::from_accept_encoding("");
		assert_eq!(tc.best_available(), TileCompression::Uncompressed);
	}
}
