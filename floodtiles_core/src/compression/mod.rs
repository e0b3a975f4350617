//! Compression used for the on-disk and over-the-wire tile representation: Brotli (best ratio,
//! used for the offline-generated archive), Gzip (fast, widely supported fallback) and the raw,
//! uncompressed form served when a client sends no `Accept-Encoding`.

mod functions;
mod goal;
mod target;

pub use functions::*;
pub use goal::*;
pub use target::*;

use anyhow::{bail, Result};
#[cfg(feature = "cli")]
use clap::ValueEnum;
use enumset::EnumSetType;
use std::fmt::Display;

/// Compression algorithm applied to a serialized tile.
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[derive(Debug, EnumSetType, PartialOrd)]
pub enum TileCompression {
	Uncompressed,
	Gzip,
	Brotli,
}

impl Display for TileCompression {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			TileCompression::Uncompressed => "none",
			TileCompression::Gzip => "gzip",
			TileCompression::Brotli => "brotli",
		})
	}
}

impl TileCompression {
	/// File extension suffix appended after the tile's base extension, e.g. `tile.u16.br`.
	pub fn extension(&self) -> &str {
		match self {
			TileCompression::Uncompressed => "",
			TileCompression::Gzip => ".gz",
			TileCompression::Brotli => ".br",
		}
	}

	/// The `Content-Encoding` header value, or `None` for the uncompressed variant.
	pub fn content_encoding(&self) -> Option<&str> {
		match self {
			TileCompression::Uncompressed => None,
			TileCompression::Gzip => Some("gzip"),
			TileCompression::Brotli => Some("br"),
		}
	}

	pub fn from_filename(filename: &mut String) -> TileCompression {
		if let Some(index) = filename.rfind('.') {
			let compression = match filename.get(index..).unwrap() {
				".gz" => TileCompression::Gzip,
				".br" => TileCompression::Brotli,
				_ => TileCompression::Uncompressed,
			};

			if compression != TileCompression::Uncompressed {
				filename.truncate(index);
			}
			return compression;
		}
		TileCompression::Uncompressed
	}

	pub fn parse_str(value: &str) -> Result<Self> {
		Ok(match value.to_lowercase().trim() {
			"br" | "brotli" => TileCompression::Brotli,
			"gz" | "gzip" => TileCompression::Gzip,
			"none" | "raw" => TileCompression::Uncompressed,
			_ => bail!("unknown tile compression '{value}', expected brotli, gzip or none"),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extension_round_trips_through_from_filename() {
		fn test(expected: TileCompression, filename: &str, remainder: &str) {
			let mut s = String::from(filename);
			assert_eq!(TileCompression::from_filename(&mut s), expected);
			assert_eq!(s, remainder);
		}

		test(TileCompression::Gzip, "file.u16.gz", "file.u16");
		test(TileCompression::Brotli, "file.u16.br", "file.u16");
		test(TileCompression::Uncompressed, "file.u16", "file.u16");
	}

	#[test]
	fn content_encoding_values() {
		assert_eq!(TileCompression::Uncompressed.content_encoding(), None);
		assert_eq!(TileCompression::Gzip.content_encoding(), Some("gzip"));
		assert_eq!(TileCompression::Brotli.content_encoding(), Some("br"));
	}

	#[test]
	fn parse_str_accepts_aliases() -> Result<()> {
		assert_eq!(TileCompression::parse_str("br")?, TileCompression::Brotli);
		assert_eq!(TileCompression::parse_str("GZIP")?, TileCompression::Gzip);
		assert_eq!(TileCompression::parse_str("none")?, TileCompression::Uncompressed);
		assert!(TileCompression::parse_str("lzma").is_err());
		Ok(())
	}
}
