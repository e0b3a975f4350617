//! Compress/decompress/optimize/recompress a [`Blob`] using the [`TileCompression`] it claims
//! (or is being converted to).

use super::{CompressionGoal, TargetCompression, TileCompression};
use crate::Blob;
use anyhow::{bail, Context, Result};
use std::io::{Read, Write};

pub fn compress_gzip(blob: &Blob) -> Result<Blob> {
	let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::best());
	encoder.write_all(blob.as_slice()).context("writing to gzip encoder")?;
	Ok(Blob::from(encoder.finish().context("finishing gzip stream")?))
}

pub fn decompress_gzip(blob: &Blob) -> Result<Blob> {
	let mut decoder = flate2::read::GzDecoder::new(blob.as_slice());
	let mut out = Vec::new();
	decoder.read_to_end(&mut out).context("reading gzip stream")?;
	Ok(Blob::from(out))
}

pub fn compress_brotli(blob: &Blob) -> Result<Blob> {
	let mut out = Vec::new();
	let params = brotli::enc::BrotliEncoderParams {
		quality: 11,
		..Default::default()
	};
	brotli::BrotliCompress(&mut blob.as_slice(), &mut out, &params).context("compressing brotli stream")?;
	Ok(Blob::from(out))
}

pub fn decompress_brotli(blob: &Blob) -> Result<Blob> {
	let mut out = Vec::new();
	brotli::BrotliDecompress(&mut blob.as_slice(), &mut out).context("decompressing brotli stream")?;
	Ok(Blob::from(out))
}

/// Optimizes the compression of a blob to match `target`'s allowed set and goal.
///
/// # Errors
///
/// Fails if `target` allows no compressions, or doesn't allow `Uncompressed` (which must always
/// be supported as the universal fallback).
pub fn optimize_compression(
	blob: Blob,
	input_compression: &TileCompression,
	target: &TargetCompression,
) -> Result<(Blob, TileCompression)> {
	if target.compressions.is_empty() {
		bail!("at least one compression algorithm must be allowed");
	}
	if !target.compressions.contains(TileCompression::Uncompressed) {
		bail!("'Uncompressed' must always be supported");
	}

	use CompressionGoal::*;

	if target.compression_goal != UseBestCompression && target.compressions.contains(*input_compression) {
		return Ok((blob, *input_compression));
	}

	match input_compression {
		TileCompression::Uncompressed => {
			if target.compression_goal != IsIncompressible {
				if target.compressions.contains(TileCompression::Brotli) {
					return Ok((compress_brotli(&blob)?, TileCompression::Brotli));
				}
				if target.compressions.contains(TileCompression::Gzip) {
					return Ok((compress_gzip(&blob)?, TileCompression::Gzip));
				}
			}
			Ok((blob, TileCompression::Uncompressed))
		}
		TileCompression::Gzip => {
			if target.compression_goal != IsIncompressible && target.compressions.contains(TileCompression::Brotli) {
				let decompressed = decompress_gzip(&blob)?;
				return Ok((compress_brotli(&decompressed)?, TileCompression::Brotli));
			}
			if target.compressions.contains(TileCompression::Gzip) {
				return Ok((blob, TileCompression::Gzip));
			}
			Ok((decompress_gzip(&blob)?, TileCompression::Uncompressed))
		}
		TileCompression::Brotli => {
			if target.compressions.contains(TileCompression::Brotli) {
				return Ok((blob, TileCompression::Brotli));
			}
			let decompressed = decompress_brotli(&blob)?;
			if target.compression_goal != IsIncompressible && target.compressions.contains(TileCompression::Gzip) {
				return Ok((compress_gzip(&decompressed)?, TileCompression::Gzip));
			}
			Ok((decompressed, TileCompression::Uncompressed))
		}
	}
}

pub fn recompress(blob: Blob, input_compression: &TileCompression, output_compression: &TileCompression) -> Result<Blob> {
	if input_compression == output_compression {
		return Ok(blob);
	}
	let decompressed = decompress(blob, input_compression)?;
	compress(decompressed, output_compression)
}

pub fn compress(blob: Blob, compression: &TileCompression) -> Result<Blob> {
	match compression {
		TileCompression::Uncompressed => Ok(blob),
		TileCompression::Gzip => compress_gzip(&blob),
		TileCompression::Brotli => compress_brotli(&blob),
	}
}

pub fn decompress(blob: Blob, compression: &TileCompression) -> Result<Blob> {
	match compression {
		TileCompression::Uncompressed => Ok(blob),
		TileCompression::Gzip => decompress_gzip(&blob),
		TileCompression::Brotli => decompress_brotli(&blob),
	}
}
