//! Decompresses a single source DEM (`{tile_id}.zst` + sidecar `{tile_id}.json`) into an
//! [`ElevationArray`] plus its [`DemMetadata`]. The store trusts the sidecar's declared shape
//! rather than re-deriving it from the decompressed byte count alone.

use anyhow::{Context, Result, bail};
use floodtiles_core::{GeoBounds, NODATA_I16};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// A decompressed in-memory view of one source DEM. Never mutated after construction; safe to
/// share across any number of concurrent mosaic computations via the `Arc`.
#[derive(Debug, Clone)]
pub struct ElevationArray {
	pub samples: Arc<Vec<i16>>,
	pub height: usize,
	pub width: usize,
}

impl ElevationArray {
	pub fn sample(&self, row: usize, col: usize) -> i16 {
		self.samples[row * self.width + col]
	}
}

/// Sidecar metadata for one source DEM. `bounds` is trusted as authoritative and already reflects
/// the half-pixel expansion the ingestion process applies — this store never recomputes or
/// adjusts it.
#[derive(Debug, Clone, PartialEq)]
pub struct DemMetadata {
	pub bounds: GeoBounds,
	pub height: usize,
	pub width: usize,
	pub nodata_value: i16,
}

#[derive(Debug, Deserialize)]
struct SidecarBounds {
	left: f64,
	right: f64,
	bottom: f64,
	top: f64,
}

/// Raw sidecar shape. Supports both the current `shape: [h, w]` field and the legacy separate
/// `height`/`width` fields.
#[derive(Debug, Deserialize)]
struct Sidecar {
	bounds: SidecarBounds,
	#[serde(default)]
	shape: Option<[usize; 2]>,
	#[serde(default)]
	height: Option<usize>,
	#[serde(default)]
	width: Option<usize>,
	#[serde(default = "default_nodata")]
	nodata_value: i16,
}

fn default_nodata() -> i16 {
	NODATA_I16
}

impl Sidecar {
	fn dims(&self) -> Result<(usize, usize)> {
		if let Some([h, w]) = self.shape {
			Ok((h, w))
		} else if let (Some(h), Some(w)) = (self.height, self.width) {
			Ok((h, w))
		} else {
			bail!("sidecar has neither `shape` nor `height`/`width`")
		}
	}
}

/// Reads `zst_path` (and its sibling `.json` sidecar) into an [`ElevationArray`] + [`DemMetadata`].
///
/// Every failure mode here is fatal for this one DEM: a missing sidecar, a sidecar that doesn't
/// parse, a declared shape that doesn't match the decompressed byte count, or a zstd frame that
/// fails to decompress. None of these are retried or silently worked around — in particular, the
/// array is never cropped or padded to "fix" a mismatch, since that would break seam alignment
/// with neighboring DEMs.
pub fn load_dem(zst_path: &Path) -> Result<(ElevationArray, DemMetadata)> {
	let dem_id = zst_path
		.file_stem()
		.and_then(|s| s.to_str())
		.unwrap_or("<unknown>")
		.to_string();

	let json_path = zst_path.with_extension("json");
	let sidecar_text = std::fs::read_to_string(&json_path)
		.with_context(|| format!("missing sidecar for {dem_id}: {}", json_path.display()))?;
	let sidecar: Sidecar =
		serde_json::from_str(&sidecar_text).with_context(|| format!("parsing sidecar JSON for {dem_id}"))?;
	let (height, width) = sidecar.dims().with_context(|| format!("reading declared shape for {dem_id}"))?;

	let expected_bytes = height
		.checked_mul(width)
		.and_then(|n| n.checked_mul(2))
		.with_context(|| format!("declared shape overflows for {dem_id}: {height} x {width}"))?;

	let file = std::fs::File::open(zst_path).with_context(|| format!("opening {}", zst_path.display()))?;
	let mut decoder = zstd::Decoder::new(file).with_context(|| format!("opening zstd frame for {dem_id}"))?;

	// Refuse unbounded allocation: never read more than one byte past the declared size, so a
	// corrupt frame claiming to be huge cannot exhaust memory before the mismatch is detected.
	let mut raw = Vec::with_capacity(expected_bytes.min(64 * 1024 * 1024));
	let read = (&mut decoder)
		.take(expected_bytes as u64 + 1)
		.read_to_end(&mut raw)
		.with_context(|| format!("decompressing {dem_id}"))?;
	if read != expected_bytes {
		bail!("decompressed size mismatch for {dem_id}: shape {height}x{width} implies {expected_bytes} bytes, got {read}");
	}

	let mut samples = Vec::with_capacity(raw.len() / 2);
	for chunk in raw.chunks_exact(2) {
		samples.push(i16::from_le_bytes([chunk[0], chunk[1]]));
	}

	let metadata = DemMetadata {
		bounds: GeoBounds {
			lat_top: sidecar.bounds.top,
			lat_bottom: sidecar.bounds.bottom,
			lon_left: sidecar.bounds.left,
			lon_right: sidecar.bounds.right,
		},
		height,
		width,
		nodata_value: sidecar.nodata_value,
	};
	let array = ElevationArray {
		samples: Arc::new(samples),
		height,
		width,
	};
	Ok((array, metadata))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write as _;

	fn write_dem(dir: &Path, tile_id: &str, samples: &[i16], height: usize, width: usize, sidecar_extra: &str) {
		let mut raw = Vec::with_capacity(samples.len() * 2);
		for &v in samples {
			raw.extend_from_slice(&v.to_le_bytes());
		}
		let compressed = zstd::encode_all(raw.as_slice(), 3).expect("zstd encode");
		std::fs::write(dir.join(format!("{tile_id}.zst")), compressed).unwrap();

		let sidecar = format!(
			r#"{{"bounds": {{"left": -83.0001389, "right": -81.9998611, "bottom": 26.9998611, "top": 28.0001389}}, {sidecar_extra}}}"#
		);
		let mut f = std::fs::File::create(dir.join(format!("{tile_id}.json"))).unwrap();
		f.write_all(sidecar.as_bytes()).unwrap();
		let _ = (height, width);
	}

	#[test]
	fn loads_valid_dem_with_shape_field() {
		let dir = tempfile::tempdir().unwrap();
		let samples = vec![100i16; 4 * 3];
		write_dem(dir.path(), "n27_w082_1arc_v3", &samples, 4, 3, r#""shape": [4, 3], "nodata_value": -32768"#);

		let (array, meta) = load_dem(&dir.path().join("n27_w082_1arc_v3.zst")).unwrap();
		assert_eq!(array.height, 4);
		assert_eq!(array.width, 3);
		assert_eq!(array.sample(0, 0), 100);
		assert_eq!(meta.nodata_value, NODATA_I16);
	}

	#[test]
	fn loads_valid_dem_with_legacy_height_width_fields() {
		let dir = tempfile::tempdir().unwrap();
		let samples = vec![50i16; 2 * 2];
		write_dem(dir.path(), "s12_e151_1arc_v3", &samples, 2, 2, r#""height": 2, "width": 2"#);

		let (array, _meta) = load_dem(&dir.path().join("s12_e151_1arc_v3.zst")).unwrap();
		assert_eq!(array.height, 2);
		assert_eq!(array.width, 2);
	}

	#[test]
	fn missing_sidecar_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let raw = vec![0u8; 8];
		let compressed = zstd::encode_all(raw.as_slice(), 3).unwrap();
		std::fs::write(dir.path().join("n00_e000_1arc_v3.zst"), compressed).unwrap();

		let err = load_dem(&dir.path().join("n00_e000_1arc_v3.zst")).unwrap_err();
		assert!(err.to_string().contains("missing sidecar"));
	}

	#[test]
	fn size_mismatch_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		// declares 4x4 (32 bytes) but only provides 2x2 (8 bytes) of data
		write_dem(dir.path(), "n10_e010_1arc_v3", &vec![1i16; 4], 2, 2, r#""shape": [4, 4]"#);

		let err = load_dem(&dir.path().join("n10_e010_1arc_v3.zst")).unwrap_err();
		assert!(err.to_string().contains("size mismatch"));
	}

	#[test]
	fn corrupt_zstd_frame_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("n20_e020_1arc_v3.zst"), b"not a zstd frame").unwrap();
		let sidecar = r#"{"bounds": {"left": 20.0, "right": 21.0, "bottom": 20.0, "top": 21.0}, "shape": [1, 1]}"#;
		std::fs::write(dir.path().join("n20_e020_1arc_v3.json"), sidecar).unwrap();

		assert!(load_dem(&dir.path().join("n20_e020_1arc_v3.zst")).is_err());
	}

	#[test]
	fn malformed_sidecar_json_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let raw = vec![0u8; 2];
		let compressed = zstd::encode_all(raw.as_slice(), 3).unwrap();
		std::fs::write(dir.path().join("n30_e030_1arc_v3.zst"), compressed).unwrap();
		std::fs::write(dir.path().join("n30_e030_1arc_v3.json"), "{ not json").unwrap();

		let err = load_dem(&dir.path().join("n30_e030_1arc_v3.zst")).unwrap_err();
		assert!(err.to_string().contains("sidecar"));
	}
}
