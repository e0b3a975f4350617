//! The mosaic engine. Produces an aligned 256x256 `int16` raster for any Web Mercator tile by
//! enumerating the overlapping source DEMs, cropping and resampling each through the
//! decompressed-array cache (`floodtiles_store`), and blending them with a deterministic
//! "paint-behind" rule.
//!
//! The per-DEM crop + resample primitive itself lives in `floodtiles_core::resample` so the
//! decompressed-array cache's `extract_tile` convenience wrapper and this engine share one
//! implementation; this crate only adds DEM enumeration, existence checks and the blend order
//! across multiple DEMs.

use floodtiles_core::{GeoBounds, NODATA_I16, TILE_SIZE, overlapping_dem_ids, tile_bounds};
use floodtiles_store::DecompressedArrayCache;
use std::path::{Path, PathBuf};

/// The result of mosaicking one tile: a row-major `int16` canvas of `TILE_SIZE x TILE_SIZE`
/// samples, plus whether every sample in it is NODATA (an ocean tile with no DEM coverage).
#[derive(Debug, Clone)]
pub struct MosaicResult {
	pub samples: Vec<i16>,
	pub all_nodata: bool,
}

fn dem_path(source_dir: &Path, lat_int: i32, lon_int: i32, dem_version: u32) -> PathBuf {
	let id = floodtiles_core::DemId { lat_int, lon_int };
	source_dir.join(format!("{}.zst", id.tile_id(dem_version)))
}

/// Mosaics Web Mercator tile `(x, y, z)` from every overlapping DEM under `source_dir`.
///
/// DEMs are visited in the deterministic west-to-east, south-to-north order
/// `floodtiles_core::overlapping_dem_ids` returns; a pixel is only painted by a DEM if the canvas
/// still holds NODATA there and the DEM's sample at that position is not NODATA itself (the
/// "paint-behind" rule) — so the first DEM to cover a pixel wins, independent of how many later
/// DEMs also cover it.
///
/// A DEM whose `.zst` file doesn't exist under `source_dir` is silently skipped — a directory
/// existence check, rather than treated as an error — this is the common case for ocean-only
/// coverage. A DEM whose file exists but fails to load (corrupt frame, bad sidecar) is logged and
/// skipped too; the mosaic continues with the remaining DEMs. If no DEM contributes any data, the
/// canvas stays entirely NODATA and is returned as `Ok`, never an error.
pub async fn mosaic_tile(cache: &DecompressedArrayCache, source_dir: &Path, dem_version: u32, z: u8, x: u32, y: u32) -> MosaicResult {
	let size = TILE_SIZE as usize;
	let dst_bounds = tile_bounds(x, y, z);
	let mut canvas = vec![NODATA_I16; size * size];

	for dem_id in overlapping_dem_ids(dst_bounds) {
		let path = dem_path(source_dir, dem_id.lat_int, dem_id.lon_int, dem_version);
		if !path.exists() {
			continue;
		}

		match cache.extract_tile(&path, dst_bounds, size).await {
			Ok(Some(patch)) => paint_behind(&mut canvas, &patch),
			Ok(None) => {
				// Enumeration said this DEM's nominal square overlaps, but its (possibly
				// half-pixel-expanded) bounds don't actually intersect the tile. Nothing to do.
			}
			Err(err) => {
				log::warn!("mosaic: skipping DEM {} for tile z={z} x={x} y={y}: {err:#}", path.display());
			}
		}
	}

	let all_nodata = canvas.iter().all(|&v| v == NODATA_I16);
	MosaicResult { samples: canvas, all_nodata }
}

/// Blends `patch` into `canvas` in place: a pixel is overwritten only if the canvas still holds
/// NODATA there and `patch`'s sample at that position is not NODATA.
fn paint_behind(canvas: &mut [i16], patch: &[i16]) {
	debug_assert_eq!(canvas.len(), patch.len());
	for (dst, &src) in canvas.iter_mut().zip(patch.iter()) {
		if *dst == NODATA_I16 && src != NODATA_I16 {
			*dst = src;
		}
	}
}

/// Geographic bounds of the tile this engine just mosaicked, exposed so callers (the generator,
/// the router) don't need to re-derive it from `floodtiles_core` themselves when logging or
/// building a `Manifest` entry.
pub fn mosaic_tile_bounds(z: u8, x: u32, y: u32) -> GeoBounds {
	tile_bounds(x, y, z)
}
