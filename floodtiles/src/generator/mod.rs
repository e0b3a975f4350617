//! The offline pre-compression generator. Walks a zoom/bbox range, drives the mosaic engine and
//! quantizer for each tile, and writes the results to the on-disk tile tree with the same
//! atomic-write discipline the runtime write-through path uses.
//!
//! The bounded-concurrency task submission loop is expressed with `tokio::task::JoinSet`, which
//! gives streaming submission with a bounded number of tasks in flight at once — see
//! `DESIGN.md` for why this is the idiomatic Rust equivalent of a bounded process pool.

mod manifest;

pub use manifest::{Manifest, ZoomCounts};

use crate::cli::GenerateArgs;
use anyhow::{Context, Result, bail};
use floodtiles_core::{Blob, Config, TileCompression, TileError, clamp_latitude, compress_brotli, compress_gzip, deg_to_tile, quantize_raster};
use floodtiles_mosaic::mosaic_tile;
use floodtiles_store::{DecompressedArrayCache, TileTree};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub fn run(args: &GenerateArgs) -> Result<()> {
	let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
	rt.block_on(run_async(args))
}

async fn run_async(args: &GenerateArgs) -> Result<()> {
	let config = build_config(args)?;
	guard_source_dir(&config)?;

	if config.zoom_min > config.zoom_max {
		bail!(TileError::ConfigurationError(format!(
			"zoom_min {} is greater than zoom_max {}",
			config.zoom_min, config.zoom_max
		)));
	}

	let bbox = match &args.bbox {
		Some(values) if values.len() == 4 => (values[0], values[1], values[2], values[3]),
		_ => derive_bbox_from_corpus(&config.source_dir)?,
	};

	let config = Arc::new(config);
	let tile_tree = Arc::new(TileTree::new(config.tile_root.clone()));
	let cache = Arc::new(DecompressedArrayCache::new(
		config.cache_budget_bytes,
		config.source_dir.clone(),
		config.dem_version,
		config.preload_workers,
	));

	let mut manifest = Manifest::new(&config, bbox);
	let run_started = Instant::now();

	for z in config.zoom_min..=config.zoom_max {
		let counts = generate_zoom(Arc::clone(&config), Arc::clone(&tile_tree), Arc::clone(&cache), z, bbox).await?;
		log::info!(
			"zoom {z}: examined={} written={} skipped_existing={} skipped_missing={} elapsed={:.1}s",
			counts.examined,
			counts.written,
			counts.skipped_existing,
			counts.skipped_missing,
			counts.elapsed_secs
		);
		manifest.per_zoom.insert(z, counts);
		manifest.write(&config.tile_root)?;
	}

	manifest.finished_at = Some(manifest::now_rfc3339());
	manifest.write(&config.tile_root)?;
	log::info!("generation complete in {:.1}s", run_started.elapsed().as_secs_f64());
	Ok(())
}

fn build_config(args: &GenerateArgs) -> Result<Config> {
	let mut config = Config::load(args.config.as_deref())?;
	if let Some(dir) = &args.output_dir {
		config.tile_root = dir.clone();
	}
	if let Some(dir) = &args.source_dir {
		config.source_dir = dir.clone();
	}
	if let Some(z) = args.zoom_min {
		config.zoom_min = z;
	}
	if let Some(z) = args.zoom_max {
		config.zoom_max = z;
	}
	if let Some(workers) = args.workers {
		config.max_tasks_inflight = workers.max(1);
	}
	if args.no_br {
		config.generate_br = false;
	}
	if args.no_gz {
		config.generate_gz = false;
	}
	if args.write_raw {
		config.write_raw = true;
	}
	if args.no_skip {
		config.skip_existing = false;
	}
	Ok(config)
}

/// Abort before generating anything if `source_dir` doesn't exist or contains implausibly few
/// DEMs — almost always a wrong-path misconfiguration.
fn guard_source_dir(config: &Config) -> Result<()> {
	if !config.source_dir.is_dir() {
		bail!(TileError::ConfigurationError(format!(
			"source directory {} does not exist or is not a directory",
			config.source_dir.display()
		)));
	}
	let count = std::fs::read_dir(&config.source_dir)
		.with_context(|| format!("reading {}", config.source_dir.display()))?
		.filter_map(|entry| entry.ok())
		.filter(|entry| entry.path().extension().is_some_and(|ext| ext == "zst"))
		.count();
	if count < config.min_dem_count {
		bail!(TileError::ConfigurationError(format!(
			"source directory {} contains only {count} DEM(s); expected at least {} (min_dem_count) \
			 — this is almost always a wrong-path misconfiguration",
			config.source_dir.display(),
			config.min_dem_count
		)));
	}
	Ok(())
}

/// Default bbox when none is given on the command line: the union of every sidecar's declared
/// bounds.
fn derive_bbox_from_corpus(source_dir: &Path) -> Result<(f64, f64, f64, f64)> {
	let mut min_lon = f64::INFINITY;
	let mut min_lat = f64::INFINITY;
	let mut max_lon = f64::NEG_INFINITY;
	let mut max_lat = f64::NEG_INFINITY;
	let mut found = false;

	for entry in std::fs::read_dir(source_dir).with_context(|| format!("reading {}", source_dir.display()))? {
		let entry = entry?;
		let path = entry.path();
		if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
			continue;
		}
		let Ok(text) = std::fs::read_to_string(&path) else { continue };
		let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else { continue };
		let Some(bounds) = value.get("bounds") else { continue };
		let (Some(left), Some(right), Some(bottom), Some(top)) = (
			bounds.get("left").and_then(serde_json::Value::as_f64),
			bounds.get("right").and_then(serde_json::Value::as_f64),
			bounds.get("bottom").and_then(serde_json::Value::as_f64),
			bounds.get("top").and_then(serde_json::Value::as_f64),
		) else {
			continue;
		};
		min_lon = min_lon.min(left);
		max_lon = max_lon.max(right);
		min_lat = min_lat.min(bottom);
		max_lat = max_lat.max(top);
		found = true;
	}

	if !found {
		bail!(TileError::ConfigurationError(format!(
			"no sidecar JSON files with a `bounds` object found under {}",
			source_dir.display()
		)));
	}
	Ok((min_lon, min_lat, max_lon, max_lat))
}

#[derive(Debug, Default)]
struct VariantSizes {
	raw: u64,
	br: u64,
	gz: u64,
}

enum TileOutcome {
	SkippedExisting,
	SkippedMissing,
	Written(VariantSizes),
}

async fn process_tile(config: Arc<Config>, tile_tree: Arc<TileTree>, cache: Arc<DecompressedArrayCache>, z: u8, x: u32, y: u32) -> Result<TileOutcome> {
	if config.skip_existing && tile_tree.any_variant_exists(z, x, y) {
		return Ok(TileOutcome::SkippedExisting);
	}

	let mosaic = mosaic_tile(&cache, &config.source_dir, config.dem_version, z, x, y).await;
	if mosaic.all_nodata {
		// never write an all-NODATA tile; ocean coverage is implicit absence.
		return Ok(TileOutcome::SkippedMissing);
	}

	let payload = quantize_raster(&mosaic.samples);
	let mut sizes = VariantSizes::default();

	if config.write_raw {
		tile_tree.write_variant(z, x, y, TileCompression::Uncompressed, &payload)?;
		sizes.raw = payload.len() as u64;
	}
	if config.generate_br {
		let blob = compress_brotli(&Blob::from(payload.clone()))?;
		sizes.br = blob.len();
		tile_tree.write_variant(z, x, y, TileCompression::Brotli, blob.as_slice())?;
	}
	if config.generate_gz {
		let blob = compress_gzip(&Blob::from(payload))?;
		sizes.gz = blob.len();
		tile_tree.write_variant(z, x, y, TileCompression::Gzip, blob.as_slice())?;
	}

	Ok(TileOutcome::Written(sizes))
}

fn apply_outcome(counts: &mut ZoomCounts, outcome: TileOutcome) {
	match outcome {
		TileOutcome::SkippedExisting => counts.skipped_existing += 1,
		TileOutcome::SkippedMissing => counts.skipped_missing += 1,
		TileOutcome::Written(sizes) => {
			counts.written += 1;
			counts.bytes_raw += sizes.raw;
			counts.bytes_br += sizes.br;
			counts.bytes_gz += sizes.gz;
		}
	}
}

/// Generates every tile at zoom `z` within `bbox`. Tiles are submitted row-major (outer `x`,
/// inner `y`) with at most `config.max_tasks_inflight` in flight at once; when that cap is
/// reached, the loop waits for the first task to finish before submitting the next, bounding
/// memory while keeping all workers saturated.
async fn generate_zoom(config: Arc<Config>, tile_tree: Arc<TileTree>, cache: Arc<DecompressedArrayCache>, z: u8, bbox: (f64, f64, f64, f64)) -> Result<ZoomCounts> {
	let started = Instant::now();
	let (min_lon, min_lat, max_lon, max_lat) = bbox;
	let min_lat = clamp_latitude(min_lat);
	let max_lat = clamp_latitude(max_lat);

	let (x_a, y_a) = deg_to_tile(min_lat, min_lon, z);
	let (x_b, y_b) = deg_to_tile(max_lat, max_lon, z);
	let (x_min, x_max) = (x_a.min(x_b), x_a.max(x_b));
	let (y_min, y_max) = (y_a.min(y_b), y_a.max(y_b));

	let mut counts = ZoomCounts::default();
	let mut in_flight = tokio::task::JoinSet::new();
	let max_inflight = config.max_tasks_inflight.max(1);

	for x in x_min..=x_max {
		for y in y_min..=y_max {
			counts.examined += 1;
			while in_flight.len() >= max_inflight {
				if let Some(joined) = in_flight.join_next().await {
					apply_outcome(&mut counts, joined??);
				}
			}
			let config = Arc::clone(&config);
			let tile_tree = Arc::clone(&tile_tree);
			let cache = Arc::clone(&cache);
			in_flight.spawn(async move { process_tile(config, tile_tree, cache, z, x, y).await });
		}
	}
	while let Some(joined) = in_flight.join_next().await {
		apply_outcome(&mut counts, joined??);
	}

	counts.elapsed_secs = started.elapsed().as_secs_f64();
	Ok(counts)
}
