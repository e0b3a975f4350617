//! A thread-safe, single-flight, byte-budgeted LRU over [`ElevationArray`]s.
//!
//! The byte accounting and eviction policy come from `floodtiles_core::ByteLimitedCache`, guarded
//! here by a `parking_lot::Mutex`. Two concurrent misses for the same DEM must decompress only
//! once, so a `DashMap` of per-key `tokio::sync::OnceCell`s tracks in-progress decompressions:
//! the lock guarding the LRU itself is only ever held for the cheap map operations, never across
//! an actual decompression.

use crate::dem_store::{DemMetadata, ElevationArray, load_dem};
use anyhow::{Result, anyhow};
use dashmap::DashMap;
use floodtiles_core::{ByteLimitedCache, ByteSized, GeoBounds};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

/// A cached DEM: its decompressed samples plus the sidecar metadata needed to place it
/// geographically.
#[derive(Debug, Clone)]
pub struct CachedDem {
	pub array: ElevationArray,
	pub metadata: DemMetadata,
}

impl ByteSized for CachedDem {
	fn byte_size(&self) -> usize {
		self.array.samples.len() * std::mem::size_of::<i16>() + std::mem::size_of::<DemMetadata>()
	}
}

/// A snapshot of cache activity, exposed by `stats()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayCacheStats {
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
	pub decompressions: u64,
	pub preloads: u64,
	pub used_bytes: usize,
	pub budget_bytes: usize,
}

type InflightCell = Arc<OnceCell<Result<CachedDem, Arc<anyhow::Error>>>>;

pub struct DecompressedArrayCache {
	cache: Mutex<ByteLimitedCache<PathBuf, CachedDem>>,
	inflight: DashMap<PathBuf, InflightCell>,
	source_dir: PathBuf,
	dem_version: u32,
	preload_workers: usize,
	decompressions: AtomicU64,
	preloads: AtomicU64,
}

impl DecompressedArrayCache {
	/// `preload_workers` bounds how many DEMs `preload_area` decompresses concurrently (default
	/// `min(CPU count, 8)`); it has no effect on `get` or `extract_tile`, which are unbounded
	/// besides the single-flight dedup they already do.
	pub fn new(budget_bytes: usize, source_dir: PathBuf, dem_version: u32, preload_workers: usize) -> Self {
		Self {
			cache: Mutex::new(ByteLimitedCache::with_budget(budget_bytes)),
			inflight: DashMap::new(),
			source_dir,
			dem_version,
			preload_workers: preload_workers.max(1),
			decompressions: AtomicU64::new(0),
			preloads: AtomicU64::new(0),
		}
	}

	/// Cache-coherent read. On a miss, at most one concurrent caller per `path` actually
	/// decompresses; the rest wait on that caller's result.
	pub async fn get(&self, path: &Path) -> Result<CachedDem> {
		let key = path.to_path_buf();
		if let Some(hit) = self.cache.lock().get(&key) {
			return Ok(hit);
		}

		let cell: InflightCell = self.inflight.entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone();

		let blocking_path = key.clone();
		let result = cell
			.get_or_try_init(|| async {
				let loaded = tokio::task::spawn_blocking(move || load_dem(&blocking_path))
					.await
					.map_err(|join_err| Arc::new(anyhow!("decompression task panicked: {join_err}")))?;
				let (array, metadata) = loaded.map_err(Arc::new)?;
				self.decompressions.fetch_add(1, Ordering::Relaxed);
				Ok(CachedDem { array, metadata })
			})
			.await
			.clone();

		self.inflight.remove(&key);

		match result {
			Ok(entry) => {
				self.cache.lock().insert(key, entry.clone());
				Ok(entry)
			}
			// a failed decompression is propagated, never cached; a later call retries from scratch
			Err(err) => Err(anyhow!("{err}")),
		}
	}

	/// Convenience wrapper performing the per-DEM crop + resample step for a single cached
	/// array. `None` means `path`'s DEM does not overlap `dst_bounds` at all.
	pub async fn extract_tile(&self, path: &Path, dst_bounds: GeoBounds, tile_size: usize) -> Result<Option<Vec<i16>>> {
		let entry = self.get(path).await?;
		Ok(floodtiles_core::extract_patch(
			&entry.array.samples,
			entry.array.height,
			entry.array.width,
			&entry.metadata.bounds,
			&dst_bounds,
			tile_size,
		))
	}

	/// Fire-and-forget background population of every DEM within `(lat ± radius_deg, lon ±
	/// radius_deg)`. Idempotent: DEMs already cached are skipped without triggering a
	/// decompression. Never blocks the caller; failures are logged, not propagated.
	pub fn preload_area(self: &Arc<Self>, lat: f64, lon: f64, radius_deg: f64) {
		let bounds = GeoBounds {
			lat_top: lat + radius_deg,
			lat_bottom: lat - radius_deg,
			lon_left: lon - radius_deg,
			lon_right: lon + radius_deg,
		};
		let ids = floodtiles_core::overlapping_dem_ids(bounds);
		let cache = Arc::clone(self);
		tokio::spawn(async move {
			let mut in_flight = tokio::task::JoinSet::new();
			for id in ids {
				while in_flight.len() >= cache.preload_workers {
					in_flight.join_next().await;
				}
				let cache = Arc::clone(&cache);
				in_flight.spawn(async move {
					let path = cache.source_dir.join(format!("{}.zst", id.tile_id(cache.dem_version)));
					if cache.cache.lock().contains(&path) {
						return;
					}
					cache.preloads.fetch_add(1, Ordering::Relaxed);
					if let Err(err) = cache.get(&path).await {
						log::warn!("preload failed for {}: {err:#}", path.display());
					}
				});
			}
			while in_flight.join_next().await.is_some() {}
		});
	}

	pub fn stats(&self) -> ArrayCacheStats {
		let cache_stats = self.cache.lock().stats();
		ArrayCacheStats {
			hits: cache_stats.hits,
			misses: cache_stats.misses,
			evictions: cache_stats.evictions,
			decompressions: self.decompressions.load(Ordering::Relaxed),
			preloads: self.preloads.load(Ordering::Relaxed),
			used_bytes: cache_stats.used_bytes,
			budget_bytes: cache_stats.budget_bytes,
		}
	}

	pub fn clear(&self) {
		self.cache.lock().clear();
	}
}
