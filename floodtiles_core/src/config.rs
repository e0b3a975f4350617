//! Process-wide configuration, populated from a YAML file, environment variables, and (in the
//! `floodtiles` binary) CLI flags, in that order of increasing precedence. Threaded through all
//! components as an immutable value rather than a global, so tests can construct independent
//! configurations without racing on process state.

use crate::ConcurrencyLimits;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Immutable, process-wide configuration for the elevation tile pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Root of the source DEM corpus (`{source_dir}/{tile_id}.zst` + `.json`).
	pub source_dir: PathBuf,
	/// Root of the on-disk tile tree.
	pub tile_root: PathBuf,
	/// Decompressed-array cache byte budget.
	pub cache_budget_bytes: usize,
	/// Background preload worker count; `0` means `min(cpu_count, 8)`.
	pub preload_workers: usize,
	/// Default inclusive zoom range for the offline generator.
	pub zoom_min: u8,
	pub zoom_max: u8,
	/// SourceDEM format version suffix (`..._1arc_v{N}`).
	pub dem_version: u32,
	/// Guardrail floor: abort the generator if `source_dir` contains fewer `.zst` files than
	/// this.
	pub min_dem_count: usize,
	pub generate_br: bool,
	pub generate_gz: bool,
	pub write_raw: bool,
	pub skip_existing: bool,
	/// Upper bound on outstanding generator tasks.
	pub max_tasks_inflight: usize,
	/// Whether the runtime router write-throughs generated tiles to `tile_root`.
	pub write_through: bool,
	/// HTTP bind address for the request router.
	pub bind_addr: String,
	/// Per-request deadline in seconds before a 503 is returned.
	pub request_timeout_secs: u64,
}

impl Default for Config {
	fn default() -> Self {
		let cpus = floodtiles_default_preload_workers();
		Self {
			source_dir: PathBuf::from("./dem-corpus"),
			tile_root: PathBuf::from("./tile-tree"),
			cache_budget_bytes: 4 * 1024 * 1024 * 1024,
			preload_workers: cpus,
			zoom_min: 8,
			zoom_max: 15,
			dem_version: 3,
			min_dem_count: 100,
			generate_br: true,
			generate_gz: false,
			write_raw: false,
			skip_existing: true,
			max_tasks_inflight: ConcurrencyLimits::default().mixed,
			write_through: false,
			bind_addr: "0.0.0.0:8080".to_string(),
			request_timeout_secs: 30,
		}
	}
}

fn floodtiles_default_preload_workers() -> usize {
	num_cpus::get().min(8)
}

impl Config {
	/// Loads a config, starting from [`Config::default`], merging an optional YAML file, then
	/// merging environment variables prefixed `FLOODTILES_` (e.g. `FLOODTILES_SOURCE_DIR`).
	/// CLI flags are applied afterwards by the caller (see `floodtiles`'s CLI definitions),
	/// which is why this function takes no CLI arguments itself.
	pub fn load(yaml_path: Option<&Path>) -> Result<Self> {
		let mut config = match yaml_path {
			Some(path) => {
				let text = std::fs::read_to_string(path)
					.with_context(|| format!("reading config file {}", path.display()))?;
				serde_yaml_ng::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?
			}
			None => Self::default(),
		};
		config.apply_env();
		Ok(config)
	}

	fn apply_env(&mut self) {
		if let Ok(v) = std::env::var("FLOODTILES_SOURCE_DIR") {
			self.source_dir = PathBuf::from(v);
		}
		if let Ok(v) = std::env::var("FLOODTILES_TILE_ROOT") {
			self.tile_root = PathBuf::from(v);
		}
		if let Ok(v) = std::env::var("FLOODTILES_CACHE_BUDGET_BYTES") {
			if let Ok(n) = v.parse() {
				self.cache_budget_bytes = n;
			}
		}
		if let Ok(v) = std::env::var("FLOODTILES_BIND_ADDR") {
			self.bind_addr = v;
		}
	}
}
