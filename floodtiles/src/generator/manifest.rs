//! The generator's `manifest.json`: records the source/output roots, the bbox and zoom range
//! that were generated, which variants were written, per-zoom counters, and start/end
//! timestamps. Informational only — the router never reads it.

use anyhow::{Context, Result};
use floodtiles_core::Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-zoom tile counters: examined, written, skipped-existing, skipped-missing, elapsed
/// seconds, and bytes written per variant.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ZoomCounts {
	pub examined: u64,
	pub written: u64,
	pub skipped_existing: u64,
	pub skipped_missing: u64,
	pub bytes_raw: u64,
	pub bytes_br: u64,
	pub bytes_gz: u64,
	pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
	pub source_dir: PathBuf,
	pub output_dir: PathBuf,
	pub bbox: (f64, f64, f64, f64),
	pub zoom_min: u8,
	pub zoom_max: u8,
	pub variants: Vec<String>,
	pub per_zoom: BTreeMap<u8, ZoomCounts>,
	pub started_at: String,
	pub finished_at: Option<String>,
}

impl Manifest {
	pub fn new(config: &Config, bbox: (f64, f64, f64, f64)) -> Self {
		let mut variants = Vec::new();
		if config.write_raw {
			variants.push("raw".to_string());
		}
		if config.generate_br {
			variants.push("br".to_string());
		}
		if config.generate_gz {
			variants.push("gz".to_string());
		}
		Manifest {
			source_dir: config.source_dir.clone(),
			output_dir: config.tile_root.clone(),
			bbox,
			zoom_min: config.zoom_min,
			zoom_max: config.zoom_max,
			variants,
			per_zoom: BTreeMap::new(),
			started_at: now_rfc3339(),
			finished_at: None,
		}
	}

	/// Writes (overwrites) `{root}/manifest.json`. Called cumulatively at the end of each zoom
	/// and again at the end of the run, so a killed-and-resumed generator leaves a manifest
	/// reflecting whatever actually completed.
	pub fn write(&self, root: &Path) -> Result<()> {
		std::fs::create_dir_all(root).with_context(|| format!("creating {}", root.display()))?;
		let path = root.join("manifest.json");
		let json = serde_json::to_string_pretty(self).context("serializing manifest")?;
		std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
	}
}

pub fn now_rfc3339() -> String {
	time::OffsetDateTime::now_utc()
		.format(&time::format_description::well_known::Rfc3339)
		.unwrap_or_else(|_| "unknown".to_string())
}
