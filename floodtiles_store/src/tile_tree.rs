//! The on-disk tile tree, `{root}/{z}/{x}/{y}.u16[.br|.gz]`.
//!
//! A directory-rooted, per-key file store with genuinely atomic writes: writing the target file
//! directly via `std::fs::write` is not atomic and can leave a truncated file visible to a
//! concurrent reader on crash or power loss, so this tile tree instead writes to a `.tmp`
//! sibling, `fsync`s it, and renames it over the final name — a partial write is never
//! observable.

use anyhow::{Context, Result};
use floodtiles_core::TileCompression;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Preference order the router and generator read variants in: Brotli, then Gzip, then raw.
pub const READ_PREFERENCE: [TileCompression; 3] = [TileCompression::Brotli, TileCompression::Gzip, TileCompression::Uncompressed];

pub struct TileTree {
	root: PathBuf,
}

impl TileTree {
	pub fn new(root: PathBuf) -> Self {
		Self { root }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn variant_path(&self, z: u8, x: u32, y: u32, compression: TileCompression) -> PathBuf {
		self.root
			.join(z.to_string())
			.join(x.to_string())
			.join(format!("{y}.u16{}", compression.extension()))
	}

	/// Whether any variant (`raw`, `.br`, `.gz`) already exists for `(z, x, y)`. The generator
	/// treats a single existing variant as "this trio is already done" under `skip_existing`.
	pub fn any_variant_exists(&self, z: u8, x: u32, y: u32) -> bool {
		READ_PREFERENCE.iter().any(|&c| self.variant_path(z, x, y, c).exists())
	}

	/// Reads the best variant for `(z, x, y)` among `allowed` compressions, in `br > gz > raw`
	/// order. A read error on one variant falls through to the next rather than failing
	/// outright — the caller falls back to runtime generation only once every variant has been
	/// tried.
	pub fn read_best(&self, z: u8, x: u32, y: u32, allowed: &[TileCompression]) -> Option<(Vec<u8>, TileCompression)> {
		for &compression in &READ_PREFERENCE {
			if !allowed.contains(&compression) {
				continue;
			}
			let path = self.variant_path(z, x, y, compression);
			match fs::read(&path) {
				Ok(bytes) => return Some((bytes, compression)),
				Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
				Err(err) => {
					log::warn!("failed reading tile variant {}: {err}", path.display());
					continue;
				}
			}
		}
		None
	}

	/// Atomically writes `payload` (already encoded for `compression`) as `(z, x, y)`'s variant
	/// file: write to a `.tmp` sibling, `fsync`, then rename over the final name. Creates
	/// `{root}/{z}/{x}/` lazily.
	pub fn write_variant(&self, z: u8, x: u32, y: u32, compression: TileCompression, payload: &[u8]) -> Result<()> {
		let final_path = self.variant_path(z, x, y, compression);
		let parent = final_path.parent().expect("variant path always has a parent directory");
		fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent.display()))?;

		let mut tmp_name = final_path.file_name().expect("variant path always has a file name").to_os_string();
		tmp_name.push(".tmp");
		let tmp_path = final_path.with_file_name(tmp_name);

		let mut file = fs::File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;
		file.write_all(payload)
			.with_context(|| format!("writing {}", tmp_path.display()))?;
		file.sync_all().with_context(|| format!("fsyncing {}", tmp_path.display()))?;
		drop(file);
		fs::rename(&tmp_path, &final_path)
			.with_context(|| format!("renaming {} to {}", tmp_path.display(), final_path.display()))?;
		Ok(())
	}
}
