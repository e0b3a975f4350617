//! This module defines the [`Blob`] struct, a wrapper around [`Vec<u8>`] that provides additional
//! methods for working with byte data: the wire type moved around the pipeline between the
//! source DEM store, the mosaic engine, the quantizer and the on-disk tile tree.

use anyhow::{bail, Result};
use std::fmt::Debug;
use std::ops::Range;
use std::path::Path;

/// A simple wrapper around [`Vec<u8>`] that provides additional methods for working with byte data.
///
/// # Examples
///
/// ```rust
/// use floodtiles_core::Blob;
///
/// let blob = Blob::from("Hello, world!");
/// assert_eq!(blob.len(), 13);
/// assert_eq!(blob.as_str(), "Hello, world!");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Blob(Vec<u8>);

#[allow(dead_code)]
impl Blob {
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	#[must_use]
	pub fn new_sized(length: usize) -> Blob {
		Blob(vec![0u8; length])
	}

	/// Returns a byte slice from the specified `range`.
	///
	/// # Panics
	///
	/// Panics if the specified range is out of bounds.
	#[must_use]
	pub fn range(&self, range: Range<usize>) -> &[u8] {
		&self.0[range]
	}

	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		self.0.as_ref()
	}

	pub fn as_mut_slice(&mut self) -> &mut [u8] {
		self.0.as_mut()
	}

	#[must_use]
	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	/// # Panics
	///
	/// Panics if the bytes are not valid UTF-8.
	#[must_use]
	pub fn as_str(&self) -> &str {
		std::str::from_utf8(&self.0).expect("Blob content was not valid UTF-8")
	}

	#[must_use]
	pub fn len(&self) -> u64 {
		self.0.len() as u64
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Saves the contents of this [`Blob`] to the given filesystem path. Not atomic; callers
	/// that need crash-safe writes should go through the tile tree's atomic writer instead.
	pub fn save_to_file(&self, path: &Path) -> Result<()> {
		std::fs::write(path, &self.0)?;
		Ok(())
	}

	pub fn load_from_file(path: &Path) -> Result<Self> {
		Ok(Blob::from(std::fs::read(path)?))
	}

	/// Returns an error if the blob's byte length exceeds `limit`. Used at ingestion boundaries
	/// (HTTP bodies, decompressed payloads) where an attacker-controlled size must not be trusted
	/// blindly before allocating derived buffers.
	pub fn ensure_within(&self, limit: u64) -> Result<()> {
		if self.len() > limit {
			bail!("blob of {} bytes exceeds the {limit} byte limit", self.len());
		}
		Ok(())
	}
}

impl From<Vec<u8>> for Blob {
	fn from(item: Vec<u8>) -> Self {
		Blob(item)
	}
}

impl From<&Vec<u8>> for Blob {
	fn from(item: &Vec<u8>) -> Self {
		Blob(item.clone())
	}
}

impl From<&[u8]> for Blob {
	fn from(item: &[u8]) -> Self {
		Blob(item.to_vec())
	}
}

impl<const N: usize> From<&[u8; N]> for Blob {
	fn from(item: &[u8; N]) -> Self {
		Blob(item.to_vec())
	}
}

impl From<&str> for Blob {
	fn from(item: &str) -> Self {
		Blob(item.as_bytes().to_vec())
	}
}

impl From<String> for Blob {
	fn from(item: String) -> Self {
		Blob(item.into_bytes())
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Blob({} bytes)", self.0.len())
	}
}

impl Default for Blob {
	fn default() -> Self {
		Self::new_empty()
	}
}

unsafe impl Send for Blob {}
unsafe impl Sync for Blob {}
