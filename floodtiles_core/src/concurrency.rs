//! Concurrency limit tuning for optimal I/O and CPU performance.
//!
//! - **I/O-bound**: disk reads for source DEMs and tile-tree lookups benefit from a multiple of
//!   the CPU count.
//! - **CPU-bound**: mosaic resampling and compression are limited to roughly 1x CPU count.
//! - **Mixed**: the offline generator's per-tile task (which does both) sits in between. This is
//!   what `Config::default`'s `max_tasks_inflight` is sized from.
//!
//! # Usage
//!
//! ```
//! use floodtiles_core::ConcurrencyLimits;
//!
//! let limits = ConcurrencyLimits::default();
//! assert!(limits.io_bound > limits.cpu_bound);
//! ```

/// Concurrency limits for different workload shapes.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimits {
	/// Concurrency for I/O-bound operations (disk reads of source DEMs and cached tiles).
	pub io_bound: usize,
	/// Concurrency for CPU-bound operations (Lanczos resampling, quantization, compression).
	pub cpu_bound: usize,
	/// Concurrency for mixed workloads (the offline generator's per-tile pipeline).
	pub mixed: usize,
}

impl ConcurrencyLimits {
	pub fn new(io_bound: usize, cpu_bound: usize, mixed: usize) -> Self {
		Self {
			io_bound: io_bound.max(1),
			cpu_bound: cpu_bound.max(1),
			mixed: mixed.max(1),
		}
	}

	pub fn cpu_count() -> usize {
		num_cpus::get()
	}
}

impl Default for ConcurrencyLimits {
	fn default() -> Self {
		let cpus = num_cpus::get();
		Self {
			io_bound: cpus * 3,
			cpu_bound: cpus,
			mixed: cpus + (cpus / 2),
		}
	}
}
