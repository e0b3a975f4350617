/// What the caller is optimizing for when asking [`super::optimize_compression`] to pick an
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionGoal {
	/// Spend the CPU to get the smallest output (used by the offline pre-compression generator).
	UseBestCompression,
	/// Prefer whatever is already at hand (used by the runtime fallback path, where latency
	/// matters more than a few extra percent of size).
	UseFastCompression,
	/// The payload is already effectively incompressible (e.g. it was quantized from noisy
	/// elevation data); don't spend time trying to shrink it further.
	IsIncompressible,
}
