//! The quantizer: converts `int16` meters into the `uint16` wire format. This formula is
//! normative — bit-identical across the runtime path and the offline generator — so it lives in
//! one place and both `floodtiles_mosaic` and `floodtiles`'s generator call through here rather
//! than reimplementing it. The division happens in `f32`, not `f64`, to get deterministic
//! rounding matching IEEE 754 single-precision semantics across platforms.

/// NODATA sentinel in the source `int16` rasters.
pub const NODATA_I16: i16 = -32768;
/// NODATA sentinel in the quantized `uint16` wire format.
pub const NODATA_U16: u16 = 65535;

/// Valid decoded elevation range in meters; samples outside this band are NODATA too.
const ELEVATION_MIN_M: f32 = -500.0;
const ELEVATION_MAX_M: f32 = 9000.0;
/// The quantization range spans [-500, +9000], i.e. 9500 meters.
const ELEVATION_RANGE_M: f32 = 9500.0;
/// Highest valid (non-NODATA) quantized value; `65535` is reserved for NODATA.
const MAX_QUANTIZED: f32 = 65534.0;

/// Quantizes a single `int16` elevation sample to its `uint16` wire value.
///
/// Uses `f32` arithmetic throughout (not `f64`) so the rounding is bit-identical to any other
/// implementation of this same formula.
pub fn quantize_sample(v: i16) -> u16 {
	let is_nodata = v == NODATA_I16 || (v as f32) < ELEVATION_MIN_M || (v as f32) > ELEVATION_MAX_M;
	if is_nodata {
		return NODATA_U16;
	}
	let meters = v as f32;
	let scaled = (meters - ELEVATION_MIN_M) / ELEVATION_RANGE_M * MAX_QUANTIZED;
	// round-half-to-even, not round-half-away-from-zero, to match other implementations bit-for-bit.
	let rounded = scaled.round_ties_even();
	rounded.clamp(0.0, MAX_QUANTIZED) as u16
}

/// Quantizes a whole row-major `int16` raster into its `uint16` wire bytes (little-endian,
/// row-major). `samples.len()` must equal `width * height`.
pub fn quantize_raster(samples: &[i16]) -> Vec<u8> {
	let mut out = Vec::with_capacity(samples.len() * 2);
	for &v in samples {
		out.extend_from_slice(&quantize_sample(v).to_le_bytes());
	}
	out
}

/// Decodes a single quantized `uint16` sample back to meters, or `None` for NODATA. Used only
/// by tests that verify the round-trip error bound; the wire format's canonical consumer is the
/// client, not this crate.
pub fn dequantize_sample(u: u16) -> Option<f32> {
	if u == NODATA_U16 {
		return None;
	}
	Some(u as f32 / MAX_QUANTIZED * ELEVATION_RANGE_M + ELEVATION_MIN_M)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn nodata_sentinel_maps_to_65535() {
		assert_eq!(quantize_sample(NODATA_I16), NODATA_U16);
	}

	#[rstest]
	#[case(-501)]
	#[case(9001)]
	#[case(i16::MAX)]
	#[case(i16::MIN)]
	fn out_of_range_samples_are_nodata(#[case] v: i16) {
		assert_eq!(quantize_sample(v), NODATA_U16);
	}

	#[test]
	fn zero_sea_level_is_not_special_cased() {
		// Sea level (0m) must quantize like any other valid elevation, not clamp to NODATA.
		let q = quantize_sample(0);
		assert_ne!(q, NODATA_U16);
	}

	#[test]
	fn boundary_elevations_are_valid() {
		assert_ne!(quantize_sample(-500), NODATA_U16);
		assert_ne!(quantize_sample(9000), NODATA_U16);
	}

	#[test]
	fn quantize_is_monotonic_in_elevation() {
		let mut prev = quantize_sample(-500);
		for v in (-499..9000i32).step_by(37) {
			let cur = quantize_sample(v as i16);
			assert!(cur >= prev, "quantized values must be non-decreasing in elevation");
			prev = cur;
		}
	}

	#[test]
	fn dequantize_round_trip_within_tolerance() {
		// roundtrip error bound is 9500 / 65534 ~= 0.145m.
		let tolerance = ELEVATION_RANGE_M / MAX_QUANTIZED + 1e-3;
		for v in (-500..9000i32).step_by(13) {
			let q = quantize_sample(v as i16);
			let decoded = dequantize_sample(q).unwrap();
			assert!(
				(decoded - v as f32).abs() <= tolerance,
				"v={v} decoded={decoded} tolerance={tolerance}"
			);
		}
	}

	#[test]
	fn dequantize_nodata_is_none() {
		assert_eq!(dequantize_sample(NODATA_U16), None);
	}

	#[test]
	fn quantize_raster_matches_per_sample_and_is_little_endian() {
		let samples = [NODATA_I16, 0, -500, 9000];
		let bytes = quantize_raster(&samples);
		assert_eq!(bytes.len(), samples.len() * 2);
		for (i, &v) in samples.iter().enumerate() {
			let expected = quantize_sample(v).to_le_bytes();
			assert_eq!(&bytes[i * 2..i * 2 + 2], &expected);
		}
	}

	#[test]
	fn full_tile_payload_is_exactly_131072_bytes() {
		let samples = vec![0i16; 256 * 256];
		assert_eq!(quantize_raster(&samples).len(), 131_072);
	}
}
