//! The per-DEM crop + resample primitive used by the mosaic engine and by the decompressed-array
//! cache's `extract_tile` convenience wrapper. Kept in `floodtiles_core` rather than
//! `floodtiles_mosaic` so both call sites share one implementation: the wire-format invariant
//! that two independent runs produce bit-identical payloads depends on there being exactly one
//! resampler.

use crate::quantize::NODATA_I16;
use crate::tile::GeoBounds;

/// Lanczos-3 kernel support radius, in source pixels.
const LANCZOS_A: f64 = 3.0;

fn lanczos_kernel(x: f64) -> f64 {
	if x == 0.0 {
		return 1.0;
	}
	if x.abs() >= LANCZOS_A {
		return 0.0;
	}
	let pi_x = std::f64::consts::PI * x;
	LANCZOS_A * pi_x.sin() * (pi_x / LANCZOS_A).sin() / (pi_x * pi_x)
}

/// Samples `src` at fractional position `(sy, sx)` using a Lanczos-3 kernel, skipping (and
/// renormalizing around) any NODATA source samples within the kernel support. Returns `None` if
/// every sample under the kernel is NODATA or out of bounds.
fn lanczos_sample(src: &[i16], height: usize, width: usize, sy: f64, sx: f64) -> Option<i16> {
	let y0 = sy.floor() as i64;
	let x0 = sx.floor() as i64;
	let radius = LANCZOS_A as i64;

	let mut acc = 0.0f64;
	let mut weight_sum = 0.0f64;
	for j in (-radius + 1)..=radius {
		let yy = y0 + j;
		if yy < 0 || yy as usize >= height {
			continue;
		}
		let wy = lanczos_kernel(sy - yy as f64);
		if wy == 0.0 {
			continue;
		}
		for i in (-radius + 1)..=radius {
			let xx = x0 + i;
			if xx < 0 || xx as usize >= width {
				continue;
			}
			let sample = src[yy as usize * width + xx as usize];
			if sample == NODATA_I16 {
				continue;
			}
			let wx = lanczos_kernel(sx - xx as f64);
			if wx == 0.0 {
				continue;
			}
			let weight = wx * wy;
			acc += weight * f64::from(sample);
			weight_sum += weight;
		}
	}

	if weight_sum.abs() < 1e-9 {
		None
	} else {
		Some((acc / weight_sum).round() as i16)
	}
}

/// Resamples a `src_h x src_w` patch to `dst_h x dst_w` using Lanczos-3 on the float-promoted
/// samples. Returns `src` unchanged (by copy) when the shapes already match — no resampling is
/// needed, and Lanczos on an identity mapping would be a lossy no-op.
pub fn resample_patch(src: &[i16], src_h: usize, src_w: usize, dst_h: usize, dst_w: usize) -> Vec<i16> {
	if src_h == dst_h && src_w == dst_w {
		return src.to_vec();
	}
	let mut out = vec![NODATA_I16; dst_h * dst_w];
	let scale_y = src_h as f64 / dst_h as f64;
	let scale_x = src_w as f64 / dst_w as f64;
	for dy in 0..dst_h {
		let sy = (dy as f64 + 0.5) * scale_y - 0.5;
		for dx in 0..dst_w {
			let sx = (dx as f64 + 0.5) * scale_x - 0.5;
			if let Some(v) = lanczos_sample(src, src_h, src_w, sy, sx) {
				out[dy * dst_w + dx] = v;
			}
		}
	}
	out
}

/// Maps a geographic window to an `[y0, y1) x [x0, x1)` index window into an array of `height x
/// width` samples spanning `array_bounds`, rounding so the index window fully covers the
/// geographic intersection rather than clipping it short.
pub fn bounds_to_index_window(window: &GeoBounds, array_bounds: &GeoBounds, height: usize, width: usize) -> (usize, usize, usize, usize) {
	let lat_span = array_bounds.lat_top - array_bounds.lat_bottom;
	let lon_span = array_bounds.lon_right - array_bounds.lon_left;
	let row_of_lat = |lat: f64| (array_bounds.lat_top - lat) / lat_span * height as f64;
	let col_of_lon = |lon: f64| (lon - array_bounds.lon_left) / lon_span * width as f64;

	let y0 = row_of_lat(window.lat_top).floor().max(0.0) as usize;
	let y1 = (row_of_lat(window.lat_bottom).ceil() as usize).min(height);
	let x0 = col_of_lon(window.lon_left).floor().max(0.0) as usize;
	let x1 = (col_of_lon(window.lon_right).ceil() as usize).min(width);
	(y0, y1, x0, x1)
}

/// The per-DEM crop + resample step: crops `array` to its geographic intersection with
/// `dst_bounds`, resamples that crop to fit the destination index window, and embeds it into a
/// `dst_size x dst_size` canvas otherwise filled with NODATA. Returns `None` when `array_bounds`
/// and `dst_bounds` do not overlap.
pub fn extract_patch(
	array: &[i16],
	array_height: usize,
	array_width: usize,
	array_bounds: &GeoBounds,
	dst_bounds: &GeoBounds,
	dst_size: usize,
) -> Option<Vec<i16>> {
	let intersection = array_bounds.intersect(dst_bounds)?;

	let (sy0, sy1, sx0, sx1) = bounds_to_index_window(&intersection, array_bounds, array_height, array_width);
	if sy1 <= sy0 || sx1 <= sx0 {
		return None;
	}
	let (dy0, dy1, dx0, dx1) = bounds_to_index_window(&intersection, dst_bounds, dst_size, dst_size);
	if dy1 <= dy0 || dx1 <= dx0 {
		return None;
	}

	let src_h = sy1 - sy0;
	let src_w = sx1 - sx0;
	let mut src_patch = Vec::with_capacity(src_h * src_w);
	for row in sy0..sy1 {
		let start = row * array_width + sx0;
		src_patch.extend_from_slice(&array[start..start + src_w]);
	}

	let dst_h = dy1 - dy0;
	let dst_w = dx1 - dx0;
	let resampled = resample_patch(&src_patch, src_h, src_w, dst_h, dst_w);

	let mut canvas = vec![NODATA_I16; dst_size * dst_size];
	for row in 0..dst_h {
		let canvas_start = (dy0 + row) * dst_size + dx0;
		let resampled_start = row * dst_w;
		canvas[canvas_start..canvas_start + dst_w].copy_from_slice(&resampled[resampled_start..resampled_start + dst_w]);
	}
	Some(canvas)
}
