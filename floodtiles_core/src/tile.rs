//! Web Mercator / Slippy Map tile geometry: pure, stateless math shared by the mosaic engine,
//! the offline generator and the request router.
//!
//! `TileId` is a `Copy + Eq + Hash` coordinate triple with a `Debug` impl printing `(z, [x, y])`,
//! plus the degree <-> tile conversions the elevation pipeline needs on top of plain tile
//! addressing: projecting arbitrary lat/lon with clamping, not just geographic points.

use std::fmt::{self, Debug};

/// Web Mercator's valid latitude range. Outside this band the projection is undefined (it is
/// asymptotic at the poles); latitudes must be clamped before projecting.
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Fixed output tile size for every elevation tile.
pub const TILE_SIZE: u32 = 256;

/// Highest zoom level the request router accepts: `0 <= z <= MAX_ZOOM`. Chosen generously above
/// the generator's default zoom range (8-15) since the runtime path may still be asked to mosaic
/// a much closer zoom on demand.
pub const MAX_ZOOM: u8 = 22;

/// An addressable Web Mercator tile: `0 <= x, y < 2^z`.
#[derive(Eq, PartialEq, Clone, Copy, Hash)]
pub struct TileId {
	pub z: u8,
	pub x: u32,
	pub y: u32,
}

impl TileId {
	pub fn new(z: u8, x: u32, y: u32) -> Self {
		TileId { z, x, y }
	}

	/// Whether `(x, y)` fall within `[0, 2^z)`. The router uses this to reject malformed
	/// requests with a 400 before doing any work.
	pub fn is_valid(&self) -> bool {
		let max = 1u64 << self.z;
		(self.x as u64) < max && (self.y as u64) < max
	}
}

impl Debug for TileId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileId(z={}, x={}, y={})", self.z, self.x, self.y)
	}
}

/// Geographic bounding box in degrees, `lat_top > lat_bottom`, `lon_right > lon_left`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
	pub lat_top: f64,
	pub lat_bottom: f64,
	pub lon_left: f64,
	pub lon_right: f64,
}

impl GeoBounds {
	pub fn contains(&self, lat: f64, lon: f64) -> bool {
		lat <= self.lat_top && lat >= self.lat_bottom && lon >= self.lon_left && lon <= self.lon_right
	}

	/// Geographic intersection with `other`, or `None` if they don't overlap.
	pub fn intersect(&self, other: &GeoBounds) -> Option<GeoBounds> {
		let lat_top = self.lat_top.min(other.lat_top);
		let lat_bottom = self.lat_bottom.max(other.lat_bottom);
		let lon_left = self.lon_left.max(other.lon_left);
		let lon_right = self.lon_right.min(other.lon_right);
		if lat_top > lat_bottom && lon_right > lon_left {
			Some(GeoBounds {
				lat_top,
				lat_bottom,
				lon_left,
				lon_right,
			})
		} else {
			None
		}
	}
}

/// Clamps a latitude into the Web Mercator validity range.
pub fn clamp_latitude(lat: f64) -> f64 {
	lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

/// Standard Slippy Map projection: `(lat, lon, z) -> (x, y)`.
///
/// `lat` is clamped to `±MAX_LATITUDE` first; callers that must distinguish "clamped" from
/// "exactly out of range" (the router's ±90° rejection) should check the raw latitude themselves
/// before calling this.
pub fn deg_to_tile(lat: f64, lon: f64, z: u8) -> (u32, u32) {
	let lat = clamp_latitude(lat);
	let zoom = (1u64 << z) as f64;
	let lat_rad = lat.to_radians();
	let x = (((lon + 180.0) / 360.0) * zoom).floor();
	let y = (((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0) * zoom).floor();
	(x.max(0.0) as u32, y.max(0.0) as u32)
}

/// Inverse of [`deg_to_tile`]: tile `(x, y, z)` -> geographic bounds.
pub fn tile_bounds(x: u32, y: u32, z: u8) -> GeoBounds {
	let zoom = (1u64 << z) as f64;
	let lon_of = |tx: f64| tx / zoom * 360.0 - 180.0;
	let lat_of = |ty: f64| {
		let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * ty / zoom;
		n.sinh().atan().to_degrees()
	};
	GeoBounds {
		lat_top: lat_of(y as f64),
		lat_bottom: lat_of(y as f64 + 1.0),
		lon_left: lon_of(x as f64),
		lon_right: lon_of(x as f64 + 1.0),
	}
}

/// One 1°x1° DEM identity: `(lat_int, lon_int)`, the southwest corner of the integer-degree
/// square, plus the formatted tile id used to locate `{tile_id}.zst`/`{tile_id}.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemId {
	pub lat_int: i32,
	pub lon_int: i32,
}

impl DemId {
	/// Formats as `{hemisphere}{lat:02}_{hemisphere}{lon:03}_1arc_v{n}`, e.g. `n27_w082_1arc_v3`.
	pub fn tile_id(&self, version: u32) -> String {
		let lat_hemi = if self.lat_int >= 0 { 'n' } else { 's' };
		let lon_hemi = if self.lon_int >= 0 { 'e' } else { 'w' };
		format!(
			"{lat_hemi}{:02}_{lon_hemi}{:03}_1arc_v{version}",
			self.lat_int.unsigned_abs(),
			self.lon_int.unsigned_abs()
		)
	}

	/// The nominal (unexpanded) geographic bounds of this 1°x1° square.
	pub fn bounds(&self) -> GeoBounds {
		GeoBounds {
			lat_top: (self.lat_int + 1) as f64,
			lat_bottom: self.lat_int as f64,
			lon_left: self.lon_int as f64,
			lon_right: (self.lon_int + 1) as f64,
		}
	}
}

/// A small epsilon applied when flooring near integer-degree boundaries, so coverage is
/// conservative: we'd rather enumerate one extra non-overlapping DEM than miss a real one.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Enumerates the integer-degree DEM squares whose `[lat_int, lat_int+1] x [lon_int, lon_int+1]`
/// box intersects `bounds`, in deterministic west-to-east, south-to-north order — this order is
/// what makes the mosaic engine's paint-behind blend reproducible.
pub fn overlapping_dem_ids(bounds: GeoBounds) -> Vec<DemId> {
	let lat_start = (bounds.lat_bottom + BOUNDARY_EPSILON).floor() as i32;
	let lat_end = (bounds.lat_top - BOUNDARY_EPSILON).ceil() as i32;
	let lon_start = (bounds.lon_left + BOUNDARY_EPSILON).floor() as i32;
	let lon_end = (bounds.lon_right - BOUNDARY_EPSILON).ceil() as i32;

	let mut ids = Vec::new();
	for lat_int in lat_start..lat_end {
		for lon_int in lon_start..lon_end {
			ids.push(DemId { lat_int, lon_int });
		}
	}
	ids
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn tile_id_validity() {
		assert!(TileId::new(10, 0, 0).is_valid());
		assert!(TileId::new(10, 1023, 1023).is_valid());
		assert!(!TileId::new(10, 1024, 0).is_valid());
		assert!(!TileId::new(10, 0, 1024).is_valid());
	}

	#[test]
	fn max_zoom_is_above_generator_defaults() {
		assert!(MAX_ZOOM > 15);
	}

	#[test]
	fn adjacent_tiles_share_edges() {
		for z in [5u8, 10, 15] {
			let b1 = tile_bounds(10, 10, z);
			let b2 = tile_bounds(11, 10, z);
			assert!((b1.lon_right - b2.lon_left).abs() < 1e-9);
		}
	}

	#[test]
	fn child_tiles_nest_inside_parent() {
		let parent = tile_bounds(10, 10, 8);
		for dx in 0..2u32 {
			for dy in 0..2u32 {
				let child = tile_bounds(20 + dx, 20 + dy, 9);
				assert!(child.lat_top <= parent.lat_top + 1e-9);
				assert!(child.lat_bottom >= parent.lat_bottom - 1e-9);
				assert!(child.lon_left >= parent.lon_left - 1e-9);
				assert!(child.lon_right <= parent.lon_right + 1e-9);
			}
		}
	}

	#[rstest]
	#[case(0.0, 0.0, 10)]
	#[case(51.5, -0.12, 12)]
	#[case(-33.9, 151.2, 7)]
	#[case(84.9, 179.9, 5)]
	fn deg_to_tile_round_trip_contains_point(#[case] lat: f64, #[case] lon: f64, #[case] z: u8) {
		let (x, y) = deg_to_tile(lat, lon, z);
		let bounds = tile_bounds(x, y, z);
		assert!(
			bounds.contains(clamp_latitude(lat), lon),
			"bounds {bounds:?} should contain ({lat}, {lon})"
		);
	}

	#[test]
	fn clamp_latitude_clips_poles() {
		assert_eq!(clamp_latitude(90.0), MAX_LATITUDE);
		assert_eq!(clamp_latitude(-90.0), -MAX_LATITUDE);
		assert_eq!(clamp_latitude(45.0), 45.0);
	}

	#[test]
	fn dem_id_formats_stable_tile_id() {
		let id = DemId { lat_int: 27, lon_int: -82 };
		assert_eq!(id.tile_id(3), "n27_w082_1arc_v3");
		let id2 = DemId { lat_int: -12, lon_int: 151 };
		assert_eq!(id2.tile_id(3), "s12_e151_1arc_v3");
	}

	#[test]
	fn overlapping_dem_ids_covers_single_square() {
		let bounds = GeoBounds {
			lat_top: 27.9,
			lat_bottom: 27.1,
			lon_left: -82.9,
			lon_right: -82.1,
		};
		let ids = overlapping_dem_ids(bounds);
		assert_eq!(ids, vec![DemId { lat_int: 27, lon_int: -83 }]);
	}

	#[test]
	fn overlapping_dem_ids_covers_boundary_straddling_box() {
		let bounds = GeoBounds {
			lat_top: 27.5,
			lat_bottom: 26.5,
			lon_left: -82.5,
			lon_right: -81.5,
		};
		let ids = overlapping_dem_ids(bounds);
		assert_eq!(ids.len(), 4);
		assert!(ids.contains(&DemId { lat_int: 26, lon_int: -83 }));
		assert!(ids.contains(&DemId { lat_int: 27, lon_int: -82 }));
	}

	#[test]
	fn overlapping_dem_ids_enumeration_is_west_to_east_south_to_north() {
		let bounds = GeoBounds {
			lat_top: 28.5,
			lat_bottom: 26.5,
			lon_left: -83.5,
			lon_right: -81.5,
		};
		let ids = overlapping_dem_ids(bounds);
		for window in ids.windows(2) {
			let (a, b) = (&window[0], &window[1]);
			assert!((a.lat_int, a.lon_int) <= (b.lat_int, b.lon_int));
		}
	}
}
