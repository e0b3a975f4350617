//! The DEM-facing storage layer: reading compressed source rasters (`dem_store`), caching their
//! decompressed form in memory (`array_cache`), and reading/writing the on-disk tile tree
//! (`tile_tree`).

pub mod array_cache;
pub use array_cache::*;

pub mod dem_store;
pub use dem_store::*;

pub mod tile_tree;
pub use tile_tree::*;
