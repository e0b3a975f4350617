use floodtiles_core::Config;
use floodtiles_store::{DecompressedArrayCache, TileTree};
use std::sync::Arc;

/// Shared state handed to every axum handler: a single `Arc`-wrapped struct cloned into the
/// router.
#[derive(Clone)]
pub struct AppState {
	pub config: Arc<Config>,
	pub cache: Arc<DecompressedArrayCache>,
	pub tile_tree: Arc<TileTree>,
}
