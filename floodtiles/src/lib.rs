//! `floodtiles`: the CLI entry point composing the lower layers (`floodtiles_core`,
//! `floodtiles_store`, `floodtiles_mosaic`) into the two tools at the top of the stack:
//!
//! - [`generator`] — the offline pre-compression generator: walks a zoom/bbox range, mosaics and
//!   quantizes each tile, and writes it into the tile tree. Fully resumable.
//! - [`server`] — the HTTP request router: serves pre-compressed tiles with static-file
//!   semantics, falling back to runtime mosaicking on a miss.
//!
//! [`cli`] defines the `clap` surface shared by both subcommands.

pub mod cli;
pub mod generator;
pub mod server;
