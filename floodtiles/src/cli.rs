//! The command-line surface: a top-level `Cli`/`Commands` pair (`clap::Parser` +
//! `clap::Subcommand`), a repeatable `-v` verbosity flag mapped to a `log::LevelFilter`, and one
//! subcommand struct per tool. `serve`'s `-i`/`-p` short flags and optional `-c` config file
//! mirror `generate`'s own flag conventions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about = "Mosaics, quantizes and caches digital elevation model rasters into Web Mercator slippy-map tiles.",
	propagate_version = true,
	disable_help_subcommand = true
)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,

	/// Increase log verbosity; repeat for more detail (-v info, -vv debug, -vvv trace). Default: warn.
	#[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
	pub verbose: u8,
}

impl Cli {
	pub fn log_level(&self) -> log::LevelFilter {
		match self.verbose {
			0 => log::LevelFilter::Warn,
			1 => log::LevelFilter::Info,
			2 => log::LevelFilter::Debug,
			_ => log::LevelFilter::Trace,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Pre-generate and compress elevation tiles for a zoom/bbox range.
	#[clap(alias = "gen")]
	Generate(GenerateArgs),

	/// Serve elevation tiles over HTTP.
	#[clap(alias = "server")]
	Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
	/// Root of the on-disk tile tree to write (default: configured tile root).
	#[arg(long, value_name = "PATH")]
	pub output_dir: Option<PathBuf>,

	/// Root of the source DEM corpus (default: configured DEM root).
	#[arg(long, value_name = "PATH")]
	pub source_dir: Option<PathBuf>,

	/// Inclusive minimum zoom level (default 8).
	#[arg(long)]
	pub zoom_min: Option<u8>,

	/// Inclusive maximum zoom level (default 15).
	#[arg(long)]
	pub zoom_max: Option<u8>,

	/// Geographic bbox to generate, as MIN_LON MIN_LAT MAX_LON MAX_LAT. Default: the union of
	/// every source DEM sidecar's bounds.
	#[arg(long, num_args = 4, value_names = ["MIN_LON", "MIN_LAT", "MAX_LON", "MAX_LAT"], allow_negative_numbers = true)]
	pub bbox: Option<Vec<f64>>,

	/// Process-level parallelism (default: CPU count - 1).
	#[arg(long)]
	pub workers: Option<usize>,

	/// Disable Brotli output.
	#[arg(long)]
	pub no_br: bool,

	/// Disable Gzip output.
	#[arg(long)]
	pub no_gz: bool,

	/// Emit the raw `.u16` variant alongside the compressed ones.
	#[arg(long)]
	pub write_raw: bool,

	/// Regenerate tiles even if an output already exists for them.
	#[arg(long)]
	pub no_skip: bool,

	/// Path to a YAML configuration file (see `Config` for the full shape).
	#[arg(short = 'c', long, value_name = "FILE")]
	pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
	/// Path to a YAML configuration file. CLI flags override anything it sets.
	#[arg(short = 'c', long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Serve via socket ip. Default: 0.0.0.0
	#[arg(short = 'i', long)]
	pub ip: Option<String>,

	/// Serve via port. Default: 8080
	#[arg(short = 'p', long)]
	pub port: Option<u16>,

	/// Root of the source DEM corpus (default: configured DEM root).
	#[arg(long, value_name = "PATH")]
	pub source_dir: Option<PathBuf>,

	/// Root of the pre-generated tile tree to serve from (default: configured tile root).
	#[arg(long, value_name = "PATH")]
	pub tile_root: Option<PathBuf>,

	/// Write runtime-generated tiles back to the tile tree.
	#[arg(long)]
	pub write_through: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generate_requires_no_positional_args() {
		let cli = Cli::try_parse_from(["floodtiles", "generate"]).unwrap();
		assert!(matches!(cli.command, Commands::Generate(_)));
	}

	#[test]
	fn serve_short_flags_parse() {
		let cli = Cli::try_parse_from(["floodtiles", "serve", "-i", "127.0.0.1", "-p", "9090"]).unwrap();
		let Commands::Serve(args) = cli.command else { panic!("expected serve") };
		assert_eq!(args.ip.as_deref(), Some("127.0.0.1"));
		assert_eq!(args.port, Some(9090));
	}

	#[test]
	fn verbosity_count_maps_to_level() {
		let cli = Cli::try_parse_from(["floodtiles", "-vv", "serve"]).unwrap();
		assert_eq!(cli.log_level(), log::LevelFilter::Debug);
	}

	#[test]
	fn bbox_accepts_four_negative_capable_floats() {
		let cli = Cli::try_parse_from(["floodtiles", "generate", "--bbox", "-83.0", "26.0", "-81.0", "28.0"]).unwrap();
		let Commands::Generate(args) = cli.command else { panic!("expected generate") };
		assert_eq!(args.bbox, Some(vec![-83.0, 26.0, -81.0, 28.0]));
	}
}
