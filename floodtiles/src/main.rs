//! CLI entry point: parse `Cli`, init `env_logger` at the requested verbosity, dispatch to a
//! subcommand, and map failures to process exit codes.

use clap::Parser;
use floodtiles::cli::{Cli, Commands};
use floodtiles::{generator, server};

fn main() {
	let cli = Cli::parse();

	env_logger::Builder::new().filter_level(cli.log_level()).format_timestamp_secs().init();

	let result = match &cli.command {
		Commands::Generate(args) => generator::run(args),
		Commands::Serve(args) => server::run(args),
	};

	if let Err(err) = result {
		log::error!("{err:#}");
		let exit_code = if err.downcast_ref::<floodtiles_core::TileError>().is_some_and(|e| matches!(e, floodtiles_core::TileError::ConfigurationError(_))) {
			2
		} else {
			1
		};
		std::process::exit(exit_code);
	}
}
