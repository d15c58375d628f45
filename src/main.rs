// Headless entry point: parse flags, start the session log, run the batch.

use std::process::ExitCode;

use clap::Parser;

use pixelcraft::cli::{self, CliArgs};
use pixelcraft::logger;
use pixelcraft::settings::AppSettings;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init(args.verbose);
    log::info!("pixelcraft {} starting", env!("CARGO_PKG_VERSION"));

    let settings = AppSettings::load();
    log::debug!("Settings: {:?}", settings);

    let code = cli::run(args, &settings);
    log::logger().flush();
    code
}
