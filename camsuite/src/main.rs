//! camsuite CLI Entry Point

use camsuite::cli::Cli;
use camsuite::logging;
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_with_level(cli.global.log_level.as_deref()) {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(camsuite::cli::run(cli)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
