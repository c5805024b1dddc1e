//! Binary entry point for `psn`.

use clap::Parser;

fn main() {
    let cli = power_sentinel::cli_app::Cli::parse();
    if let Err(error) = power_sentinel::cli_app::run(&cli) {
        eprintln!("{error}");
        std::process::exit(2);
    }
}
