//! algebras CLI application entry point.

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let args = algebras::cli::Arguments::parse();

    match algebras::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            algebras::cli::ExitStatus::Error.into()
        }
    }
}
