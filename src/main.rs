//! Plantboard - production planning from the terminal

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = plantboard::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
