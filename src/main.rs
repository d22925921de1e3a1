//! aphreton CLI entry point
//!
//! All logic is delegated to the CLI module.

use aphreton::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
