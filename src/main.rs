//! aeromodel CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. The error response
//! is already on stdout; the error is repeated on stderr and the process
//! exits non-zero.

use aeromodel::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
