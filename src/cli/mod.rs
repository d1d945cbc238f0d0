//! Command-line interface
//!
//! - validate: validate one JSON object from stdin
//! - dump: validate, then project with output options
//! - json-schema: print a schema's JSON Schema
//! - settings: build a record from environment variables

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{default_config_path, dump, json_schema, run, run_command, settings, validate, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
