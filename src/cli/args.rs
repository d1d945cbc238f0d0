//! CLI argument definitions using clap
//!
//! Commands:
//! - aeromodel validate --config <path> --schema <name>
//! - aeromodel dump --config <path> --schema <name> [--include a,b.c] [--exclude x]
//! - aeromodel json-schema --config <path> --schema <name>
//! - aeromodel settings --config <path> --schema <name>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeromodel - declarative record validation
#[derive(Parser, Debug)]
#[command(name = "aeromodel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate one JSON object read from stdin
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./aeromodel.json")]
        config: PathBuf,

        /// Schema to validate against
        #[arg(long)]
        schema: String,
    },

    /// Validate stdin, then print the record with output options applied
    Dump {
        #[arg(long, default_value = "./aeromodel.json")]
        config: PathBuf,

        #[arg(long)]
        schema: String,

        /// Dotted paths to keep
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Dotted paths to drop
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        #[arg(long)]
        by_alias: bool,

        #[arg(long)]
        exclude_none: bool,

        #[arg(long)]
        exclude_unset: bool,

        #[arg(long)]
        reveal_secrets: bool,
    },

    /// Print the JSON Schema of a schema
    JsonSchema {
        #[arg(long, default_value = "./aeromodel.json")]
        config: PathBuf,

        #[arg(long)]
        schema: String,

        /// Use aliases as property names
        #[arg(long)]
        by_alias: bool,
    },

    /// Build a record from environment variables
    Settings {
        #[arg(long, default_value = "./aeromodel.json")]
        config: PathBuf,

        #[arg(long)]
        schema: String,

        /// Variable prefix, overriding the config's settings_prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Dotenv file, overriding the config's env_file
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Separator for spelling nested fields (e.g. "__")
        #[arg(long)]
        nested_delimiter: Option<String>,

        #[arg(long)]
        case_sensitive: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Validate { .. } => "validate",
            Command::Dump { .. } => "dump",
            Command::JsonSchema { .. } => "json-schema",
            Command::Settings { .. } => "settings",
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
