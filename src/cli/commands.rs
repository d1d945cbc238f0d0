//! CLI command implementations
//!
//! Every command loads the configuration, loads and resolves the schema
//! directory, then works on a single schema. Commands return the response
//! payload; [`run`] writes it (or the error) to stdout.

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Model;
use crate::observability::{log_event_with_fields, Event, Logger, Severity, LOG_ENV_VAR};
use crate::schema::SchemaLoader;
use crate::serialize::DumpOptions;
use crate::settings::SettingsSource;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory of `*.json` schema definitions (required)
    pub schema_dir: String,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prefix for the settings command's variables (optional, default "")
    #[serde(default)]
    pub settings_prefix: String,

    /// Dotenv file for the settings command (optional)
    #[serde(default)]
    pub env_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.schema_dir.trim().is_empty() {
            return Err(CliError::config_error("schema_dir must not be empty"));
        }
        self.severity()?;
        Ok(())
    }

    pub fn schema_path(&self) -> &Path {
        Path::new(&self.schema_dir)
    }

    pub fn severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or fatal.",
                self.log_level
            ))
        })
    }

    /// Settings source described by the config, before CLI overrides
    pub fn settings_source(&self) -> SettingsSource {
        let mut source = SettingsSource::new().prefix(self.settings_prefix.clone());
        if let Some(env_file) = &self.env_file {
            source = source.env_file(env_file);
        }
        source
    }
}

/// Main CLI entry point
///
/// Parses arguments, runs the command against stdin and writes the
/// response to stdout. Failures are written as error responses and also
/// returned so the process can exit non-zero.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let command = cli.command.name();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match run_command(cli.command, stdin.lock()) {
        Ok(data) => write_response(&mut stdout, data),
        Err(e) => {
            log_event_with_fields(
                Event::CommandFailed,
                &[("code", e.code_str()), ("command", command)],
            );
            write_error(&mut stdout, &e)?;
            Err(e)
        }
    }
}

/// Run a command, reading any request from `input`
pub fn run_command<R: BufRead>(cmd: Command, input: R) -> CliResult<Value> {
    match cmd {
        Command::Validate { config, schema } => validate(&config, &schema, input),
        Command::Dump {
            config,
            schema,
            include,
            exclude,
            by_alias,
            exclude_none,
            exclude_unset,
            reveal_secrets,
        } => {
            let mut options = DumpOptions::new()
                .exclude(exclude)
                .by_alias(by_alias)
                .exclude_none(exclude_none)
                .exclude_unset(exclude_unset)
                .reveal_secrets(reveal_secrets);
            if !include.is_empty() {
                options = options.include(include);
            }
            dump(&config, &schema, &options, input)
        }
        Command::JsonSchema {
            config,
            schema,
            by_alias,
        } => json_schema(&config, &schema, by_alias),
        Command::Settings {
            config,
            schema,
            prefix,
            env_file,
            nested_delimiter,
            case_sensitive,
        } => {
            let config = Config::load(&config)?;
            let mut source = config.settings_source().case_sensitive(case_sensitive);
            if let Some(prefix) = prefix {
                source = source.prefix(prefix);
            }
            if let Some(env_file) = env_file {
                source = source.env_file(env_file);
            }
            if let Some(delimiter) = nested_delimiter {
                source = source.nested_delimiter(delimiter);
            }
            settings(&config, &schema, &source)
        }
    }
}

/// Validate the request and return the record with default output options
pub fn validate<R: BufRead>(config_path: &Path, schema: &str, input: R) -> CliResult<Value> {
    dump(config_path, schema, &DumpOptions::default(), input)
}

/// Validate the request and return the record projected with `options`
pub fn dump<R: BufRead>(
    config_path: &Path,
    schema: &str,
    options: &DumpOptions,
    input: R,
) -> CliResult<Value> {
    let model = open_model(&Config::load(config_path)?, schema)?;
    let request = read_request(input)?;
    let record = model.validate(&request)?;
    Ok(Value::Object(record.dump(options)))
}

pub fn json_schema(config_path: &Path, schema: &str, by_alias: bool) -> CliResult<Value> {
    let model = open_model(&Config::load(config_path)?, schema)?;
    Ok(model.json_schema(by_alias))
}

/// Build a record from the process environment
pub fn settings(config: &Config, schema: &str, source: &SettingsSource) -> CliResult<Value> {
    let model = open_model(config, schema)?;
    let record = model.load_settings(source)?;
    Ok(Value::Object(record.dump(&DumpOptions::default())))
}

/// Applies the config's log level and loads the model for `schema`.
fn open_model(config: &Config, schema: &str) -> CliResult<Model> {
    // AEROMODEL_LOG, when set, wins over the config file
    if std::env::var_os(LOG_ENV_VAR).is_none() {
        Logger::set_min_severity(config.severity()?);
    }
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("log_level", config.log_level.as_str()), ("schema_dir", config.schema_dir.as_str())],
    );

    let registry = SchemaLoader::new(config.schema_path()).load_all()?.resolve()?;
    Ok(registry.model(schema)?)
}

/// Default config path relative to `dir`
pub fn default_config_path(dir: &Path) -> PathBuf {
    dir.join("aeromodel.json")
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> PathBuf {
        let config_path = default_config_path(temp_dir.path());
        let schema_dir = temp_dir.path().join("schemas");
        fs::create_dir_all(&schema_dir).unwrap();

        fs::write(
            schema_dir.join("User.json"),
            json!({
                "name": "User",
                "fields": [
                    {"name": "name", "type": "string", "alias": "userName",
                     "constraints": [{"min_length": 1}]},
                    {"name": "age", "type": "int", "constraints": [{"ge": 0}, {"le": 120}]},
                    {"name": "password", "type": "secret", "inner": {"type": "string"}, "default": null},
                    {"name": "nickname", "type": "optional", "inner": {"type": "string"}, "default": null}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let config = json!({
            "schema_dir": schema_dir.to_string_lossy()
        });
        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    #[test]
    fn test_validate_returns_record() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let data = validate(
            &config_path,
            "User",
            r#"{"userName": "ada", "age": "36", "password": "pw"}"#.as_bytes(),
        )
        .unwrap();
        assert_eq!(
            data,
            json!({"name": "ada", "age": 36, "password": "**********", "nickname": null})
        );
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let err = validate(&config_path, "User", r#"{"age": "150"}"#.as_bytes()).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ValidationFailed);
        let paths: Vec<String> = err.issues().iter().map(|i| i.path.to_string()).collect();
        assert_eq!(paths, vec!["name".to_string(), "age".to_string()]);
    }

    #[test]
    fn test_dump_with_options() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let options = DumpOptions::new()
            .by_alias(true)
            .exclude(["age"])
            .exclude_none(true);
        let data = dump(
            &config_path,
            "User",
            &options,
            r#"{"userName": "ada", "age": 1}"#.as_bytes(),
        )
        .unwrap();
        assert_eq!(data, json!({"userName": "ada"}));
    }

    #[test]
    fn test_json_schema_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let data = json_schema(&config_path, "User", false).unwrap();
        assert_eq!(data["title"], "User");
        assert_eq!(data["required"], json!(["name", "age"]));
    }

    #[test]
    fn test_unknown_schema() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let err = json_schema(&config_path, "Ghost", false).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::SchemaError);
    }

    #[test]
    fn test_settings_from_env_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let env_file = temp_dir.path().join(".env");
        fs::write(&env_file, "AEROMODEL_CLI_TEST_USERNAME=ada\nAEROMODEL_CLI_TEST_AGE=7\n").unwrap();

        let config = Config::load(&config_path).unwrap();
        let source = SettingsSource::new()
            .prefix("AEROMODEL_CLI_TEST_")
            .env_file(&env_file);
        let data = settings(&config, "User", &source).unwrap();
        assert_eq!(data["name"], "ada");
        assert_eq!(data["age"], 7);
    }

    #[test]
    fn test_settings_uses_loaded_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let env_file = temp_dir.path().join("settings.env");
        fs::write(&env_file, "SVC_USERNAME=grace\nSVC_AGE=40\n").unwrap();

        let mut config = Config::load(&config_path).unwrap();
        config.settings_prefix = "SVC_".to_string();
        config.env_file = Some(env_file.to_string_lossy().into_owned());
        // Once loaded, the config file itself is no longer needed
        fs::remove_file(&config_path).unwrap();

        let data = settings(&config, "User", &config.settings_source()).unwrap();
        assert_eq!(data["name"], "grace");
        assert_eq!(data["age"], 40);
    }

    #[test]
    fn test_config_validates_log_level() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("aeromodel.json");

        let config = json!({
            "schema_dir": temp_dir.path().to_string_lossy(),
            "log_level": "loud"
        });
        fs::write(&config_path, config.to_string()).unwrap();

        let result = Config::load(&config_path);
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("aeromodel.json");

        let config_json = json!({
            "schema_dir": temp_dir.path().to_string_lossy()
        });
        fs::write(&config_path, config_json.to_string()).unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.settings_prefix, "");
        assert!(config.env_file.is_none());
    }
}
