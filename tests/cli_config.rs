//! CLI Configuration Tests
//!
//! Config file handling and command dispatch against on-disk schemas:
//! - Config defaults and validation
//! - Schema directory loading through commands
//! - Error responses carry issues

use aeromodel::cli::{run_command, CliErrorCode, Command, Config};
use aeromodel::schema::{SchemaLoader, SchemaSpec};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// Writes schemas through the loader and a config pointing at them.
fn setup(dir: &TempDir) -> PathBuf {
    let schema_dir = dir.path().join("schemas");
    fs::create_dir_all(&schema_dir).unwrap();
    let loader = SchemaLoader::new(&schema_dir);

    let specs = [
        json!({
            "name": "Order",
            "extends": ["Entity"],
            "fields": [
                {"name": "lines", "type": "list", "items": {"type": "nested", "schema": "Line"}},
                {"name": "status", "type": "literal", "values": ["open", "closed"], "default": "open"}
            ],
            "config": {"extra": "forbid"}
        }),
        json!({
            "name": "Entity",
            "fields": [{"name": "id", "type": "int", "constraints": [{"gt": 0}]}]
        }),
        json!({
            "name": "Line",
            "fields": [
                {"name": "sku", "type": "string", "constraints": [{"pattern": "^[A-Z]{3}-\\d+$"}]},
                {"name": "qty", "type": "int", "default": 1}
            ]
        }),
    ];
    for spec in specs {
        let spec: SchemaSpec = serde_json::from_value(spec).unwrap();
        loader.save(&spec).unwrap();
    }

    let config_path = dir.path().join("aeromodel.json");
    fs::write(
        &config_path,
        json!({"schema_dir": schema_dir.to_string_lossy(), "log_level": "warn"}).to_string(),
    )
    .unwrap();
    config_path
}

fn validate_command(config: PathBuf) -> Command {
    Command::Validate {
        config,
        schema: "Order".to_string(),
    }
}

// =============================================================================
// Config Tests
// =============================================================================

/// Missing schema_dir is a config error.
#[test]
fn test_config_requires_schema_dir() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("aeromodel.json");
    fs::write(&config_path, json!({"log_level": "info"}).to_string()).unwrap();

    let err = Config::load(&config_path).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
}

/// Missing config file is a config error.
#[test]
fn test_config_file_missing() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(&dir.path().join("nope.json")).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
}

/// Optional keys take their defaults.
#[test]
fn test_config_optional_keys() {
    let dir = TempDir::new().unwrap();
    let config_path = setup(&dir);

    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.log_level, "warn");
    assert_eq!(config.settings_prefix, "");
    assert!(config.settings_source().env_file.is_none());
}

// =============================================================================
// Command Tests
// =============================================================================

/// Inherited fields, nested lists and literal defaults come through.
#[test]
fn test_validate_command() {
    let dir = TempDir::new().unwrap();
    let config_path = setup(&dir);

    let input = r#"{"id": "7", "lines": [{"sku": "ABC-1"}, {"sku": "XYZ-22", "qty": 3}]}"#;
    let data = run_command(validate_command(config_path), input.as_bytes()).unwrap();

    assert_eq!(
        data,
        json!({
            "id": 7,
            "lines": [{"sku": "ABC-1", "qty": 1}, {"sku": "XYZ-22", "qty": 3}],
            "status": "open"
        })
    );
}

/// Nested issues carry index paths.
#[test]
fn test_validate_command_issues() {
    let dir = TempDir::new().unwrap();
    let config_path = setup(&dir);

    let input = r#"{"id": 0, "lines": [{"sku": "ABC-1"}, {"sku": "bad"}], "status": "lost", "x": 1}"#;
    let err = run_command(validate_command(config_path), input.as_bytes()).unwrap_err();

    assert_eq!(err.code(), &CliErrorCode::ValidationFailed);
    let paths: Vec<String> = err.issues().iter().map(|i| i.path.to_string()).collect();
    assert_eq!(paths, vec!["id", "lines[1].sku", "status", "x"]);
}

/// Dump applies include paths inside nested lists.
#[test]
fn test_dump_command() {
    let dir = TempDir::new().unwrap();
    let config_path = setup(&dir);

    let command = Command::Dump {
        config: config_path,
        schema: "Order".to_string(),
        include: vec!["id".to_string(), "status".to_string()],
        exclude: vec!["status".to_string()],
        by_alias: false,
        exclude_none: false,
        exclude_unset: false,
        reveal_secrets: false,
    };
    let data = run_command(command, r#"{"id": 3, "lines": []}"#.as_bytes()).unwrap();
    assert_eq!(data, json!({"id": 3}));
}

/// JSON Schema output for a loaded schema.
#[test]
fn test_json_schema_command() {
    let dir = TempDir::new().unwrap();
    let config_path = setup(&dir);

    let command = Command::JsonSchema {
        config: config_path,
        schema: "Order".to_string(),
        by_alias: false,
    };
    let data = run_command(command, std::io::empty()).unwrap();

    assert_eq!(data["additionalProperties"], json!(false));
    assert_eq!(data["properties"]["lines"]["items"]["$ref"], "#/$defs/Line");
    assert_eq!(data["properties"]["status"]["enum"], json!(["open", "closed"]));
    assert!(data["$defs"]["Line"].is_object());
}

/// Unknown schema names fail before reading stdin.
#[test]
fn test_unknown_schema_command() {
    let dir = TempDir::new().unwrap();
    let config_path = setup(&dir);

    let command = Command::Validate {
        config: config_path,
        schema: "Invoice".to_string(),
    };
    let err = run_command(command, std::io::empty()).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::SchemaError);
}
