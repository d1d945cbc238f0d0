//! Schema loader for data-only schema files
//!
//! - One JSON file per schema, named `<Name>.json`
//! - Files are defined in dependency order (parents and eager references
//!   first), regardless of their names
//! - Existing files are never overwritten

use std::fs;
use std::path::{Path, PathBuf};

use super::definition::SchemaSpec;
use super::errors::{SchemaError, SchemaResult};
use super::registry::SchemaRegistry;
use crate::observability::{log_event_with_fields, Event};

/// Reads and writes schema files in one directory.
pub struct SchemaLoader {
    schema_dir: PathBuf,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl AsRef<Path>) -> Self {
        Self {
            schema_dir: schema_dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the schema directory path.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every `*.json` file into a fresh registry.
    ///
    /// A missing directory yields an empty registry. The registry is not
    /// resolved; callers may define more schemas before resolving.
    pub fn load_all(&self) -> SchemaResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        self.load_into(&mut registry)?;
        Ok(registry)
    }

    /// Loads every `*.json` file into an existing registry.
    ///
    /// Returns the number of schemas defined.
    pub fn load_into(&self, registry: &mut SchemaRegistry) -> SchemaResult<usize> {
        let mut pending = self.read_specs()?;
        let total = pending.len();

        while !pending.is_empty() {
            let ready = pending.iter().position(|(_, spec)| {
                spec.dependencies()
                    .iter()
                    .all(|dep| registry.contains(dep))
            });

            // When nothing is ready, define the first pending file anyway so
            // the registry reports the real problem (unknown parent, cycle).
            let (path, spec) = pending.remove(ready.unwrap_or(0));
            registry.define(spec.into_def()).map_err(|e| match e {
                SchemaError::Malformed { .. } => e,
                other => SchemaError::malformed(path.display().to_string(), other.to_string()),
            })?;
        }

        let count = total.to_string();
        let dir = self.schema_dir.display().to_string();
        log_event_with_fields(
            Event::SchemasLoaded,
            &[("dir", dir.as_str()), ("schemas", count.as_str())],
        );
        Ok(total)
    }

    /// Writes a schema file; fails if the file already exists.
    pub fn save(&self, spec: &SchemaSpec) -> SchemaResult<PathBuf> {
        let path = self.schema_dir.join(format!("{}.json", spec.name));
        if path.exists() {
            return Err(SchemaError::AlreadyDefined(spec.name.clone()));
        }

        fs::create_dir_all(&self.schema_dir).map_err(|e| {
            SchemaError::malformed(
                self.schema_dir.display().to_string(),
                format!("failed to create schema directory: {}", e),
            )
        })?;

        let content = serde_json::to_string_pretty(spec).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("failed to serialize schema: {}", e),
            )
        })?;

        fs::write(&path, content).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("failed to write file: {}", e),
            )
        })?;

        Ok(path)
    }

    /// Parses every schema file, sorted by file name.
    fn read_specs(&self) -> SchemaResult<Vec<(PathBuf, SchemaSpec)>> {
        if !self.schema_dir.exists() {
            return Ok(Vec::new());
        }

        let dir = self.schema_dir.display().to_string();
        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            SchemaError::malformed(&dir, format!("failed to read schema directory: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::malformed(&dir, format!("failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let spec = read_spec(&path)?;
                Ok((path, spec))
            })
            .collect()
    }
}

fn read_spec(path: &Path) -> SchemaResult<SchemaSpec> {
    let content = fs::read_to_string(path).map_err(|e| {
        SchemaError::malformed(path.display().to_string(), format!("failed to read file: {}", e))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        SchemaError::malformed(path.display().to_string(), format!("invalid JSON: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_load_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let registry = SchemaLoader::new(temp_dir.path()).load_all().unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path().join("nope"));
        assert!(loader.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_loads_in_dependency_order() {
        let temp_dir = TempDir::new().unwrap();
        // "Account" sorts before "Base" but extends it
        write(
            temp_dir.path(),
            "Account.json",
            r#"{"name": "Account", "extends": ["Base"], "fields": [
                {"name": "owner", "type": "nested", "schema": "Person"}
            ]}"#,
        );
        write(
            temp_dir.path(),
            "Base.json",
            r#"{"name": "Base", "fields": [{"name": "id", "type": "uuid"}]}"#,
        );
        write(
            temp_dir.path(),
            "Person.json",
            r#"{"name": "Person", "fields": [{"name": "name", "type": "string"}]}"#,
        );
        write(temp_dir.path(), "notes.txt", "ignored");

        let registry = SchemaLoader::new(temp_dir.path()).load_all().unwrap();
        assert_eq!(registry.len(), 3);
        let account = registry.get("Account").unwrap();
        assert_eq!(account.fields().len(), 2);
        assert!(registry.resolve().is_ok());
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "Bad.json", "{ not json");

        let err = SchemaLoader::new(temp_dir.path()).load_all().unwrap_err();
        assert_eq!(err.code(), "AERO_SCHEMA_MALFORMED");
    }

    #[test]
    fn test_unknown_parent_surfaces() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "Child.json",
            r#"{"name": "Child", "extends": ["Ghost"], "fields": []}"#,
        );

        let err = SchemaLoader::new(temp_dir.path()).load_all().unwrap_err();
        match err {
            SchemaError::Malformed { reason, .. } => assert!(reason.contains("Ghost")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path());

        let spec: SchemaSpec = serde_json::from_str(
            r#"{"name": "User", "fields": [
                {"name": "name", "type": "string", "constraints": [{"min_length": 1}]},
                {"name": "age", "type": "int", "default": 0}
            ]}"#,
        )
        .unwrap();
        let path = loader.save(&spec).unwrap();
        assert!(path.ends_with("User.json"));

        let registry = loader.load_all().unwrap();
        let user = registry.get("User").unwrap();
        assert!(user.field("name").unwrap().is_required());
        assert!(!user.field("age").unwrap().is_required());
    }

    #[test]
    fn test_save_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path());
        let spec: SchemaSpec =
            serde_json::from_str(r#"{"name": "User", "fields": []}"#).unwrap();

        loader.save(&spec).unwrap();
        let err = loader.save(&spec).unwrap_err();
        assert_eq!(err.code(), "AERO_SCHEMA_ALREADY_DEFINED");
    }
}
