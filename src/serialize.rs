//! Record serialization
//!
//! Projects records to JSON in declaration order. Field selection uses
//! dotted paths: `"address"` selects the whole field, `"address.city"`
//! selects `city` inside the nested record. When a path is both included
//! and excluded, exclusion wins.

use std::collections::BTreeSet;

use serde_json::{Map, Value as Json};

use crate::record::Record;
use crate::value::{format_duration, Value, SECRET_MASK};

/// Output options for [`dump`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Only these paths, when set
    pub include: Option<BTreeSet<String>>,
    /// Never these paths
    pub exclude: BTreeSet<String>,
    /// Use aliases as output keys
    pub by_alias: bool,
    /// Omit fields whose value is null
    pub exclude_none: bool,
    /// Omit fields that took their default
    pub exclude_unset: bool,
    /// Render secrets in clear text
    pub reveal_secrets: bool,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn by_alias(mut self, by_alias: bool) -> Self {
        self.by_alias = by_alias;
        self
    }

    pub fn exclude_none(mut self, exclude_none: bool) -> Self {
        self.exclude_none = exclude_none;
        self
    }

    pub fn exclude_unset(mut self, exclude_unset: bool) -> Self {
        self.exclude_unset = exclude_unset;
        self
    }

    pub fn reveal_secrets(mut self, reveal: bool) -> Self {
        self.reveal_secrets = reveal;
        self
    }
}

/// Which part of a field a path set selects
enum Selection {
    None,
    All,
    /// Only the listed sub-paths of a nested record
    Some(BTreeSet<String>),
}

/// Paths in `set` that address `field` or something inside it.
fn select(set: &BTreeSet<String>, field: &str) -> Selection {
    if set.contains(field) {
        return Selection::All;
    }
    let prefix = format!("{}.", field);
    let nested: BTreeSet<String> = set
        .iter()
        .filter_map(|path| path.strip_prefix(&prefix).map(str::to_string))
        .collect();
    if nested.is_empty() {
        Selection::None
    } else {
        Selection::Some(nested)
    }
}

/// Projects a record to a JSON object.
pub fn dump(record: &Record, options: &DumpOptions) -> Map<String, Json> {
    let mut out = Map::new();

    for (field, (name, value)) in record.schema().fields().iter().zip(record.fields()) {
        let included = match &options.include {
            None => Selection::All,
            Some(set) => select(set, name),
        };
        let excluded = select(&options.exclude, name);

        let (include, exclude) = match (included, excluded) {
            (Selection::None, _) | (_, Selection::All) => continue,
            (Selection::All, Selection::None) => (None, BTreeSet::new()),
            (Selection::All, Selection::Some(ex)) => (None, ex),
            (Selection::Some(inc), Selection::None) => (Some(inc), BTreeSet::new()),
            (Selection::Some(inc), Selection::Some(ex)) => (Some(inc), ex),
        };

        if options.exclude_unset && !record.is_set(name) {
            continue;
        }
        if options.exclude_none && value.is_null() {
            continue;
        }

        let child = DumpOptions {
            include,
            exclude,
            ..options.clone()
        };
        let key = if options.by_alias {
            field.input_key()
        } else {
            name
        };
        out.insert(key.to_string(), value_to_json(value, &child));
    }

    if options.include.is_none() {
        for (key, value) in record.extras() {
            if options.exclude.contains(key) || out.contains_key(key) {
                continue;
            }
            if options.exclude_none && value.is_null() {
                continue;
            }
            out.insert(key.clone(), value_to_json(value, options));
        }
    }

    out
}

/// Projects a record to compact JSON text.
pub fn dump_json(record: &Record, options: &DumpOptions) -> String {
    Json::Object(dump(record, options)).to_string()
}

/// Projects a record to indented JSON text.
pub fn dump_json_pretty(record: &Record, options: &DumpOptions) -> String {
    format!("{:#}", Json::Object(dump(record, options)))
}

/// Projects a single value to JSON.
///
/// Options only affect nested records and secrets.
pub fn value_to_json(value: &Value, options: &DumpOptions) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Str(s) => Json::String(s.clone()),
        Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => Json::String(t.format("%H:%M:%S%.f").to_string()),
        Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
        Value::Duration(d) => Json::String(format_duration(d)),
        Value::Uuid(u) => Json::String(u.to_string()),
        Value::List(items) | Value::Set(items) => Json::Array(
            items
                .iter()
                .map(|item| value_to_json(item, options))
                .collect(),
        ),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v, options)))
                .collect(),
        ),
        Value::Record(record) => Json::Object(dump(record, options)),
        Value::Secret(secret) => {
            if options.reveal_secrets {
                value_to_json(secret.expose(), options)
            } else {
                Json::String(SECRET_MASK.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, Registry, SchemaConfig, SchemaDef, SchemaRegistry};
    use serde_json::json;

    fn registry() -> Registry {
        let mut registry = SchemaRegistry::new();
        registry
            .define(
                SchemaDef::new("Address")
                    .field(FieldDef::required_string("city"))
                    .field(FieldDef::required_string("zip")),
            )
            .unwrap();
        registry
            .define(
                SchemaDef::new("User")
                    .field(FieldDef::required_string("name").with_alias("userName"))
                    .field(FieldDef::nested("address", "Address"))
                    .field(FieldDef::optional("nickname", FieldType::String))
                    .field(FieldDef::new("password", FieldType::secret(FieldType::String)))
                    .field(FieldDef::new("joined", FieldType::Date).with_default(Value::Null))
                    .config(SchemaConfig {
                        extra: crate::schema::ExtraPolicy::Allow,
                        populate_by_name: true,
                        ..SchemaConfig::default()
                    }),
            )
            .unwrap();
        registry.resolve().unwrap()
    }

    fn user(registry: &Registry) -> Record {
        registry
            .model("User")
            .unwrap()
            .validate(&json!({
                "userName": "ada",
                "address": {"city": "London", "zip": "N1"},
                "password": "hunter2",
                "joined": "2020-05-17",
                "role": "admin"
            }))
            .unwrap()
    }

    #[test]
    fn test_default_dump() {
        let registry = registry();
        let out = Json::Object(dump(&user(&registry), &DumpOptions::default()));
        assert_eq!(
            out,
            json!({
                "name": "ada",
                "address": {"city": "London", "zip": "N1"},
                "nickname": null,
                "password": "**********",
                "joined": "2020-05-17",
                "role": "admin"
            })
        );
    }

    #[test]
    fn test_declaration_order_and_aliases() {
        let registry = registry();
        let text = dump_json(&user(&registry), &DumpOptions::new().by_alias(true));
        assert!(text.starts_with("{\"userName\":\"ada\",\"address\":"));
    }

    #[test]
    fn test_include_exclude_paths() {
        let registry = registry();
        let record = user(&registry);

        let out = dump(&record, &DumpOptions::new().include(["name", "address.city"]));
        assert_eq!(
            Json::Object(out),
            json!({"name": "ada", "address": {"city": "London"}})
        );

        let out = dump(&record, &DumpOptions::new().exclude(["address.zip", "password", "role"]));
        assert_eq!(out["address"], json!({"city": "London"}));
        assert!(!out.contains_key("password"));
        assert!(!out.contains_key("role"));

        // exclusion wins
        let out = dump(
            &record,
            &DumpOptions::new().include(["name"]).exclude(["name"]),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_exclude_none_and_unset() {
        let registry = registry();
        let record = user(&registry);

        let out = dump(&record, &DumpOptions::new().exclude_none(true));
        assert!(!out.contains_key("nickname"));

        let out = dump(&record, &DumpOptions::new().exclude_unset(true));
        assert!(!out.contains_key("nickname"));
        assert!(out.contains_key("joined"));
    }

    #[test]
    fn test_reveal_secrets() {
        let registry = registry();
        let out = dump(&user(&registry), &DumpOptions::new().reveal_secrets(true));
        assert_eq!(out["password"], json!("hunter2"));
    }

    #[test]
    fn test_value_formats() {
        use chrono::{Duration, NaiveTime};

        let opts = DumpOptions::default();
        assert_eq!(
            value_to_json(&Value::Duration(Duration::minutes(90)), &opts),
            json!("PT1H30M")
        );
        assert_eq!(
            value_to_json(
                &Value::Time(NaiveTime::from_hms_milli_opt(8, 30, 0, 250).unwrap()),
                &opts
            ),
            json!("08:30:00.250")
        );
        assert_eq!(
            value_to_json(&Value::Set(vec![Value::Int(1), Value::Int(2)]), &opts),
            json!([1, 2])
        );
    }

    #[test]
    fn test_pretty_output_is_indented() {
        let registry = registry();
        let text = dump_json_pretty(&user(&registry), &DumpOptions::default());
        assert!(text.contains("\n  \"name\": \"ada\""));
    }
}
