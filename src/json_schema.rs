//! JSON Schema generation
//!
//! Produces a draft 2020-12 style document for a schema. Nested schemas are
//! emitted once under `$defs` and referenced with `$ref`, which also covers
//! recursive (lazy) references.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value as Json};

use crate::schema::{Constraint, DefaultValue, ExtraPolicy, FieldType, Registry, Schema};
use crate::serialize::{value_to_json, DumpOptions};

/// Generates the JSON Schema document for `schema`.
pub fn generate(registry: &Registry, schema: &Schema, by_alias: bool) -> Json {
    let mut generator = Generator {
        by_alias,
        defs: Map::new(),
        queued: BTreeSet::new(),
        pending: Vec::new(),
    };
    // The root may be referenced by its own descendants
    generator.queued.insert(schema.name().to_string());

    let mut root = generator.object_schema(schema);
    while let Some(name) = generator.pending.pop() {
        if let Some(nested) = registry.schema(&name) {
            let def = generator.object_schema(nested);
            generator.defs.insert(name, Json::Object(def));
        }
    }

    // Self references point at a copy of the root under `$defs`
    let self_ref = Json::String(def_ref(schema.name()));
    let root_json = Json::Object(root.clone());
    if contains_ref(&root_json, &self_ref)
        || generator.defs.values().any(|def| contains_ref(def, &self_ref))
    {
        generator.defs.insert(schema.name().to_string(), root_json);
    }

    if !generator.defs.is_empty() {
        let mut defs: Vec<(String, Json)> = generator.defs.into_iter().collect();
        defs.sort_by(|a, b| a.0.cmp(&b.0));
        root.insert("$defs".into(), Json::Object(defs.into_iter().collect()));
    }
    Json::Object(root)
}

fn contains_ref(value: &Json, target: &Json) -> bool {
    match value {
        Json::Object(map) => {
            map.get("$ref") == Some(target) || map.values().any(|v| contains_ref(v, target))
        }
        Json::Array(items) => items.iter().any(|v| contains_ref(v, target)),
        _ => false,
    }
}

fn def_ref(name: &str) -> String {
    format!("#/$defs/{}", name)
}

struct Generator {
    by_alias: bool,
    defs: Map<String, Json>,
    /// Schemas already emitted or waiting to be
    queued: BTreeSet<String>,
    pending: Vec<String>,
}

impl Generator {
    fn object_schema(&mut self, schema: &Schema) -> Map<String, Json> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in schema.fields() {
            let key = if self.by_alias {
                field.input_key()
            } else {
                field.name()
            };

            let mut property = self.field_schema(field.field_type(), field.constraints());
            property.insert("title".into(), Json::String(title_case(field.name())));
            if let Some(description) = field.description() {
                property.insert("description".into(), Json::String(description.into()));
            }
            match field.default() {
                DefaultValue::Required => required.push(Json::String(key.to_string())),
                DefaultValue::Value(value) => {
                    property.insert("default".into(), value_to_json(value, &DumpOptions::default()));
                }
                DefaultValue::Factory(_) => {}
            }
            properties.insert(key.to_string(), Json::Object(property));
        }

        let mut out = Map::new();
        out.insert("title".into(), Json::String(schema.name().to_string()));
        if let Some(description) = &schema.config().description {
            out.insert("description".into(), Json::String(description.clone()));
        }
        out.insert("type".into(), json!("object"));
        out.insert("properties".into(), Json::Object(properties));
        if !required.is_empty() {
            out.insert("required".into(), Json::Array(required));
        }
        if schema.config().extra == ExtraPolicy::Forbid {
            out.insert("additionalProperties".into(), Json::Bool(false));
        }
        out
    }

    /// Schema for one field: the type with its constraints applied to the
    /// non-null branch.
    fn field_schema(&mut self, ty: &FieldType, constraints: &[Constraint]) -> Map<String, Json> {
        match ty {
            FieldType::Optional { inner } => {
                let inner = self.field_schema(inner, constraints);
                let mut out = Map::new();
                out.insert(
                    "anyOf".into(),
                    json!([Json::Object(inner), {"type": "null"}]),
                );
                out
            }
            other => {
                let mut out = self.type_schema(other);
                apply_constraints(&mut out, other.base(), constraints);
                out
            }
        }
    }

    fn type_schema(&mut self, ty: &FieldType) -> Map<String, Json> {
        let value = match ty {
            FieldType::String => json!({"type": "string"}),
            FieldType::Int => json!({"type": "integer"}),
            FieldType::Float => json!({"type": "number"}),
            FieldType::Bool => json!({"type": "boolean"}),
            FieldType::Date => json!({"type": "string", "format": "date"}),
            FieldType::Time => json!({"type": "string", "format": "time"}),
            FieldType::DateTime => json!({"type": "string", "format": "date-time"}),
            FieldType::Duration => json!({"type": "string", "format": "duration"}),
            FieldType::Uuid => json!({"type": "string", "format": "uuid"}),
            FieldType::Any => json!({}),
            FieldType::Optional { inner } => {
                json!({"anyOf": [Json::Object(self.type_schema(inner)), {"type": "null"}]})
            }
            FieldType::List { items } => {
                json!({"type": "array", "items": Json::Object(self.type_schema(items))})
            }
            FieldType::Set { items } => json!({
                "type": "array",
                "items": Json::Object(self.type_schema(items)),
                "uniqueItems": true
            }),
            FieldType::Map { values } => json!({
                "type": "object",
                "additionalProperties": Json::Object(self.type_schema(values))
            }),
            FieldType::Nested { schema, .. } => {
                if self.queued.insert(schema.clone()) {
                    self.pending.push(schema.clone());
                }
                json!({"$ref": def_ref(schema)})
            }
            FieldType::Union { members } => {
                let members: Vec<Json> = members
                    .iter()
                    .map(|m| Json::Object(self.type_schema(m)))
                    .collect();
                json!({ "anyOf": members })
            }
            FieldType::Literal { values } => {
                let values: Vec<Json> = values
                    .iter()
                    .map(|v| value_to_json(&v.to_value(), &DumpOptions::default()))
                    .collect();
                if values.len() == 1 {
                    json!({"const": values[0]})
                } else {
                    json!({ "enum": values })
                }
            }
            FieldType::Secret { inner } => {
                let mut out = self.type_schema(inner);
                out.insert("writeOnly".into(), Json::Bool(true));
                if matches!(inner.base(), FieldType::String) {
                    out.insert("format".into(), json!("password"));
                }
                return out;
            }
        };
        match value {
            Json::Object(map) => map,
            _ => Map::new(),
        }
    }
}

fn apply_constraints(out: &mut Map<String, Json>, base: &FieldType, constraints: &[Constraint]) {
    let (min_len, max_len) = match base {
        FieldType::List { .. } | FieldType::Set { .. } => ("minItems", "maxItems"),
        FieldType::Map { .. } => ("minProperties", "maxProperties"),
        _ => ("minLength", "maxLength"),
    };
    for constraint in constraints {
        let (key, value) = match constraint {
            Constraint::Gt(n) => ("exclusiveMinimum", json!(n)),
            Constraint::Ge(n) => ("minimum", json!(n)),
            Constraint::Lt(n) => ("exclusiveMaximum", json!(n)),
            Constraint::Le(n) => ("maximum", json!(n)),
            Constraint::MultipleOf(n) => ("multipleOf", json!(n)),
            Constraint::MinLength(n) => (min_len, json!(n)),
            Constraint::MaxLength(n) => (max_len, json!(n)),
            Constraint::Pattern(p) => ("pattern", json!(p.as_str())),
            Constraint::OneOf(values) => (
                "enum",
                Json::Array(
                    values
                        .iter()
                        .map(|v| value_to_json(&v.to_value(), &DumpOptions::default()))
                        .collect(),
                ),
            ),
            Constraint::StripWhitespace | Constraint::ToLower | Constraint::ToUpper => continue,
        };
        out.insert(key.into(), integral(value));
    }
}

/// Renders whole-number bounds as integers (`120` rather than `120.0`).
fn integral(value: Json) -> Json {
    match value.as_f64() {
        Some(f) if value.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => json!(f as i64),
        _ => value,
    }
}

/// `user_name` -> `User Name`
fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
