//! Schema inference and schema diffing.
//!
//! [`SchemaEngine`] is the boundary between the generator's callers and
//! whatever computes schemas: an in-process engine, a subprocess, or a remote
//! service can sit behind it. [`NativeEngine`] is the in-process
//! implementation.
//!
//! Inference streams samples into a join-semilattice: every sample is
//! observed into a [`Shape`] and shapes are joined kind by kind, so the
//! result does not depend on how samples are batched. Object keys keep their
//! first-seen order.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::{SchemaNode, parse_schema};

/// Capabilities of a schema engine.
pub trait SchemaEngine {
    /// Compute a schema (serialized JSON in the generator's dialect) from
    /// serialized example records.
    fn infer_schema(&self, samples: &[String]) -> Result<String>;

    /// Compare two serialized schemas field by field.
    fn diff_schemas(&self, a: &str, b: &str) -> Result<SchemaDiff>;
}

/// Field-level comparison of two schemas.
///
/// Fields are identified by path: `user`, `user.email`, `tags[]`,
/// `tags[].id`. Each list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Present only in the second schema.
    pub added: Vec<String>,
    /// Present only in the first schema.
    pub removed: Vec<String>,
    /// Present in both.
    pub common: Vec<String>,
}

impl SchemaDiff {
    /// True when both schemas declare exactly the same fields.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Split example data into serialized JSON samples.
///
/// A top-level JSON array yields one sample per element and any other JSON
/// document (pretty-printed or not) is a single sample. Text that does not
/// parse as one JSON document is read as JSONL: one sample per non-blank
/// line, surrounding whitespace trimmed.
pub fn samples_from_text(data: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Array(records)) => records.iter().map(Value::to_string).collect(),
        Ok(record) => vec![record.to_string()],
        Err(_) => data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// In-process schema engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEngine;

impl SchemaEngine for NativeEngine {
    fn infer_schema(&self, samples: &[String]) -> Result<String> {
        if samples.is_empty() {
            return Err(Error::Inference("no samples to infer a schema from".to_string()));
        }

        let mut shape = Shape::default();
        for (index, sample) in samples.iter().enumerate() {
            let value: Value = serde_json::from_str(sample)
                .map_err(|source| Error::InvalidSample { index, source })?;
            shape.join(Shape::observe(&value));
        }

        debug!(samples = samples.len(), "inferred schema");
        Ok(serde_json::to_string_pretty(&shape.to_schema())?)
    }

    fn diff_schemas(&self, a: &str, b: &str) -> Result<SchemaDiff> {
        let before = field_paths(&parse_schema(a)?);
        let after = field_paths(&parse_schema(b)?);

        Ok(SchemaDiff {
            added: after.difference(&before).cloned().collect(),
            removed: before.difference(&after).cloned().collect(),
            common: before.intersection(&after).cloned().collect(),
        })
    }
}

// ── Inference ──────────────────────────────────────────────────────────

/// Least upper bound of every value observed at one position.
#[derive(Debug, Clone, Default, PartialEq)]
struct Shape {
    nullable: bool,
    boolean: bool,
    integer: bool,
    number: bool,
    string: bool,
    /// Element shape, if any array was seen. Stays bottom when every array
    /// was empty.
    array: Option<Box<Shape>>,
    object: Option<IndexMap<String, Shape>>,
}

impl Shape {
    fn observe(value: &Value) -> Self {
        match value {
            Value::Null => Shape {
                nullable: true,
                ..Shape::default()
            },
            Value::Bool(_) => Shape {
                boolean: true,
                ..Shape::default()
            },
            Value::Number(n) if n.is_i64() || n.is_u64() => Shape {
                integer: true,
                ..Shape::default()
            },
            Value::Number(_) => Shape {
                number: true,
                ..Shape::default()
            },
            Value::String(_) => Shape {
                string: true,
                ..Shape::default()
            },
            Value::Array(elements) => {
                let mut item = Shape::default();
                for element in elements {
                    item.join(Shape::observe(element));
                }
                Shape {
                    array: Some(Box::new(item)),
                    ..Shape::default()
                }
            }
            Value::Object(map) => {
                let fields = map
                    .iter()
                    .map(|(k, v)| (k.clone(), Shape::observe(v)))
                    .collect();
                Shape {
                    object: Some(fields),
                    ..Shape::default()
                }
            }
        }
    }

    fn is_bottom(&self) -> bool {
        *self == Shape::default()
    }

    fn join(&mut self, other: Shape) {
        self.nullable |= other.nullable;
        self.boolean |= other.boolean;
        self.integer |= other.integer;
        self.number |= other.number;
        self.string |= other.string;

        if let Some(theirs) = other.array {
            match &mut self.array {
                Some(mine) => mine.join(*theirs),
                None => self.array = Some(theirs),
            }
        }

        if let Some(theirs) = other.object {
            match &mut self.object {
                Some(mine) => {
                    for (key, shape) in theirs {
                        match mine.get_mut(&key) {
                            Some(existing) => existing.join(shape),
                            None => {
                                mine.insert(key, shape);
                            }
                        }
                    }
                }
                None => self.object = Some(theirs),
            }
        }
    }

    /// Type tokens in a fixed kind order, `null` last.
    fn type_tokens(&self) -> Vec<&'static str> {
        let mut tokens = Vec::new();
        if self.object.is_some() {
            tokens.push("object");
        }
        if self.array.is_some() {
            tokens.push("array");
        }
        if self.string {
            tokens.push("string");
        }
        // integer joined with number widens to number
        if self.number {
            tokens.push("number");
        } else if self.integer {
            tokens.push("integer");
        }
        if self.boolean {
            tokens.push("boolean");
        }
        if self.nullable {
            tokens.push("null");
        }
        tokens
    }

    fn to_schema(&self) -> Value {
        let mut node = Map::new();

        match self.type_tokens().as_slice() {
            [] => {}
            [single] => {
                node.insert("type".to_string(), Value::from(*single));
            }
            many => {
                node.insert(
                    "type".to_string(),
                    Value::Array(many.iter().map(|t| Value::from(*t)).collect()),
                );
            }
        }

        if let Some(fields) = &self.object {
            let properties = fields
                .iter()
                .map(|(k, shape)| (k.clone(), shape.to_schema()))
                .collect();
            node.insert("properties".to_string(), Value::Object(properties));
        }

        if let Some(item) = &self.array {
            if !item.is_bottom() {
                node.insert("items".to_string(), item.to_schema());
            }
        }

        Value::Object(node)
    }
}

// ── Diff ───────────────────────────────────────────────────────────────

fn field_paths(schema: &SchemaNode) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    collect_paths(schema, "", &mut paths);
    paths
}

fn collect_paths(node: &SchemaNode, prefix: &str, out: &mut BTreeSet<String>) {
    if let Some(properties) = &node.properties {
        for (key, child) in properties {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            collect_paths(child, &path, out);
            out.insert(path);
        }
    }
    if let Some(items) = &node.items {
        let path = format!("{prefix}[]");
        collect_paths(items, &path, out);
        out.insert(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn infer(samples: &[Value]) -> Value {
        let texts: Vec<String> = samples.iter().map(Value::to_string).collect();
        let schema = NativeEngine.infer_schema(&texts).unwrap();
        serde_json::from_str(&schema).unwrap()
    }

    #[test]
    fn samples_from_json_array() {
        let samples = samples_from_text(r#"[{"id": 1}, {"id": 2}, 3]"#);
        assert_eq!(samples, [r#"{"id":1}"#, r#"{"id":2}"#, "3"]);
    }

    #[test]
    fn samples_from_single_document() {
        let pretty = "{\n  \"id\": 1,\n  \"tags\": [\n    \"a\"\n  ]\n}\n";
        assert_eq!(samples_from_text(pretty), [r#"{"id":1,"tags":["a"]}"#]);
        assert_eq!(samples_from_text("\"just text\""), [r#""just text""#]);
    }

    #[test]
    fn samples_from_jsonl() {
        let data = "{\"id\": 1}\n{\"id\": 2}\n{\"id\": 3}\n";
        assert_eq!(
            samples_from_text(data),
            [r#"{"id": 1}"#, r#"{"id": 2}"#, r#"{"id": 3}"#]
        );
    }

    #[test]
    fn jsonl_skips_blank_lines() {
        let data = "\n{\"id\": 1}\n   \n\r\n  {\"id\": 2}  \n\n";
        assert_eq!(samples_from_text(data), [r#"{"id": 1}"#, r#"{"id": 2}"#]);
    }

    #[test]
    fn jsonl_samples_feed_inference() {
        let samples = samples_from_text("{\"id\": 1}\n\n{\"id\": null, \"name\": \"x\"}\n");
        let schema: Value =
            serde_json::from_str(&NativeEngine.infer_schema(&samples).unwrap()).unwrap();
        assert_eq!(schema["properties"]["id"]["type"], json!(["integer", "null"]));
        assert_eq!(schema["properties"]["name"]["type"], json!("string"));
    }

    #[test]
    fn infers_simple_records() {
        let schema = infer(&[
            json!({"id": 1, "name": "Alice", "tags": ["a", "b"]}),
            json!({"id": 2, "name": "Bob", "tags": []}),
        ]);

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["id"]["type"], "integer");
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert_eq!(schema["properties"]["tags"]["type"], "array");
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "string");
    }

    #[test]
    fn keeps_first_seen_key_order() {
        let schema = infer(&[json!({"b": 1, "a": 2}), json!({"c": 3, "a": 4})]);
        let keys: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn null_values_make_fields_nullable() {
        let schema = infer(&[json!({"email": "a@b.c"}), json!({"email": null})]);
        assert_eq!(schema["properties"]["email"]["type"], json!(["string", "null"]));
    }

    #[test]
    fn integer_and_float_widen_to_number() {
        let schema = infer(&[json!({"score": 1}), json!({"score": 2.5})]);
        assert_eq!(schema["properties"]["score"]["type"], "number");
    }

    #[test]
    fn mixed_kinds_become_token_list() {
        let schema = infer(&[json!({"id": "x1"}), json!({"id": 7}), json!({"id": true})]);
        assert_eq!(
            schema["properties"]["id"]["type"],
            json!(["string", "integer", "boolean"])
        );
    }

    #[test]
    fn empty_arrays_have_no_items() {
        let schema = infer(&[json!({"tags": []})]);
        assert_eq!(schema["properties"]["tags"]["type"], "array");
        assert!(schema["properties"]["tags"].get("items").is_none());
    }

    #[test]
    fn nested_objects_in_arrays_are_joined() {
        let schema = infer(&[json!({"rows": [{"id": 1}, {"id": 2, "label": "x"}]})]);
        let item = &schema["properties"]["rows"]["items"];
        assert_eq!(item["type"], "object");
        assert_eq!(item["properties"]["id"]["type"], "integer");
        assert_eq!(item["properties"]["label"]["type"], "string");
    }

    #[test]
    fn null_only_field_is_null_typed() {
        let schema = infer(&[json!({"gone": null})]);
        assert_eq!(schema["properties"]["gone"]["type"], "null");
    }

    #[test]
    fn no_samples_is_an_error() {
        let err = NativeEngine.infer_schema(&[]).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn invalid_sample_reports_index() {
        let samples = vec!["{\"a\": 1}".to_string(), "{oops".to_string()];
        match NativeEngine.infer_schema(&samples).unwrap_err() {
            Error::InvalidSample { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn diff_reports_added_removed_common() {
        let a = json!({"type": "object", "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"},
            "address": {"type": "object", "properties": {"city": {"type": "string"}}}
        }})
        .to_string();
        let b = json!({"type": "object", "properties": {
            "id": {"type": "string"},
            "email": {"type": "string"},
            "address": {"type": "object", "properties": {"zip": {"type": "string"}}}
        }})
        .to_string();

        let diff = NativeEngine.diff_schemas(&a, &b).unwrap();
        assert_eq!(diff.added, ["address.zip", "email"]);
        assert_eq!(diff.removed, ["address.city", "name"]);
        assert_eq!(diff.common, ["address", "id"]);
        assert!(!diff.is_unchanged());
    }

    #[test]
    fn diff_walks_array_items() {
        let a = json!({"type": "object", "properties": {
            "tags": {"type": "array", "items": {"type": "object", "properties": {"id": {"type": "integer"}}}}
        }})
        .to_string();

        let diff = NativeEngine.diff_schemas(&a, &a).unwrap();
        assert_eq!(diff.common, ["tags", "tags[]", "tags[].id"]);
        assert!(diff.is_unchanged());
    }

    #[test]
    fn diff_rejects_malformed_schema() {
        let bad = r#"{"type": "object", "properties": 3}"#;
        let good = r#"{"type": "object"}"#;
        assert!(matches!(
            NativeEngine.diff_schemas(bad, good),
            Err(Error::SchemaFormat { .. })
        ));
    }

    #[test]
    fn inferred_schema_is_valid_generator_input() {
        let texts = vec![json!({"user": {"id": 1}, "tags": ["a"]}).to_string()];
        let schema = NativeEngine.infer_schema(&texts).unwrap();
        let code = crate::codegen::generate(&parse_schema(&schema).unwrap(), "Event").unwrap();
        assert!(code.contains("class User(BaseModel):\n    id: int\n"));
        assert!(code.contains("    tags: list[str]\n"));
    }
}
