//! Schema dialect types, parsing, loading, and downloading.
//!
//! The accepted dialect is a small subset of JSON Schema: a node carries a
//! `type` (a single token or an ordered list of tokens), optional
//! `properties` for objects and an optional `items` node for arrays. Every
//! other keyword is ignored. Type tokens are never rejected; anything the
//! generator does not understand later maps to `Any`.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

/// Path of the root node in error messages and class registrations.
pub const ROOT_PATH: &str = "$";

/// A single entry of a node's `type` keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeToken {
    /// A string token such as `"string"`, `"object"` or `"null"`.
    Name(String),
    /// A non-string token (e.g. `5` or `{}`), kept as its JSON text.
    Other(String),
}

impl TypeToken {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => TypeToken::Name(s.clone()),
            other => TypeToken::Other(other.to_string()),
        }
    }

    /// Whether this token is the literal `"null"`.
    pub fn is_null(&self) -> bool {
        matches!(self, TypeToken::Name(n) if n == "null")
    }

    /// The token text, for string tokens.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeToken::Name(n) => Some(n),
            TypeToken::Other(_) => None,
        }
    }
}

/// The `type` keyword of a schema node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeSpec {
    /// No `type` keyword (or `"type": null`).
    #[default]
    Absent,
    /// `"type": "string"`.
    Single(TypeToken),
    /// `"type": ["string", "null"]`, in declared order.
    Many(Vec<TypeToken>),
}

impl TypeSpec {
    /// Shorthand for a single named token.
    pub fn single(name: &str) -> Self {
        TypeSpec::Single(TypeToken::Name(name.to_string()))
    }

    /// Shorthand for a list of named tokens.
    pub fn many(names: &[&str]) -> Self {
        TypeSpec::Many(
            names
                .iter()
                .map(|n| TypeToken::Name((*n).to_string()))
                .collect(),
        )
    }

    /// Whether the type is, or includes, the given token.
    pub fn includes(&self, kind: &str) -> bool {
        match self {
            TypeSpec::Absent => false,
            TypeSpec::Single(t) => t.name() == Some(kind),
            TypeSpec::Many(ts) => ts.iter().any(|t| t.name() == Some(kind)),
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => TypeSpec::Absent,
            Some(Value::Array(tokens)) => {
                TypeSpec::Many(tokens.iter().map(TypeToken::from_value).collect())
            }
            Some(other) => TypeSpec::Single(TypeToken::from_value(other)),
        }
    }
}

/// One node of the schema dialect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    /// Declared type.
    pub type_spec: TypeSpec,

    /// Object properties in declared order.
    pub properties: Option<IndexMap<String, SchemaNode>>,

    /// Array element shape.
    pub items: Option<Box<SchemaNode>>,
}

impl SchemaNode {
    /// Parse a node (and all of its descendants) from a JSON value.
    ///
    /// Fails with [`Error::SchemaFormat`] when a node is not a JSON object,
    /// or when `properties`/`items` hold something other than nodes. A
    /// `null` value for either keyword is treated as absent.
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::from_value_at(value, ROOT_PATH)
    }

    fn from_value_at(value: &Value, path: &str) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::schema_format(
                path,
                format!("expected a schema object, found {}", kind_of(value)),
            ));
        };

        let type_spec = TypeSpec::from_value(map.get("type"));

        let properties = match map.get("properties") {
            None | Some(Value::Null) => None,
            Some(Value::Object(props)) => {
                let mut out = IndexMap::with_capacity(props.len());
                for (key, child) in props {
                    let child_path = format!("{path}.{key}");
                    out.insert(key.clone(), Self::from_value_at(child, &child_path)?);
                }
                Some(out)
            }
            Some(other) => {
                return Err(Error::schema_format(
                    path,
                    format!("`properties` must be an object, found {}", kind_of(other)),
                ));
            }
        };

        let items = match map.get("items") {
            None | Some(Value::Null) => None,
            Some(child @ Value::Object(_)) => {
                Some(Box::new(Self::from_value_at(child, &format!("{path}[]"))?))
            }
            Some(other) => {
                return Err(Error::schema_format(
                    path,
                    format!("`items` must be a schema object, found {}", kind_of(other)),
                ));
            }
        };

        Ok(SchemaNode {
            type_spec,
            properties,
            items,
        })
    }

    /// Object node with at least one declared property.
    pub fn is_object_with_properties(&self) -> bool {
        self.type_spec.includes("object")
            && self.properties.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Array node with an element schema.
    pub fn is_array_with_items(&self) -> bool {
        self.type_spec.includes("array") && self.items.is_some()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse schema text into a [`SchemaNode`].
pub fn parse_schema(text: &str) -> Result<SchemaNode> {
    let value: Value = serde_json::from_str(text)?;
    SchemaNode::from_value(&value)
}

/// Load a schema file from disk.
pub fn load_schema(path: &Path) -> Result<SchemaNode> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_schema(&content)
}

/// Download a schema document and save it to disk.
///
/// The response body is validated as dialect input before it is written, so
/// a broken download never replaces a good local copy.
#[cfg(feature = "download")]
pub async fn download_schema(url: &str, output_path: &Path) -> Result<()> {
    tracing::info!(%url, "downloading schema");

    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Download(format!(
            "GET {url} returned {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::Download(format!("reading response body: {e}")))?;

    let schema = parse_schema(&body)?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(output_path, &body).map_err(|e| Error::Write {
        path: output_path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(
        properties = schema.properties.as_ref().map_or(0, |p| p.len()),
        path = %output_path.display(),
        "saved schema"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema_json() -> &'static str {
        r#"{
            "type": "object",
            "properties": {
                "zeta": {"type": "string"},
                "id": {"type": "integer"},
                "email": {"type": ["string", "null"]},
                "tags": {"type": "array", "items": {"type": "string"}},
                "address": {
                    "type": "object",
                    "properties": {
                        "city": {"type": "string"}
                    }
                }
            }
        }"#
    }

    #[test]
    fn parse_keeps_property_order() {
        let schema = parse_schema(user_schema_json()).unwrap();
        let keys: Vec<&str> = schema
            .properties
            .as_ref()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["zeta", "id", "email", "tags", "address"]);
    }

    #[test]
    fn parse_type_forms() {
        let schema = parse_schema(user_schema_json()).unwrap();
        let props = schema.properties.as_ref().unwrap();

        assert_eq!(props["id"].type_spec, TypeSpec::single("integer"));
        assert_eq!(props["email"].type_spec, TypeSpec::many(&["string", "null"]));
        assert!(props["tags"].is_array_with_items());
        assert!(props["address"].is_object_with_properties());
        assert!(!props["zeta"].is_object_with_properties());
    }

    #[test]
    fn absent_and_null_type_are_absent() {
        let a = parse_schema("{}").unwrap();
        let b = parse_schema(r#"{"type": null}"#).unwrap();
        assert_eq!(a.type_spec, TypeSpec::Absent);
        assert_eq!(b.type_spec, TypeSpec::Absent);
    }

    #[test]
    fn non_string_tokens_are_kept_not_rejected() {
        let schema = parse_schema(r#"{"type": ["string", 5, null]}"#).unwrap();
        assert_eq!(
            schema.type_spec,
            TypeSpec::Many(vec![
                TypeToken::Name("string".to_string()),
                TypeToken::Other("5".to_string()),
                TypeToken::Other("null".to_string()),
            ])
        );
        // A JSON null inside the list is not the "null" type token.
        if let TypeSpec::Many(tokens) = &schema.type_spec {
            assert!(!tokens[2].is_null());
        }
    }

    #[test]
    fn null_properties_and_items_are_absent() {
        let schema = parse_schema(r#"{"type": "object", "properties": null, "items": null}"#)
            .unwrap();
        assert!(schema.properties.is_none());
        assert!(schema.items.is_none());
        assert!(!schema.is_object_with_properties());
    }

    #[test]
    fn empty_properties_do_not_qualify_as_object() {
        let schema = parse_schema(r#"{"type": "object", "properties": {}}"#).unwrap();
        assert!(!schema.is_object_with_properties());
    }

    #[test]
    fn properties_must_be_an_object() {
        let err = parse_schema(r#"{"type": "object", "properties": ["a", "b"]}"#).unwrap_err();
        assert!(matches!(err, Error::SchemaFormat { .. }));
        assert!(err.to_string().contains("`properties` must be an object"));
    }

    #[test]
    fn nested_items_error_reports_path() {
        let json = r#"{
            "type": "object",
            "properties": {
                "rows": {"type": "array", "items": [{"type": "string"}]}
            }
        }"#;
        let err = parse_schema(json).unwrap_err();
        match err {
            Error::SchemaFormat { path, message } => {
                assert_eq!(path, "$.rows");
                assert!(message.contains("`items`"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn property_node_must_be_an_object() {
        let err = parse_schema(r#"{"type": "object", "properties": {"a": "string"}}"#)
            .unwrap_err();
        match err {
            Error::SchemaFormat { path, .. } => assert_eq!(path, "$.a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_json_is_a_json_error() {
        assert!(matches!(parse_schema("{not json"), Err(Error::Json(_))));
    }
}
