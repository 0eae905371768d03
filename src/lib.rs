//! Generate Pydantic models from JSON schemas.
//!
//! `aif-modelgen` turns a small JSON-Schema dialect (`type`, `properties`,
//! `items`) into a deterministic Python module of Pydantic v2 `BaseModel`
//! classes. Around that generator it provides schema inference from example
//! records, field-level schema diffs, and a directory of versioned schema
//! contracts.
//!
//! # Features
//!
//! - One class per object node that declares properties; nested classes are
//!   emitted before the classes that use them
//! - Field names are kept verbatim, class names are PascalCase
//! - `["T", "null"]` becomes `Optional[T]`, other token lists become unions,
//!   `Optional[A | B]` when `null` is listed
//! - Unknown type tokens map to `Any` instead of failing
//! - Class name collisions are disambiguated (`Address2`) rather than lost;
//!   the old last-definition-wins behaviour needs
//!   [`codegen::CollisionPolicy::Overwrite`] (CLI `--overwrite-collisions`)
//! - Deterministic output: byte-identical across runs
//!
//! # Usage
//!
//! ```
//! let schema = aif_modelgen::schema::parse_schema(
//!     r#"{"type": "object", "properties": {"user_id": {"type": "integer"}}}"#,
//! )?;
//! let code = aif_modelgen::codegen::generate(&schema, "Event")?;
//! assert!(code.contains("class Event(BaseModel):\n    user_id: int\n"));
//! # Ok::<(), aif_modelgen::error::Error>(())
//! ```

pub mod codegen;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod schema;
pub mod type_map;

/// Parse schema text and generate its Pydantic module in one step.
pub fn generate_from_json(text: &str, root_name: &str) -> error::Result<String> {
    let schema = schema::parse_schema(text)?;
    codegen::generate(&schema, root_name)
}
