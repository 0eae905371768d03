//! Maps schema type tokens to model type references, and raw names to
//! class identifiers.
//!
//! # Type Mapping Table
//!
//! | Schema type | Type reference | Python |
//! |-------------|----------------|--------|
//! | `string` | `String` | `str` |
//! | `integer` | `Integer` | `int` |
//! | `number` | `Float` | `float` |
//! | `boolean` | `Boolean` | `bool` |
//! | `array` (no `items`) | `List(Dynamic)` | `list[Any]` |
//! | `object` (no `properties`) | `Map(Dynamic)` | `dict[str, Any]` |
//! | anything else | `Dynamic` | `Any` |
//!
//! Token lists carry nullability: `null` is removed first, a single remaining
//! token becomes `Optional[...]`, several become a union (itself wrapped in
//! `Optional[...]` only when `null` was listed), and none at all becomes
//! `Optional[Any]`.

use crate::schema::{TypeSpec, TypeToken};

/// Class name used when a raw name normalizes to nothing.
pub const FALLBACK_CLASS_NAME: &str = "Model";

/// Leaf types of the generated model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Integer,
    Float,
    Boolean,
    /// The universal "any" type.
    Dynamic,
}

/// A resolved field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(Primitive),
    /// Reference by name to a class owned by the registry.
    Class(String),
    List(Box<TypeRef>),
    /// String-keyed map.
    Map(Box<TypeRef>),
    Optional(Box<TypeRef>),
    /// Non-optional union, members in declared order without duplicates.
    Union(Vec<TypeRef>),
}

impl TypeRef {
    pub const DYNAMIC: TypeRef = TypeRef::Primitive(Primitive::Dynamic);

    pub fn list(item: TypeRef) -> Self {
        TypeRef::List(Box::new(item))
    }

    pub fn map(value: TypeRef) -> Self {
        TypeRef::Map(Box::new(value))
    }

    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::Optional(Box::new(inner))
    }

    /// Whether this type refers to the class `name` anywhere inside it.
    pub fn mentions_class(&self, name: &str) -> bool {
        match self {
            TypeRef::Primitive(_) => false,
            TypeRef::Class(class) => class == name,
            TypeRef::List(inner) | TypeRef::Map(inner) | TypeRef::Optional(inner) => {
                inner.mentions_class(name)
            }
            TypeRef::Union(members) => members.iter().any(|m| m.mentions_class(name)),
        }
    }
}

/// Convert a raw property or root name to a PascalCase class name.
///
/// - `"user_id"` → `"UserId"`
/// - `"shipping-address"` → `"ShippingAddress"`
/// - `"__"` → `"Model"`
///
/// Only the first character of each segment changes; `"userID"` stays
/// `"UserID"`.
pub fn normalize(raw: &str) -> String {
    let name: String = raw
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().to_string() + chars.as_str(),
            }
        })
        .collect();

    if name.is_empty() {
        FALLBACK_CLASS_NAME.to_string()
    } else {
        name
    }
}

/// Map a single type token, ignoring nullability.
pub fn map_token(token: &TypeToken) -> TypeRef {
    let Some(name) = token.name() else {
        return TypeRef::DYNAMIC;
    };
    match name {
        "string" => TypeRef::Primitive(Primitive::String),
        "integer" => TypeRef::Primitive(Primitive::Integer),
        "number" => TypeRef::Primitive(Primitive::Float),
        "boolean" => TypeRef::Primitive(Primitive::Boolean),
        // Used only when no `items` / `properties` schema is available.
        "array" => TypeRef::list(TypeRef::DYNAMIC),
        "object" => TypeRef::map(TypeRef::DYNAMIC),
        _ => TypeRef::DYNAMIC,
    }
}

/// Map a node's declared type to a type reference.
pub fn map_type(spec: &TypeSpec) -> TypeRef {
    match spec {
        TypeSpec::Absent => TypeRef::DYNAMIC,
        TypeSpec::Single(token) => map_token(token),
        TypeSpec::Many(tokens) => map_token_list(tokens),
    }
}

fn map_token_list(tokens: &[TypeToken]) -> TypeRef {
    let non_null: Vec<&TypeToken> = tokens.iter().filter(|t| !t.is_null()).collect();
    let nullable = non_null.len() < tokens.len();

    match non_null.as_slice() {
        [] => TypeRef::optional(TypeRef::DYNAMIC),
        [only] => TypeRef::optional(map_token(only)),
        many => {
            let mut members: Vec<TypeRef> = Vec::with_capacity(many.len());
            for token in many {
                let mapped = map_token(token);
                if !members.contains(&mapped) {
                    members.push(mapped);
                }
            }
            let union = if members.len() == 1 {
                members.swap_remove(0)
            } else {
                TypeRef::Union(members)
            };
            // only an explicit `null` makes a union optional
            if nullable {
                TypeRef::optional(union)
            } else {
                union
            }
        }
    }
}

/// Tokens of `spec` outside the known vocabulary, as they appear in the
/// schema. An absent type is not reported.
pub fn unrecognized_tokens(spec: &TypeSpec) -> Vec<String> {
    let tokens: &[TypeToken] = match spec {
        TypeSpec::Absent => &[],
        TypeSpec::Single(t) => std::slice::from_ref(t),
        TypeSpec::Many(ts) => ts,
    };
    tokens
        .iter()
        .filter_map(|t| match t {
            TypeToken::Name(n) if is_known(n) => None,
            TypeToken::Name(n) => Some(n.clone()),
            TypeToken::Other(raw) => Some(raw.clone()),
        })
        .collect()
}

fn is_known(name: &str) -> bool {
    matches!(
        name,
        "string" | "integer" | "number" | "boolean" | "array" | "object" | "null"
    )
}
