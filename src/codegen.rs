//! Pydantic model generation from a schema tree.
//!
//! Generation runs in two steps over a run-scoped [`ClassRegistry`]:
//! - the walker classifies every node, recursing into `properties` and
//!   `items`, and registers one class per object node that declares
//!   properties;
//! - the emitter renders the registry as Python source.
//!
//! A node's children are always registered before the node itself, so the
//! registry is ordered leaves first, root last, and the emitted module never
//! needs forward references. The output is deterministic: identical input
//! always produces byte-identical output.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::schema::{ROOT_PATH, SchemaNode, TypeSpec};
use crate::type_map::{Primitive, TypeRef, map_type, normalize, unrecognized_tokens};

/// Root class name used when the caller does not pick one.
pub const DEFAULT_ROOT_NAME: &str = "RootModel";

/// Default nesting limit for [`GenerateOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Imports emitted ahead of every generated module.
const PREAMBLE: [&str; 3] = [
    "from __future__ import annotations",
    "from typing import Any, Optional, List, Dict",
    "from pydantic import BaseModel",
];

/// Body line for classes without fields.
const EMPTY_BODY: &str = "    pass";

/// What to do when two distinct nodes normalize to the same class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Register the later class under the first free `Name2`, `Name3`, ...
    #[default]
    Disambiguate,
    /// Drop the earlier class; the last registered definition wins.
    Overwrite,
}

/// Generation settings. Everything the generator needs is passed in here;
/// nothing is read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Deepest allowed nesting of `properties`/`items` below the root.
    pub max_depth: usize,
    pub collisions: CollisionPolicy,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            collisions: CollisionPolicy::default(),
        }
    }
}

/// Statistics collected during generation for reporting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationStats {
    pub classes_generated: usize,
    pub fields_generated: usize,
    pub unknown_types_defaulted: usize,
    pub collisions: usize,
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct Generation {
    pub code: String,
    pub stats: GenerationStats,
}

/// A field of a generated class. `name` is the property key verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
}

/// A generated class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    /// Structural path of the declaring node, e.g. `$.orders[].customer`.
    pub path: String,
    pub fields: Vec<FieldDef>,
}

/// Ordered, append-only collection of the classes produced by one run.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Classes in registration order.
    pub fn classes(&self) -> &[ClassDef] {
        &self.classes
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Append a class and return the name it was registered under.
    ///
    /// On a name clash the policy decides whether the new class is renamed
    /// or replaces the existing one.
    ///
    /// A replaced class keeps definitions ahead of their uses: classes that
    /// referred to the old definition, directly or through each other, move
    /// behind the new one.
    pub fn register(&mut self, mut class: ClassDef, policy: CollisionPolicy) -> String {
        let mut dependents = Vec::new();
        if let Some(pos) = self.classes.iter().position(|c| c.name == class.name) {
            let existing = &self.classes[pos].path;
            match policy {
                CollisionPolicy::Disambiguate => {
                    let unique = self.unique_name(&class.name);
                    warn!(
                        class = %class.name,
                        path = %class.path,
                        existing = %existing,
                        renamed = %unique,
                        "class name collision"
                    );
                    class.name = unique;
                }
                CollisionPolicy::Overwrite => {
                    warn!(
                        class = %class.name,
                        path = %class.path,
                        existing = %existing,
                        "class name collision, replacing earlier definition"
                    );
                    self.classes.remove(pos);
                    dependents = self.take_dependents(pos, &class.name);
                }
            }
        }

        debug!(
            class = %class.name,
            path = %class.path,
            fields = class.fields.len(),
            "registered class"
        );
        let name = class.name.clone();
        self.classes.push(class);
        self.classes.extend(dependents);
        name
    }

    /// Remove and return the classes from `from` onward that refer to
    /// `name`, or to another class removed this way, in registration order.
    fn take_dependents(&mut self, from: usize, name: &str) -> Vec<ClassDef> {
        let mut replaced = vec![name.to_string()];
        let mut dependents = Vec::new();
        let mut kept = Vec::with_capacity(self.classes.len() - from);
        for class in self.classes.drain(from..) {
            let refers = class
                .fields
                .iter()
                .any(|f| replaced.iter().any(|r| f.ty.mentions_class(r)));
            if refers {
                replaced.push(class.name.clone());
                dependents.push(class);
            } else {
                kept.push(class);
            }
        }
        self.classes.extend(kept);
        dependents
    }

    fn unique_name(&self, base: &str) -> String {
        let mut suffix = 2usize;
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

/// Generate a Pydantic module for `schema` with default options.
pub fn generate(schema: &SchemaNode, root_name: &str) -> Result<String> {
    generate_with(schema, root_name, &GenerateOptions::default()).map(|g| g.code)
}

/// Generate a Pydantic module for `schema`.
///
/// Fails without producing any output if the schema nests deeper than
/// `options.max_depth`.
pub fn generate_with(
    schema: &SchemaNode,
    root_name: &str,
    options: &GenerateOptions,
) -> Result<Generation> {
    let mut registry = ClassRegistry::new();
    let mut walker = Walker::new(&mut registry, options);
    walker.walk(root_name, ROOT_PATH, schema, 0)?;
    let mut stats = walker.stats;

    stats.classes_generated = registry.len();
    let code = emit(&registry, root_name);

    debug!(
        root = %root_name,
        classes = stats.classes_generated,
        fields = stats.fields_generated,
        "generated models"
    );
    Ok(Generation { code, stats })
}

/// Walk `node` with default options, registering classes into `registry`.
///
/// Returns the type reference of the node itself: a class name for objects
/// with properties, a list for arrays with items, and the mapped type
/// otherwise.
pub fn walk(name: &str, node: &SchemaNode, registry: &mut ClassRegistry) -> Result<TypeRef> {
    let options = GenerateOptions::default();
    Walker::new(registry, &options).walk(name, ROOT_PATH, node, 0)
}

// ── Schema walker ──────────────────────────────────────────────────────

struct Walker<'a> {
    registry: &'a mut ClassRegistry,
    options: &'a GenerateOptions,
    stats: GenerationStats,
}

impl<'a> Walker<'a> {
    fn new(registry: &'a mut ClassRegistry, options: &'a GenerateOptions) -> Self {
        Walker {
            registry,
            options,
            stats: GenerationStats::default(),
        }
    }

    fn walk(&mut self, name: &str, path: &str, node: &SchemaNode, depth: usize) -> Result<TypeRef> {
        if depth > self.options.max_depth {
            return Err(Error::DepthExceeded {
                path: path.to_string(),
                limit: self.options.max_depth,
            });
        }

        if node.is_object_with_properties() {
            if let Some(properties) = &node.properties {
                return self.walk_object(name, path, properties, depth);
            }
        }

        if node.is_array_with_items() {
            if let Some(items) = &node.items {
                let item_name = normalize(&format!("{name}Item"));
                let item = self.walk(&item_name, &format!("{path}[]"), items, depth + 1)?;
                return Ok(TypeRef::list(item));
            }
        }

        Ok(self.shallow_type(path, &node.type_spec))
    }

    fn walk_object(
        &mut self,
        name: &str,
        path: &str,
        properties: &IndexMap<String, SchemaNode>,
        depth: usize,
    ) -> Result<TypeRef> {
        let mut fields = Vec::with_capacity(properties.len());

        for (key, child) in properties {
            let child_path = format!("{path}.{key}");
            let ty = if child.is_object_with_properties() || child.is_array_with_items() {
                self.walk(&normalize(key), &child_path, child, depth + 1)?
            } else {
                self.shallow_type(&child_path, &child.type_spec)
            };
            fields.push(FieldDef {
                name: key.clone(),
                ty,
            });
        }
        self.stats.fields_generated += fields.len();

        let class_name = normalize(name);
        if self.registry.contains(&class_name) {
            self.stats.collisions += 1;
        }
        let assigned = self.registry.register(
            ClassDef {
                name: class_name,
                path: path.to_string(),
                fields,
            },
            self.options.collisions,
        );
        Ok(TypeRef::Class(assigned))
    }

    /// Map a declared type directly, counting tokens that fall back to `Any`.
    fn shallow_type(&mut self, path: &str, spec: &TypeSpec) -> TypeRef {
        let unknown = unrecognized_tokens(spec);
        if !unknown.is_empty() {
            debug!(%path, tokens = ?unknown, "unrecognized type tokens, using Any");
            self.stats.unknown_types_defaulted += 1;
        }
        map_type(spec)
    }
}

// ── Code emitter ───────────────────────────────────────────────────────

/// Render a registry as a Python module.
///
/// An empty registry (the root was a scalar or an object without
/// properties) still yields an empty `root_name` class.
pub fn emit(registry: &ClassRegistry, root_name: &str) -> String {
    let mut lines: Vec<String> = PREAMBLE.iter().map(|l| (*l).to_string()).collect();
    lines.push(String::new());

    if registry.is_empty() {
        lines.push(class_header(root_name));
        lines.push(EMPTY_BODY.to_string());
        lines.push(String::new());
    } else {
        for class in registry.classes() {
            lines.push(class_header(&class.name));
            if class.fields.is_empty() {
                lines.push(EMPTY_BODY.to_string());
            }
            for field in &class.fields {
                lines.push(format!("    {}: {}", field.name, render_type(&field.ty)));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn class_header(name: &str) -> String {
    format!("class {name}(BaseModel):")
}

/// Render a type reference in Python annotation syntax.
pub fn render_type(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Primitive(p) => python_primitive(*p).to_string(),
        TypeRef::Class(name) => name.clone(),
        TypeRef::List(item) => format!("list[{}]", render_type(item)),
        TypeRef::Map(value) => format!("dict[str, {}]", render_type(value)),
        TypeRef::Optional(inner) => format!("Optional[{}]", render_type(inner)),
        TypeRef::Union(members) => members
            .iter()
            .map(render_type)
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

fn python_primitive(p: Primitive) -> &'static str {
    match p {
        Primitive::String => "str",
        Primitive::Integer => "int",
        Primitive::Float => "float",
        Primitive::Boolean => "bool",
        Primitive::Dynamic => "Any",
    }
}
