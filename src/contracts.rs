//! Schema and model file storage, and versioned schema contracts.
//!
//! A contract store is a directory of schema files: `current.json` holds the
//! working schema and every frozen version is a sibling `<version>.json`.
//! The directory is always passed in by the caller.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::schema::{SchemaNode, load_schema, parse_schema};

/// File stem of the working schema.
pub const CURRENT_VERSION: &str = "current";

/// A directory of schema contracts.
#[derive(Debug, Clone)]
pub struct ContractStore {
    dir: PathBuf,
}

impl ContractStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ContractStore { dir: dir.into() }
    }

    /// Load and validate a schema file.
    pub fn read_schema(&self, path: &Path) -> Result<SchemaNode> {
        load_schema(path)
    }

    /// Save a schema as pretty JSON, creating parent directories.
    pub fn write_schema(&self, path: &Path, schema: &Value) -> Result<()> {
        write_json(path, schema)?;
        info!(path = %path.display(), "saved schema");
        Ok(())
    }

    /// Save generated model code, creating parent directories.
    pub fn write_code(&self, path: &Path, code: &str) -> Result<()> {
        write_text(path, code)?;
        info!(path = %path.display(), "wrote models");
        Ok(())
    }

    /// `<dir>/current.json`.
    pub fn current_path(&self) -> PathBuf {
        self.dir.join(format!("{CURRENT_VERSION}.json"))
    }

    /// `<dir>/<version>.json`, rejecting names that would escape the store.
    pub fn version_path(&self, version: &str) -> Result<PathBuf> {
        let invalid = version.is_empty()
            || version.starts_with('.')
            || version.contains(['/', '\\'])
            || version.chars().any(char::is_control);
        if invalid {
            return Err(Error::InvalidVersion(version.to_string()));
        }
        Ok(self.dir.join(format!("{version}.json")))
    }

    /// Freeze `src` as a named contract version.
    ///
    /// Without an explicit version the contract is stamped with the current
    /// UTC time (`v20240131120000`). The source must be a valid schema; it
    /// is copied byte for byte.
    pub fn freeze(&self, src: &Path, version: Option<&str>) -> Result<PathBuf> {
        let version = match version {
            Some(v) => v.to_string(),
            None => default_version(),
        };
        let target = self.version_path(&version)?;

        let content = read_text(src)?;
        parse_schema(&content)?;
        write_text(&target, &content)?;

        info!(src = %src.display(), target = %target.display(), "froze contract");
        Ok(target)
    }
}

fn default_version() -> String {
    Utc::now().format("v%Y%m%d%H%M%S").to_string()
}

/// Write a JSON document with two-space indentation, creating parent
/// directories as needed.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    write_text(path, &content)
}

/// Read a whole file as UTF-8.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write content to a file, creating parent directories as needed.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
