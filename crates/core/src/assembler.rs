//! Configuration assembler
//!
//! Converts flat maps keyed by dotted field ids (`"config.host"`) into the
//! nested configuration object that schema predicates read, and back.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Flat field values keyed by dotted path
pub type FlatValues = BTreeMap<String, Value>;

/// Nested configuration built from flat field values.
///
/// Tracks which paths were written as leaves so that a later write to a
/// prefix or an extension of a leaf is reported as a collision instead of
/// silently replacing part of the tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct AssembledConfig {
    root: Map<String, Value>,
    leaves: BTreeSet<String>,
}

impl AssembledConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Whether a value exists at the dotted path
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Insert a value at a dotted path.
    ///
    /// Writing the same path twice keeps the last value. Writing a path that
    /// extends an existing leaf, or one that an existing leaf extends, fails
    /// with [`Error::PathCollision`].
    pub fn insert(&mut self, path: &str, value: Value) -> Result<()> {
        let segments = split_path(path)?;

        for depth in 1..segments.len() {
            let prefix = segments[..depth].join(".");
            if self.leaves.contains(&prefix) {
                return Err(Error::PathCollision {
                    path: path.to_string(),
                    conflict: prefix,
                });
            }
        }

        let nested_prefix = format!("{path}.");
        if let Some(conflict) = self.leaves.iter().find(|l| l.starts_with(&nested_prefix)) {
            return Err(Error::PathCollision {
                path: path.to_string(),
                conflict: conflict.clone(),
            });
        }

        let Some((last, parents)) = segments.split_last() else {
            return Err(Error::InvalidPath(path.to_string()));
        };

        let mut current = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(Error::PathCollision {
                        path: path.to_string(),
                        conflict: segments[..=depth].join("."),
                    });
                }
            };
        }

        current.insert(last.to_string(), value);
        self.leaves.insert(path.to_string());
        Ok(())
    }

    /// Paths that were written as leaves, in sorted order
    pub fn leaf_paths(&self) -> impl Iterator<Item = &str> {
        self.leaves.iter().map(String::as_str)
    }

    /// Convert back to flat values using the recorded leaf paths.
    ///
    /// Unlike [`flatten`], object-valued leaves stay intact.
    pub fn to_flat(&self) -> FlatValues {
        self.leaves
            .iter()
            .filter_map(|path| self.get(path).map(|v| (path.clone(), v.clone())))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

impl PartialEq for AssembledConfig {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl From<Map<String, Value>> for AssembledConfig {
    fn from(root: Map<String, Value>) -> Self {
        let mut leaves = BTreeSet::new();
        collect_leaves(&root, "", &mut leaves);
        Self { root, leaves }
    }
}

impl From<AssembledConfig> for Map<String, Value> {
    fn from(config: AssembledConfig) -> Self {
        config.root
    }
}

fn collect_leaves(map: &Map<String, Value>, prefix: &str, leaves: &mut BTreeSet<String>) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            Value::Object(inner) if !inner.is_empty() => collect_leaves(inner, &path, leaves),
            _ => {
                leaves.insert(path);
            }
        }
    }
}

/// Build a nested configuration from flat values.
///
/// Missing keys are simply absent from the result; nothing is defaulted here.
pub fn assemble(flat: &FlatValues) -> Result<AssembledConfig> {
    assemble_entries(flat.iter().map(|(k, v)| (k.as_str(), v.clone())))
}

/// Build a nested configuration from an ordered sequence of entries.
///
/// Repeated keys are last-writer-wins; overlapping paths are an error.
pub fn assemble_entries<I, K>(entries: I) -> Result<AssembledConfig>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut config = AssembledConfig::new();
    for (key, value) in entries {
        config.insert(key.as_ref(), value)?;
    }
    Ok(config)
}

/// Flatten a nested configuration object into dotted-path values.
///
/// Non-empty objects are descended into; every other value, including an
/// empty object, becomes a leaf.
pub fn flatten(nested: &Value) -> Result<FlatValues> {
    let Value::Object(root) = nested else {
        return Err(Error::ConfigError(format!(
            "Expected a configuration object, found {}",
            value_kind(nested)
        )));
    };
    let mut flat = FlatValues::new();
    flatten_into(root, "", &mut flat)?;
    Ok(flat)
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, flat: &mut FlatValues) -> Result<()> {
    for (key, value) in map {
        if key.is_empty() || key.contains('.') {
            return Err(Error::InvalidPath(join_path(prefix, key)));
        }
        let path = join_path(prefix, key);
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(inner, &path, flat)?,
            other => {
                flat.insert(path, other.clone());
            }
        }
    }
    Ok(())
}

/// Split a dotted path, rejecting empty segments
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
