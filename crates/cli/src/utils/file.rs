use anyhow::{Context, Result};
use connector_forms_core::{EngineSettings, FlatValues, Schema, schema::JsonSchema};
use serde::de::DeserializeOwned;
use std::path::Path;

use super::parser::parse_assignment;
use crate::cli::FormArgs;

/// Read and deserialize a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

pub fn load_schema(path: &Path) -> Result<Schema> {
    let document = JsonSchema::load_from_file(path)
        .with_context(|| format!("Failed to load schema {}", path.display()))?;
    Ok(document.to_schema()?)
}

/// Values from `--values`, then every `--set` in order
pub fn load_values(form: &FormArgs) -> Result<FlatValues> {
    let mut values: FlatValues = match &form.values {
        Some(path) => read_json(path)?,
        None => FlatValues::new(),
    };

    for assignment in &form.set {
        let (id, value) = parse_assignment(assignment)?;
        values.insert(id, value);
    }
    Ok(values)
}

/// Settings from an explicit file or the nearest one above the current
/// directory, with environment overrides applied
pub fn load_settings(explicit: Option<&Path>) -> Result<EngineSettings> {
    let settings = match explicit {
        Some(path) => EngineSettings::load_from_file(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            EngineSettings::discover(&cwd)?
        }
    };
    Ok(settings.with_env_overrides()?)
}
