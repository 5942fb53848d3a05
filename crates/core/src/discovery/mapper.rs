//! Mapping raw discovery payloads to parameter specs

use crate::schema::{ParameterSpec, TypeTag};
use anyhow::{Context, bail};
use serde_json::{Map, Value};

/// Turns a raw discovery payload into parameter specs
pub trait SchemaMapper: Send + Sync {
    fn map(&self, raw: &Value) -> anyhow::Result<Vec<ParameterSpec>>;
}

impl<F> SchemaMapper for F
where
    F: Fn(&Value) -> anyhow::Result<Vec<ParameterSpec>> + Send + Sync,
{
    fn map(&self, raw: &Value) -> anyhow::Result<Vec<ParameterSpec>> {
        self(raw)
    }
}

/// Maps a JSON-Schema-shaped connector specification.
///
/// Accepts either the schema itself or an object wrapping it under
/// `connectionSpecification`. Nested objects with `properties` are
/// flattened into dotted ids below `prefix`; other objects become `json`
/// fields. Properties carrying an integer `order` come first, by that
/// order; the rest follow in key order, since JSON objects do not keep
/// their declaration order.
#[derive(Debug, Clone)]
pub struct JsonSchemaMapper {
    prefix: String,
}

impl Default for JsonSchemaMapper {
    fn default() -> Self {
        Self::new("config")
    }
}

impl JsonSchemaMapper {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn map_object(
        &self,
        prefix: &str,
        schema: &Map<String, Value>,
        out: &mut Vec<ParameterSpec>,
    ) -> anyhow::Result<()> {
        let Some(properties) = schema.get("properties") else {
            return Ok(());
        };
        let properties = properties
            .as_object()
            .with_context(|| format!("'properties' of '{prefix}' is not an object"))?;
        let required = required_names(schema);

        let mut properties: Vec<(&String, &Value)> = properties.iter().collect();
        properties.sort_by_key(|(_, property)| {
            property.get("order").and_then(Value::as_u64).unwrap_or(u64::MAX)
        });

        for (name, property) in properties {
            let id = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            let property = property
                .as_object()
                .with_context(|| format!("property '{id}' is not an object"))?;

            if json_type(property) == Some("object") && property.contains_key("properties") {
                self.map_object(&id, property, out)?;
                continue;
            }

            out.push(property_spec(id, property, required.contains(&name.as_str())));
        }
        Ok(())
    }
}

impl SchemaMapper for JsonSchemaMapper {
    fn map(&self, raw: &Value) -> anyhow::Result<Vec<ParameterSpec>> {
        let root = raw.get("connectionSpecification").unwrap_or(raw);
        let Some(root) = root.as_object() else {
            bail!("connector specification must be a JSON object");
        };

        let mut specs = Vec::new();
        self.map_object(&self.prefix, root, &mut specs)?;
        Ok(specs)
    }
}

fn required_names(schema: &Map<String, Value>) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn json_type(property: &Map<String, Value>) -> Option<&str> {
    match property.get("type")? {
        Value::String(t) => Some(t.as_str()),
        // ["string", "null"] style nullable types
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn type_tag(property: &Map<String, Value>) -> TypeTag {
    let secret = property
        .get("writeOnly")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    match json_type(property) {
        Some("string") if secret => TypeTag::Password,
        Some("string") if property.contains_key("enum") => TypeTag::Selection,
        Some("string") => TypeTag::String,
        Some("integer") => TypeTag::Int,
        Some("boolean") => TypeTag::Boolean,
        Some("object") => TypeTag::Json,
        Some("array") => {
            let item = property
                .get("items")
                .and_then(Value::as_object)
                .map(type_tag)
                .filter(|tag| !tag.is_array())
                .unwrap_or(TypeTag::String);
            TypeTag::array_of(item)
        }
        Some(other) => TypeTag::Custom(other.to_string()),
        None => TypeTag::String,
    }
}

fn property_spec(id: String, property: &Map<String, Value>, required: bool) -> ParameterSpec {
    let mut spec = ParameterSpec::new(id, type_tag(property)).with_required(required);

    if let Some(default) = property.get("default") {
        spec = spec.with_default(default.clone());
    }
    if let Some(constant) = property.get("const") {
        spec = spec.with_constant(constant.clone());
    }
    if let Some(title) = property.get("title").and_then(Value::as_str) {
        spec = spec.with_display_name(title);
    }
    if let Some(description) = property.get("description").and_then(Value::as_str) {
        spec = spec.with_documentation(description);
    }
    if let Some(options) = property.get("enum").and_then(Value::as_array) {
        spec = spec.with_options(options.iter().cloned());
    }
    spec
}

/// Maps a stream enumeration into one multi-select parameter.
///
/// Expects `{"streams": [...]}` where each entry is a stream name or an
/// object with a `name`.
#[derive(Debug, Clone)]
pub struct StreamListMapper {
    id: String,
}

impl Default for StreamListMapper {
    fn default() -> Self {
        Self::new("streams")
    }
}

impl StreamListMapper {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl SchemaMapper for StreamListMapper {
    fn map(&self, raw: &Value) -> anyhow::Result<Vec<ParameterSpec>> {
        let streams = raw
            .get("streams")
            .and_then(Value::as_array)
            .context("stream list payload has no 'streams' array")?;

        let names = streams
            .iter()
            .enumerate()
            .map(|(index, stream)| {
                stream
                    .as_str()
                    .or_else(|| stream.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .with_context(|| format!("stream #{index} has no name"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(vec![
            ParameterSpec::new(self.id.clone(), TypeTag::array_of(TypeTag::String))
                .with_display_name("Streams")
                .with_required(true)
                .with_options(names),
        ])
    }
}
