//! JSON representation of static connector schemas
//!
//! Predicates cannot be serialized, so static schemas express `constant`,
//! `required` and `omit` with a small condition language that is compiled
//! into predicates when the document is converted to a [`Schema`].

use super::{ConstantValue, FieldSpecValue, ParameterSpec, Schema, TypeTag};
use crate::assembler::AssembledConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// JSON representation of a schema document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Connector this schema belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,

    #[serde(default)]
    pub parameters: Vec<JsonParameter>,
}

/// JSON representation of one parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonParameter {
    pub id: String,

    #[serde(rename = "type", default)]
    pub type_tag: TypeTag,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<JsonConstant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<JsonFlag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omit: Option<JsonFlag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
}

/// A constant that is either always applied or applied when a condition holds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonConstant {
    Conditional { when: JsonCondition, value: Value },
    Literal(Value),
}

/// A boolean attribute that is either fixed or conditional
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonFlag {
    Fixed(bool),
    When(JsonCondition),
}

/// Condition over the assembled configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonCondition {
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    IsSet(String),
    All(Vec<JsonCondition>),
    Any(Vec<JsonCondition>),
    Not(Box<JsonCondition>),
}

impl JsonCondition {
    /// Evaluate against a configuration. A missing field is never equal to anything.
    pub fn evaluate(&self, config: &AssembledConfig) -> bool {
        match self {
            JsonCondition::Equals { field, value } => config.get(field) == Some(value),
            JsonCondition::NotEquals { field, value } => config.get(field) != Some(value),
            JsonCondition::In { field, values } => config
                .get(field)
                .is_some_and(|current| values.contains(current)),
            JsonCondition::IsSet(field) => {
                matches!(config.get(field), Some(v) if !v.is_null() && v != "")
            }
            JsonCondition::All(conditions) => conditions.iter().all(|c| c.evaluate(config)),
            JsonCondition::Any(conditions) => conditions.iter().any(|c| c.evaluate(config)),
            JsonCondition::Not(inner) => !inner.evaluate(config),
        }
    }

    /// Field ids this condition reads
    pub fn fields(&self) -> Vec<&str> {
        match self {
            JsonCondition::Equals { field, .. }
            | JsonCondition::NotEquals { field, .. }
            | JsonCondition::In { field, .. }
            | JsonCondition::IsSet(field) => vec![field.as_str()],
            JsonCondition::All(conditions) | JsonCondition::Any(conditions) => {
                conditions.iter().flat_map(|c| c.fields()).collect()
            }
            JsonCondition::Not(inner) => inner.fields(),
        }
    }
}

impl JsonFlag {
    fn to_field_value(&self) -> FieldSpecValue<bool> {
        match self {
            JsonFlag::Fixed(flag) => FieldSpecValue::Literal(*flag),
            JsonFlag::When(condition) => {
                let condition = Arc::new(condition.clone());
                FieldSpecValue::computed(move |cfg: &AssembledConfig| Ok(condition.evaluate(cfg)))
            }
        }
    }
}

impl JsonConstant {
    fn to_field_value(&self) -> FieldSpecValue<ConstantValue> {
        match self {
            JsonConstant::Literal(value) => FieldSpecValue::Literal(Some(value.clone())),
            JsonConstant::Conditional { when, value } => {
                let when = Arc::new(when.clone());
                let value = value.clone();
                FieldSpecValue::computed(move |cfg: &AssembledConfig| {
                    Ok(when.evaluate(cfg).then(|| value.clone()))
                })
            }
        }
    }
}

impl JsonParameter {
    /// Convert to a parameter spec
    pub fn to_spec(&self) -> ParameterSpec {
        ParameterSpec {
            id: self.id.clone(),
            type_tag: self.type_tag.clone(),
            default_value: self.default.clone(),
            constant: self.constant.as_ref().map(JsonConstant::to_field_value),
            required: self.required.as_ref().map(JsonFlag::to_field_value),
            omit: self.omit.as_ref().map(JsonFlag::to_field_value),
            display_name: self.display_name.clone(),
            documentation: self.documentation.clone(),
            options: self.options.clone(),
        }
    }
}

impl JsonSchema {
    pub fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| Error::SchemaError(format!("Failed to parse schema: {e}")))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Convert to a schema, validating ids
    pub fn to_schema(&self) -> Result<Schema> {
        tracing::debug!(
            "Converting JSON schema for {:?} with {} parameters",
            self.connector,
            self.parameters.len()
        );
        Schema::new(self.parameters.iter().map(JsonParameter::to_spec).collect())
    }
}
