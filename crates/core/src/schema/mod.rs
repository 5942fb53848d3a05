//! Parameter schema model
//!
//! A [`Schema`] is the ordered list of [`ParameterSpec`]s describing one
//! connector's configuration. Declaration order matters: the resolver walks
//! it once, front to back.

pub mod builder;
pub mod field_value;
pub mod json;
pub mod type_tag;

pub use builder::SchemaBuilder;
pub use field_value::{ConstantValue, FieldSpecValue, Predicate};
pub use json::{JsonCondition, JsonSchema};
pub use type_tag::TypeTag;

use crate::assembler::{AssembledConfig, split_path};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashSet;

/// One declared configuration field
#[derive(Debug, Clone, Default)]
pub struct ParameterSpec {
    /// Dotted path of the field inside the assembled configuration
    pub id: String,
    pub type_tag: TypeTag,
    pub default_value: Option<Value>,
    /// Forces the field hidden with this value when it resolves to `Some`
    pub constant: Option<FieldSpecValue<ConstantValue>>,
    pub required: Option<FieldSpecValue<bool>>,
    /// Drops the field from the form and from the configuration when true
    pub omit: Option<FieldSpecValue<bool>>,
    pub display_name: Option<String>,
    pub documentation: Option<String>,
    /// Choices for selection-like fields
    pub options: Vec<Value>,
}

impl ParameterSpec {
    pub fn new(id: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            id: id.into(),
            type_tag,
            ..Self::default()
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Fixed constant: the field is always hidden and forced to `value`
    pub fn with_constant(mut self, value: impl Into<Value>) -> Self {
        self.constant = Some(FieldSpecValue::Literal(Some(value.into())));
        self
    }

    /// Computed constant; returning `Ok(None)` leaves the field editable
    pub fn with_constant_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&AssembledConfig) -> anyhow::Result<ConstantValue> + Send + Sync + 'static,
    {
        self.constant = Some(FieldSpecValue::computed(f));
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(FieldSpecValue::Literal(required));
        self
    }

    pub fn with_required_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&AssembledConfig) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.required = Some(FieldSpecValue::computed(f));
        self
    }

    pub fn with_omit_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&AssembledConfig) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.omit = Some(FieldSpecValue::computed(f));
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_documentation(mut self, doc: impl Into<String>) -> Self {
        self.documentation = Some(doc.into());
        self
    }

    pub fn with_options<I, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Label shown to users, falling back to the last path segment
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.id.rsplit('.').next().unwrap_or(&self.id))
    }
}

/// Ordered, id-unique list of parameter specs
#[derive(Debug, Clone, Default)]
pub struct Schema {
    parameters: Vec<ParameterSpec>,
}

impl Schema {
    /// Create a schema, rejecting duplicate or malformed ids
    pub fn new(parameters: Vec<ParameterSpec>) -> Result<Self> {
        let schema = Self { parameters };
        schema.validate()?;
        Ok(schema)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for param in &self.parameters {
            split_path(&param.id)?;
            if !seen.insert(param.id.as_str()) {
                return Err(Error::DuplicateParameter(param.id.clone()));
            }
        }
        Ok(())
    }

    /// Append a fragment, keeping ids unique across the combined schema
    pub fn extend(&mut self, fragment: Vec<ParameterSpec>) -> Result<()> {
        let mut combined = self.parameters.clone();
        combined.extend(fragment);
        *self = Schema::new(combined)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.id == id)
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a ParameterSpec;
    type IntoIter = std::slice::Iter<'a, ParameterSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = Schema::new(vec![
            ParameterSpec::new("config.host", TypeTag::String),
            ParameterSpec::new("config.host", TypeTag::Int),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateParameter(ref id) if id == "config.host"));
    }

    #[test]
    fn test_malformed_id_rejected() {
        let err = Schema::new(vec![ParameterSpec::new("config..host", TypeTag::String)])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn test_extend_keeps_ids_unique() {
        let mut schema = Schema::new(vec![ParameterSpec::new("a", TypeTag::String)]).unwrap();
        schema
            .extend(vec![ParameterSpec::new("b", TypeTag::String)])
            .unwrap();
        assert_eq!(schema.len(), 2);

        let err = schema
            .extend(vec![ParameterSpec::new("a", TypeTag::Int)])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateParameter(_)));
        assert_eq!(schema.len(), 2, "failed extend leaves schema untouched");
    }

    #[test]
    fn test_label_falls_back_to_last_segment() {
        let spec = ParameterSpec::new("config.db.host", TypeTag::String);
        assert_eq!(spec.label(), "host");
        let named = spec.with_display_name("Host name");
        assert_eq!(named.label(), "Host name");
    }

    #[test]
    fn test_builder_methods() {
        let spec = ParameterSpec::new("mode", TypeTag::Selection)
            .with_default("basic")
            .with_options(["basic", "advanced"])
            .with_required(true);

        assert_eq!(spec.default_value, Some(json!("basic")));
        assert_eq!(spec.options, vec![json!("basic"), json!("advanced")]);
        assert!(spec.required.is_some());
    }
}
