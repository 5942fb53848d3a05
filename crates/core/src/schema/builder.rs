//! Schema builder for fluent API
//!
//! Provides an easy way to declare a schema from Rust code.

use super::{ParameterSpec, Schema, TypeTag};
use crate::error::Result;

/// Builder for creating schemas
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    parameters: Vec<ParameterSpec>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter and configure it in place
    pub fn param<F>(mut self, id: impl Into<String>, type_tag: TypeTag, f: F) -> Self
    where
        F: FnOnce(&mut ParameterSpec),
    {
        let mut spec = ParameterSpec::new(id, type_tag);
        f(&mut spec);
        self.parameters.push(spec);
        self
    }

    /// Add a parameter with no further attributes
    pub fn field(self, id: impl Into<String>, type_tag: TypeTag) -> Self {
        self.param(id, type_tag, |_| {})
    }

    /// Add a plain string parameter
    pub fn string(self, id: impl Into<String>) -> Self {
        self.field(id, TypeTag::String)
    }

    /// Add a prepared parameter spec
    pub fn spec(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// Build the schema, validating ids
    pub fn build(self) -> Result<Schema> {
        Schema::new(self.parameters)
    }
}
