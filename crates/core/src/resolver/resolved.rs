//! Resolver output types

use crate::assembler::AssembledConfig;
use crate::error::Error;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Resolved state of one declared parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedField {
    pub id: String,
    /// Value the field contributes to the configuration; `None` when the
    /// field is omitted or has nothing to contribute
    pub effective_value: Option<Value>,
    pub is_hidden: bool,
    pub is_required: bool,
    pub is_omitted: bool,
}

impl ResolvedField {
    pub(crate) fn visible(id: &str, effective_value: Option<Value>) -> Self {
        Self {
            id: id.to_string(),
            effective_value,
            is_hidden: false,
            is_required: false,
            is_omitted: false,
        }
    }

    pub(crate) fn hidden(id: &str, constant: Value) -> Self {
        Self {
            is_hidden: true,
            ..Self::visible(id, Some(constant))
        }
    }

    pub(crate) fn omitted(id: &str) -> Self {
        Self {
            is_omitted: true,
            ..Self::visible(id, None)
        }
    }

    /// Whether the user should see and edit this field
    pub fn is_editable(&self) -> bool {
        !self.is_hidden && !self.is_omitted
    }

    /// Whether the field has a usable value for submission
    pub fn has_value(&self) -> bool {
        match &self.effective_value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

/// Schema attribute whose predicate failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Omit,
    Constant,
    Required,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Omit => write!(f, "omit"),
            Attribute::Constant => write!(f, "constant"),
            Attribute::Required => write!(f, "required"),
        }
    }
}

/// Non-fatal predicate failure recorded during resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub field: String,
    pub attribute: Attribute,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(field: &str, attribute: Attribute, error: &anyhow::Error) -> Self {
        Self {
            field: field.to_string(),
            attribute,
            message: format!("{error:#}"),
        }
    }

    pub fn to_error(&self) -> Error {
        Error::SchemaEvaluation {
            field: self.field.clone(),
            message: format!("{} predicate failed: {}", self.attribute, self.message),
        }
    }
}

/// Result of resolving a whole schema against one value snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// One entry per declared parameter, in declaration order
    pub fields: Vec<ResolvedField>,
    /// Configuration assembled from every non-omitted field
    pub configuration: AssembledConfig,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn get(&self, id: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Fields that take part in the form (not omitted)
    pub fn visible(&self) -> impl Iterator<Item = &ResolvedField> {
        self.fields.iter().filter(|f| !f.is_omitted)
    }

    /// Fields the user can edit (neither omitted nor hidden)
    pub fn editable(&self) -> impl Iterator<Item = &ResolvedField> {
        self.fields.iter().filter(|f| f.is_editable())
    }

    /// Required fields that are still empty
    pub fn missing_required(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_required && f.is_editable() && !f.has_value())
            .map(|f| f.id.as_str())
            .collect()
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics_for(&self, id: &str) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.field == id)
    }
}
