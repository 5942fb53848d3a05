//! Text rendering of resolved forms
//!
//! The engine only emits [`ResolvedField`](crate::resolver::ResolvedField)s;
//! turning them into something a user sees is delegated to a
//! [`FieldRenderer`] looked up by type tag in a [`RendererRegistry`].

pub mod registry;
pub mod text;

pub use registry::RendererRegistry;
pub use text::plain;

use crate::schema::ParameterSpec;
use serde_json::Value;

/// Renders the current value of one field
pub trait FieldRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// `spec` is `None` when the field is not declared in the schema
    fn render(&self, spec: Option<&ParameterSpec>, value: Option<&Value>) -> String;
}
