//! Renderer registry
//!
//! Maps type tags to renderers so the engine never switches over tags itself.

use super::FieldRenderer;
use super::text::{
    ChoiceRenderer, JsonRenderer, ListRenderer, SecretRenderer, TextRenderer, ToggleRenderer,
};
use crate::resolver::{Resolution, ResolvedField};
use crate::schema::{Schema, TypeTag};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

/// Key used for array tags without a more specific renderer
pub const ARRAY_KEY: &str = "array";

/// Registry of renderers keyed by type tag
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn FieldRenderer>>,
    fallback: Arc<dyn FieldRenderer>,
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("renderers", &self.tags())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl RendererRegistry {
    /// Create a registry with renderers for the built-in tags
    pub fn new() -> Self {
        let mut registry = Self::empty();

        let text: Arc<dyn FieldRenderer> = Arc::new(TextRenderer);
        let secret: Arc<dyn FieldRenderer> = Arc::new(SecretRenderer);
        let json: Arc<dyn FieldRenderer> = Arc::new(JsonRenderer);

        registry.register(TypeTag::String.as_tag(), Arc::clone(&text));
        registry.register(TypeTag::Text.as_tag(), Arc::clone(&text));
        registry.register(TypeTag::Int.as_tag(), text);
        registry.register(TypeTag::Password.as_tag(), secret);
        registry.register(TypeTag::Boolean.as_tag(), Arc::new(ToggleRenderer));
        registry.register(TypeTag::Selection.as_tag(), Arc::new(ChoiceRenderer));
        registry.register(TypeTag::Json.as_tag(), Arc::clone(&json));
        registry.register(TypeTag::Javascript.as_tag(), json);
        registry.register(ARRAY_KEY, Arc::new(ListRenderer));

        registry
    }

    /// Create a registry that renders everything as plain text
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
            fallback: Arc::new(TextRenderer),
        }
    }

    /// Register a renderer for a type tag, replacing any previous one
    pub fn register(&mut self, tag: impl Into<String>, renderer: Arc<dyn FieldRenderer>) {
        self.renderers.insert(tag.into(), renderer);
    }

    pub fn set_fallback(&mut self, renderer: Arc<dyn FieldRenderer>) {
        self.fallback = renderer;
    }

    /// Renderer for a tag: exact match, then the generic array renderer,
    /// then the fallback. Unregistered secret tags are always masked.
    pub fn get(&self, tag: &TypeTag) -> Arc<dyn FieldRenderer> {
        self.renderers
            .get(&tag.as_tag())
            .or_else(|| tag.is_array().then(|| self.renderers.get(ARRAY_KEY)).flatten())
            .cloned()
            .unwrap_or_else(|| {
                if tag.is_secret() {
                    Arc::new(SecretRenderer)
                } else {
                    Arc::clone(&self.fallback)
                }
            })
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.renderers.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Render one resolved field as `label: value`
    pub fn render_field(&self, schema: &Schema, field: &ResolvedField) -> String {
        let Some(spec) = schema.get(&field.id) else {
            let value = self.fallback.render(None, field.effective_value.as_ref());
            return format!("{}: {}", field.id, value);
        };

        let value = self
            .get(&spec.type_tag)
            .render(Some(spec), field.effective_value.as_ref());
        let mut line = spec.label().to_string();
        if field.is_required {
            line.push_str(" (required)");
        }
        let _ = write!(line, ": {value}");
        if field.is_hidden {
            line.push_str(" (fixed)");
        }
        line
    }

    /// Render every non-omitted field, one per line, followed by diagnostics
    pub fn render_form(&self, schema: &Schema, resolution: &Resolution) -> String {
        let mut lines: Vec<String> = resolution
            .visible()
            .map(|field| self.render_field(schema, field))
            .collect();

        for diagnostic in &resolution.diagnostics {
            lines.push(format!(
                "! {}: {} predicate failed: {}",
                diagnostic.field, diagnostic.attribute, diagnostic.message
            ));
        }
        lines.join("\n")
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}
