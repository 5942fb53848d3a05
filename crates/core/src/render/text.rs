//! Plain-text renderers for the built-in type tags

use super::FieldRenderer;
use crate::schema::ParameterSpec;
use serde_json::Value;

const EMPTY: &str = "<empty>";

/// Render a value the way a user typed it: strings unquoted, the rest as JSON
pub fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

pub struct TextRenderer;

impl FieldRenderer for TextRenderer {
    fn name(&self) -> &str {
        "text"
    }

    fn render(&self, _spec: Option<&ParameterSpec>, value: Option<&Value>) -> String {
        match value {
            Some(value) if !is_blank(Some(value)) => plain(value),
            _ => EMPTY.to_string(),
        }
    }
}

/// Masks any non-empty value
pub struct SecretRenderer;

impl FieldRenderer for SecretRenderer {
    fn name(&self) -> &str {
        "secret"
    }

    fn render(&self, _spec: Option<&ParameterSpec>, value: Option<&Value>) -> String {
        if is_blank(value) {
            EMPTY.to_string()
        } else {
            "********".to_string()
        }
    }
}

pub struct ToggleRenderer;

impl FieldRenderer for ToggleRenderer {
    fn name(&self) -> &str {
        "toggle"
    }

    fn render(&self, _spec: Option<&ParameterSpec>, value: Option<&Value>) -> String {
        match value {
            Some(Value::Bool(true)) => "[x]".to_string(),
            Some(Value::Bool(false)) | None | Some(Value::Null) => "[ ]".to_string(),
            Some(other) => format!("[?] {}", plain(other)),
        }
    }
}

/// Current choice followed by the available options
pub struct ChoiceRenderer;

impl FieldRenderer for ChoiceRenderer {
    fn name(&self) -> &str {
        "choice"
    }

    fn render(&self, spec: Option<&ParameterSpec>, value: Option<&Value>) -> String {
        let current = TextRenderer.render(spec, value);
        match spec.filter(|s| !s.options.is_empty()) {
            Some(spec) => {
                let options: Vec<String> = spec.options.iter().map(plain).collect();
                format!("{current} ({})", options.join(" | "))
            }
            None => current,
        }
    }
}

pub struct ListRenderer;

impl FieldRenderer for ListRenderer {
    fn name(&self) -> &str {
        "list"
    }

    fn render(&self, spec: Option<&ParameterSpec>, value: Option<&Value>) -> String {
        match value {
            Some(Value::Array(items)) if items.is_empty() => EMPTY.to_string(),
            Some(Value::Array(items)) => items.iter().map(plain).collect::<Vec<_>>().join(", "),
            other => TextRenderer.render(spec, other),
        }
    }
}

/// Compact JSON; strings (scripts) are shown as-is
pub struct JsonRenderer;

impl FieldRenderer for JsonRenderer {
    fn name(&self) -> &str {
        "json"
    }

    fn render(&self, _spec: Option<&ParameterSpec>, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => EMPTY.to_string(),
            Some(value) => plain(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeTag;
    use serde_json::json;

    #[test]
    fn test_plain() {
        assert_eq!(plain(&json!("db")), "db");
        assert_eq!(plain(&json!(5432)), "5432");
        assert_eq!(plain(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_builtin_renderers() {
        assert_eq!(TextRenderer.render(None, Some(&json!(""))), "<empty>");
        assert_eq!(SecretRenderer.render(None, Some(&json!("s3cret"))), "********");
        assert_eq!(SecretRenderer.render(None, None), "<empty>");
        assert_eq!(ToggleRenderer.render(None, Some(&json!(false))), "[ ]");
        assert_eq!(ListRenderer.render(None, Some(&json!([]))), "<empty>");
        assert_eq!(JsonRenderer.render(None, Some(&json!({}))), "{}");
        assert_eq!(JsonRenderer.render(None, Some(&json!("return {}"))), "return {}");

        let spec = ParameterSpec::new("mode", TypeTag::Selection).with_options(["a", "b"]);
        assert_eq!(ChoiceRenderer.render(Some(&spec), None), "<empty> (a | b)");
    }
}
