//! Literal-or-predicate schema attributes
//!
//! `constant`, `required` and `omit` may be fixed values or functions of the
//! assembled configuration. Both shapes are resolved through
//! [`FieldSpecValue::evaluate`].

use crate::assembler::AssembledConfig;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A pure function of the assembled configuration
pub type Predicate<T> = Arc<dyn Fn(&AssembledConfig) -> anyhow::Result<T> + Send + Sync>;

/// Result of evaluating a `constant`: `None` means "no override"
pub type ConstantValue = Option<Value>;

/// A schema attribute that is either a literal or computed from the configuration
pub enum FieldSpecValue<T> {
    Literal(T),
    Computed(Predicate<T>),
}

impl<T: Clone> FieldSpecValue<T> {
    /// Wrap a closure as a computed attribute
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&AssembledConfig) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        FieldSpecValue::Computed(Arc::new(f))
    }

    /// Resolve against the configuration assembled so far
    pub fn evaluate(&self, config: &AssembledConfig) -> anyhow::Result<T> {
        match self {
            FieldSpecValue::Literal(value) => Ok(value.clone()),
            FieldSpecValue::Computed(predicate) => predicate(config),
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, FieldSpecValue::Computed(_))
    }
}

impl<T: Clone> Clone for FieldSpecValue<T> {
    fn clone(&self) -> Self {
        match self {
            FieldSpecValue::Literal(value) => FieldSpecValue::Literal(value.clone()),
            FieldSpecValue::Computed(predicate) => FieldSpecValue::Computed(Arc::clone(predicate)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FieldSpecValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpecValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            FieldSpecValue::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

impl<T> From<T> for FieldSpecValue<T> {
    fn from(value: T) -> Self {
        FieldSpecValue::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble_entries;
    use serde_json::json;

    #[test]
    fn test_literal_ignores_config() {
        let value: FieldSpecValue<bool> = true.into();
        assert!(value.evaluate(&AssembledConfig::new()).unwrap());
        assert!(!value.is_computed());
    }

    #[test]
    fn test_computed_reads_config() {
        let omit = FieldSpecValue::computed(|cfg: &AssembledConfig| {
            Ok(cfg.get("mode") != Some(&json!("advanced")))
        });
        let basic = assemble_entries([("mode", json!("basic"))]).unwrap();
        let advanced = assemble_entries([("mode", json!("advanced"))]).unwrap();

        assert!(omit.evaluate(&basic).unwrap());
        assert!(!omit.evaluate(&advanced).unwrap());
        assert_eq!(format!("{omit:?}"), "Computed(<fn>)");
    }

    #[test]
    fn test_computed_error_propagates() {
        let constant: FieldSpecValue<ConstantValue> =
            FieldSpecValue::computed(|_| anyhow::bail!("boom"));
        let err = constant.evaluate(&AssembledConfig::new()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
