//! Field resolver
//!
//! Computes, for every declared parameter, its effective value and whether
//! it is hidden, omitted or required, given a snapshot of flat values.
//!
//! Resolution is a single linear pass in declaration order: `omit` and
//! `constant` of a field see only the configuration assembled from the
//! fields declared before it. There is no fixed-point iteration, so a schema
//! whose predicates depend on later fields resolves according to its
//! declaration order. When a value change can alter which fields are
//! visible, callers re-run [`FieldResolver::resolve`] on the new snapshot
//! rather than patching the previous result.

pub mod resolved;

pub use resolved::{Attribute, Diagnostic, Resolution, ResolvedField};

use crate::assembler::{AssembledConfig, FlatValues};
use crate::error::Result;
use crate::schema::{ParameterSpec, Schema};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Resolves a schema against flat field values
pub struct FieldResolver<'a> {
    schema: &'a Schema,
}

/// Per-field outcome of the seed pass
struct Seed {
    field: ResolvedField,
    /// A predicate failed; the field is left visible and optional
    aborted: bool,
}

impl<'a> FieldResolver<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Resolve every parameter against `values`.
    ///
    /// Predicate failures are recorded as diagnostics and never abort the
    /// whole resolution. A path collision between two contributing fields
    /// is returned as an error.
    pub fn resolve(&self, values: &FlatValues) -> Result<Resolution> {
        debug!(
            "Resolving {} parameters against {} values",
            self.schema.len(),
            values.len()
        );

        let mut configuration = AssembledConfig::new();
        let mut diagnostics = Vec::new();
        let mut seeds = Vec::with_capacity(self.schema.len());

        for spec in self.schema {
            let seed = self.seed(spec, values, &configuration, &mut diagnostics);
            if let Some(value) = seed.field.effective_value.as_ref() {
                configuration.insert(&spec.id, value.clone())?;
            }
            seeds.push(seed);
        }

        let fields = self
            .schema
            .iter()
            .zip(seeds)
            .map(|(spec, seed)| {
                let mut field = seed.field;
                if !seed.aborted && field.is_editable() {
                    field.is_required = self.required(spec, &configuration, &mut diagnostics);
                }
                field
            })
            .collect();

        if !diagnostics.is_empty() {
            debug!("Resolution finished with {} diagnostics", diagnostics.len());
        }

        Ok(Resolution {
            fields,
            configuration,
            diagnostics,
        })
    }

    /// Evaluate `omit` and `constant` against the configuration built so far
    fn seed(
        &self,
        spec: &ParameterSpec,
        values: &FlatValues,
        configuration: &AssembledConfig,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Seed {
        let omitted = match spec.omit.as_ref().map(|omit| omit.evaluate(configuration)) {
            None => false,
            Some(Ok(omitted)) => omitted,
            Some(Err(e)) => return self.abort(spec, values, Attribute::Omit, &e, diagnostics),
        };
        if omitted {
            trace!("Field '{}' omitted", spec.id);
            return Seed {
                field: ResolvedField::omitted(&spec.id),
                aborted: false,
            };
        }

        let constant = match spec.constant.as_ref().map(|c| c.evaluate(configuration)) {
            None => None,
            Some(Ok(constant)) => constant,
            Some(Err(e)) => return self.abort(spec, values, Attribute::Constant, &e, diagnostics),
        };

        let field = match constant {
            Some(value) => {
                trace!("Field '{}' hidden with constant {}", spec.id, value);
                ResolvedField::hidden(&spec.id, value)
            }
            None => ResolvedField::visible(&spec.id, editable_value(spec, values)),
        };
        Seed {
            field,
            aborted: false,
        }
    }

    fn abort(
        &self,
        spec: &ParameterSpec,
        values: &FlatValues,
        attribute: Attribute,
        error: &anyhow::Error,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Seed {
        warn!("{} predicate of '{}' failed: {:#}", attribute, spec.id, error);
        diagnostics.push(Diagnostic::new(&spec.id, attribute, error));
        Seed {
            field: ResolvedField::visible(&spec.id, editable_value(spec, values)),
            aborted: true,
        }
    }

    fn required(
        &self,
        spec: &ParameterSpec,
        configuration: &AssembledConfig,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        match spec.required.as_ref().map(|r| r.evaluate(configuration)) {
            None => false,
            Some(Ok(required)) => required,
            Some(Err(e)) => {
                warn!("required predicate of '{}' failed: {:#}", spec.id, e);
                diagnostics.push(Diagnostic::new(&spec.id, Attribute::Required, &e));
                false
            }
        }
    }
}

/// Explicit value, else default, else the type-driven fallback. An explicit
/// `null` counts as no value.
fn editable_value(spec: &ParameterSpec, values: &FlatValues) -> Option<Value> {
    values
        .get(&spec.id)
        .filter(|v| !v.is_null())
        .cloned()
        .or_else(|| spec.default_value.clone())
        .or_else(|| spec.type_tag.fallback_value())
}

/// Resolve `schema` against `values`
pub fn resolve(schema: &Schema, values: &FlatValues) -> Result<Resolution> {
    FieldResolver::new(schema).resolve(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::{SchemaBuilder, TypeTag};
    use serde_json::json;

    fn values(entries: &[(&str, Value)]) -> FlatValues {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn scenario_schema() -> Schema {
        SchemaBuilder::new()
            .spec(ParameterSpec::new("a", TypeTag::String).with_constant_fn(|_| Ok(None)))
            .spec(
                ParameterSpec::new("b", TypeTag::String)
                    .with_omit_fn(|cfg| Ok(cfg.get("a") != Some(&json!("x")))),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_omit_depends_on_earlier_field() {
        let schema = scenario_schema();

        let shown = resolve(&schema, &values(&[("a", json!("x")), ("b", json!("y"))])).unwrap();
        let b = shown.get("b").unwrap();
        assert!(!b.is_omitted);
        assert!(!b.is_hidden);
        assert_eq!(b.effective_value, Some(json!("y")));
        assert_eq!(shown.configuration.get("b"), Some(&json!("y")));

        let dropped = resolve(&schema, &values(&[("a", json!("z")), ("b", json!("y"))])).unwrap();
        let b = dropped.get("b").unwrap();
        assert!(b.is_omitted);
        assert_eq!(b.effective_value, None);
        assert!(dropped.configuration.get("b").is_none());
        assert_eq!(dropped.visible().count(), 1);
    }

    #[test]
    fn test_effective_value_precedence() {
        let schema = SchemaBuilder::new()
            .spec(ParameterSpec::new("explicit", TypeTag::String).with_default("d"))
            .spec(ParameterSpec::new("defaulted", TypeTag::String).with_default("d"))
            .string("text")
            .field("payload", TypeTag::Json)
            .field("list", TypeTag::array_of(TypeTag::Int))
            .field("script", TypeTag::Javascript)
            .field("count", TypeTag::Int)
            .build()
            .unwrap();

        let resolution = resolve(&schema, &values(&[("explicit", json!("v"))])).unwrap();
        let value = |id: &str| resolution.get(id).unwrap().effective_value.clone();

        assert_eq!(value("explicit"), Some(json!("v")));
        assert_eq!(value("defaulted"), Some(json!("d")));
        assert_eq!(value("text"), Some(json!("")));
        assert_eq!(value("payload"), Some(json!({})));
        assert_eq!(value("list"), Some(json!([])));
        assert_eq!(value("script"), Some(json!("return {}")));
        assert_eq!(value("count"), None);
        assert!(!resolution.configuration.contains("count"));
    }

    #[test]
    fn test_explicit_null_falls_back_to_default() {
        let schema = SchemaBuilder::new()
            .spec(ParameterSpec::new("port", TypeTag::Int).with_default(5432))
            .build()
            .unwrap();
        let resolution = resolve(&schema, &values(&[("port", Value::Null)])).unwrap();
        assert_eq!(resolution.get("port").unwrap().effective_value, Some(json!(5432)));
    }

    #[test]
    fn test_constant_hides_and_forces_value() {
        let schema = SchemaBuilder::new()
            .spec(
                ParameterSpec::new("config.version", TypeTag::String)
                    .with_constant("v2")
                    .with_required(true),
            )
            .build()
            .unwrap();

        let resolution =
            resolve(&schema, &values(&[("config.version", json!("user value"))])).unwrap();
        let field = resolution.get("config.version").unwrap();

        assert!(field.is_hidden);
        assert!(!field.is_required);
        assert_eq!(field.effective_value, Some(json!("v2")));
        assert_eq!(resolution.configuration.get("config.version"), Some(&json!("v2")));
    }

    #[test]
    fn test_constant_visible_to_later_fields() {
        let schema = SchemaBuilder::new()
            .spec(ParameterSpec::new("auth.type", TypeTag::String).with_constant("token"))
            .spec(
                ParameterSpec::new("auth.password", TypeTag::Password)
                    .with_omit_fn(|cfg| Ok(cfg.get("auth.type") == Some(&json!("token")))),
            )
            .build()
            .unwrap();

        let resolution = resolve(&schema, &FlatValues::new()).unwrap();
        assert!(resolution.get("auth.password").unwrap().is_omitted);
        assert_eq!(
            resolution.configuration.to_value(),
            json!({"auth": {"type": "token"}})
        );
    }

    #[test]
    fn test_required_sees_final_configuration() {
        // `key` is declared before `mode` but its requirement reads `mode`
        let schema = SchemaBuilder::new()
            .spec(
                ParameterSpec::new("key", TypeTag::String)
                    .with_required_fn(|cfg| Ok(cfg.get("mode") == Some(&json!("secure")))),
            )
            .spec(ParameterSpec::new("mode", TypeTag::String).with_default("secure"))
            .build()
            .unwrap();

        let resolution = resolve(&schema, &FlatValues::new()).unwrap();
        assert!(resolution.get("key").unwrap().is_required);
        assert_eq!(resolution.missing_required(), vec!["key"]);
    }

    #[test]
    fn test_omit_reading_later_field_follows_declaration_order() {
        // `early` cannot observe `late` because `late` is declared after it
        let schema = SchemaBuilder::new()
            .spec(
                ParameterSpec::new("early", TypeTag::String)
                    .with_omit_fn(|cfg| Ok(cfg.contains("late"))),
            )
            .spec(ParameterSpec::new("late", TypeTag::String).with_default("set"))
            .build()
            .unwrap();

        let resolution = resolve(&schema, &FlatValues::new()).unwrap();
        assert!(!resolution.get("early").unwrap().is_omitted);
        assert!(resolution.configuration.contains("late"));
    }

    #[test]
    fn test_failing_predicate_is_contained() {
        let schema = SchemaBuilder::new()
            .spec(
                ParameterSpec::new("broken", TypeTag::String)
                    .with_omit_fn(|_| anyhow::bail!("cannot read config"))
                    .with_required(true)
                    .with_default("fallback"),
            )
            .spec(
                ParameterSpec::new("other", TypeTag::String)
                    .with_constant_fn(|cfg| Ok(cfg.get("broken").cloned())),
            )
            .build()
            .unwrap();

        let resolution = resolve(&schema, &FlatValues::new()).unwrap();
        let broken = resolution.get("broken").unwrap();

        assert!(!broken.is_omitted);
        assert!(!broken.is_hidden);
        assert!(!broken.is_required);
        assert_eq!(broken.effective_value, Some(json!("fallback")));

        let other = resolution.get("other").unwrap();
        assert!(other.is_hidden);
        assert_eq!(other.effective_value, Some(json!("fallback")));

        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(resolution.diagnostics[0].attribute, Attribute::Omit);
        assert_eq!(resolution.diagnostics[0].message, "cannot read config");
    }

    #[test]
    fn test_failing_required_only_clears_required() {
        let schema = SchemaBuilder::new()
            .spec(
                ParameterSpec::new("a", TypeTag::String)
                    .with_required_fn(|_| anyhow::bail!("nope")),
            )
            .build()
            .unwrap();

        let resolution = resolve(&schema, &values(&[("a", json!("v"))])).unwrap();
        let a = resolution.get("a").unwrap();
        assert!(!a.is_required);
        assert_eq!(a.effective_value, Some(json!("v")));
        assert_eq!(resolution.diagnostics_for("a").count(), 1);
        assert_eq!(resolution.diagnostics[0].attribute, Attribute::Required);
    }

    #[test]
    fn test_collision_between_fields_propagates() {
        let schema = SchemaBuilder::new()
            .string("a")
            .string("a.b")
            .build()
            .unwrap();

        let err = resolve(&schema, &FlatValues::new()).unwrap_err();
        assert!(matches!(err, Error::PathCollision { .. }));
    }

    #[test]
    fn test_omitted_field_avoids_collision() {
        let schema = SchemaBuilder::new()
            .string("a")
            .spec(ParameterSpec::new("a.b", TypeTag::String).with_omit_fn(|_| Ok(true)))
            .build()
            .unwrap();

        assert!(resolve(&schema, &FlatValues::new()).is_ok());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let schema = scenario_schema();
        let input = values(&[("a", json!("x")), ("b", json!("y")), ("unknown", json!(1))]);

        let first = resolve(&schema, &input).unwrap();
        let second = resolve(&schema, &input).unwrap();
        assert_eq!(first, second);
        assert!(!first.configuration.contains("unknown"));
    }
}
