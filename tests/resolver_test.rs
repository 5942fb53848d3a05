//! Integration tests for schema resolution and configuration assembly

use connector_forms_core::{
    Error, FlatValues, ParameterSpec, Schema, SchemaBuilder, TypeTag, assemble, flatten, resolve,
};
use serde_json::{Value, json};

fn values(entries: &[(&str, Value)]) -> FlatValues {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// `a` with a constant that never applies, and `b` omitted unless `a` is "x"
fn gated_schema() -> Schema {
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
fn test_omit_follows_earlier_field() {
    let schema = gated_schema();

    let shown = resolve(&schema, &values(&[("a", json!("x")), ("b", json!("y"))])).unwrap();
    let b = shown.get("b").unwrap();
    assert!(!b.is_omitted);
    assert!(!b.is_hidden);
    assert_eq!(b.effective_value, Some(json!("y")));
    assert_eq!(shown.configuration.get("b"), Some(&json!("y")));

    let hidden = resolve(&schema, &values(&[("a", json!("z")), ("b", json!("y"))])).unwrap();
    assert!(hidden.get("b").unwrap().is_omitted);
    assert!(!hidden.configuration.contains("b"));
    assert_eq!(hidden.configuration.to_value(), json!({"a": "z"}));
}

#[test]
fn test_tunnel_form() {
    let schema = SchemaBuilder::new()
        .spec(
            ParameterSpec::new("config.tunnel.mode", TypeTag::Selection)
                .with_default("none")
                .with_options(["none", "ssh_key", "password"]),
        )
        .spec(
            ParameterSpec::new("config.tunnel.host", TypeTag::String)
                .with_omit_fn(|cfg| Ok(cfg.get("config.tunnel.mode") == Some(&json!("none"))))
                .with_required(true),
        )
        .spec(
            ParameterSpec::new("config.tunnel.key", TypeTag::Password)
                .with_omit_fn(|cfg| Ok(cfg.get("config.tunnel.mode") != Some(&json!("ssh_key"))))
                .with_required(true),
        )
        .spec(ParameterSpec::new("config.version", TypeTag::String).with_constant("v2"))
        .build()
        .unwrap();

    let direct = resolve(&schema, &FlatValues::new()).unwrap();
    assert_eq!(
        direct.configuration.to_value(),
        json!({"config": {"tunnel": {"mode": "none"}, "version": "v2"}})
    );
    assert!(direct.missing_required().is_empty());

    let keyed = resolve(
        &schema,
        &values(&[
            ("config.tunnel.mode", json!("ssh_key")),
            ("config.tunnel.host", json!("bastion")),
            ("config.version", json!("v1")),
        ]),
    )
    .unwrap();
    assert_eq!(keyed.missing_required(), vec!["config.tunnel.key"]);
    assert_eq!(
        keyed.configuration.get("config.version"),
        Some(&json!("v2"))
    );
    assert!(keyed.get("config.version").unwrap().is_hidden);
    assert_eq!(keyed.editable().count(), 3);
}

#[test]
fn test_resolution_is_deterministic() {
    let schema = gated_schema();
    let input = values(&[("a", json!("x")), ("b", json!("y"))]);

    let first = resolve(&schema, &input).unwrap();
    let second = resolve(&schema, &input).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_predicate_failure_becomes_diagnostic() {
    let schema = SchemaBuilder::new()
        .string("name")
        .spec(
            ParameterSpec::new("port", TypeTag::Int)
                .with_default(5432)
                .with_omit_fn(|_| anyhow::bail!("lookup unavailable")),
        )
        .build()
        .unwrap();

    let resolution = resolve(&schema, &values(&[("name", json!("pg"))])).unwrap();
    assert_eq!(resolution.diagnostics.len(), 1);
    assert_eq!(resolution.diagnostics[0].field, "port");
    assert_eq!(resolution.diagnostics[0].message, "lookup unavailable");

    let port = resolution.get("port").unwrap();
    assert!(!port.is_omitted);
    assert_eq!(port.effective_value, Some(json!(5432)));
    assert!(matches!(
        resolution.diagnostics[0].to_error(),
        Error::SchemaEvaluation { .. }
    ));
}

#[test]
fn test_colliding_ids_fail_resolution() {
    let schema = SchemaBuilder::new()
        .field("tuning", TypeTag::Json)
        .field("tuning.threads", TypeTag::Int)
        .build()
        .unwrap();

    let err = resolve(&schema, &values(&[("tuning.threads", json!(4))])).unwrap_err();
    assert!(matches!(err, Error::PathCollision { .. }));
}

#[test]
fn test_flatten_then_assemble_restores_configuration() {
    let nested = json!({
        "name": "warehouse",
        "config": {
            "host": "db",
            "ports": [5432, 5433],
            "ssl": {"enabled": true, "mode": null}
        }
    });

    let flat = flatten(&nested).unwrap();
    assert_eq!(flat["config.ssl.enabled"], json!(true));
    assert_eq!(flat["config.ports"], json!([5432, 5433]));
    assert_eq!(assemble(&flat).unwrap().to_value(), nested);
}
