use anyhow::{Result, bail};
use serde_json::Value;

/// Parse an `id=value` assignment.
///
/// The value is read as a JSON literal when it is one (`5432`, `true`,
/// `["a"]`, `"quoted"`), otherwise it is taken as a plain string.
pub fn parse_assignment(arg: &str) -> Result<(String, Value)> {
    let Some((id, raw)) = arg.split_once('=') else {
        bail!("expected ID=VALUE, got '{arg}'");
    };

    let id = id.trim();
    if id.is_empty() {
        bail!("missing field id in '{arg}'");
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((id.to_string(), value))
}
