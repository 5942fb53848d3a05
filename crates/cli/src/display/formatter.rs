use anyhow::Result;
use connector_forms_core::{RendererRegistry, Resolution, Schema};
use serde::Serialize;

/// Resolution plus the required fields that are still empty
#[derive(Debug, Serialize)]
pub struct ResolutionReport<'a> {
    #[serde(flatten)]
    pub resolution: &'a Resolution,
    pub missing_required: Vec<&'a str>,
}

impl<'a> ResolutionReport<'a> {
    pub fn new(resolution: &'a Resolution) -> Self {
        Self {
            resolution,
            missing_required: resolution.missing_required(),
        }
    }
}

/// Render the form as text, one field per line
pub fn format_form(schema: &Schema, resolution: &Resolution) -> String {
    let mut out = RendererRegistry::default().render_form(schema, resolution);

    let missing = resolution.missing_required();
    if !missing.is_empty() {
        out.push_str(&format!("\n\n⚠️  Missing required: {}", missing.join(", ")));
    }
    out
}

pub fn print_form(schema: &Schema, resolution: &Resolution) {
    println!("{}", format_form(schema, resolution));
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a resolution as text or as a JSON report
pub fn print_resolution(schema: &Schema, resolution: &Resolution, json: bool) -> Result<()> {
    if json {
        print_json(&ResolutionReport::new(resolution))
    } else {
        print_form(schema, resolution);
        Ok(())
    }
}
