use anyhow::Result;
use connector_forms_core::flatten;
use serde_json::Value;
use std::path::Path;

use crate::display::print_json;
use crate::utils::read_json;

pub fn flatten_command(config: &Path) -> Result<()> {
    let nested: Value = read_json(config)?;
    let flat = flatten(&nested)?;
    print_json(&flat)
}
