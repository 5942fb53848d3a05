use anyhow::Result;
use connector_forms_core::{FlatValues, assemble};
use std::path::Path;

use crate::display::print_json;
use crate::utils::read_json;

pub fn assemble_command(values: &Path) -> Result<()> {
    let flat: FlatValues = read_json(values)?;
    let config = assemble(&flat)?;
    print_json(&config)
}
