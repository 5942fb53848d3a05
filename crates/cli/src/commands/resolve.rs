use anyhow::Result;
use connector_forms_core::FieldResolver;
use tracing::debug;

use crate::cli::FormArgs;
use crate::display::print_resolution;
use crate::utils::{load_schema, load_values};

pub fn resolve_command(form: &FormArgs, json: bool) -> Result<()> {
    debug!("Resolving schema: {}", form.schema.display());

    let schema = load_schema(&form.schema)?;
    let values = load_values(form)?;
    let resolution = FieldResolver::new(&schema).resolve(&values)?;

    print_resolution(&schema, &resolution, json)
}
