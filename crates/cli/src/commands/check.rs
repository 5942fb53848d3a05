use anyhow::{Context, Result};

use super::discover::open_session;
use crate::cli::{FormArgs, TransportArgs};

pub async fn check_command(form: &FormArgs, transport: &TransportArgs) -> Result<()> {
    let mut session = open_session(form, transport)?;
    let connector = transport.connector.as_str();

    let missing: Vec<String> = session
        .resolve()?
        .missing_required()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        eprintln!("⚠️  Missing required: {}", missing.join(", "));
    }

    eprintln!("🔌 Testing connection for '{connector}'...");
    let status = session
        .test_connection(connector)
        .await
        .with_context(|| format!("Connection test for '{connector}' failed"))?;

    match status.message {
        Some(message) => println!("✅ Connection to '{connector}' succeeded: {message}"),
        None => println!("✅ Connection to '{connector}' succeeded"),
    }
    Ok(())
}
