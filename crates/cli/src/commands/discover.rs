use anyhow::{Context, Result};
use connector_forms_core::discovery::settle_outcome;
use connector_forms_core::{DiscoveryKind, EditorSession};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::{FormArgs, TransportArgs};
use crate::display::print_resolution;
use crate::transport::CommandTransport;
use crate::utils::{load_schema, load_settings, load_values};

/// Open an editor session over the form's schema and values
pub fn open_session(form: &FormArgs, transport: &TransportArgs) -> Result<EditorSession> {
    let schema = load_schema(&form.schema)?;
    let values = load_values(form)?;
    let settings = load_settings(transport.settings.as_deref())?;
    let command = CommandTransport::parse(&transport.command)?;
    debug!("Using discovery command '{}'", command.program());

    let mut session = EditorSession::with_settings(schema, Arc::new(command), settings);
    session.set_values(values)?;
    Ok(session)
}

pub async fn discover_command(
    form: &FormArgs,
    transport: &TransportArgs,
    kind: DiscoveryKind,
    json: bool,
) -> Result<()> {
    if kind == DiscoveryKind::ConnectionTest {
        anyhow::bail!("use the 'check' command to test a connection");
    }

    let mut session = open_session(form, transport)?;
    let connector = transport.connector.as_str();

    eprintln!("🔍 Discovering {kind} for '{connector}'...");
    let poller = session.start_discovery(kind, connector)?;
    let outcome = tokio::select! {
        outcome = poller.wait() => outcome?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, cancelling discovery");
            poller.cancel();
            poller.wait().await?
        }
    };
    debug!("Discovery finished after {} probes", poller.invocations());

    let fragment = settle_outcome(connector, outcome)
        .with_context(|| format!("Could not discover {kind} for '{connector}'"))?;
    eprintln!("✅ Discovered {} parameters", fragment.len());

    let resolution = session.apply_discovery(fragment)?;
    print_resolution(session.schema(), &resolution, json)
}
