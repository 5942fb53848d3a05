//! Connection tests driven by the discovery poller

use super::adapter::{DiscoveryKey, PollRegistry, settle_outcome};
use super::transport::{DiscoveryKind, DiscoveryRequest, DiscoveryTransport};
use crate::config::EngineSettings;
use crate::error::Result;
use crate::poller::{DiscoveryPoller, Probe, ProbeStatus};
use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Result of a successful connection test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub connector: String,
    /// Optional `message` reported by the connector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct ConnectionProbe {
    transport: Arc<dyn DiscoveryTransport>,
    request: DiscoveryRequest,
}

impl ConnectionProbe {
    pub fn new(
        transport: Arc<dyn DiscoveryTransport>,
        connector: impl Into<String>,
        configuration: Value,
    ) -> Self {
        Self {
            transport,
            request: DiscoveryRequest::new(DiscoveryKind::ConnectionTest, connector, configuration),
        }
    }
}

#[async_trait]
impl Probe for ConnectionProbe {
    type Output = ConnectionStatus;

    async fn probe(&mut self) -> anyhow::Result<ProbeStatus<ConnectionStatus>> {
        let connector = &self.request.connector;
        let response = self
            .transport
            .discover(&self.request)
            .await
            .with_context(|| format!("connection test for '{connector}' could not run"))?;

        let Some(payload) = response
            .into_payload()
            .with_context(|| format!("connection test for '{connector}' failed"))?
        else {
            return Ok(ProbeStatus::Pending);
        };

        Ok(ProbeStatus::Done(ConnectionStatus {
            connector: connector.clone(),
            message: payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        }))
    }
}

/// Runs connection tests, one at a time per connector and configuration
pub struct ConnectionChecker {
    transport: Arc<dyn DiscoveryTransport>,
    settings: EngineSettings,
    polls: PollRegistry<ConnectionStatus>,
}

impl std::fmt::Debug for ConnectionChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionChecker")
            .field("polls", &self.polls)
            .finish()
    }
}

impl ConnectionChecker {
    pub fn new(transport: Arc<dyn DiscoveryTransport>, settings: EngineSettings) -> Self {
        Self {
            transport,
            settings,
            polls: PollRegistry::new(),
        }
    }

    pub fn start(
        &mut self,
        connector: &str,
        configuration: Value,
    ) -> Result<Arc<DiscoveryPoller<ConnectionStatus>>> {
        let key = DiscoveryKey::new(DiscoveryKind::ConnectionTest, connector, &configuration);
        let settings = self
            .settings
            .poll_settings_for(DiscoveryKind::ConnectionTest.as_str());
        let transport = Arc::clone(&self.transport);

        self.polls.get_or_start(key, &settings, || {
            ConnectionProbe::new(transport, connector, configuration)
        })
    }

    /// Test `configuration` against `connector` and wait for the verdict
    pub async fn check(&mut self, connector: &str, configuration: Value) -> Result<ConnectionStatus> {
        let poller = self.start(connector, configuration)?;
        let outcome = poller.wait().await?;
        self.polls.prune();
        settle_outcome(connector, outcome)
    }

    pub fn cancel(&mut self, connector: &str) -> usize {
        self.polls.cancel(DiscoveryKind::ConnectionTest, connector)
    }

    pub fn cancel_all(&mut self) {
        self.polls.cancel_all();
    }
}
