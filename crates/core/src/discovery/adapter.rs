//! Bridges discovery polls into schema fragments

use super::mapper::{JsonSchemaMapper, SchemaMapper, StreamListMapper};
use super::transport::{DiscoveryKind, DiscoveryRequest, DiscoveryTransport};
use crate::config::{EngineSettings, PollSettings};
use crate::error::{Error, Result};
use crate::poller::{DiscoveryPoller, PollOutcome, Probe, ProbeStatus};
use crate::schema::ParameterSpec;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Parameter specs produced by one successful discovery
#[derive(Debug, Clone)]
pub struct SchemaFragment {
    pub kind: DiscoveryKind,
    pub connector: String,
    pub parameters: Vec<ParameterSpec>,
}

impl SchemaFragment {
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Probe that performs one discovery request per tick and maps the
/// payload once the response is ready
pub struct SchemaProbe {
    transport: Arc<dyn DiscoveryTransport>,
    mapper: Arc<dyn SchemaMapper>,
    request: DiscoveryRequest,
}

impl SchemaProbe {
    pub fn new(
        transport: Arc<dyn DiscoveryTransport>,
        mapper: Arc<dyn SchemaMapper>,
        request: DiscoveryRequest,
    ) -> Self {
        Self {
            transport,
            mapper,
            request,
        }
    }
}

#[async_trait]
impl Probe for SchemaProbe {
    type Output = SchemaFragment;

    async fn probe(&mut self) -> anyhow::Result<ProbeStatus<SchemaFragment>> {
        let response = self
            .transport
            .discover(&self.request)
            .await
            .with_context(|| {
                format!(
                    "{} request for '{}' failed",
                    self.request.kind, self.request.connector
                )
            })?;

        let Some(payload) = response.into_payload().with_context(|| {
            format!(
                "{} discovery for '{}' returned an error",
                self.request.kind, self.request.connector
            )
        })?
        else {
            return Ok(ProbeStatus::Pending);
        };

        let parameters = self.mapper.map(&payload).with_context(|| {
            format!(
                "could not map {} payload for '{}'",
                self.request.kind, self.request.connector
            )
        })?;
        debug!(
            "Mapped {} parameters from {} discovery of '{}'",
            parameters.len(),
            self.request.kind,
            self.request.connector
        );

        Ok(ProbeStatus::Done(SchemaFragment {
            kind: self.request.kind,
            connector: self.request.connector.clone(),
            parameters,
        }))
    }
}

/// Identity of a discovery: kind, connector and request payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveryKey {
    pub kind: DiscoveryKind,
    pub connector: String,
    /// Payload serialized with sorted keys
    payload: String,
}

impl DiscoveryKey {
    pub fn new(kind: DiscoveryKind, connector: impl Into<String>, payload: &Value) -> Self {
        Self {
            kind,
            connector: connector.into(),
            payload: payload.to_string(),
        }
    }

    pub fn matches(&self, kind: DiscoveryKind, connector: &str) -> bool {
        self.kind == kind && self.connector == connector
    }
}

impl fmt::Display for DiscoveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.connector)
    }
}

/// Polls owned by one session, at most one running per [`DiscoveryKey`]
pub struct PollRegistry<T> {
    polls: HashMap<DiscoveryKey, Arc<DiscoveryPoller<T>>>,
}

impl<T> Default for PollRegistry<T> {
    fn default() -> Self {
        Self {
            polls: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for PollRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.polls.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("PollRegistry").field("polls", &keys).finish()
    }
}

impl<T> PollRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the running poll for `key`, or start a new one with the
    /// probe built by `make_probe`. Finished polls are dropped first.
    pub fn get_or_start<P, F>(
        &mut self,
        key: DiscoveryKey,
        settings: &PollSettings,
        make_probe: F,
    ) -> Result<Arc<DiscoveryPoller<T>>>
    where
        P: Probe<Output = T>,
        F: FnOnce() -> P,
    {
        self.prune();
        if let Some(existing) = self.polls.get(&key).filter(|p| p.is_running()) {
            debug!("Reusing running discovery for {}", key);
            return Ok(Arc::clone(existing));
        }

        let poller = Arc::new(DiscoveryPoller::new(key.to_string()));
        poller.start_with_settings(make_probe(), settings)?;
        self.polls.insert(key, Arc::clone(&poller));
        Ok(poller)
    }

    pub fn get(&self, key: &DiscoveryKey) -> Option<Arc<DiscoveryPoller<T>>> {
        self.polls.get(key).cloned()
    }

    /// Cancel and forget every poll for `kind` and `connector`
    pub fn cancel(&mut self, kind: DiscoveryKind, connector: &str) -> usize {
        let mut cancelled = 0;
        self.polls.retain(|key, poller| {
            if key.matches(kind, connector) {
                poller.cancel();
                cancelled += 1;
                false
            } else {
                true
            }
        });
        cancelled
    }

    pub fn cancel_all(&mut self) {
        for (key, poller) in self.polls.drain() {
            debug!("Cancelling discovery {}", key);
            poller.cancel();
        }
    }

    /// Forget polls that already finished
    pub fn prune(&mut self) {
        self.polls.retain(|_, poller| !poller.phase().is_terminal());
    }

    pub fn running(&self) -> usize {
        self.polls.values().filter(|p| p.is_running()).count()
    }

    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }
}

/// Convert a finished poll into the discovered value or a typed error
pub fn settle_outcome<T>(connector: &str, outcome: PollOutcome<T>) -> Result<T> {
    match outcome {
        PollOutcome::Succeeded(value) => Ok(value),
        PollOutcome::Failed(failure) => Err(Error::DiscoveryTransport(failure.message())),
        PollOutcome::Cancelled => Err(Error::DiscoveryCancelled(connector.to_string())),
        PollOutcome::TimedOut { waited } => Err(Error::DiscoveryTimeout {
            connector: connector.to_string(),
            waited_ms: waited.as_millis() as u64,
        }),
    }
}

/// Runs schema discoveries through a transport and per-kind mappers
pub struct LoadableSchemaAdapter {
    transport: Arc<dyn DiscoveryTransport>,
    mappers: HashMap<DiscoveryKind, Arc<dyn SchemaMapper>>,
    settings: EngineSettings,
    polls: PollRegistry<SchemaFragment>,
}

impl fmt::Debug for LoadableSchemaAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.mappers.keys().collect();
        kinds.sort();
        f.debug_struct("LoadableSchemaAdapter")
            .field("mappers", &kinds)
            .field("settings", &self.settings)
            .field("polls", &self.polls)
            .finish()
    }
}

impl LoadableSchemaAdapter {
    /// Adapter with the built-in spec and stream mappers
    pub fn new(transport: Arc<dyn DiscoveryTransport>, settings: EngineSettings) -> Self {
        let mut mappers: HashMap<DiscoveryKind, Arc<dyn SchemaMapper>> = HashMap::new();
        mappers.insert(DiscoveryKind::Spec, Arc::new(JsonSchemaMapper::default()));
        mappers.insert(DiscoveryKind::Streams, Arc::new(StreamListMapper::default()));

        Self {
            transport,
            mappers,
            settings,
            polls: PollRegistry::new(),
        }
    }

    pub fn set_mapper(&mut self, kind: DiscoveryKind, mapper: Arc<dyn SchemaMapper>) {
        self.mappers.insert(kind, mapper);
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Start a discovery, reusing a running one with identical inputs
    pub fn start(
        &mut self,
        kind: DiscoveryKind,
        connector: &str,
        payload: Value,
    ) -> Result<Arc<DiscoveryPoller<SchemaFragment>>> {
        let mapper = self.mappers.get(&kind).cloned().ok_or_else(|| {
            Error::SchemaError(format!("no schema mapper registered for {kind} discovery"))
        })?;

        let key = DiscoveryKey::new(kind, connector, &payload);
        let settings = self.settings.poll_settings_for(kind.as_str());
        let transport = Arc::clone(&self.transport);

        self.polls.get_or_start(key, &settings, || {
            SchemaProbe::new(
                transport,
                mapper,
                DiscoveryRequest::new(kind, connector, payload),
            )
        })
    }

    /// Run a discovery to completion
    pub async fn discover(
        &mut self,
        kind: DiscoveryKind,
        connector: &str,
        payload: Value,
    ) -> Result<SchemaFragment> {
        let poller = self.start(kind, connector, payload)?;
        let outcome = poller.wait().await?;
        self.polls.prune();
        settle_outcome(connector, outcome)
    }

    pub fn cancel(&mut self, kind: DiscoveryKind, connector: &str) -> usize {
        self.polls.cancel(kind, connector)
    }

    pub fn cancel_all(&mut self) {
        self.polls.cancel_all();
    }

    pub fn polls(&self) -> &PollRegistry<SchemaFragment> {
        &self.polls
    }
}
