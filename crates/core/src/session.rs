//! Editor session
//!
//! Owns everything one configuration form needs: the static schema, the
//! fragments discovered for it, the current flat values and the polls
//! started on its behalf. The working schema only changes when the static
//! schema is loaded and when a discovery succeeds.

use crate::assembler::{AssembledConfig, FlatValues, split_path};
use crate::config::EngineSettings;
use crate::discovery::{
    ConnectionChecker, ConnectionStatus, DiscoveryKind, DiscoveryTransport, LoadableSchemaAdapter,
    SchemaFragment, SchemaMapper,
};
use crate::error::Result;
use crate::poller::DiscoveryPoller;
use crate::resolver::{FieldResolver, Resolution};
use crate::schema::Schema;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

type FragmentKey = (DiscoveryKind, String);

pub struct EditorSession {
    base: Schema,
    fragments: BTreeMap<FragmentKey, SchemaFragment>,
    /// `base` followed by every fragment in key order
    working: Schema,
    values: FlatValues,
    adapter: LoadableSchemaAdapter,
    checker: ConnectionChecker,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("parameters", &self.working.len())
            .field("fragments", &self.fragments.keys().collect::<Vec<_>>())
            .field("values", &self.values)
            .field("adapter", &self.adapter)
            .field("checker", &self.checker)
            .finish()
    }
}

impl EditorSession {
    pub fn new(schema: Schema, transport: Arc<dyn DiscoveryTransport>) -> Self {
        Self::with_settings(schema, transport, EngineSettings::default())
    }

    pub fn with_settings(
        schema: Schema,
        transport: Arc<dyn DiscoveryTransport>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            working: schema.clone(),
            base: schema,
            fragments: BTreeMap::new(),
            values: FlatValues::new(),
            adapter: LoadableSchemaAdapter::new(Arc::clone(&transport), settings.clone()),
            checker: ConnectionChecker::new(transport, settings),
        }
    }

    /// Replace the mapper used for `kind` discoveries
    pub fn set_mapper(&mut self, kind: DiscoveryKind, mapper: Arc<dyn SchemaMapper>) {
        self.adapter.set_mapper(kind, mapper);
    }

    /// Static schema plus every discovered fragment
    pub fn schema(&self) -> &Schema {
        &self.working
    }

    pub fn static_schema(&self) -> &Schema {
        &self.base
    }

    pub fn fragment(&self, kind: DiscoveryKind, connector: &str) -> Option<&SchemaFragment> {
        self.fragments.get(&(kind, connector.to_string()))
    }

    pub fn values(&self) -> &FlatValues {
        &self.values
    }

    /// Resolve the working schema against the current values
    pub fn resolve(&self) -> Result<Resolution> {
        FieldResolver::new(&self.working).resolve(&self.values)
    }

    /// Set one value and re-resolve the whole schema
    pub fn set_value(&mut self, id: &str, value: Value) -> Result<Resolution> {
        split_path(id)?;
        self.values.insert(id.to_string(), value);
        self.resolve()
    }

    /// Set several values at once; nothing is applied if any id is malformed
    pub fn set_values<I, K>(&mut self, entries: I) -> Result<Resolution>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries: Vec<(String, Value)> = entries
            .into_iter()
            .map(|(id, value)| (id.into(), value))
            .collect();
        for (id, _) in &entries {
            split_path(id)?;
        }
        self.values.extend(entries);
        self.resolve()
    }

    pub fn remove_value(&mut self, id: &str) -> Result<Resolution> {
        self.values.remove(id);
        self.resolve()
    }

    /// Configuration assembled from the static schema only; sent as the
    /// payload of schema discoveries
    pub fn static_configuration(&self) -> Result<AssembledConfig> {
        Ok(FieldResolver::new(&self.base)
            .resolve(&self.values)?
            .configuration)
    }

    /// Start discovering a `kind` fragment for `connector`.
    ///
    /// A discovery with the same inputs that is still running is returned
    /// instead of starting a new one. Pass the finished fragment to
    /// [`apply_discovery`](Self::apply_discovery).
    pub fn start_discovery(
        &mut self,
        kind: DiscoveryKind,
        connector: &str,
    ) -> Result<Arc<DiscoveryPoller<SchemaFragment>>> {
        let payload = self.static_configuration()?.into_value();
        self.adapter.start(kind, connector, payload)
    }

    /// Merge a discovered fragment, replacing an earlier one of the same
    /// kind and connector, and re-resolve.
    ///
    /// On error the session keeps its previous schema.
    pub fn apply_discovery(&mut self, fragment: SchemaFragment) -> Result<Resolution> {
        let key = (fragment.kind, fragment.connector.clone());
        let mut fragments = self.fragments.clone();
        fragments.insert(key, fragment);

        let working = compose(&self.base, &fragments)?;
        let resolution = FieldResolver::new(&working).resolve(&self.values)?;

        info!(
            "Schema now has {} parameters from {} fragments",
            working.len(),
            fragments.len()
        );
        self.fragments = fragments;
        self.working = working;
        Ok(resolution)
    }

    /// Discover a fragment and merge it.
    ///
    /// Failures, timeouts and cancellation leave the schema unchanged.
    pub async fn discover(&mut self, kind: DiscoveryKind, connector: &str) -> Result<Resolution> {
        let payload = self.static_configuration()?.into_value();
        let fragment = self.adapter.discover(kind, connector, payload).await?;
        debug!(
            "Discovered {} parameters for '{}' ({})",
            fragment.len(),
            connector,
            kind
        );
        self.apply_discovery(fragment)
    }

    /// Run a connection test with the full current configuration
    pub async fn test_connection(&mut self, connector: &str) -> Result<ConnectionStatus> {
        let configuration = self.resolve()?.configuration.into_value();
        self.checker.check(connector, configuration).await
    }

    /// Cancel running discoveries and connection tests for `connector`
    pub fn cancel_discovery(&mut self, kind: DiscoveryKind, connector: &str) -> usize {
        match kind {
            DiscoveryKind::ConnectionTest => self.checker.cancel(connector),
            _ => self.adapter.cancel(kind, connector),
        }
    }

    /// Drop a merged fragment, returning to the schema without it
    pub fn discard_fragment(&mut self, kind: DiscoveryKind, connector: &str) -> Result<bool> {
        let mut fragments = self.fragments.clone();
        if fragments.remove(&(kind, connector.to_string())).is_none() {
            return Ok(false);
        }
        self.working = compose(&self.base, &fragments)?;
        self.fragments = fragments;
        Ok(true)
    }

    /// Cancel everything in flight and forget discovered fragments
    pub fn close(&mut self) {
        self.adapter.cancel_all();
        self.checker.cancel_all();
        if !self.fragments.is_empty() {
            debug!("Discarding {} discovered fragments", self.fragments.len());
            self.fragments.clear();
            self.working = self.base.clone();
        }
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn compose(base: &Schema, fragments: &BTreeMap<FragmentKey, SchemaFragment>) -> Result<Schema> {
    let mut schema = base.clone();
    for fragment in fragments.values() {
        schema.extend(fragment.parameters.clone())?;
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{DiscoveryRequest, DiscoveryResponse};
    use crate::error::Error;
    use crate::poller::PollOutcome;
    use crate::schema::{ParameterSpec, SchemaBuilder, TypeTag};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every kind immediately and records requests
    #[derive(Default)]
    struct FakeConnector {
        requests: Mutex<Vec<DiscoveryRequest>>,
        fail_spec: bool,
        pending: bool,
    }

    #[async_trait]
    impl DiscoveryTransport for FakeConnector {
        async fn discover(&self, request: &DiscoveryRequest) -> anyhow::Result<DiscoveryResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if self.pending {
                return Ok(DiscoveryResponse::Pending);
            }
            let response = match request.kind {
                DiscoveryKind::Spec if self.fail_spec => DiscoveryResponse::Error {
                    message: "spec image missing".to_string(),
                },
                DiscoveryKind::Spec => DiscoveryResponse::Ready {
                    payload: json!({
                        "required": ["database"],
                        "properties": {
                            "database": {"type": "string"},
                            "port": {"type": "integer", "default": 5432}
                        }
                    }),
                },
                DiscoveryKind::Streams => DiscoveryResponse::Ready {
                    payload: json!({"streams": ["users"]}),
                },
                DiscoveryKind::ConnectionTest => DiscoveryResponse::Ready {
                    payload: json!({"message": "ok"}),
                },
            };
            Ok(response)
        }
    }

    fn static_schema() -> Schema {
        SchemaBuilder::new()
            .param("name", TypeTag::String, |p| p.required = Some(true.into()))
            .param("mode", TypeTag::Selection, |p| {
                p.default_value = Some(json!("basic"));
                p.options = vec![json!("basic"), json!("advanced")];
            })
            .spec(
                ParameterSpec::new("tuning.threads", TypeTag::Int)
                    .with_omit_fn(|cfg| Ok(cfg.get("mode") != Some(&json!("advanced")))),
            )
            .build()
            .unwrap()
    }

    fn session(transport: FakeConnector) -> (EditorSession, Arc<FakeConnector>) {
        let transport = Arc::new(transport);
        (EditorSession::new(static_schema(), transport.clone()), transport)
    }

    #[test]
    fn test_set_value_reveals_branch() {
        let (mut session, _) = session(FakeConnector::default());

        let resolution = session.resolve().unwrap();
        assert!(resolution.get("tuning.threads").unwrap().is_omitted);
        assert_eq!(resolution.missing_required(), vec!["name"]);

        let resolution = session.set_value("mode", json!("advanced")).unwrap();
        assert!(!resolution.get("tuning.threads").unwrap().is_omitted);

        let resolution = session.remove_value("mode").unwrap();
        assert!(resolution.get("tuning.threads").unwrap().is_omitted);
    }

    #[test]
    fn test_set_values_rejects_bad_ids_atomically() {
        let (mut session, _) = session(FakeConnector::default());
        let err = session
            .set_values([("name", json!("pg")), ("bad..id", json!(1))])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
        assert!(session.values().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_merges_fragment() {
        let (mut session, transport) = session(FakeConnector::default());
        session.set_value("name", json!("warehouse")).unwrap();

        let resolution = session.discover(DiscoveryKind::Spec, "postgres").await.unwrap();

        assert_eq!(session.schema().len(), 5);
        assert_eq!(
            resolution.get("config.port").unwrap().effective_value,
            Some(json!(5432))
        );
        assert!(resolution.get("config.database").unwrap().is_required);
        assert_eq!(
            resolution.configuration.get("config.port"),
            Some(&json!(5432))
        );

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].payload,
            json!({"name": "warehouse", "mode": "basic"})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rediscovery_replaces_fragment() {
        let (mut session, _) = session(FakeConnector::default());
        session.discover(DiscoveryKind::Streams, "pg").await.unwrap();
        session.discover(DiscoveryKind::Streams, "pg").await.unwrap();

        assert_eq!(session.schema().len(), 4);
        let fragment = session.fragment(DiscoveryKind::Streams, "pg").unwrap();
        assert_eq!(fragment.parameters[0].options, vec![json!("users")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_discovery_keeps_schema() {
        let (mut session, _) = session(FakeConnector {
            fail_spec: true,
            ..FakeConnector::default()
        });

        let err = session
            .discover(DiscoveryKind::Spec, "postgres")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DiscoveryTransport(_)));
        assert_eq!(session.schema().len(), 3);
        assert!(session.fragment(DiscoveryKind::Spec, "postgres").is_none());
        assert!(session.resolve().is_ok());
    }

    #[test]
    fn test_conflicting_fragment_rejected() {
        let (mut session, _) = session(FakeConnector::default());
        let err = session
            .apply_discovery(SchemaFragment {
                kind: DiscoveryKind::Spec,
                connector: "pg".to_string(),
                parameters: vec![ParameterSpec::new("name", TypeTag::String)],
            })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateParameter(_)));

        session
            .set_values([("mode", json!("advanced")), ("tuning.threads", json!(4))])
            .unwrap();
        let err = session
            .apply_discovery(SchemaFragment {
                kind: DiscoveryKind::Spec,
                connector: "pg".to_string(),
                parameters: vec![ParameterSpec::new("tuning", TypeTag::Json)],
            })
            .unwrap_err();
        assert!(matches!(err, Error::PathCollision { .. }));
        assert_eq!(session.schema().len(), 3);
        assert!(session.resolve().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_close() {
        let (mut session, _) = session(FakeConnector {
            pending: true,
            ..FakeConnector::default()
        });

        let first = session.start_discovery(DiscoveryKind::Spec, "pg").unwrap();
        let again = session.start_discovery(DiscoveryKind::Spec, "pg").unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        assert_eq!(session.cancel_discovery(DiscoveryKind::Spec, "pg"), 1);
        assert_eq!(session.cancel_discovery(DiscoveryKind::Spec, "pg"), 0);
        assert!(matches!(first.wait().await.unwrap(), PollOutcome::Cancelled));

        let streams = session.start_discovery(DiscoveryKind::Streams, "pg").unwrap();
        session.close();
        assert!(matches!(streams.wait().await.unwrap(), PollOutcome::Cancelled));
        assert_eq!(session.schema().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_uses_full_configuration() {
        let (mut session, transport) = session(FakeConnector::default());
        session.discover(DiscoveryKind::Spec, "pg").await.unwrap();
        session.set_value("config.database", json!("analytics")).unwrap();

        let status = session.test_connection("pg").await.unwrap();
        assert_eq!(status.message.as_deref(), Some("ok"));

        let requests = transport.requests.lock().unwrap();
        let check = requests.last().unwrap();
        assert_eq!(check.kind, DiscoveryKind::ConnectionTest);
        assert_eq!(check.payload["config"]["database"], json!("analytics"));
    }
}
