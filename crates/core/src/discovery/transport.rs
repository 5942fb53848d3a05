use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What an external discovery call is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryKind {
    /// The connector's configuration specification
    Spec,
    /// The data streams the connector exposes
    Streams,
    /// A connection test; produces no schema
    #[serde(rename = "check")]
    ConnectionTest,
}

impl DiscoveryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryKind::Spec => "spec",
            DiscoveryKind::Streams => "streams",
            DiscoveryKind::ConnectionTest => "check",
        }
    }
}

impl fmt::Display for DiscoveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spec" => Ok(DiscoveryKind::Spec),
            "streams" => Ok(DiscoveryKind::Streams),
            "check" => Ok(DiscoveryKind::ConnectionTest),
            other => Err(format!(
                "unknown discovery kind '{other}' (expected spec, streams or check)"
            )),
        }
    }
}

/// One request sent through a [`DiscoveryTransport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub connector: String,
    pub kind: DiscoveryKind,
    /// Currently assembled static configuration
    pub payload: Value,
}

impl DiscoveryRequest {
    pub fn new(kind: DiscoveryKind, connector: impl Into<String>, payload: Value) -> Self {
        Self {
            connector: connector.into(),
            kind,
            payload,
        }
    }
}

/// Answer to one discovery request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscoveryResponse {
    /// The external process has not finished yet
    Pending,
    Ready {
        #[serde(default)]
        payload: Value,
    },
    Error {
        message: String,
    },
}

impl DiscoveryResponse {
    /// Turn the response into the payload once ready.
    ///
    /// `Ok(None)` means poll again; an error status becomes an error.
    pub fn into_payload(self) -> anyhow::Result<Option<Value>> {
        match self {
            DiscoveryResponse::Pending => Ok(None),
            DiscoveryResponse::Ready { payload } => Ok(Some(payload)),
            DiscoveryResponse::Error { message } => Err(anyhow::anyhow!(message)),
        }
    }
}

/// Performs one discovery request against whatever runs the connector
#[async_trait]
pub trait DiscoveryTransport: Send + Sync {
    async fn discover(&self, request: &DiscoveryRequest) -> anyhow::Result<DiscoveryResponse>;
}

#[async_trait]
impl<T: DiscoveryTransport + ?Sized> DiscoveryTransport for Arc<T> {
    async fn discover(&self, request: &DiscoveryRequest) -> anyhow::Result<DiscoveryResponse> {
        (**self).discover(request).await
    }
}
