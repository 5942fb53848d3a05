//! Discovery of schema fragments and connection tests through an external
//! transport, driven by [`DiscoveryPoller`](crate::poller::DiscoveryPoller)

pub mod adapter;
pub mod check;
pub mod mapper;
pub mod transport;

pub use adapter::{
    DiscoveryKey, LoadableSchemaAdapter, PollRegistry, SchemaFragment, SchemaProbe,
    settle_outcome,
};
pub use check::{ConnectionChecker, ConnectionProbe, ConnectionStatus};
pub use mapper::{JsonSchemaMapper, SchemaMapper, StreamListMapper};
pub use transport::{DiscoveryKind, DiscoveryRequest, DiscoveryResponse, DiscoveryTransport};
