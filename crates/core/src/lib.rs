//! connector-forms-core - Declarative connector configuration engine
//!
//! This crate provides functionality to:
//! - Describe a connector's configuration as an ordered parameter schema
//! - Assemble flat dotted-path values into a nested configuration and back
//! - Resolve which fields are visible, hidden with a constant, omitted or required
//! - Discover schema fragments and test connections through a cancellable poller
pub mod assembler;
pub mod config;
pub mod discovery;
pub mod error;
pub mod poller;
pub mod render;
pub mod resolver;
pub mod schema;
pub mod session;

// Re-export commonly used types and traits
pub use error::{Error, Result};

pub use assembler::{AssembledConfig, FlatValues, assemble, assemble_entries, flatten};
pub use config::{EngineSettings, PollSettings};
pub use discovery::{
    DiscoveryKind, DiscoveryRequest, DiscoveryResponse, DiscoveryTransport, SchemaFragment,
    SchemaMapper,
};
pub use poller::{DiscoveryPoller, PollOutcome, PollPhase, PollState, Probe, ProbeStatus};
pub use render::{FieldRenderer, RendererRegistry};
pub use resolver::{Diagnostic, FieldResolver, Resolution, ResolvedField, resolve};
pub use schema::{ParameterSpec, Schema, SchemaBuilder, TypeTag};
pub use session::EditorSession;
