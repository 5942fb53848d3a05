use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use connector_forms_core::DiscoveryKind;
use std::path::PathBuf;

use crate::commands::{
    assemble_command, check_command, discover_command, flatten_command, resolve_command,
};

#[derive(Parser, Debug)]
#[command(name = "connector-forms")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    RUST_LOG=debug                      Enable debug logging\n    CONNECTOR_FORMS_POLL_INTERVAL_MS    Override the discovery poll interval\n    CONNECTOR_FORMS_POLL_TIMEOUT_MS     Override the discovery timeout"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Schema file plus the values to resolve it against
#[derive(Args, Debug, Clone)]
pub struct FormArgs {
    /// Path to a JSON schema document
    pub schema: PathBuf,

    /// JSON file with flat dotted-path values
    #[arg(short, long)]
    pub values: Option<PathBuf>,

    /// Set a value (e.g., --set config.port=5432); repeatable
    #[arg(short, long = "set", value_name = "ID=VALUE")]
    pub set: Vec<String>,
}

/// How to reach the connector's discovery process
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Connector identifier sent with every request
    #[arg(long)]
    pub connector: String,

    /// Command that answers one discovery request (request on stdin, response on stdout)
    #[arg(long)]
    pub command: String,

    /// Settings file (defaults to the nearest .connector-forms.json)
    #[arg(long = "settings")]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a schema against values and show the resulting form
    #[command(visible_alias = "r")]
    Resolve {
        #[command(flatten)]
        form: FormArgs,

        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assemble flat dotted-path values into a nested configuration
    Assemble {
        /// JSON file with flat values
        values: PathBuf,
    },
    /// Flatten a nested configuration into dotted-path values
    Flatten {
        /// JSON file with a nested configuration object
        config: PathBuf,
    },
    /// Discover a schema fragment and show the merged form
    #[command(visible_alias = "d")]
    Discover {
        #[command(flatten)]
        form: FormArgs,

        #[command(flatten)]
        transport: TransportArgs,

        /// What to discover: spec or streams
        #[arg(short, long, default_value = "spec")]
        kind: DiscoveryKind,

        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
    /// Test the resolved configuration against the connector
    Check {
        #[command(flatten)]
        form: FormArgs,

        #[command(flatten)]
        transport: TransportArgs,
    },
}

impl Commands {
    /// Execute the command
    pub async fn execute(self) -> Result<()> {
        match self {
            Commands::Resolve { form, json } => resolve_command(&form, json),
            Commands::Assemble { values } => assemble_command(&values),
            Commands::Flatten { config } => flatten_command(&config),
            Commands::Discover {
                form,
                transport,
                kind,
                json,
            } => discover_command(&form, &transport, kind, json).await,
            Commands::Check { form, transport } => check_command(&form, &transport).await,
        }
    }
}
