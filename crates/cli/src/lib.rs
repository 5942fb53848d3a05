pub mod cli;
pub mod commands;
pub mod display;
pub mod transport;
pub mod utils;

// Re-export commonly used items
pub use cli::{Cli, Commands, FormArgs, TransportArgs};
pub use transport::CommandTransport;
