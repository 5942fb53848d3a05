pub mod file;
pub mod parser;

pub use file::{load_schema, load_settings, load_values, read_json};
pub use parser::parse_assignment;
