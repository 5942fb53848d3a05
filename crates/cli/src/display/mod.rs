pub mod formatter;

pub use formatter::{ResolutionReport, format_form, print_form, print_json, print_resolution};
