pub mod assemble;
pub mod check;
pub mod discover;
pub mod flatten;
pub mod resolve;

pub use assemble::assemble_command;
pub use check::check_command;
pub use discover::discover_command;
pub use flatten::flatten_command;
pub use resolve::resolve_command;
