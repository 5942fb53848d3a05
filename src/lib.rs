//! Host package for cross-crate integration tests

pub use connector_forms_core::*;
