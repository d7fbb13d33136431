//! External data service module
//!
//! Tests, sections, passages, questions, profiles and results all live with an
//! external managed backend. This module defines the records it hands back and the
//! trait the rest of the crate fetches them through.

pub mod catalog;
pub mod records;

pub use catalog::{DataService, FetchError, JsonCatalog};
pub use records::*;
