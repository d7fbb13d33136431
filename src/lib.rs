//! Practice Exam - timed, sectioned practice tests with resumable countdowns
//!
//! This library hosts section attempts (English, Math, Reading, Science), runs a
//! per-section countdown whose deadline survives restarts through a local key-value
//! store, grades answers by exact match, and serves role-gated dashboards. Test
//! content, profiles and results come from an external data service.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod section;
pub mod services;
pub mod state;
pub mod store;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::AppError;
pub use state::AppState;
pub use utils::signals::shutdown_signal;
