pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use errors::{OrchestratorError, OrchestratorResult};
