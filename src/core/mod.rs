/// Core Module for Uniql
///
/// Shared infrastructure every other module builds on: the uniform error
/// taxonomy and the backend connection and session layer.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DriverError, Result, UniqlError};
