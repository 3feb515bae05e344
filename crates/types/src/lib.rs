//! Shared types for the Jito bundler system
//!
//! This crate contains the domain types used across the bundler crates:
//! transactions and bundles, relay wire types, and the error taxonomy.

pub mod bundle;
pub mod error;
pub mod relay;
pub mod utils;

// Re-export commonly used types
pub use bundle::*;
pub use error::{BundlerError, ConfigError, RelayError, Result};
pub use relay::*;
pub use utils::TxEncoding;
