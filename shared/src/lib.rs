//! Shared types for the farm marketplace
//!
//! Domain models, the unified error system and fixed-point money helpers
//! used by the server and by API clients.

pub mod error;
pub mod models;
pub mod money;
pub mod util;

// Re-exports
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};
