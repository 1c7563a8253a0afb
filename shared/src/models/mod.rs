//! Data models
//!
//! Shared between the server and API clients.
//! All IDs are `i64` (PostgreSQL BIGSERIAL), money is `rust_decimal::Decimal`.

pub mod listing;
pub mod market_price;
pub mod order;
pub mod transaction;
pub mod user;

// Re-exports
pub use listing::*;
pub use market_price::*;
pub use order::*;
pub use transaction::*;
pub use user::*;
