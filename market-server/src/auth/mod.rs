//! Authentication and request guards
//!
//! - [`user_auth`]: bearer JWT verification, injects [`UserIdentity`]
//! - [`guard`]: role checks against the stored account, injects [`AuthorizedUser`]
//! - [`rate_limit`]: per-IP limits for the unauthenticated webhooks

pub mod guard;
pub mod rate_limit;
pub mod user_auth;

pub use guard::AuthorizedUser;
pub use user_auth::UserIdentity;
