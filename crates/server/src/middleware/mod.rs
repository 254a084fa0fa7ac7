//! Request middleware.
//!
//! - [`auth`] - Bearer-token extractor resolving the calling account
//! - [`rate_limit`] - Sliding-window admission control, applied to every
//!   inbound request before anything else runs

pub mod auth;
pub mod rate_limit;

pub use auth::RequireAuth;
pub use rate_limit::RateLimiter;
