//! Domain services.
//!
//! # Modules
//!
//! - [`password`] - One-way credential hashing and verification
//! - [`tokens`] - Signed, time-bounded bearer tokens
//! - [`policy`] - Role-based authorization decisions
//! - [`auth`] - Registration, login, and caller resolution
//! - [`shipments`] - Shipment lifecycle and the tracking ledger

pub mod auth;
pub mod password;
pub mod policy;
pub mod shipments;
pub mod tokens;

pub use auth::{AuthError, AuthService};
pub use policy::{AccessDenied, Action, authorize};
pub use shipments::{ShipmentError, ShipmentService};
pub use tokens::{AccessClaims, TokenError, TokenService};
