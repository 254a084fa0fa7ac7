//! Domain types and API projections.
//!
//! These types represent validated domain objects separate from database row
//! types; repositories construct them after validating raw column values.

pub mod notification;
pub mod shipment;
pub mod user;

pub use notification::Notification;
pub use shipment::{Shipment, TrackingEntry};
pub use user::{User, UserProfile};
