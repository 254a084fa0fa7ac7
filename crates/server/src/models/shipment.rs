//! Shipment domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use parcelflow_core::{
    ShipmentId, ShipmentPriority, ShipmentStatus, TrackingEntryId, TrackingNumber, UserId,
};

/// A shipment (domain type).
///
/// `status` is denormalized: it always mirrors the status of the most recent
/// [`TrackingEntry`], which is the source of truth. The two are written
/// together in one transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Shipment {
    /// Unique shipment ID.
    pub id: ShipmentId,
    /// Caller-visible tracking number, unique per shipment.
    pub tracking_number: TrackingNumber,
    /// Current lifecycle status.
    pub status: ShipmentStatus,
    /// Handling priority.
    pub priority: ShipmentPriority,
    /// Pickup street address.
    pub origin_address: String,
    /// Pickup city.
    pub origin_city: String,
    /// Delivery street address.
    pub destination_address: String,
    /// Delivery city.
    pub destination_city: String,
    /// Package weight in kilograms.
    pub weight_kg: f64,
    /// Declared value for insurance purposes.
    pub declared_value: Option<f64>,
    /// Free-form contents description.
    pub description: Option<String>,
    /// Owning customer account. Immutable after creation when set by a
    /// customer; staff-created shipments may leave it unset.
    pub owner_id: Option<UserId>,
    /// When the shipment was created.
    pub created_at: DateTime<Utc>,
    /// When the shipment was last modified.
    pub updated_at: DateTime<Utc>,
}

/// One entry in a shipment's append-only tracking ledger.
///
/// Entries are created with the shipment (the initial entry) and on every
/// status change; they are never mutated or deleted while the shipment
/// exists.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingEntry {
    /// Unique entry ID.
    pub id: TrackingEntryId,
    /// The shipment this entry belongs to.
    pub shipment_id: ShipmentId,
    /// Status recorded by this entry.
    pub status: ShipmentStatus,
    /// Where the status was recorded.
    pub location: String,
    /// Human-readable description of the update.
    pub description: String,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}
