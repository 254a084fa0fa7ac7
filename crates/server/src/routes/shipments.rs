//! Shipment route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use parcelflow_core::{
    ShipmentId, ShipmentPriority, ShipmentStatus, TrackingNumber, UserId,
};

use crate::db::shipments::{ShipmentFieldChanges, ShipmentFilter};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Shipment, TrackingEntry};
use crate::services::ShipmentService;
use crate::services::shipments::{NewShipment, TrackingUpdate};
use crate::state::AppState;

/// Largest page size a caller may request.
const MAX_PAGE_SIZE: i64 = 500;
/// Page size when the caller doesn't ask for one.
const DEFAULT_PAGE_SIZE: i64 = 100;

// =============================================================================
// Request Types
// =============================================================================

/// Body for creating a shipment.
#[derive(Debug, Deserialize)]
pub struct CreateShipmentRequest {
    /// Generated when omitted.
    pub tracking_number: Option<String>,
    pub priority: Option<ShipmentPriority>,
    #[serde(default)]
    pub origin_address: String,
    #[serde(default)]
    pub origin_city: String,
    #[serde(default)]
    pub destination_address: String,
    #[serde(default)]
    pub destination_city: String,
    #[serde(default)]
    pub weight_kg: f64,
    pub declared_value: Option<f64>,
    pub description: Option<String>,
    /// Staff only; customers always own what they create.
    pub owner_id: Option<i64>,
}

/// Query parameters for listing shipments.
#[derive(Debug, Deserialize)]
pub struct ShipmentListQuery {
    pub status: Option<ShipmentStatus>,
    pub priority: Option<ShipmentPriority>,
    pub search: Option<String>,
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

/// Body for updating a shipment. Absent fields are left unchanged; a status
/// change goes through the lifecycle state machine and appends a ledger
/// entry.
#[derive(Debug, Deserialize)]
pub struct UpdateShipmentRequest {
    pub status: Option<ShipmentStatus>,
    pub priority: Option<ShipmentPriority>,
    pub origin_address: Option<String>,
    pub origin_city: Option<String>,
    pub destination_address: Option<String>,
    pub destination_city: Option<String>,
    pub weight_kg: Option<f64>,
    pub declared_value: Option<f64>,
    pub description: Option<String>,
}

/// Body for appending a tracking entry.
#[derive(Debug, Deserialize)]
pub struct TrackingEntryRequest {
    pub status: ShipmentStatus,
    #[serde(default)]
    pub location: String,
    pub description: Option<String>,
}

fn page_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a shipment.
///
/// # Errors
///
/// Returns `AppError::Validation` on bad fields, `AppError::Conflict` on a
/// duplicate tracking number, `AppError::Forbidden` on a policy denial.
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(req): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<Shipment>)> {
    let service = ShipmentService::new(state.pool());

    let shipment = service
        .create(
            NewShipment {
                tracking_number: req.tracking_number,
                priority: req.priority.unwrap_or_default(),
                origin_address: req.origin_address,
                origin_city: req.origin_city,
                destination_address: req.destination_address,
                destination_city: req.destination_city,
                weight_kg: req.weight_kg,
                declared_value: req.declared_value,
                description: req.description,
                owner_id: req.owner_id.map(UserId::new),
            },
            &user,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(shipment)))
}

/// List shipments visible to the caller.
///
/// # Errors
///
/// Returns `AppError::Internal` on store failures.
pub async fn list(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> Result<Json<Vec<Shipment>>> {
    let service = ShipmentService::new(state.pool());

    let shipments = service
        .list(
            ShipmentFilter {
                owner_id: query.owner_id.map(UserId::new),
                status: query.status,
                priority: query.priority,
                search: query.search,
                limit: page_limit(query.limit),
                offset: query.skip.max(0),
            },
            &user,
        )
        .await?;

    Ok(Json(shipments))
}

/// Fetch one shipment.
///
/// # Errors
///
/// Returns `AppError::NotFound` for missing shipments and for shipments
/// outside the caller's visibility.
pub async fn get_one(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Shipment>> {
    let service = ShipmentService::new(state.pool());
    let shipment = service.get(ShipmentId::new(id), &user).await?;
    Ok(Json(shipment))
}

/// Public tracking lookup by tracking number. No token, no owner filter.
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown (or malformed) tracking numbers.
pub async fn track(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Json<Shipment>> {
    // A number that can't exist is indistinguishable from one that doesn't.
    let tracking_number =
        TrackingNumber::parse(&tracking_number).map_err(|_| AppError::NotFound)?;

    let service = ShipmentService::new(state.pool());
    let shipment = service.track(&tracking_number).await?;
    Ok(Json(shipment))
}

/// Update a shipment's fields and/or status.
///
/// # Errors
///
/// Returns `AppError::NotFound` for invisible shipments,
/// `AppError::Forbidden` when the caller sees it but may not update it, and
/// `AppError::InvalidTransition` for status changes out of terminal states.
pub async fn update_one(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateShipmentRequest>,
) -> Result<Json<Shipment>> {
    let service = ShipmentService::new(state.pool());

    let shipment = service
        .update(
            ShipmentId::new(id),
            ShipmentFieldChanges {
                priority: req.priority,
                origin_address: req.origin_address,
                origin_city: req.origin_city,
                destination_address: req.destination_address,
                destination_city: req.destination_city,
                weight_kg: req.weight_kg,
                declared_value: req.declared_value,
                description: req.description,
            },
            req.status,
            &user,
        )
        .await?;

    Ok(Json(shipment))
}

/// Delete a shipment.
///
/// # Errors
///
/// Returns `AppError::NotFound` for invisible shipments and
/// `AppError::Forbidden` when deletion isn't permitted for the caller.
pub async fn delete_one(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let service = ShipmentService::new(state.pool());
    service.delete(ShipmentId::new(id), &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Read a shipment's tracking ledger, oldest entry first.
///
/// # Errors
///
/// Returns `AppError::NotFound` for missing or invisible shipments.
pub async fn tracking_list(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TrackingEntry>>> {
    let service = ShipmentService::new(state.pool());
    let entries = service.tracking(ShipmentId::new(id), &user).await?;
    Ok(Json(entries))
}

/// Append a tracking entry, transitioning the shipment's status.
///
/// # Errors
///
/// Returns `AppError::NotFound` for invisible shipments,
/// `AppError::Forbidden` when appending isn't permitted, and
/// `AppError::InvalidTransition` from terminal states.
pub async fn tracking_append(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<TrackingEntryRequest>,
) -> Result<(StatusCode, Json<TrackingEntry>)> {
    let service = ShipmentService::new(state.pool());

    let description = req
        .description
        .unwrap_or_else(|| format!("Status updated to {}", req.status));

    let entry = service
        .add_tracking(
            ShipmentId::new(id),
            TrackingUpdate {
                status: req.status,
                location: req.location,
                description,
            },
            &user,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}
