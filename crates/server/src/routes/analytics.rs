//! Operational dashboard route handler (admin and manager).

use axum::{Json, extract::State};
use chrono::{Datelike, TimeZone, Utc};
use serde::Serialize;

use parcelflow_core::ShipmentStatus;

use crate::db::ShipmentRepository;
use crate::db::shipments::ShipmentFilter;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Shipment;
use crate::services::policy::{Action, authorize};
use crate::state::AppState;

/// How many destination cities the dashboard lists.
const TOP_DESTINATIONS: i64 = 5;
/// How many recent shipments the dashboard lists.
const RECENT_SHIPMENTS: i64 = 10;

/// A destination city with its shipment count.
#[derive(Debug, Serialize)]
pub struct DestinationCount {
    pub city: String,
    pub count: i64,
}

/// Dashboard aggregates.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_shipments: i64,
    pub pending_shipments: i64,
    pub in_transit_shipments: i64,
    pub delivered_shipments: i64,
    /// Sum of declared values across all shipments.
    pub total_revenue: f64,
    /// Sum of declared values for shipments created this calendar month.
    pub monthly_revenue: f64,
    pub top_destinations: Vec<DestinationCount>,
    pub recent_shipments: Vec<Shipment>,
}

/// Return the operational dashboard.
///
/// # Errors
///
/// Returns `AppError::Forbidden` for callers without dashboard access.
pub async fn dashboard(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>> {
    authorize(actor.role, Action::AnalyticsRead, None, actor.id)?;

    let repo = ShipmentRepository::new(state.pool());

    let total_shipments = repo.count_total().await?;

    let mut pending_shipments = 0;
    let mut in_transit_shipments = 0;
    let mut delivered_shipments = 0;
    for (status, count) in repo.status_counts().await? {
        match status {
            ShipmentStatus::Pending => pending_shipments = count,
            ShipmentStatus::InTransit => in_transit_shipments = count,
            ShipmentStatus::Delivered => delivered_shipments = count,
            _ => {}
        }
    }

    let total_revenue = repo.declared_value_total().await?;
    let monthly_revenue = repo.declared_value_since(month_start()?).await?;

    let top_destinations = repo
        .top_destinations(TOP_DESTINATIONS)
        .await?
        .into_iter()
        .map(|(city, count)| DestinationCount { city, count })
        .collect();

    let recent_shipments = repo
        .list(&ShipmentFilter {
            limit: RECENT_SHIPMENTS,
            ..ShipmentFilter::default()
        })
        .await?;

    Ok(Json(DashboardResponse {
        total_shipments,
        pending_shipments,
        in_transit_shipments,
        delivered_shipments,
        total_revenue,
        monthly_revenue,
        top_destinations,
        recent_shipments,
    }))
}

/// Midnight UTC on the first of the current month.
fn month_start() -> Result<chrono::DateTime<Utc>> {
    let now = Utc::now();
    now.date_naive()
        .with_day(1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| AppError::Internal("could not compute month start".to_owned()))
}
