//! Shipment and tracking-ledger repository.
//!
//! The shipment's `status` column mirrors the newest tracking entry; both
//! writes happen inside one transaction so the pair commits or rolls back as
//! a unit. Status updates are compare-and-set against the caller's observed
//! status, which serializes concurrent transitions on the same shipment.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use parcelflow_core::{
    ShipmentId, ShipmentPriority, ShipmentStatus, TrackingEntryId, TrackingNumber, UserId,
};

use super::{RepositoryError, map_unique_violation};
use crate::models::{Shipment, TrackingEntry};

/// Fields required to create a shipment record with its initial ledger entry.
#[derive(Debug)]
pub struct NewShipmentRecord<'a> {
    pub tracking_number: &'a TrackingNumber,
    pub priority: ShipmentPriority,
    pub origin_address: &'a str,
    pub origin_city: &'a str,
    pub destination_address: &'a str,
    pub destination_city: &'a str,
    pub weight_kg: f64,
    pub declared_value: Option<f64>,
    pub description: Option<&'a str>,
    pub owner_id: Option<UserId>,
    pub initial_location: &'a str,
    pub initial_description: &'a str,
}

/// Filters for listing shipments.
#[derive(Debug, Clone, Default)]
pub struct ShipmentFilter {
    pub owner_id: Option<UserId>,
    pub status: Option<ShipmentStatus>,
    pub priority: Option<ShipmentPriority>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Field-level changes applied by a shipment update.
///
/// Absent fields are left unchanged. Status is not here: status changes go
/// through [`ShipmentRepository::append_transition`] only.
#[derive(Debug, Clone, Default)]
pub struct ShipmentFieldChanges {
    pub priority: Option<ShipmentPriority>,
    pub origin_address: Option<String>,
    pub origin_city: Option<String>,
    pub destination_address: Option<String>,
    pub destination_city: Option<String>,
    pub weight_kg: Option<f64>,
    pub declared_value: Option<f64>,
    pub description: Option<String>,
}

impl ShipmentFieldChanges {
    /// Whether no field is being changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.priority.is_none()
            && self.origin_address.is_none()
            && self.origin_city.is_none()
            && self.destination_address.is_none()
            && self.destination_city.is_none()
            && self.weight_kg.is_none()
            && self.declared_value.is_none()
            && self.description.is_none()
    }
}

/// Repository for shipment and tracking-entry database operations.
pub struct ShipmentRepository<'a> {
    pool: &'a SqlitePool,
}

const SHIPMENT_COLUMNS: &str = "id, tracking_number, status, priority, origin_address, \
     origin_city, destination_address, destination_city, weight_kg, declared_value, \
     description, owner_id, created_at, updated_at";

/// Raw `shipments` row before domain validation.
#[derive(sqlx::FromRow)]
struct ShipmentRow {
    id: i64,
    tracking_number: String,
    status: String,
    priority: String,
    origin_address: String,
    origin_city: String,
    destination_address: String,
    destination_city: String,
    weight_kg: f64,
    declared_value: Option<f64>,
    description: Option<String>,
    owner_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShipmentRow {
    fn into_shipment(self) -> Result<Shipment, RepositoryError> {
        let tracking_number = TrackingNumber::parse(&self.tracking_number).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid tracking number in database: {e}"))
        })?;
        let status: ShipmentStatus =
            self.status.parse().map_err(RepositoryError::DataCorruption)?;
        let priority: ShipmentPriority = self
            .priority
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Shipment {
            id: ShipmentId::new(self.id),
            tracking_number,
            status,
            priority,
            origin_address: self.origin_address,
            origin_city: self.origin_city,
            destination_address: self.destination_address,
            destination_city: self.destination_city,
            weight_kg: self.weight_kg,
            declared_value: self.declared_value,
            description: self.description,
            owner_id: self.owner_id.map(UserId::new),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Raw `tracking_entries` row before domain validation.
#[derive(sqlx::FromRow)]
struct TrackingEntryRow {
    id: i64,
    shipment_id: i64,
    status: String,
    location: String,
    description: String,
    timestamp: DateTime<Utc>,
}

impl TrackingEntryRow {
    fn into_entry(self) -> Result<TrackingEntry, RepositoryError> {
        let status: ShipmentStatus =
            self.status.parse().map_err(RepositoryError::DataCorruption)?;

        Ok(TrackingEntry {
            id: TrackingEntryId::new(self.id),
            shipment_id: ShipmentId::new(self.shipment_id),
            status,
            location: self.location,
            description: self.description,
            timestamp: self.timestamp,
        })
    }
}

impl<'a> ShipmentRepository<'a> {
    /// Create a new shipment repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a shipment and its initial tracking entry in one transaction.
    ///
    /// The shipment starts in `pending` status and the ledger starts with
    /// exactly one entry; both rows commit together or not at all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the tracking number already
    /// exists. Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewShipmentRecord<'_>) -> Result<Shipment, RepositoryError> {
        let now = Utc::now();
        let status = ShipmentStatus::Pending;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO shipments (tracking_number, status, priority, origin_address, \
             origin_city, destination_address, destination_city, weight_kg, declared_value, \
             description, owner_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.tracking_number.as_str())
        .bind(status.to_string())
        .bind(new.priority.to_string())
        .bind(new.origin_address)
        .bind(new.origin_city)
        .bind(new.destination_address)
        .bind(new.destination_city)
        .bind(new.weight_kg)
        .bind(new.declared_value)
        .bind(new.description)
        .bind(new.owner_id.map(|owner_id| owner_id.as_i64()))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "tracking number already exists"))?;

        let id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO tracking_entries (shipment_id, status, location, description, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(new.initial_location)
        .bind(new.initial_description)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get(ShipmentId::new(id)).await?.ok_or_else(|| {
            RepositoryError::DataCorruption("shipment row missing after insert".to_owned())
        })
    }

    /// Get a shipment by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn get(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = ?"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(ShipmentRow::into_shipment).transpose()
    }

    /// Get a shipment by its tracking number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn get_by_tracking_number(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<Shipment>, RepositoryError> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE tracking_number = ?"
        ))
        .bind(tracking_number.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(ShipmentRow::into_shipment).transpose()
    }

    /// Whether a tracking number is already taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tracking_number_exists(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<bool, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shipments WHERE tracking_number = ?")
                .bind(tracking_number.as_str())
                .fetch_one(self.pool)
                .await?;

        Ok(count > 0)
    }

    /// List shipments matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn list(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE 1=1"
        ));

        if let Some(owner_id) = filter.owner_id {
            builder.push(" AND owner_id = ").push_bind(owner_id.as_i64());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(priority) = filter.priority {
            builder
                .push(" AND priority = ")
                .push_bind(priority.to_string());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            builder
                .push(" AND (tracking_number LIKE ")
                .push_bind(pattern.clone())
                .push(" OR origin_city LIKE ")
                .push_bind(pattern.clone())
                .push(" OR destination_city LIKE ")
                .push_bind(pattern.clone())
                .push(" OR description LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<ShipmentRow> = builder.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(ShipmentRow::into_shipment).collect()
    }

    /// Apply field-level changes to a shipment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shipment doesn't exist.
    pub async fn update_fields(
        &self,
        id: ShipmentId,
        changes: &ShipmentFieldChanges,
    ) -> Result<Shipment, RepositoryError> {
        if changes.is_empty() {
            return self.get(id).await?.ok_or(RepositoryError::NotFound);
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE shipments SET updated_at = ");
        builder.push_bind(Utc::now());

        if let Some(priority) = changes.priority {
            builder
                .push(", priority = ")
                .push_bind(priority.to_string());
        }
        if let Some(v) = &changes.origin_address {
            builder.push(", origin_address = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.origin_city {
            builder.push(", origin_city = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.destination_address {
            builder
                .push(", destination_address = ")
                .push_bind(v.clone());
        }
        if let Some(v) = &changes.destination_city {
            builder.push(", destination_city = ").push_bind(v.clone());
        }
        if let Some(v) = changes.weight_kg {
            builder.push(", weight_kg = ").push_bind(v);
        }
        if let Some(v) = changes.declared_value {
            builder.push(", declared_value = ").push_bind(v);
        }
        if let Some(v) = &changes.description {
            builder.push(", description = ").push_bind(v.clone());
        }

        builder.push(" WHERE id = ").push_bind(id.as_i64());

        let result = builder.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a shipment and (via cascade) its tracking entries.
    ///
    /// # Returns
    ///
    /// Returns `true` if the shipment was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ShipmentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shipments WHERE id = ?")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Append a tracking entry and update the denormalized status as a unit.
    ///
    /// The status update is compare-and-set against `expected`: if another
    /// transition committed in between, nothing is written and the call
    /// fails with `Conflict` so the caller can re-read and retry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the shipment's status no longer
    /// equals `expected` (or the shipment is gone).
    pub async fn append_transition(
        &self,
        id: ShipmentId,
        expected: ShipmentStatus,
        new_status: ShipmentStatus,
        location: &str,
        description: &str,
    ) -> Result<TrackingEntry, RepositoryError> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE shipments SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(new_status.to_string())
        .bind(now)
        .bind(id.as_i64())
        .bind(expected.to_string())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(RepositoryError::Conflict(
                "shipment status changed concurrently".to_owned(),
            ));
        }

        let inserted = sqlx::query(
            "INSERT INTO tracking_entries (shipment_id, status, location, description, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.as_i64())
        .bind(new_status.to_string())
        .bind(location)
        .bind(description)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TrackingEntry {
            id: TrackingEntryId::new(inserted.last_insert_rowid()),
            shipment_id: id,
            status: new_status,
            location: location.to_owned(),
            description: description.to_owned(),
            timestamp: now,
        })
    }

    /// List a shipment's tracking entries in chronological order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn list_tracking(
        &self,
        shipment_id: ShipmentId,
    ) -> Result<Vec<TrackingEntry>, RepositoryError> {
        let rows: Vec<TrackingEntryRow> = sqlx::query_as(
            "SELECT id, shipment_id, status, location, description, timestamp
             FROM tracking_entries WHERE shipment_id = ?
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(shipment_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TrackingEntryRow::into_entry).collect()
    }

    // =========================================================================
    // Aggregations (dashboard)
    // =========================================================================

    /// Total number of shipments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_total(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shipments")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Shipment counts grouped by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn status_counts(&self) -> Result<Vec<(ShipmentStatus, i64)>, RepositoryError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM shipments GROUP BY status")
                .fetch_all(self.pool)
                .await?;

        rows.into_iter()
            .map(|(status, count)| {
                let status: ShipmentStatus =
                    status.parse().map_err(RepositoryError::DataCorruption)?;
                Ok((status, count))
            })
            .collect()
    }

    /// Sum of declared values across all shipments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn declared_value_total(&self) -> Result<f64, RepositoryError> {
        let total: f64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(declared_value), 0.0) FROM shipments")
                .fetch_one(self.pool)
                .await?;
        Ok(total)
    }

    /// Sum of declared values for shipments created at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn declared_value_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<f64, RepositoryError> {
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(declared_value), 0.0) FROM shipments WHERE created_at >= ?",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }

    /// Most frequent destination cities with their shipment counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_destinations(
        &self,
        limit: i64,
    ) -> Result<Vec<(String, i64)>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT destination_city, COUNT(*) AS shipment_count FROM shipments
             GROUP BY destination_city ORDER BY shipment_count DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
