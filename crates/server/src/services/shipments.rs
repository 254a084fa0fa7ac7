//! Shipment lifecycle service.
//!
//! Owns the status state machine and the append-only tracking ledger.
//! Every status change goes through [`ShipmentService::apply_transition`],
//! which enforces the terminal-state rule and retries optimistically when a
//! concurrent transition wins the race.
//!
//! Visibility rule: a shipment outside the caller's visibility is reported
//! as missing, not forbidden. Forbidden is reserved for operations on
//! shipments the caller can legitimately see.

use rand::Rng;
use sqlx::SqlitePool;
use thiserror::Error;

use parcelflow_core::{
    ShipmentId, ShipmentPriority, ShipmentStatus, TrackingNumber, TrackingNumberError, UserId,
    UserRole,
};

use crate::db::shipments::{NewShipmentRecord, ShipmentFieldChanges, ShipmentFilter};
use crate::db::{RepositoryError, ShipmentRepository};
use crate::models::{Shipment, TrackingEntry, User};
use crate::services::policy::{AccessDenied, Action, authorize};

/// Location recorded on the initial ledger entry.
const INITIAL_LOCATION: &str = "Origin Facility";
/// Description recorded on the initial ledger entry.
const INITIAL_DESCRIPTION: &str = "Shipment created and pending pickup";
/// Location recorded when a status change arrives without one.
const PROCESSING_LOCATION: &str = "Processing Facility";

/// Attempts to allocate a random tracking number before giving up.
const MAX_GENERATION_ATTEMPTS: usize = 4;
/// Attempts to apply a transition against concurrent writers.
const MAX_TRANSITION_RETRIES: usize = 3;

/// Input for creating a shipment.
#[derive(Debug)]
pub struct NewShipment {
    pub tracking_number: Option<String>,
    pub priority: ShipmentPriority,
    pub origin_address: String,
    pub origin_city: String,
    pub destination_address: String,
    pub destination_city: String,
    pub weight_kg: f64,
    pub declared_value: Option<f64>,
    pub description: Option<String>,
    pub owner_id: Option<UserId>,
}

/// Input for appending a tracking entry.
#[derive(Debug)]
pub struct TrackingUpdate {
    pub status: ShipmentStatus,
    pub location: String,
    pub description: String,
}

/// Errors that can occur during shipment operations.
#[derive(Debug, Error)]
pub enum ShipmentError {
    /// The shipment doesn't exist, or is invisible to the caller.
    #[error("shipment not found")]
    NotFound,

    /// The caller may see the shipment but not perform this operation.
    #[error(transparent)]
    Denied(#[from] AccessDenied),

    /// The shipment is in a terminal state; no transitions are accepted.
    #[error("no transitions allowed from terminal status '{0}'")]
    InvalidTransition(ShipmentStatus),

    /// The requested tracking number is already in use.
    #[error("tracking number already exists")]
    DuplicateTrackingNumber,

    /// The caller-supplied tracking number is malformed.
    #[error("invalid tracking number: {0}")]
    InvalidTrackingNumber(#[from] TrackingNumberError),

    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Shipment lifecycle service.
pub struct ShipmentService<'a> {
    shipments: ShipmentRepository<'a>,
}

impl<'a> ShipmentService<'a> {
    /// Create a new shipment service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            shipments: ShipmentRepository::new(pool),
        }
    }

    /// Create a shipment with its initial `pending` ledger entry.
    ///
    /// Customers always become the owner of shipments they create; staff may
    /// assign an explicit owner or leave it unset. A missing tracking number
    /// is generated (collision-checked); a supplied one must be unused.
    ///
    /// # Errors
    ///
    /// Returns `Denied` if the caller may not create this shipment,
    /// `Validation` on out-of-range fields, `InvalidTrackingNumber` /
    /// `DuplicateTrackingNumber` on tracking-number problems.
    pub async fn create(&self, new: NewShipment, actor: &User) -> Result<Shipment, ShipmentError> {
        authorize(actor.role, Action::ShipmentCreate, new.owner_id, actor.id)?;

        validate_shipment_fields(new.weight_kg, new.declared_value)?;
        for (field, value) in [
            ("origin_address", &new.origin_address),
            ("origin_city", &new.origin_city),
            ("destination_address", &new.destination_address),
            ("destination_city", &new.destination_city),
        ] {
            if value.trim().is_empty() {
                return Err(ShipmentError::Validation(format!("{field} is required")));
            }
        }

        let owner_id = if actor.role == UserRole::Customer {
            Some(actor.id)
        } else {
            new.owner_id
        };

        let tracking_number = match new.tracking_number.as_deref() {
            Some(raw) => {
                let tracking_number = TrackingNumber::parse(raw)?;
                if self
                    .shipments
                    .tracking_number_exists(&tracking_number)
                    .await?
                {
                    return Err(ShipmentError::DuplicateTrackingNumber);
                }
                tracking_number
            }
            None => self.allocate_tracking_number().await?,
        };

        let shipment = self
            .shipments
            .create(&NewShipmentRecord {
                tracking_number: &tracking_number,
                priority: new.priority,
                origin_address: &new.origin_address,
                origin_city: &new.origin_city,
                destination_address: &new.destination_address,
                destination_city: &new.destination_city,
                weight_kg: new.weight_kg,
                declared_value: new.declared_value,
                description: new.description.as_deref(),
                owner_id,
                initial_location: INITIAL_LOCATION,
                initial_description: INITIAL_DESCRIPTION,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ShipmentError::DuplicateTrackingNumber,
                other => ShipmentError::Repository(other),
            })?;

        tracing::info!(
            shipment_id = %shipment.id,
            tracking_number = %shipment.tracking_number,
            "shipment created"
        );
        Ok(shipment)
    }

    /// Get a shipment visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` both for missing shipments and for shipments the
    /// caller may not see.
    pub async fn get(&self, id: ShipmentId, actor: &User) -> Result<Shipment, ShipmentError> {
        let shipment = self
            .shipments
            .get(id)
            .await?
            .ok_or(ShipmentError::NotFound)?;

        authorize(actor.role, Action::ShipmentRead, shipment.owner_id, actor.id)
            .map_err(|_| ShipmentError::NotFound)?;

        Ok(shipment)
    }

    /// Look up a shipment by tracking number. Public: no owner filter.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no shipment carries this tracking number.
    pub async fn track(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Shipment, ShipmentError> {
        self.shipments
            .get_by_tracking_number(tracking_number)
            .await?
            .ok_or(ShipmentError::NotFound)
    }

    /// List shipments visible to the caller.
    ///
    /// Customers are always scoped to their own shipments regardless of the
    /// requested filter; staff filters pass through.
    ///
    /// # Errors
    ///
    /// Returns `Repository` on store failures.
    pub async fn list(
        &self,
        mut filter: ShipmentFilter,
        actor: &User,
    ) -> Result<Vec<Shipment>, ShipmentError> {
        if actor.role == UserRole::Customer {
            filter.owner_id = Some(actor.id);
        }

        authorize(actor.role, Action::ShipmentRead, filter.owner_id, actor.id)?;

        Ok(self.shipments.list(&filter).await?)
    }

    /// Apply field changes and (optionally) a status change.
    ///
    /// The status change, when present, goes through the state machine and
    /// appends a ledger entry; plain field edits never touch the ledger.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for invisible shipments, `Denied` when the caller
    /// sees the shipment but may not update it, `InvalidTransition` when a
    /// status change is requested from a terminal state.
    pub async fn update(
        &self,
        id: ShipmentId,
        changes: ShipmentFieldChanges,
        new_status: Option<ShipmentStatus>,
        actor: &User,
    ) -> Result<Shipment, ShipmentError> {
        let shipment = self.get(id, actor).await?;
        authorize(actor.role, Action::ShipmentUpdate, shipment.owner_id, actor.id)?;

        if let Some(weight) = changes.weight_kg
            && weight <= 0.0
        {
            return Err(ShipmentError::Validation(
                "weight_kg must be positive".to_owned(),
            ));
        }
        if let Some(value) = changes.declared_value
            && value <= 0.0
        {
            return Err(ShipmentError::Validation(
                "declared_value must be positive".to_owned(),
            ));
        }

        if let Some(status) = new_status {
            let update = TrackingUpdate {
                status,
                location: PROCESSING_LOCATION.to_owned(),
                description: format!("Status updated to {status}"),
            };
            self.apply_transition(shipment, &update).await?;
        }

        self.shipments
            .update_fields(id, &changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ShipmentError::NotFound,
                other => ShipmentError::Repository(other),
            })
    }

    /// Delete a shipment and its ledger.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for invisible shipments and `Denied` when the
    /// caller sees the shipment but may not delete it.
    pub async fn delete(&self, id: ShipmentId, actor: &User) -> Result<(), ShipmentError> {
        let shipment = self.get(id, actor).await?;
        authorize(actor.role, Action::ShipmentDelete, shipment.owner_id, actor.id)?;

        if !self.shipments.delete(id).await? {
            return Err(ShipmentError::NotFound);
        }

        tracing::info!(shipment_id = %id, "shipment deleted");
        Ok(())
    }

    /// Read a shipment's tracking ledger, oldest entry first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` both for missing shipments and for shipments the
    /// caller may not see.
    pub async fn tracking(
        &self,
        id: ShipmentId,
        actor: &User,
    ) -> Result<Vec<TrackingEntry>, ShipmentError> {
        let shipment = self
            .shipments
            .get(id)
            .await?
            .ok_or(ShipmentError::NotFound)?;

        authorize(actor.role, Action::TrackingRead, shipment.owner_id, actor.id)
            .map_err(|_| ShipmentError::NotFound)?;

        Ok(self.shipments.list_tracking(id).await?)
    }

    /// Append a tracking entry, transitioning the shipment's status.
    ///
    /// An update whose status equals the current status still appends an
    /// entry: it is an explicit re-affirmation of the state, not a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for invisible shipments, `Denied` when the caller
    /// may not append, and `InvalidTransition` from terminal states.
    pub async fn add_tracking(
        &self,
        id: ShipmentId,
        update: TrackingUpdate,
        actor: &User,
    ) -> Result<TrackingEntry, ShipmentError> {
        let shipment = self
            .shipments
            .get(id)
            .await?
            .ok_or(ShipmentError::NotFound)?;

        // Invisible shipments stay invisible even to append attempts.
        authorize(actor.role, Action::TrackingRead, shipment.owner_id, actor.id)
            .map_err(|_| ShipmentError::NotFound)?;
        authorize(actor.role, Action::TrackingAppend, shipment.owner_id, actor.id)?;

        if update.location.trim().is_empty() {
            return Err(ShipmentError::Validation("location is required".to_owned()));
        }

        self.apply_transition(shipment, &update).await
    }

    /// Run one transition through the state machine.
    ///
    /// Terminal states accept nothing. The ledger append and the
    /// denormalized status update commit as a unit; when a concurrent
    /// transition invalidates our read, re-read and retry.
    async fn apply_transition(
        &self,
        mut shipment: Shipment,
        update: &TrackingUpdate,
    ) -> Result<TrackingEntry, ShipmentError> {
        for _ in 0..MAX_TRANSITION_RETRIES {
            if shipment.status.is_terminal() {
                return Err(ShipmentError::InvalidTransition(shipment.status));
            }

            match self
                .shipments
                .append_transition(
                    shipment.id,
                    shipment.status,
                    update.status,
                    &update.location,
                    &update.description,
                )
                .await
            {
                Ok(entry) => {
                    tracing::info!(
                        shipment_id = %shipment.id,
                        status = %entry.status,
                        "shipment status transitioned"
                    );
                    return Ok(entry);
                }
                Err(RepositoryError::Conflict(_)) => {
                    shipment = self
                        .shipments
                        .get(shipment.id)
                        .await?
                        .ok_or(ShipmentError::NotFound)?;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(ShipmentError::Repository(RepositoryError::Conflict(
            "shipment is being updated concurrently".to_owned(),
        )))
    }

    /// Allocate an unused random tracking number.
    async fn allocate_tracking_number(&self) -> Result<TrackingNumber, ShipmentError> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = generate_tracking_number(&mut rand::rng());
            if !self.shipments.tracking_number_exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(ShipmentError::Repository(RepositoryError::Conflict(
            "could not allocate a unique tracking number".to_owned(),
        )))
    }
}

/// Generate a `SHP`-prefixed candidate from eight random hex digits.
fn generate_tracking_number<R: Rng>(rng: &mut R) -> TrackingNumber {
    let candidate = format!("SHP{:08X}", rng.random::<u32>());
    TrackingNumber::parse(&candidate)
        .expect("generated tracking numbers are always uppercase alphanumeric")
}

/// Range checks shared by create and update.
fn validate_shipment_fields(
    weight_kg: f64,
    declared_value: Option<f64>,
) -> Result<(), ShipmentError> {
    if weight_kg <= 0.0 {
        return Err(ShipmentError::Validation(
            "weight_kg must be positive".to_owned(),
        ));
    }
    if let Some(value) = declared_value
        && value <= 0.0
    {
        return Err(ShipmentError::Validation(
            "declared_value must be positive".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::users::NewUser;
    use crate::db::{MIGRATOR, UserRepository};
    use parcelflow_core::{Email, Username};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        MIGRATOR.run(&pool).await.unwrap();
        pool
    }

    async fn make_user(pool: &SqlitePool, username: &str, role: UserRole) -> User {
        UserRepository::new(pool)
            .create(&NewUser {
                username: &Username::parse(username).unwrap(),
                email: &Email::parse(&format!("{username}@example.com")).unwrap(),
                password_hash: "unused",
                full_name: None,
                role,
            })
            .await
            .unwrap()
    }

    fn basic_shipment(owner_id: Option<UserId>) -> NewShipment {
        NewShipment {
            tracking_number: None,
            priority: ShipmentPriority::Normal,
            origin_address: "1 Dock Rd".to_owned(),
            origin_city: "Rotterdam".to_owned(),
            destination_address: "9 Harbor Ln".to_owned(),
            destination_city: "Oslo".to_owned(),
            weight_kg: 4.2,
            declared_value: Some(120.0),
            description: Some("glassware".to_owned()),
            owner_id,
        }
    }

    fn update(status: ShipmentStatus) -> TrackingUpdate {
        TrackingUpdate {
            status,
            location: "Hub 7".to_owned(),
            description: format!("moved to {status}"),
        }
    }

    #[tokio::test]
    async fn test_create_yields_single_pending_entry() {
        let pool = test_pool().await;
        let manager = make_user(&pool, "mgr", UserRole::Manager).await;
        let service = ShipmentService::new(&pool);

        let shipment = service.create(basic_shipment(None), &manager).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert!(shipment.tracking_number.as_str().starts_with("SHP"));

        let ledger = service.tracking(shipment.id, &manager).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.first().unwrap().status, ShipmentStatus::Pending);
        assert_eq!(ledger.first().unwrap().location, "Origin Facility");
    }

    #[tokio::test]
    async fn test_lifecycle_to_delivered() {
        let pool = test_pool().await;
        let manager = make_user(&pool, "mgr", UserRole::Manager).await;
        let service = ShipmentService::new(&pool);

        let shipment = service.create(basic_shipment(None), &manager).await.unwrap();

        service
            .add_tracking(shipment.id, update(ShipmentStatus::InTransit), &manager)
            .await
            .unwrap();
        service
            .add_tracking(shipment.id, update(ShipmentStatus::Delivered), &manager)
            .await
            .unwrap();

        let current = service.get(shipment.id, &manager).await.unwrap();
        assert_eq!(current.status, ShipmentStatus::Delivered);

        let ledger = service.tracking(shipment.id, &manager).await.unwrap();
        let statuses: Vec<ShipmentStatus> = ledger.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                ShipmentStatus::Pending,
                ShipmentStatus::InTransit,
                ShipmentStatus::Delivered
            ]
        );
    }

    #[tokio::test]
    async fn test_terminal_state_rejects_transitions() {
        let pool = test_pool().await;
        let manager = make_user(&pool, "mgr", UserRole::Manager).await;
        let service = ShipmentService::new(&pool);

        let shipment = service.create(basic_shipment(None), &manager).await.unwrap();
        service
            .add_tracking(shipment.id, update(ShipmentStatus::Delivered), &manager)
            .await
            .unwrap();

        let result = service
            .add_tracking(shipment.id, update(ShipmentStatus::InTransit), &manager)
            .await;
        assert!(matches!(
            result,
            Err(ShipmentError::InvalidTransition(ShipmentStatus::Delivered))
        ));
    }

    #[tokio::test]
    async fn test_equal_status_update_appends_entry() {
        let pool = test_pool().await;
        let manager = make_user(&pool, "mgr", UserRole::Manager).await;
        let service = ShipmentService::new(&pool);

        let shipment = service.create(basic_shipment(None), &manager).await.unwrap();
        service
            .add_tracking(shipment.id, update(ShipmentStatus::Pending), &manager)
            .await
            .unwrap();

        let ledger = service.tracking(shipment.id, &manager).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|e| e.status == ShipmentStatus::Pending));
    }

    #[tokio::test]
    async fn test_duplicate_tracking_number_conflicts() {
        let pool = test_pool().await;
        let manager = make_user(&pool, "mgr", UserRole::Manager).await;
        let service = ShipmentService::new(&pool);

        let mut first = basic_shipment(None);
        first.tracking_number = Some("SHPAAAA1111".to_owned());
        service.create(first, &manager).await.unwrap();

        let mut second = basic_shipment(None);
        second.tracking_number = Some("SHPAAAA1111".to_owned());
        let result = service.create(second, &manager).await;
        assert!(matches!(result, Err(ShipmentError::DuplicateTrackingNumber)));
    }

    #[tokio::test]
    async fn test_customer_cannot_see_foreign_shipment() {
        let pool = test_pool().await;
        let manager = make_user(&pool, "mgr", UserRole::Manager).await;
        let customer = make_user(&pool, "cust", UserRole::Customer).await;
        let service = ShipmentService::new(&pool);

        let shipment = service.create(basic_shipment(None), &manager).await.unwrap();

        // Reported as missing, not forbidden.
        let result = service.get(shipment.id, &customer).await;
        assert!(matches!(result, Err(ShipmentError::NotFound)));
    }

    #[tokio::test]
    async fn test_customer_owns_created_shipment_and_cannot_mutate() {
        let pool = test_pool().await;
        let customer = make_user(&pool, "cust", UserRole::Customer).await;
        let service = ShipmentService::new(&pool);

        let shipment = service
            .create(basic_shipment(None), &customer)
            .await
            .unwrap();
        assert_eq!(shipment.owner_id, Some(customer.id));

        // Customers never mutate, even their own shipments.
        let result = service
            .update(
                shipment.id,
                ShipmentFieldChanges::default(),
                Some(ShipmentStatus::Cancelled),
                &customer,
            )
            .await;
        assert!(matches!(result, Err(ShipmentError::Denied(_))));
    }

    #[tokio::test]
    async fn test_employee_cannot_delete() {
        let pool = test_pool().await;
        let manager = make_user(&pool, "mgr", UserRole::Manager).await;
        let employee = make_user(&pool, "emp", UserRole::Employee).await;
        let service = ShipmentService::new(&pool);

        let shipment = service.create(basic_shipment(None), &manager).await.unwrap();

        let result = service.delete(shipment.id, &employee).await;
        assert!(matches!(result, Err(ShipmentError::Denied(_))));

        // But employees do append tracking entries.
        service
            .add_tracking(shipment.id, update(ShipmentStatus::Confirmed), &employee)
            .await
            .unwrap();
    }

    #[test]
    fn test_generated_tracking_number_shape() {
        let mut rng = rand::rng();
        for _ in 0..16 {
            let tn = generate_tracking_number(&mut rng);
            assert!(tn.as_str().starts_with("SHP"));
            assert_eq!(tn.as_str().len(), 11);
        }
    }
}
