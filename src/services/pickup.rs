// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pickup requests and driver availability.
//!
//! Only approved vendors schedule and only approved drivers accept. Each
//! state change is written first and fanned out afterwards.

use crate::db::{collections, fields, from_document, to_document, DocumentStore, Filter, Query};
use crate::error::AppError;
use crate::models::{
    AvailabilityEntry, CancellationRecord, Pickup, PickupStatus, Role, RoleProfile, UserProfile,
};
use crate::services::fanout::{FanoutEvent, NotificationFanout, PickupSummary};
use crate::services::profile::load_profile;
use crate::time_utils::now_rfc3339;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPickup {
    #[validate(length(min = 1, max = 300, message = "Address is required"))]
    pub address: String,
    #[validate(range(min = 1, message = "Bottle count must be at least 1"))]
    pub bottle_count: u32,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<&Pickup> for PickupSummary {
    fn from(p: &Pickup) -> Self {
        PickupSummary {
            id: p.id.clone(),
            vendor_id: p.vendor_id.clone(),
            vendor_name: p.vendor_name.clone(),
            address: p.address.clone(),
            bottle_count: p.bottle_count,
        }
    }
}

fn require_role(profile: &UserProfile, role: Role) -> Result<(), AppError> {
    if profile.role() != role {
        return Err(AppError::Forbidden(format!("Only {}s can do this", role)));
    }
    if !profile.can_transact() {
        return Err(AppError::Forbidden(
            "Your account is waiting for approval".to_string(),
        ));
    }
    Ok(())
}

pub struct PickupService {
    store: Arc<dyn DocumentStore>,
    fanout: Arc<NotificationFanout>,
}

impl PickupService {
    pub fn new(store: Arc<dyn DocumentStore>, fanout: Arc<NotificationFanout>) -> Self {
        Self { store, fanout }
    }

    pub async fn get(&self, pickup_id: &str) -> Result<Pickup, AppError> {
        let doc = self
            .store
            .get(collections::PICKUPS, pickup_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pickup {}", pickup_id)))?;
        from_document(collections::PICKUPS, doc)
    }

    pub async fn schedule(&self, vendor_id: &str, request: NewPickup) -> Result<Pickup, AppError> {
        request.validate()?;
        let address = request.address.trim();
        if address.is_empty() {
            return Err(AppError::Validation("Address is required".to_string()));
        }

        let vendor = load_profile(self.store.as_ref(), vendor_id).await?;
        require_role(&vendor, Role::Vendor)?;

        let pickup = Pickup {
            id: uuid::Uuid::new_v4().to_string(),
            vendor_id: vendor.id.clone(),
            vendor_name: vendor.display_name.clone(),
            address: address.to_string(),
            bottle_count: request.bottle_count,
            status: PickupStatus::Pending,
            driver_id: None,
            driver_name: None,
            scheduled_for: request.scheduled_for,
            notes: request.notes,
            created_at: now_rfc3339(),
            accepted_at: None,
            completed_at: None,
        };
        self.store
            .set(collections::PICKUPS, &pickup.id, to_document(&pickup)?)
            .await?;

        self.fanout
            .dispatch(FanoutEvent::PickupScheduled {
                pickup: PickupSummary::from(&pickup),
            })
            .await;
        Ok(pickup)
    }

    pub async fn accept(&self, pickup_id: &str, driver_id: &str) -> Result<Pickup, AppError> {
        let driver = load_profile(self.store.as_ref(), driver_id).await?;
        require_role(&driver, Role::Driver)?;

        let mut pickup = self.get(pickup_id).await?;
        if pickup.status != PickupStatus::Pending {
            return Err(AppError::Validation(
                "This pickup is no longer available".to_string(),
            ));
        }

        let now = now_rfc3339();
        self.store
            .update(
                collections::PICKUPS,
                pickup_id,
                fields([
                    ("status", json!("accepted")),
                    ("driverId", json!(driver.id)),
                    ("driverName", json!(driver.display_name)),
                    ("acceptedAt", json!(now)),
                ]),
            )
            .await?;
        pickup.status = PickupStatus::Accepted;
        pickup.driver_id = Some(driver.id.clone());
        pickup.driver_name = Some(driver.display_name.clone());
        pickup.accepted_at = Some(now);
        tracing::info!(pickup_id, driver_id, "Pickup accepted");

        self.fanout
            .dispatch(FanoutEvent::PickupAccepted {
                pickup: PickupSummary::from(&pickup),
                driver_name: driver.display_name,
            })
            .await;
        Ok(pickup)
    }

    /// Load a pickup the driver is currently assigned to.
    async fn assigned(&self, pickup_id: &str, driver_id: &str) -> Result<Pickup, AppError> {
        let pickup = self.get(pickup_id).await?;
        if pickup.driver_id.as_deref() != Some(driver_id) {
            return Err(AppError::Forbidden(
                "This pickup is not assigned to you".to_string(),
            ));
        }
        if pickup.status != PickupStatus::Accepted {
            return Err(AppError::Validation(
                "Only accepted pickups can be changed".to_string(),
            ));
        }
        Ok(pickup)
    }

    pub async fn complete(&self, pickup_id: &str, driver_id: &str) -> Result<Pickup, AppError> {
        let mut pickup = self.assigned(pickup_id, driver_id).await?;

        let now = now_rfc3339();
        self.store
            .update(
                collections::PICKUPS,
                pickup_id,
                fields([("status", json!("completed")), ("completedAt", json!(now))]),
            )
            .await?;
        pickup.status = PickupStatus::Completed;
        pickup.completed_at = Some(now);
        tracing::info!(pickup_id, driver_id, "Pickup completed");

        self.fanout
            .dispatch(FanoutEvent::PickupCompleted {
                pickup: PickupSummary::from(&pickup),
                driver_name: pickup.driver_name.clone().unwrap_or_default(),
            })
            .await;
        Ok(pickup)
    }

    /// Driver backs out. The pickup goes back to the open pool.
    pub async fn cancel(
        &self,
        pickup_id: &str,
        driver_id: &str,
        reason: &str,
    ) -> Result<Pickup, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "A cancellation reason is required".to_string(),
            ));
        }

        let mut pickup = self.assigned(pickup_id, driver_id).await?;
        let driver_name = pickup.driver_name.clone().unwrap_or_default();

        let record = CancellationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            pickup_id: pickup.id.clone(),
            driver_id: driver_id.to_string(),
            vendor_id: pickup.vendor_id.clone(),
            reason: reason.to_string(),
            cancelled_at: now_rfc3339(),
        };
        self.store
            .set(collections::CANCELLATIONS, &record.id, to_document(&record)?)
            .await?;

        self.store
            .update(
                collections::PICKUPS,
                pickup_id,
                fields([
                    ("status", json!("pending")),
                    ("driverId", Value::Null),
                    ("driverName", Value::Null),
                    ("acceptedAt", Value::Null),
                ]),
            )
            .await?;
        pickup.status = PickupStatus::Pending;
        pickup.driver_id = None;
        pickup.driver_name = None;
        pickup.accepted_at = None;
        tracing::info!(pickup_id, driver_id, "Pickup cancelled by driver");

        self.fanout
            .dispatch(FanoutEvent::PickupCancelled {
                pickup: PickupSummary::from(&pickup),
                driver_name,
                reason: reason.to_string(),
            })
            .await;
        Ok(pickup)
    }

    /// Pickups relevant to a user, newest first.
    ///
    /// Vendors see their own, drivers see the open pool plus their
    /// assignments, admins see everything.
    pub async fn list_for(&self, user_id: &str, role: Role) -> Result<Vec<Pickup>, AppError> {
        let mut docs = match role {
            Role::Vendor => {
                self.store
                    .query(
                        collections::PICKUPS,
                        &Query::new()
                            .filter(Filter::eq("vendorId", user_id))
                            .order_desc("createdAt"),
                    )
                    .await?
            }
            Role::Driver => {
                let mut open = self
                    .store
                    .query(
                        collections::PICKUPS,
                        &Query::new().filter(Filter::eq("status", "pending")),
                    )
                    .await?;
                open.extend(
                    self.store
                        .query(
                            collections::PICKUPS,
                            &Query::new().filter(Filter::eq("driverId", user_id)),
                        )
                        .await?,
                );
                open
            }
            Role::Admin => {
                self.store
                    .query(collections::PICKUPS, &Query::new().order_desc("createdAt"))
                    .await?
            }
        };

        let query = Query::new().order_desc("createdAt");
        docs.sort_by(|a, b| query.compare(a, b));

        let mut pickups: Vec<Pickup> = docs
            .into_iter()
            .map(|doc| from_document(collections::PICKUPS, doc))
            .collect::<Result<_, _>>()?;
        pickups.dedup_by(|a, b| a.id == b.id);
        Ok(pickups)
    }

    pub async fn set_availability(
        &self,
        driver_id: &str,
        available: bool,
    ) -> Result<UserProfile, AppError> {
        let mut driver = load_profile(self.store.as_ref(), driver_id).await?;
        if driver.role() != Role::Driver {
            return Err(AppError::Forbidden(
                "Only drivers have availability".to_string(),
            ));
        }

        let now = now_rfc3339();
        self.store
            .update(
                collections::USERS,
                driver_id,
                fields([("isAvailable", json!(available)), ("updatedAt", json!(now))]),
            )
            .await?;

        let entry = AvailabilityEntry {
            id: uuid::Uuid::new_v4().to_string(),
            driver_id: driver_id.to_string(),
            is_available: available,
            changed_at: now.clone(),
        };
        self.store
            .set(
                collections::AVAILABILITY_HISTORY,
                &entry.id,
                to_document(&entry)?,
            )
            .await?;

        if let RoleProfile::Driver { is_available, .. } = &mut driver.role {
            *is_available = available;
        }
        driver.updated_at = Some(now);
        tracing::info!(driver_id, available, "Driver availability changed");
        Ok(driver)
    }
}
