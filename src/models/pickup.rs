// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pickup requests and the records written alongside them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickupStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

/// Pickup stored in `pickups/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pickup {
    pub id: String,
    pub vendor_id: String,
    pub vendor_name: String,
    pub address: String,
    pub bottle_count: u32,
    pub status: PickupStatus,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub accepted_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Driver cancellation, kept in `cancellations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRecord {
    pub id: String,
    pub pickup_id: String,
    pub driver_id: String,
    pub vendor_id: String,
    pub reason: String,
    pub cancelled_at: String,
}

/// Driver availability toggle, kept in `availabilityHistory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    pub id: String,
    pub driver_id: String,
    pub is_available: bool,
    pub changed_at: String,
}
