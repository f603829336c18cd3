// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and API.
//!
//! Role-specific data lives in [`RoleProfile`], internally tagged by the
//! `role` field, so a vendor without a business name or a driver without
//! vehicle info is rejected when the document is decoded.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vendor,
    Driver,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Vendor => "vendor",
            Role::Driver => "driver",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Approval fields shared by vendors and drivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub approval_status: ApprovalStatus,
    /// Present only while rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<String>,
}

impl Approval {
    pub fn pending() -> Self {
        Self {
            approval_status: ApprovalStatus::Pending,
            rejection_reason: None,
            approved_at: None,
            rejected_at: None,
        }
    }

    pub fn approved(at: &str) -> Self {
        Self {
            approval_status: ApprovalStatus::Approved,
            approved_at: Some(at.to_string()),
            ..Self::pending()
        }
    }
}

/// Role plus the attributes only that role carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleProfile {
    #[serde(rename_all = "camelCase")]
    Vendor {
        #[serde(flatten)]
        approval: Approval,
        business_name: String,
        business_category: String,
        business_location: String,
    },
    #[serde(rename_all = "camelCase")]
    Driver {
        #[serde(flatten)]
        approval: Approval,
        vehicle_info: String,
        #[serde(default)]
        is_available: bool,
    },
    Admin,
}

/// User profile stored in Firestore (`users/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity provider user ID (also used as document ID)
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Mirror of the identity provider's flag, refreshed on sign-in
    #[serde(default)]
    pub email_verified: bool,
    /// Push delivery token registered by the user's device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub role: RoleProfile,
}

impl UserProfile {
    pub fn role(&self) -> Role {
        match self.role {
            RoleProfile::Vendor { .. } => Role::Vendor,
            RoleProfile::Driver { .. } => Role::Driver,
            RoleProfile::Admin => Role::Admin,
        }
    }

    pub fn approval(&self) -> Option<&Approval> {
        match &self.role {
            RoleProfile::Vendor { approval, .. } | RoleProfile::Driver { approval, .. } => {
                Some(approval)
            }
            RoleProfile::Admin => None,
        }
    }

    pub fn approval_mut(&mut self) -> Option<&mut Approval> {
        match &mut self.role {
            RoleProfile::Vendor { approval, .. } | RoleProfile::Driver { approval, .. } => {
                Some(approval)
            }
            RoleProfile::Admin => None,
        }
    }

    /// Admins have no stored status and count as approved.
    pub fn approval_status(&self) -> ApprovalStatus {
        self.approval()
            .map(|a| a.approval_status)
            .unwrap_or(ApprovalStatus::Approved)
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.approval().and_then(|a| a.rejection_reason.as_deref())
    }

    /// Whether the account may create or accept pickups.
    pub fn can_transact(&self) -> bool {
        self.approval_status() == ApprovalStatus::Approved
    }
}
