//! Organization record model.
//!
//! A `PivotOrg` records which cloud organization was dispensed to which
//! user. Records are keyed by the owning user, so at most one record
//! (and therefore at most one active org) exists per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An organization allocated to a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotOrg {
    /// Owning user identity (their email).
    pub email: String,
    /// Organization name as registered with the cloud controller.
    pub org_name: String,
    /// Organization GUID assigned by the cloud controller.
    pub org_guid: String,
    /// Whether the allocation is live.
    pub active: bool,
    /// Free-text notes about the allocation.
    pub details: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Selects the organization record owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrgSelector {
    pub email: String,
}

impl OrgSelector {
    pub fn owned_by(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }

    pub fn matches(&self, org: &PivotOrg) -> bool {
        org.email == self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(email: &str) -> PivotOrg {
        let now = Utc::now();
        PivotOrg {
            email: email.into(),
            org_name: "pivot-alice".into(),
            org_guid: "guid-1".into(),
            active: true,
            details: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn selector_matches_owner_only() {
        let selector = OrgSelector::owned_by("alice@pivotal.io");
        assert!(selector.matches(&org("alice@pivotal.io")));
        assert!(!selector.matches(&org("bob@pivotal.io")));
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let value = serde_json::to_value(org("alice@pivotal.io")).unwrap();
        assert_eq!(value["org_guid"], "guid-1");
        assert_eq!(value["active"], true);
    }
}
