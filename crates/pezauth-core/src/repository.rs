//! Persistence trait definitions.
//!
//! [`Collection`] is the raw document-store handle and reports the
//! store's own error type. [`Persistence`] is the narrow domain surface
//! the org manager talks to; its errors never leak storage-engine types
//! except through the transparent remove path.

use crate::error::PersistenceResult;
use crate::models::pivot_org::{OrgSelector, PivotOrg};

/// Outcome of an upsert at the store level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeInfo {
    /// `true` when the upsert created a new document.
    pub inserted: bool,
}

/// A document-store collection holding organization records.
pub trait Collection: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the single record matching `selector`, if any.
    fn find_one(
        &self,
        selector: &OrgSelector,
    ) -> impl Future<Output = Result<Option<PivotOrg>, Self::Error>> + Send;

    /// Insert `update`, or replace the record matching `selector`.
    fn upsert(
        &self,
        selector: &OrgSelector,
        update: &PivotOrg,
    ) -> impl Future<Output = Result<ChangeInfo, Self::Error>> + Send;

    /// Delete the record matching `selector`.
    fn remove(&self, selector: &OrgSelector)
    -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Domain-facing persistence for organization records.
pub trait Persistence: Send + Sync {
    /// Returns [`PersistenceError::NotFound`](crate::PersistenceError::NotFound)
    /// when no record matches.
    fn find_one(
        &self,
        selector: &OrgSelector,
    ) -> impl Future<Output = PersistenceResult<PivotOrg>> + Send;

    /// Any failure is reported as
    /// [`PersistenceError::CannotAddOrgRecord`](crate::PersistenceError::CannotAddOrgRecord).
    fn upsert(
        &self,
        selector: &OrgSelector,
        update: &PivotOrg,
    ) -> impl Future<Output = PersistenceResult<()>> + Send;

    /// Failures carry the store's error unchanged.
    fn remove(&self, selector: &OrgSelector) -> impl Future<Output = PersistenceResult<()>> + Send;
}
