//! Adapter from a raw [`Collection`] to the domain [`Persistence`]
//! surface.
//!
//! Upsert failures are collapsed into
//! [`PersistenceError::CannotAddOrgRecord`] so allocation logic only ever
//! branches on one sentinel. Remove failures are passed through with the
//! store's error intact.

use pezauth_core::error::{PersistenceError, PersistenceResult};
use pezauth_core::models::pivot_org::{OrgSelector, PivotOrg};
use pezauth_core::repository::{Collection, Persistence};
use tracing::{debug, warn};

const ENTITY: &str = "pivot_org";

/// Persistence over any organization [`Collection`].
#[derive(Debug, Clone)]
pub struct CollectionWrapper<C> {
    collection: C,
}

impl<C: Collection> CollectionWrapper<C> {
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }
}

impl<C: Collection> Persistence for CollectionWrapper<C> {
    async fn find_one(&self, selector: &OrgSelector) -> PersistenceResult<PivotOrg> {
        self.collection
            .find_one(selector)
            .await
            .map_err(PersistenceError::store)?
            .ok_or_else(|| PersistenceError::NotFound {
                entity: ENTITY.into(),
                id: selector.email.clone(),
            })
    }

    async fn upsert(&self, selector: &OrgSelector, update: &PivotOrg) -> PersistenceResult<()> {
        match self.collection.upsert(selector, update).await {
            Ok(info) => {
                debug!(email = %selector.email, inserted = info.inserted, "Upserted org record");
                Ok(())
            }
            Err(err) => {
                warn!(email = %selector.email, error = %err, "Org record upsert failed");
                Err(PersistenceError::CannotAddOrgRecord)
            }
        }
    }

    async fn remove(&self, selector: &OrgSelector) -> PersistenceResult<()> {
        self.collection
            .remove(selector)
            .await
            .map_err(PersistenceError::store)
    }
}
