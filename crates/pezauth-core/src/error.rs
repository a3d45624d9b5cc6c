//! Error types for the persistence boundary.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed store error, preserved as-is when it crosses the persistence
/// boundary.
pub type StoreError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Sentinel returned for every failed upsert, whatever the store said.
    #[error("cannot add organization record")]
    CannotAddOrgRecord,

    #[error(transparent)]
    Store(StoreError),
}

impl PersistenceError {
    /// Wrap a raw store error without altering its message or type.
    pub fn store<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Recover the concrete store error carried by [`Self::Store`].
    pub fn store_error<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Store(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
