//! PezAuth Core: domain models, error types and the persistence
//! traits shared by every other crate in the workspace.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{PersistenceError, PersistenceResult};
pub use models::pivot_org::{OrgSelector, PivotOrg};
pub use repository::{ChangeInfo, Collection, Persistence};
