//! PezAuth Org: the org allocation state machine and the external
//! collaborators it drives: the cloud controller provisioning client,
//! the OAuth token source and user identity resolution.

pub mod config;
pub mod error;
pub mod identity;
pub mod manager;
pub mod provisioning;
pub mod token;

pub use config::OrgConfig;
pub use error::{IdentityError, OrgError, ProvisioningError};
pub use manager::{AllocationState, OrgManager};
pub use provisioning::{AuthRequestCreator, CloudControllerClient, HttpDoer};
pub use token::{OAuthTokens, TokenSource};
