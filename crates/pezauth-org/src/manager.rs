//! Org allocation for a single user.
//!
//! [`OrgManager::safe_create`] walks a small state machine:
//!
//! ```text
//! NoOrg ──reserve──▶ ReservationPending ──provision+persist──▶ OrgCreated
//!   ▲                         │
//!   │ (record inactive        └──failure──▶ AllocationFailed
//!   │  or missing)
//! show ──active record──▶ OrgExists
//! ```
//!
//! Nothing is locked between the lookup and the upsert. Two concurrent
//! calls for the same user can both provision, and the later upsert
//! replaces the earlier record.

use chrono::Utc;
use pezauth_core::{OrgSelector, Persistence, PivotOrg};
use pezauth_keygen::{CommandExecutor, GuidMaker, KeyGen};
use tracing::{debug, info, instrument, warn};

use crate::config::OrgConfig;
use crate::error::OrgError;
use crate::provisioning::{AuthRequestCreator, OrgRequest, provision_org};
use crate::token::TokenSource;

const RESERVATION_DETAILS: &str = "org allocation in progress";

/// Where an allocation attempt currently stands.
#[derive(Debug)]
pub enum AllocationState {
    NoOrg,
    OrgExists(PivotOrg),
    ReservationPending { guid: String },
    OrgCreated(PivotOrg),
    AllocationFailed(OrgError),
}

impl AllocationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoOrg => "no_org",
            Self::OrgExists(_) => "org_exists",
            Self::ReservationPending { .. } => "reservation_pending",
            Self::OrgCreated(_) => "org_created",
            Self::AllocationFailed(_) => "allocation_failed",
        }
    }
}

/// Allocates, shows and releases the org of one user.
///
/// Built per request from shared, long-lived collaborators.
pub struct OrgManager<'a, P, E, G, A> {
    username: String,
    tokens: &'a dyn TokenSource,
    store: &'a P,
    keygen: &'a KeyGen<E, G>,
    client: &'a A,
    config: &'a OrgConfig,
}

impl<'a, P, E, G, A> OrgManager<'a, P, E, G, A>
where
    P: Persistence,
    E: CommandExecutor,
    G: GuidMaker,
    A: AuthRequestCreator,
{
    pub fn new(
        username: impl Into<String>,
        tokens: &'a dyn TokenSource,
        store: &'a P,
        keygen: &'a KeyGen<E, G>,
        client: &'a A,
        config: &'a OrgConfig,
    ) -> Self {
        Self {
            username: username.into(),
            tokens,
            store,
            keygen,
            client,
            config,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn selector(&self) -> OrgSelector {
        OrgSelector::owned_by(self.username.as_str())
    }

    /// The user's org record.
    #[instrument(skip_all, fields(username = %self.username))]
    pub async fn show(&self) -> Result<PivotOrg, OrgError> {
        self.store.find_one(&self.selector()).await.map_err(|e| {
            if e.is_not_found() {
                OrgError::NotFound {
                    username: self.username.clone(),
                }
            } else {
                OrgError::ShowFailed(e)
            }
        })
    }

    /// Provision a new org and record it, replacing any existing record.
    #[instrument(skip_all, fields(username = %self.username))]
    pub async fn create(&self) -> Result<PivotOrg, OrgError> {
        let request = OrgRequest {
            name: self.config.org_name_for(&self.username),
            username: self.username.clone(),
            space: self.config.default_space.clone(),
        };
        let provisioned = provision_org(self.client, self.tokens, &request)
            .await
            .map_err(OrgError::ProvisioningFailed)?;

        let now = Utc::now();
        let org = PivotOrg {
            email: self.username.clone(),
            org_name: provisioned.name,
            org_guid: provisioned.guid,
            active: true,
            details: provisioned
                .space_guid
                .map(|guid| format!("default space {guid}"))
                .unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .upsert(&self.selector(), &org)
            .await
            .map_err(OrgError::PersistFailed)?;

        info!(org_guid = %org.org_guid, org_name = %org.org_name, "Allocated org");
        Ok(org)
    }

    /// Return the user's active org, allocating one if there is none.
    #[instrument(skip_all, fields(username = %self.username))]
    pub async fn safe_create(&self) -> Result<PivotOrg, OrgError> {
        let mut state = match self.show().await {
            Ok(org) if org.active => AllocationState::OrgExists(org),
            Ok(org) => {
                debug!(org_guid = %org.org_guid, "Existing org is inactive");
                AllocationState::NoOrg
            }
            Err(OrgError::NotFound { .. }) => AllocationState::NoOrg,
            Err(e) => AllocationState::AllocationFailed(e),
        };

        loop {
            debug!(state = state.name(), "Allocation state");
            state = match state {
                AllocationState::OrgExists(org) => {
                    info!(org_guid = %org.org_guid, "Org already allocated");
                    return Ok(org);
                }
                AllocationState::OrgCreated(org) => return Ok(org),
                AllocationState::AllocationFailed(e) => return Err(e),
                AllocationState::NoOrg => {
                    match self.keygen.create(&self.username, RESERVATION_DETAILS).await {
                        Ok(guid) => AllocationState::ReservationPending { guid },
                        Err(e) => {
                            AllocationState::AllocationFailed(OrgError::KeyGenerationFailed(e))
                        }
                    }
                }
                AllocationState::ReservationPending { guid } => match self.create().await {
                    Ok(org) => AllocationState::OrgCreated(org),
                    Err(e) => {
                        debug!(%guid, "Allocation failed, releasing reservation");
                        self.release(&guid).await;
                        AllocationState::AllocationFailed(e)
                    }
                },
            };
        }
    }

    /// Delete the user's org record and any reservation they hold.
    #[instrument(skip_all, fields(username = %self.username))]
    pub async fn remove(&self) -> Result<(), OrgError> {
        self.store
            .remove(&self.selector())
            .await
            .map_err(OrgError::RemoveFailed)?;
        self.release_all().await;
        info!("Released org");
        Ok(())
    }

    /// Drop this attempt's reservation only. Concurrent attempts for the
    /// same user keep theirs. Best-effort: a reservation left behind
    /// expires with its TTL.
    async fn release(&self, guid: &str) {
        match self.keygen.release(&self.username, guid).await {
            Ok(released) => debug!(%guid, released, "Released reservation"),
            Err(e) => warn!(%guid, error = %e, "Failed to release reservation"),
        }
    }

    async fn release_all(&self) {
        match self.keygen.delete(&self.username).await {
            Ok(deleted) => debug!(deleted, "Released reservations"),
            Err(e) => warn!(error = %e, "Failed to release reservations"),
        }
    }
}
