//! Org allocation error types.

use pezauth_core::error::PersistenceError;
use pezauth_keygen::KeyGenError;
use thiserror::Error;

/// Errors surfaced by [`OrgManager`](crate::OrgManager).
#[derive(Debug, Error)]
pub enum OrgError {
    #[error("no organization allocated for {username}")]
    NotFound { username: String },

    #[error("organization lookup failed: {0}")]
    ShowFailed(#[source] PersistenceError),

    #[error("reservation key generation failed: {0}")]
    KeyGenerationFailed(#[source] KeyGenError),

    #[error("organization provisioning failed: {0}")]
    ProvisioningFailed(#[source] ProvisioningError),

    /// Always carries the upsert sentinel.
    #[error(transparent)]
    PersistFailed(PersistenceError),

    #[error(transparent)]
    RemoveFailed(PersistenceError),
}

impl OrgError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors talking to the cloud controller.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("access token has expired")]
    TokenExpired,

    #[error("invalid cloud controller URL: {0}")]
    InvalidUrl(String),

    #[error("invalid request header: {0}")]
    InvalidHeader(String),

    #[error("cannot encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{path} returned {status}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("cannot decode {path} response: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors resolving the authenticated user's identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("domain {domain:?} is not allowed")]
    DomainNotAllowed { domain: Option<String> },

    #[error("no email in domain {domain}")]
    NoMatchingEmail { domain: String },

    #[error("user info request failed: {0}")]
    Fetch(#[from] ProvisioningError),
}
