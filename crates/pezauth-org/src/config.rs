//! Org allocation configuration.

use std::time::Duration;

/// Configuration for org allocation.
#[derive(Debug, Clone)]
pub struct OrgConfig {
    /// Cloud controller API base URL.
    pub api_url: String,
    /// Prefix of every dispensed org name (`<prefix>-<user>`).
    pub org_name_prefix: String,
    /// Space created inside each new org. `None` skips space creation.
    pub default_space: Option<String>,
    /// Only users of this email domain may be allocated an org.
    pub allowed_domain: String,
    /// Lifetime of a reservation key in seconds (default: 600).
    pub reservation_ttl_secs: u64,
    /// Timeout for each cloud controller request in seconds (default: 30).
    pub request_timeout_secs: u64,
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.run.pivotal.io".into(),
            org_name_prefix: "pivot".into(),
            default_space: Some("development".into()),
            allowed_domain: "pivotal.io".into(),
            reservation_ttl_secs: 600,
            request_timeout_secs: 30,
        }
    }
}

impl OrgConfig {
    /// Org name dispensed to `username`: the prefix plus the local part
    /// of the user's email, lowercased.
    pub fn org_name_for(&self, username: &str) -> String {
        let local = username.split('@').next().unwrap_or(username);
        format!("{}-{}", self.org_name_prefix, local).to_lowercase()
    }

    pub fn reservation_ttl(&self) -> Duration {
        Duration::from_secs(self.reservation_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
