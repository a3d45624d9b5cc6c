//! OAuth token source consumed when building provisioning requests.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The current user's OAuth tokens.
pub trait TokenSource: Send + Sync {
    fn access(&self) -> &str;
    fn refresh(&self) -> &str;
    fn expiry_time(&self) -> Option<DateTime<Utc>>;

    fn expired(&self) -> bool {
        self.expiry_time().is_some_and(|at| at <= Utc::now())
    }
}

/// Tokens obtained from an OAuth2 exchange.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthTokens {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expiry,
        }
    }
}

impl TokenSource for OAuthTokens {
    fn access(&self) -> &str {
        &self.access_token
    }

    fn refresh(&self) -> &str {
        &self.refresh_token
    }

    fn expiry_time(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn expiry_in_the_past_is_expired() {
        let tokens = OAuthTokens::new("a", "r", Some(Utc::now() - Duration::seconds(1)));
        assert!(tokens.expired());
    }

    #[test]
    fn missing_expiry_never_expires() {
        let tokens = OAuthTokens::new("a", "r", None);
        assert!(!tokens.expired());
        assert_eq!(tokens.refresh(), "r");
    }

    #[test]
    fn debug_redacts_tokens() {
        let tokens = OAuthTokens::new("secret-access", "secret-refresh", None);
        let rendered = format!("{tokens:?}");
        assert!(!rendered.contains("secret"));
    }
}
