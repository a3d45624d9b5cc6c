//! Resolving the authenticated user's identity from their OAuth tokens.
//!
//! The user-info lookup is an injected [`UserInfoSource`], so callers
//! and tests choose where user info comes from.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Deserialize;

use crate::error::{IdentityError, ProvisioningError};
use crate::provisioning::{HttpDoer, bearer_header};
use crate::token::TokenSource;

/// User info document as returned by the identity provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub emails: Vec<EmailEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailEntry {
    pub value: String,
}

pub trait UserInfoSource: Send + Sync {
    fn user_info(
        &self,
        tokens: &dyn TokenSource,
    ) -> impl Future<Output = Result<UserInfo, IdentityError>> + Send;
}

/// Fetches user info over HTTP with the bearer token.
#[derive(Debug, Clone)]
pub struct HttpUserInfo<D = reqwest::Client> {
    url: Url,
    doer: D,
}

impl<D: HttpDoer> HttpUserInfo<D> {
    pub fn new(url: &str, doer: D) -> Result<Self, ProvisioningError> {
        let url =
            Url::parse(url).map_err(|e| ProvisioningError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self { url, doer })
    }
}

impl<D: HttpDoer> UserInfoSource for HttpUserInfo<D> {
    async fn user_info(&self, tokens: &dyn TokenSource) -> Result<UserInfo, IdentityError> {
        if tokens.expired() {
            return Err(ProvisioningError::TokenExpired.into());
        }

        let mut request = Request::new(Method::GET, self.url.clone());
        request
            .headers_mut()
            .insert(AUTHORIZATION, bearer_header(tokens)?);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));

        let response = self
            .doer
            .execute(request)
            .await
            .map_err(ProvisioningError::from)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProvisioningError::Status {
                status: status.as_u16(),
                path: self.url.path().to_string(),
                body,
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(ProvisioningError::from)?;
        serde_json::from_slice(&bytes).map_err(|source| {
            ProvisioningError::Decode {
                path: self.url.path().to_string(),
                source,
            }
            .into()
        })
    }
}

/// Pick the username for `info`: the user must belong to
/// `allowed_domain`, and their first email in that domain is used.
pub fn resolve_username(info: &UserInfo, allowed_domain: &str) -> Result<String, IdentityError> {
    let in_domain = info
        .domain
        .as_deref()
        .is_some_and(|d| d.eq_ignore_ascii_case(allowed_domain));
    if !in_domain {
        return Err(IdentityError::DomainNotAllowed {
            domain: info.domain.clone(),
        });
    }

    let suffix = format!("@{}", allowed_domain.to_ascii_lowercase());
    info.emails
        .iter()
        .map(|e| e.value.trim())
        .find(|email| email.to_ascii_lowercase().ends_with(&suffix))
        .map(str::to_string)
        .ok_or_else(|| IdentityError::NoMatchingEmail {
            domain: allowed_domain.to_string(),
        })
}

/// Fetch user info with `tokens` and resolve the username.
pub async fn resolve_identity<S: UserInfoSource>(
    source: &S,
    tokens: &dyn TokenSource,
    allowed_domain: &str,
) -> Result<String, IdentityError> {
    let info = source.user_info(tokens).await?;
    resolve_username(&info, allowed_domain)
}
