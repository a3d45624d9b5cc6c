//! Cloud controller client used to provision dispensed orgs.
//!
//! Requests are built by an [`AuthRequestCreator`], which attaches the
//! user's bearer token, and sent through its [`HttpDoer`]. Provisioning
//! an org is a fixed sequence against the v2 API:
//!
//! 1. `POST /v2/organizations`
//! 2. `PUT /v2/organizations/{guid}/users` and `/managers`
//! 3. `POST /v2/spaces` and `PUT /v2/spaces/{guid}/developers`, when a
//!    default space is configured

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ProvisioningError;
use crate::token::TokenSource;

/// Sends prepared HTTP requests.
pub trait HttpDoer: Send + Sync {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, reqwest::Error>> + Send;
}

impl HttpDoer for reqwest::Client {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, reqwest::Error>> + Send {
        reqwest::Client::execute(self, request)
    }
}

/// Builds authenticated requests against the cloud controller.
pub trait AuthRequestCreator: Send + Sync {
    type Doer: HttpDoer;

    fn create_auth_request(
        &self,
        tokens: &dyn TokenSource,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Request, ProvisioningError>;

    fn http_client(&self) -> &Self::Doer;
}

/// Cloud controller v2 API client.
#[derive(Debug, Clone)]
pub struct CloudControllerClient<D = reqwest::Client> {
    api_url: Url,
    doer: D,
}

impl CloudControllerClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ProvisioningError> {
        let doer = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_doer(api_url, doer)
    }
}

impl<D: HttpDoer> CloudControllerClient<D> {
    pub fn with_doer(api_url: &str, doer: D) -> Result<Self, ProvisioningError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| ProvisioningError::InvalidUrl(format!("{api_url}: {e}")))?;
        Ok(Self { api_url, doer })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }
}

impl<D: HttpDoer> AuthRequestCreator for CloudControllerClient<D> {
    type Doer = D;

    fn create_auth_request(
        &self,
        tokens: &dyn TokenSource,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Request, ProvisioningError> {
        if tokens.expired() {
            return Err(ProvisioningError::TokenExpired);
        }

        let url = self
            .api_url
            .join(path)
            .map_err(|e| ProvisioningError::InvalidUrl(format!("{path}: {e}")))?;
        let mut request = Request::new(method, url);

        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer_header(tokens)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(body) = body {
            let encoded = serde_json::to_vec(body).map_err(ProvisioningError::Encode)?;
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(encoded.into());
        }

        Ok(request)
    }

    fn http_client(&self) -> &D {
        &self.doer
    }
}

/// `Authorization` header value for `tokens`, marked sensitive.
pub(crate) fn bearer_header(tokens: &dyn TokenSource) -> Result<HeaderValue, ProvisioningError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", tokens.access()))
        .map_err(|e| ProvisioningError::InvalidHeader(e.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// What to provision for one user.
#[derive(Debug, Clone)]
pub struct OrgRequest {
    pub name: String,
    pub username: String,
    pub space: Option<String>,
}

/// The org as created upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedOrg {
    pub guid: String,
    pub name: String,
    pub space_guid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    metadata: Metadata,
    entity: Entity,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    guid: String,
}

#[derive(Debug, Deserialize)]
struct Entity {
    name: String,
}

/// Create the org, grant `username` its user and manager roles, and
/// create the default space.
///
/// A failure part-way leaves whatever was already created upstream.
pub async fn provision_org<A: AuthRequestCreator>(
    client: &A,
    tokens: &dyn TokenSource,
    request: &OrgRequest,
) -> Result<ProvisionedOrg, ProvisioningError> {
    let org: Resource = send_json(
        client,
        tokens,
        Method::POST,
        "/v2/organizations",
        &json!({ "name": request.name }),
    )
    .await?;
    let org_guid = org.metadata.guid;
    debug!(%org_guid, name = %org.entity.name, "Created org");

    let user = json!({ "username": request.username });
    for role in ["users", "managers"] {
        send(
            client,
            tokens,
            Method::PUT,
            &format!("/v2/organizations/{org_guid}/{role}"),
            Some(&user),
        )
        .await?;
    }

    let space_guid = match &request.space {
        Some(space) => {
            let created: Resource = send_json(
                client,
                tokens,
                Method::POST,
                "/v2/spaces",
                &json!({ "name": space, "organization_guid": org_guid }),
            )
            .await?;
            let space_guid = created.metadata.guid;
            send(
                client,
                tokens,
                Method::PUT,
                &format!("/v2/spaces/{space_guid}/developers"),
                Some(&user),
            )
            .await?;
            Some(space_guid)
        }
        None => None,
    };

    Ok(ProvisionedOrg {
        guid: org_guid,
        name: org.entity.name,
        space_guid,
    })
}

/// Send one authenticated request and return the body of a 2xx reply.
async fn send<A: AuthRequestCreator>(
    client: &A,
    tokens: &dyn TokenSource,
    method: Method,
    path: &str,
    body: Option<&Value>,
) -> Result<Vec<u8>, ProvisioningError> {
    let request = client.create_auth_request(tokens, method, path, body)?;
    let response = client.http_client().execute(request).await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProvisioningError::Status {
            status: status.as_u16(),
            path: path.to_string(),
            body,
        });
    }

    Ok(response.bytes().await?.to_vec())
}

async fn send_json<A: AuthRequestCreator, T: DeserializeOwned>(
    client: &A,
    tokens: &dyn TokenSource,
    method: Method,
    path: &str,
    body: &Value,
) -> Result<T, ProvisioningError> {
    let bytes = send(client, tokens, method, path, Some(body)).await?;
    serde_json::from_slice(&bytes).map_err(|source| ProvisioningError::Decode {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};

    use super::*;
    use crate::token::OAuthTokens;

    fn client() -> CloudControllerClient {
        CloudControllerClient::new("https://api.example.com", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn auth_request_carries_bearer_and_json_body() {
        let tokens = OAuthTokens::new("tok-123", "ref", None);
        let body = json!({ "name": "pivot-alice" });

        let request = client()
            .create_auth_request(&tokens, Method::POST, "/v2/organizations", Some(&body))
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().as_str(), "https://api.example.com/v2/organizations");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok-123");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        let sent: Value =
            serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(sent, body);
    }

    #[test]
    fn auth_request_without_body_has_no_content_type() {
        let tokens = OAuthTokens::new("tok", "ref", None);

        let request = client()
            .create_auth_request(&tokens, Method::GET, "/v2/info", None)
            .unwrap();

        assert!(request.body().is_none());
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let tokens = OAuthTokens::new("tok", "ref", Some(Utc::now() - ChronoDuration::minutes(1)));

        let err = client()
            .create_auth_request(&tokens, Method::GET, "/v2/info", None)
            .unwrap_err();

        assert!(matches!(err, ProvisioningError::TokenExpired));
    }

    #[test]
    fn invalid_api_url_is_rejected() {
        let err = CloudControllerClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ProvisioningError::InvalidUrl(_)));
    }
}
