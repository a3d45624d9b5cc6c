use anyhow::{Context, Result};
use pezauth_db::DbConfig;
use pezauth_org::OrgConfig;

// Service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Document store connection.
    pub db: DbConfig,
    // Separate database for reservation keys. `None` keeps them in `db`.
    pub kv: Option<DbConfig>,
    // Org allocation settings.
    pub org: OrgConfig,
    // User info endpoint used to resolve the caller when no username is given.
    pub userinfo_url: String,
}

const DEFAULT_USERINFO_URL: &str = "https://login.run.pivotal.io/userinfo";

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // A full connection URI wins over the individual PEZ_DB_* settings.
        let db = match var("PEZ_DB_URI") {
            Some(uri) => DbConfig::from_uri(&uri).with_context(|| "parse PEZ_DB_URI")?,
            None => {
                let defaults = DbConfig::default();
                DbConfig {
                    url: var("PEZ_DB_URL").unwrap_or(defaults.url),
                    namespace: var("PEZ_DB_NAMESPACE").unwrap_or(defaults.namespace),
                    database: var("PEZ_DB_DATABASE").unwrap_or(defaults.database),
                    username: var("PEZ_DB_USER").unwrap_or(defaults.username),
                    password: var("PEZ_DB_PASS").unwrap_or(defaults.password),
                }
            }
        };

        let kv = var("PEZ_KV_URI")
            .map(|uri| DbConfig::from_uri(&uri))
            .transpose()
            .with_context(|| "parse PEZ_KV_URI")?;

        let defaults = OrgConfig::default();
        let reservation_ttl_secs = match var("PEZ_RESERVATION_TTL_SECS") {
            Some(value) => value
                .parse::<u64>()
                .with_context(|| "parse PEZ_RESERVATION_TTL_SECS")?,
            None => defaults.reservation_ttl_secs,
        };
        let request_timeout_secs = var("PEZ_CC_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(defaults.request_timeout_secs);
        // An empty value disables default space creation.
        let default_space = match var("PEZ_DEFAULT_SPACE") {
            Some(space) if space.is_empty() => None,
            Some(space) => Some(space),
            None => defaults.default_space,
        };
        let org = OrgConfig {
            api_url: var("PEZ_CC_API_URL").unwrap_or(defaults.api_url),
            org_name_prefix: var("PEZ_ORG_PREFIX").unwrap_or(defaults.org_name_prefix),
            default_space,
            allowed_domain: var("PEZ_ALLOWED_DOMAIN").unwrap_or(defaults.allowed_domain),
            reservation_ttl_secs,
            request_timeout_secs,
        };

        Ok(Self {
            db,
            kv,
            org,
            userinfo_url: var("PEZ_USERINFO_URL").unwrap_or_else(|| DEFAULT_USERINFO_URL.into()),
        })
    }
}
