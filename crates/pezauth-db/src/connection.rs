//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;
use url::Url;

use crate::error::DbError;
use crate::kv::SurrealKvStore;
use crate::repository::SurrealCollection;
use crate::wrapper::CollectionWrapper;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "pezauth".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Build a configuration from a service-binding style URI such as
    /// `ws://user:pass@db.internal:8000/pezauth`.
    ///
    /// The last path segment names the database. When two segments are
    /// present the first one names the namespace. Credentials in the
    /// URI override the defaults.
    pub fn from_uri(uri: &str) -> Result<Self, DbError> {
        let parsed = Url::parse(uri).map_err(|e| DbError::InvalidUri(format!("{uri}: {e}")))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| DbError::InvalidUri(format!("{uri}: missing host")))?;
        let url = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let mut config = Self {
            url,
            ..Self::default()
        };

        match segments.as_slice() {
            [] => {
                return Err(DbError::InvalidUri(format!(
                    "{uri}: missing database name"
                )));
            }
            [database] => config.database = (*database).to_string(),
            [.., namespace, database] => {
                config.namespace = (*namespace).to_string();
                config.database = (*database).to_string();
            }
        }

        if !parsed.username().is_empty() {
            config.username = parsed.username().to_string();
        }
        if let Some(password) = parsed.password() {
            config.password = password.to_string();
        }

        Ok(config)
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root, selects the configured namespace and
    /// database, and returns a ready-to-use manager.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }

    /// A persistence handle over the organization collection. Handles
    /// share the underlying connection.
    pub fn collection(&self) -> CollectionWrapper<SurrealCollection<Client>> {
        CollectionWrapper::new(SurrealCollection::new(self.db.clone()))
    }

    /// A reservation key store on the same connection.
    pub fn kv_store(&self) -> SurrealKvStore<Client> {
        SurrealKvStore::new(self.db.clone())
    }
}
