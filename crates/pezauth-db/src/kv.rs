//! SurrealDB-backed [`CommandExecutor`] for reservation keys.
//!
//! Every store key is one `reservation` record whose ID is the key. Hash
//! fields are kept as strings in a flexible object. Expired records are
//! purged at the start of each command, so reads never see them.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use pezauth_keygen::{Command, CommandExecutor, Reply, glob_match};
use serde_json::{Map, Value};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct KeyRow {
    store_key: String,
}

#[derive(Debug, SurrealValue)]
struct FieldsRow {
    fields: serde_json::Value,
}

/// Reservation key store shared by every process using the database.
#[derive(Clone)]
pub struct SurrealKvStore<C: Connection> {
    db: Surreal<C>,
}

fn query_error(e: impl std::fmt::Display) -> DbError {
    DbError::Query(e.to_string())
}

fn wrong_arity(command: &str) -> DbError {
    DbError::Query(format!("wrong number of arguments for '{command}' command"))
}

impl<C: Connection> SurrealKvStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn purge_expired(&self) -> Result<(), DbError> {
        self.db
            .query("DELETE reservation WHERE expires_at != NONE AND expires_at <= time::now()")
            .await?
            .check()
            .map_err(query_error)?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DbError> {
        let mut result = self
            .db
            .query("SELECT store_key FROM reservation ORDER BY store_key")
            .await?;
        let rows: Vec<KeyRow> = result.take(0)?;
        Ok(rows
            .into_iter()
            .map(|row| row.store_key)
            .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
            .collect())
    }

    async fn fields(&self, key: &str) -> Result<Option<Map<String, Value>>, DbError> {
        let mut result = self
            .db
            .query("SELECT fields FROM type::record('reservation', $key)")
            .bind(("key", key.to_string()))
            .await?;
        let rows: Vec<FieldsRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(|row| match row.fields {
            Value::Object(map) => map,
            _ => Map::new(),
        }))
    }

    async fn hmset(&self, key: String, fields: Vec<(String, Bytes)>) -> Result<(), DbError> {
        let mut stored = self.fields(&key).await?.unwrap_or_default();
        for (name, value) in fields {
            let value = String::from_utf8(value.to_vec()).map_err(|e| {
                DbError::Query(format!("HMSET {key}: field {name} is not utf-8: {e}"))
            })?;
            stored.insert(name, Value::String(value));
        }

        self.db
            .query(
                "UPSERT type::record('reservation', $key) SET \
                 store_key = $key, fields = $fields",
            )
            .bind(("key", key))
            .bind(("fields", Value::Object(stored)))
            .await?
            .check()
            .map_err(query_error)?;
        Ok(())
    }

    async fn delete(&self, key: String) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query("DELETE type::record('reservation', $key) RETURN BEFORE")
            .bind(("key", key))
            .await?;
        let removed: Vec<KeyRow> = result.take(0)?;
        Ok(!removed.is_empty())
    }

    async fn expire(&self, key: String, ttl: Duration) -> Result<bool, DbError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(query_error)?;
        let expires_at = Utc::now() + ttl;

        let mut result = self
            .db
            .query(
                "UPDATE type::record('reservation', $key) SET \
                 expires_at = $expires_at RETURN AFTER",
            )
            .bind(("key", key.clone()))
            .bind(("expires_at", expires_at))
            .await?;
        let updated: Vec<KeyRow> = result.take(0)?;

        debug!(%key, %expires_at, updated = !updated.is_empty(), "Set reservation expiry");
        Ok(!updated.is_empty())
    }
}

impl<C: Connection> CommandExecutor for SurrealKvStore<C> {
    type Error = DbError;

    async fn execute(&self, command: Command) -> Result<Reply, DbError> {
        self.purge_expired().await?;

        match command {
            Command::Keys { pattern } => Ok(Reply::Array(
                self.keys(&pattern)
                    .await?
                    .into_iter()
                    .map(Reply::bulk)
                    .collect(),
            )),
            Command::HmSet { key, fields } => {
                if fields.is_empty() {
                    return Err(wrong_arity("HMSET"));
                }
                self.hmset(key, fields).await?;
                Ok(Reply::Status("OK".into()))
            }
            Command::HmGet { key, fields } => {
                if fields.is_empty() {
                    return Err(wrong_arity("HMGET"));
                }
                let stored = self.fields(&key).await?;
                Ok(Reply::Array(
                    fields
                        .iter()
                        .map(|field| match stored.as_ref().and_then(|m| m.get(field)) {
                            Some(Value::String(value)) => Reply::bulk(value.clone()),
                            _ => Reply::Nil,
                        })
                        .collect(),
                ))
            }
            Command::Del { keys } => {
                if keys.is_empty() {
                    return Err(wrong_arity("DEL"));
                }
                let mut removed = 0;
                for key in keys {
                    if self.delete(key).await? {
                        removed += 1;
                    }
                }
                Ok(Reply::Integer(removed))
            }
            Command::Expire { key, ttl } => {
                Ok(Reply::Integer(i64::from(self.expire(key, ttl).await?)))
            }
        }
    }
}
