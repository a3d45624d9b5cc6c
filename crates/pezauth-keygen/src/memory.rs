//! In-process [`CommandExecutor`] backed by a hash map.
//!
//! Expired keys are purged lazily on access, so no background task is
//! needed.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::command::Command;
use crate::executor::CommandExecutor;
use crate::reply::Reply;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
}

#[derive(Debug, Default)]
struct Entry {
    fields: BTreeMap<String, Bytes>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Hash store with glob key listing and per-key expiry.
///
/// ```
/// use bytes::Bytes;
/// use pezauth_keygen::{Command, CommandExecutor, MemoryStore, Reply};
///
/// let store = MemoryStore::new();
/// let rt = tokio::runtime::Runtime::new().expect("rt");
/// rt.block_on(async {
///     store
///         .execute(Command::HmSet {
///             key: "alice:1".into(),
///             fields: vec![("guid".into(), Bytes::from_static(b"1"))],
///         })
///         .await
///         .unwrap();
///     let reply = store
///         .execute(Command::Keys { pattern: "alice:*".into() })
///         .await
///         .unwrap();
///     assert_eq!(reply, Reply::Array(vec![Reply::bulk("alice:1")]));
/// });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let guard = self.inner.read().await;
        guard.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl CommandExecutor for MemoryStore {
    type Error = MemoryStoreError;

    async fn execute(&self, command: Command) -> Result<Reply, MemoryStoreError> {
        let now = Instant::now();
        let mut guard = self.inner.write().await;
        guard.retain(|_, entry| !entry.is_expired(now));

        match command {
            Command::Keys { pattern } => {
                let mut keys: Vec<&String> = guard
                    .keys()
                    .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
                    .collect();
                keys.sort();
                Ok(Reply::Array(
                    keys.into_iter()
                        .map(|key| Reply::bulk(key.clone()))
                        .collect(),
                ))
            }
            Command::HmSet { key, fields } => {
                if fields.is_empty() {
                    return Err(MemoryStoreError::WrongArity("HMSET"));
                }
                let entry = guard.entry(key).or_default();
                entry.fields.extend(fields);
                Ok(Reply::Status("OK".into()))
            }
            Command::HmGet { key, fields } => {
                if fields.is_empty() {
                    return Err(MemoryStoreError::WrongArity("HMGET"));
                }
                let entry = guard.get(&key);
                Ok(Reply::Array(
                    fields
                        .iter()
                        .map(|field| {
                            entry
                                .and_then(|e| e.fields.get(field))
                                .map(|value| Reply::Bulk(value.clone()))
                                .unwrap_or(Reply::Nil)
                        })
                        .collect(),
                ))
            }
            Command::Del { keys } => {
                if keys.is_empty() {
                    return Err(MemoryStoreError::WrongArity("DEL"));
                }
                let removed = keys
                    .iter()
                    .filter(|key| guard.remove(key.as_str()).is_some())
                    .count();
                Ok(Reply::Integer(removed as i64))
            }
            Command::Expire { key, ttl } => match guard.get_mut(&key) {
                Some(entry) => {
                    entry.expires_at = Some(now + ttl);
                    Ok(Reply::Integer(1))
                }
                None => Ok(Reply::Integer(0)),
            },
        }
    }
}

/// Glob matching with `*`, `?` and backslash escapes.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position to resume from after the most recent `*`.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(b'*') => {
                star = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some(b'?') => {
                p += 1;
                t += 1;
                continue;
            }
            Some(b'\\') if p + 1 < pattern.len() && pattern[p + 1] == text[t] => {
                p += 2;
                t += 1;
                continue;
            }
            Some(&c) if c != b'\\' && c == text[t] => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }

        match star {
            Some((resume_p, resume_t)) => {
                p = resume_p;
                t = resume_t + 1;
                star = Some((resume_p, resume_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
