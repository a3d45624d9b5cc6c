//! Reservation key generation and lookup.
//!
//! A reservation for `alice@pivotal.io` lives in the hash
//! `alice@pivotal.io:<guid>` with two fields:
//!
//! - `guid`: the bare GUID,
//! - `state`: a serialized `{"active": bool, "details": string}` blob.
//!
//! Lookups list the user's keys and then read both fields, so a valid
//! reply has the GUID at element 0 and the state blob at element 1.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::Command;
use crate::error::KeyGenError;
use crate::executor::CommandExecutor;
use crate::guid::GuidMaker;
use crate::reply::Reply;

const GUID_FIELD: &str = "guid";
const STATE_FIELD: &str = "state";

/// The serialized part of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationState {
    pub active: bool,
    #[serde(default)]
    pub details: String,
}

/// A reservation as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Full store key (`<username>:<guid>`).
    pub key: String,
    pub guid: String,
    pub active: bool,
    pub details: String,
}

/// Creates and inspects reservation keys.
///
/// Every method is a single attempt; executor failures are returned to
/// the caller without retrying.
#[derive(Debug)]
pub struct KeyGen<E, G> {
    executor: E,
    guid_maker: G,
    ttl: Option<Duration>,
}

impl<E: CommandExecutor, G: GuidMaker> KeyGen<E, G> {
    pub fn new(executor: E, guid_maker: G) -> Self {
        Self {
            executor,
            guid_maker,
            ttl: None,
        }
    }

    /// Expire reservations `ttl` after creation.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Store a new active reservation for `username` and return its
    /// bare GUID.
    pub async fn create(&self, username: &str, details: &str) -> Result<String, KeyGenError> {
        let guid = self.guid_maker.create().value;
        let key = reservation_key(username, &guid);
        let state = serde_json::to_vec(&ReservationState {
            active: true,
            details: details.to_string(),
        })?;

        self.run(Command::HmSet {
            key: key.clone(),
            fields: vec![
                (GUID_FIELD.into(), Bytes::from(guid.clone())),
                (STATE_FIELD.into(), Bytes::from(state)),
            ],
        })
        .await?;

        if let Some(ttl) = self.ttl {
            self.run(Command::Expire {
                key: key.clone(),
                ttl,
            })
            .await?;
        }

        debug!(%key, "Created reservation key");
        Ok(guid)
    }

    /// Look up the reservation held by `username`. `None` when the
    /// store has no key for the user.
    ///
    /// A user may hold several keys, since successful attempts leave
    /// theirs to expire. The first active one in key order wins, falling
    /// back to the first inactive one.
    pub async fn get(&self, username: &str) -> Result<Option<Reservation>, KeyGenError> {
        let mut fallback = None;
        for key in self.user_keys(username).await? {
            let reply = self
                .run(Command::HmGet {
                    key: key.clone(),
                    fields: vec![GUID_FIELD.into(), STATE_FIELD.into()],
                })
                .await?;

            match parse_reservation(key, reply)? {
                Some(reservation) if reservation.active => return Ok(Some(reservation)),
                Some(reservation) => {
                    fallback.get_or_insert(reservation);
                }
                None => {}
            }
        }
        Ok(fallback)
    }

    /// `true` when `username` holds an active reservation.
    pub async fn exists(&self, username: &str) -> Result<bool, KeyGenError> {
        Ok(self.get(username).await?.is_some_and(|r| r.active))
    }

    /// Remove the single reservation `guid` of `username`, leaving any
    /// other reservation of the user in place. `true` when a key was
    /// deleted.
    pub async fn release(&self, username: &str, guid: &str) -> Result<bool, KeyGenError> {
        let deleted = self.del(vec![reservation_key(username, guid)]).await?;
        debug!(%username, %guid, deleted, "Released reservation key");
        Ok(deleted > 0)
    }

    /// Remove every reservation held by `username`, returning how many
    /// keys were deleted.
    pub async fn delete(&self, username: &str) -> Result<u64, KeyGenError> {
        let keys = self.user_keys(username).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.del(keys).await
    }

    /// Keys of `username`'s reservations, sorted. Keys of other users
    /// that the glob also matches (`a:*` matching `a:b:<guid>`) are
    /// dropped.
    async fn user_keys(&self, username: &str) -> Result<Vec<String>, KeyGenError> {
        let reply = self
            .run(Command::Keys {
                pattern: key_pattern(username),
            })
            .await?;
        let mut keys: Vec<String> = all_keys(reply)?
            .into_iter()
            .filter(|key| is_reservation_of(username, key))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn del(&self, keys: Vec<String>) -> Result<u64, KeyGenError> {
        match self.run(Command::Del { keys }).await? {
            Reply::Integer(n) => Ok(u64::try_from(n).unwrap_or(0)),
            other => Err(KeyGenError::malformed(
                "DEL",
                format!("expected integer, got {}", other.kind()),
            )),
        }
    }

    async fn run(&self, command: Command) -> Result<Reply, KeyGenError> {
        self.executor
            .execute(command)
            .await
            .map_err(KeyGenError::executor)
    }
}

/// Store key of a reservation. GUIDs never contain `:`, so the
/// username is everything before the last colon.
pub fn reservation_key(username: &str, guid: &str) -> String {
    format!("{username}:{guid}")
}

fn is_reservation_of(username: &str, key: &str) -> bool {
    key.strip_prefix(username)
        .and_then(|rest| rest.strip_prefix(':'))
        .is_some_and(|guid| !guid.is_empty() && !guid.contains(':'))
}

/// KEYS pattern matching every reservation of `username`, with glob
/// metacharacters in the name escaped.
fn key_pattern(username: &str) -> String {
    let mut pattern = String::with_capacity(username.len() + 2);
    for c in username.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push_str(":*");
    pattern
}

fn all_keys(reply: Reply) -> Result<Vec<String>, KeyGenError> {
    match reply {
        Reply::Nil => Ok(Vec::new()),
        Reply::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let bytes = item.as_bytes().ok_or_else(|| {
                    KeyGenError::malformed(
                        "KEYS",
                        format!("element {i} is {}, expected bytes", item.kind()),
                    )
                })?;
                utf8("KEYS", bytes)
            })
            .collect(),
        other => Err(KeyGenError::malformed(
            "KEYS",
            format!("expected array, got {}", other.kind()),
        )),
    }
}

/// Validate an HMGET reply and unpack it into a [`Reservation`].
///
/// Nil, or an array of nils (the key vanished between KEYS and HMGET),
/// means not found.
pub fn parse_reservation(key: String, reply: Reply) -> Result<Option<Reservation>, KeyGenError> {
    let items = match reply {
        Reply::Nil => return Ok(None),
        Reply::Array(items) => items,
        other => {
            return Err(KeyGenError::malformed(
                "HMGET",
                format!("expected array, got {}", other.kind()),
            ));
        }
    };

    if items.iter().all(Reply::is_nil) {
        return Ok(None);
    }
    if items.len() < 2 {
        return Err(KeyGenError::malformed(
            "HMGET",
            format!("expected 2 elements, got {}", items.len()),
        ));
    }

    let guid = element_bytes(&items, 0)?;
    let state = parse_details(element_bytes(&items, 1)?)?;

    Ok(Some(Reservation {
        key,
        guid: utf8("HMGET", guid)?,
        active: state.active,
        details: state.details,
    }))
}

/// Decode a state blob. Accepts a JSON object, or the bare field list
/// older writers stored without braces.
pub fn parse_details(raw: &[u8]) -> Result<ReservationState, KeyGenError> {
    let trimmed = raw.trim_ascii();
    if trimmed.first() == Some(&b'{') {
        return Ok(serde_json::from_slice(trimmed)?);
    }

    let mut wrapped = Vec::with_capacity(trimmed.len() + 2);
    wrapped.push(b'{');
    wrapped.extend_from_slice(trimmed);
    wrapped.push(b'}');
    Ok(serde_json::from_slice(&wrapped)?)
}

fn element_bytes(items: &[Reply], index: usize) -> Result<&[u8], KeyGenError> {
    items[index].as_bytes().ok_or_else(|| {
        KeyGenError::malformed(
            "HMGET",
            format!("element {index} is {}, expected bytes", items[index].kind()),
        )
    })
}

fn utf8(command: &'static str, bytes: &[u8]) -> Result<String, KeyGenError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| KeyGenError::malformed(command, format!("invalid utf-8: {e}")))
}
