//! Commands understood by a [`CommandExecutor`](crate::CommandExecutor).

use std::time::Duration;

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List keys matching a glob pattern.
    Keys { pattern: String },
    /// Set one or more hash fields.
    HmSet {
        key: String,
        fields: Vec<(String, Bytes)>,
    },
    /// Read hash fields; missing fields come back as nil.
    HmGet { key: String, fields: Vec<String> },
    /// Delete keys, replying with the number removed.
    Del { keys: Vec<String> },
    /// Expire a key after `ttl`.
    Expire { key: String, ttl: Duration },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keys { .. } => "KEYS",
            Self::HmSet { .. } => "HMSET",
            Self::HmGet { .. } => "HMGET",
            Self::Del { .. } => "DEL",
            Self::Expire { .. } => "EXPIRE",
        }
    }
}
