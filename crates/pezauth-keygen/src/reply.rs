//! Untyped replies returned by a key-value store.

use bytes::Bytes;

/// A store reply. Shapes vary by command, so callers validate before
/// reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Integer(i64),
    Status(String),
    Bulk(Bytes),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn bulk(value: impl Into<Bytes>) -> Self {
        Self::Bulk(value.into())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bulk(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Short shape description for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Integer(_) => "integer",
            Self::Status(_) => "status",
            Self::Bulk(_) => "bulk",
            Self::Array(_) => "array",
        }
    }
}
