//! GUID production for reservation keys.

use std::fmt;

use uuid::Uuid;

/// A globally unique token with the namespace it was minted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Guid {
    pub prefix: String,
    pub value: String,
}

impl Guid {
    pub fn new(prefix: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.value)
    }
}

pub trait GuidMaker: Send + Sync {
    fn create(&self) -> Guid;
}

/// Random (v4) UUID producer.
#[derive(Debug, Clone)]
pub struct UuidGuidMaker {
    prefix: String,
}

impl UuidGuidMaker {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for UuidGuidMaker {
    fn default() -> Self {
        Self::new("pez")
    }
}

impl GuidMaker for UuidGuidMaker {
    fn create(&self) -> Guid {
        Guid::new(self.prefix.clone(), Uuid::new_v4().to_string())
    }
}
