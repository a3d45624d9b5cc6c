//! Key generation error types.

use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyGenError {
    /// The executor failed; the store's error is kept unchanged.
    #[error(transparent)]
    Executor(Box<dyn StdError + Send + Sync + 'static>),

    #[error("malformed {command} reply: {reason}")]
    MalformedReply {
        command: &'static str,
        reason: String,
    },

    #[error("invalid reservation details: {0}")]
    InvalidDetails(#[from] serde_json::Error),
}

impl KeyGenError {
    pub(crate) fn executor<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Executor(Box::new(err))
    }

    pub(crate) fn malformed(command: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedReply {
            command,
            reason: reason.into(),
        }
    }

    /// Recover the concrete executor error carried by [`Self::Executor`].
    pub fn executor_error<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Executor(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}
