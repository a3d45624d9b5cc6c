//! The key-value store capability.

use crate::command::Command;
use crate::reply::Reply;

/// Executes a single store command as one round trip.
///
/// Implementations must be safe to share between concurrent callers.
pub trait CommandExecutor: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn execute(&self, command: Command)
    -> impl Future<Output = Result<Reply, Self::Error>> + Send;
}
