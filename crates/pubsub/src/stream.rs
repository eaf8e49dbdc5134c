use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;

/// Marker trait for pull stream errors.
pub trait PullStreamError: Error + Send + Sync + 'static {}

/// Closable handle to a persistent streaming pull.
#[async_trait]
pub trait PullStream: Clone + Debug + Send + Sync + 'static {
    /// The error type for the stream.
    type Error: PullStreamError;

    /// Stops the pull loop and resolves once it has exited.
    ///
    /// In-flight handler invocations are not awaited; they run to completion
    /// on their own. Closing an already-closed stream is a no-op.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Whether the pull loop has terminated.
    fn is_closed(&self) -> bool;
}
