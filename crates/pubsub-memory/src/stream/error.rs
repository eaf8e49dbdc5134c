use courier_pubsub::stream::PullStreamError;
use thiserror::Error;

/// Errors that can occur on the in-process pull stream.
#[derive(Debug, Error)]
pub enum Error {
    /// The background loop terminated abnormally.
    #[error("pull loop terminated abnormally")]
    Terminated,
}

impl PullStreamError for Error {}
