use cognicode_core::CogniCodeError;
use thiserror::Error;

/// Failure of one WebSocket request. The display text is what the client
/// receives in the `error` event.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Code exceeds maximum size limit")]
    CodeTooLarge { size: usize, limit: usize },

    #[error("No code provided for {0}")]
    MissingCode(&'static str),

    #[error("Invalid data format")]
    InvalidFormat,

    #[error("Server at capacity")]
    AtCapacity,

    #[error("{operation} failed: {source}")]
    Agent {
        operation: &'static str,
        #[source]
        source: CogniCodeError,
    },

    #[error("{0} task was cancelled")]
    Cancelled(&'static str),
}

impl RequestError {
    pub fn agent(operation: &'static str) -> impl FnOnce(CogniCodeError) -> Self {
        move |source| RequestError::Agent { operation, source }
    }
}
