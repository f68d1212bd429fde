use thiserror::Error;

/// The three ways a bot operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing token, missing geocoding key, no matching room. Fatal.
    Configuration,
    /// Network failure, timeout or malformed body. Recoverable.
    TransientFetch,
    /// Unexpected HTTP status from the chat backend. Recoverable.
    ProtocolViolation,
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Fetch failed: {0}")]
    TransientFetch(String),

    #[error("{service} returned status {status}: {body}")]
    ProtocolViolation {
        service: &'static str,
        status: u16,
        body: String,
    },
}

impl BotError {
    pub fn config(msg: impl Into<String>) -> Self {
        BotError::Configuration(msg.into())
    }

    /// Wrap a lower-level failure with the name of the call that produced it.
    pub fn transient(context: &str, err: impl std::fmt::Display) -> Self {
        BotError::TransientFetch(format!("{}: {}", context, err))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::Configuration(_) => ErrorKind::Configuration,
            BotError::TransientFetch(_) => ErrorKind::TransientFetch,
            BotError::ProtocolViolation { .. } => ErrorKind::ProtocolViolation,
        }
    }

    /// Everything except configuration problems is retried by the poll loop.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Configuration
    }
}

pub type FetchResult<T> = std::result::Result<T, BotError>;
