use std::fmt;

use super::types::{POOL_EXHAUSTED_STATUS, TRANSPORT_FAILURE_STATUS};

/// Failure delivered through a deferred result.
///
/// The engine never returns these from a submission call directly; they only
/// surface when a caller observes the deferred handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No pooled connection was free when the task ran
    PoolExhausted,
    /// DNS, connect, TLS or timeout failure
    Transport(String),
    /// Transfer completed with a status outside 200..300
    Http { status: i64, detail: String },
    /// Body did not match the requested shape
    Decode(String),
    /// Submission before `initialize`
    NotInitialized,
    /// `initialize` called on a running engine
    AlreadyInitialized,
    /// Submission or initialization after `shutdown`
    ShutDown,
    /// `initialize` called outside a tokio runtime
    NoRuntime,
    /// The task was dropped before it ran, e.g. still queued at shutdown
    Abandoned,
}

impl EngineError {
    /// Status code associated with the failure, if any
    pub fn status(&self) -> Option<i64> {
        match self {
            EngineError::PoolExhausted => Some(POOL_EXHAUSTED_STATUS),
            EngineError::Transport(_) => Some(TRANSPORT_FAILURE_STATUS),
            EngineError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, EngineError::Decode(_))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::PoolExhausted => write!(
                f,
                "HTTP error: {} - connection pool exhausted",
                POOL_EXHAUSTED_STATUS
            ),
            EngineError::Transport(msg) => {
                write!(f, "HTTP error: {} - {}", TRANSPORT_FAILURE_STATUS, msg)
            }
            EngineError::Http { status, detail } if detail.is_empty() => {
                write!(f, "HTTP error: {}", status)
            }
            EngineError::Http { status, detail } => write!(f, "HTTP error: {} - {}", status, detail),
            EngineError::Decode(msg) => write!(f, "Decode error: {}", msg),
            EngineError::NotInitialized => write!(f, "HTTP engine is not initialized"),
            EngineError::AlreadyInitialized => write!(f, "HTTP engine is already initialized"),
            EngineError::ShutDown => write!(f, "HTTP engine has been shut down"),
            EngineError::NoRuntime => write!(f, "HTTP engine requires a running tokio runtime"),
            EngineError::Abandoned => write!(f, "Request was abandoned before completion"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Error raised by a transport while performing a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        // reqwest's top-level message omits the cause (timeout, refused, ...)
        let mut message = error.to_string();
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { message }
    }
}
