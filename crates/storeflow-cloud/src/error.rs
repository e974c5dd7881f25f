//! Cloud provider error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed remote call
///
/// Used for logging and diagnostics only. Nothing in the reconciler retries
/// based on the kind; the next cycle is the retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Transient,
    Denied,
    Timeout,
    Cancelled,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Transient => write!(f, "transient"),
            ErrorKind::Denied => write!(f, "denied"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lifecycle phase in which a remote call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Create,
    Tag,
    Update,
    Delete,
    List,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Create => write!(f, "create"),
            Phase::Tag => write!(f, "tag"),
            Phase::Update => write!(f, "update"),
            Phase::Delete => write!(f, "delete"),
            Phase::List => write!(f, "list"),
        }
    }
}

/// A failure reported by a provider's remote API
///
/// `message` carries the remote cause verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation cancelled")
    }
}

/// Failure isolated to one resource of a batch
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{phase} {name} failed ({kind}): {cause}")]
pub struct ItemError {
    pub name: String,
    pub phase: Phase,
    pub kind: ErrorKind,
    pub cause: String,
}

impl ItemError {
    pub fn new(name: impl Into<String>, phase: Phase, error: RemoteError) -> Self {
        Self {
            name: name.into(),
            phase,
            kind: error.kind,
            cause: error.message,
        }
    }

    pub fn cancelled(name: impl Into<String>, phase: Phase) -> Self {
        Self::new(name, phase, RemoteError::cancelled())
    }
}

/// Cloud provider errors
///
/// Every variant here aborts the whole lifecycle call. Per-item failures are
/// carried as [`ItemError`] alongside a partial snapshot instead.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Parent group {group} could not be created: {source}")]
    ParentCreate {
        group: String,
        #[source]
        source: RemoteError,
    },

    #[error("Remote {phase} failed: {source}")]
    Remote {
        phase: Phase,
        #[source]
        source: RemoteError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Provider name that is neither aws nor azure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown provider: {0} (expected aws or azure)")]
pub struct UnknownProviderKind(pub String);
