//! Resource operation set
//!
//! Each provider (S3, Azure Storage, ...) implements [`ResourceOperations`]
//! as a thin adapter over its remote API. Inputs are plain identifiers and
//! the tag payload; the reconciler owns sequencing, polling and bookkeeping.

use crate::error::RemoteError;
use crate::model::{ProviderKind, RemoteResource};
use async_trait::async_trait;

/// Result type of a single remote call
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Handle to a long-running create that has not reached a terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    /// Name the create was requested for
    pub name: String,
    /// Provider-specific monitor reference (e.g. an operation status URL)
    pub monitor: String,
    /// Location of the resource itself, read back once the operation succeeds
    pub target: Option<String>,
}

impl PendingOperation {
    pub fn new(name: impl Into<String>, monitor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            monitor: monitor.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Outcome of issuing a create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The remote finished synchronously
    Completed(RemoteResource),
    /// The remote accepted the request; poll until terminal
    Pending(PendingOperation),
}

/// State of a long-running create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    InProgress,
    Succeeded(RemoteResource),
    Failed(RemoteError),
}

/// One page of a remote listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<RemoteResource>,
    /// Continuation token or link; `None` when this is the last page
    pub next: Option<String>,
}

impl ListPage {
    pub fn last(items: Vec<RemoteResource>) -> Self {
        Self { items, next: None }
    }
}

/// Storage resource operations for one provider
#[async_trait]
pub trait ResourceOperations: Send + Sync {
    /// Provider implementing these operations
    fn kind(&self) -> ProviderKind;

    /// Whether a parent group must be created before any child resource
    fn is_hierarchical(&self) -> bool {
        self.kind().is_hierarchical()
    }

    /// Create or update the parent management group
    async fn create_parent(&self, group: &str, region: &str) -> RemoteResult<()>;

    /// Issue the create call for a storage resource
    ///
    /// An already existing resource owned by the caller counts as success.
    async fn begin_create(&self, name: &str, group: Option<&str>) -> RemoteResult<CreateOutcome>;

    /// Check the progress of a pending create
    async fn poll_create(&self, operation: &PendingOperation) -> RemoteResult<PollStatus>;

    /// Replace the managed tag on an existing resource
    async fn apply_tags(
        &self,
        name: &str,
        group: Option<&str>,
        tags: &str,
    ) -> RemoteResult<RemoteResource>;

    /// Fetch one page of the remote listing
    ///
    /// `continuation` is `None` for the first page and the previous page's
    /// `next` afterwards. Resources without the managed tag are reported with
    /// `tags: None`; the reconciler leaves them alone.
    async fn list_page(
        &self,
        group: Option<&str>,
        continuation: Option<&str>,
    ) -> RemoteResult<ListPage>;

    /// Delete a single storage resource
    async fn delete_one(&self, name: &str, group: Option<&str>) -> RemoteResult<()>;
}
