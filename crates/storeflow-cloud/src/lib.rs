//! StoreFlow Cloud Storage Reconciliation
//!
//! This crate reconciles a declared set of storage resources (S3 buckets,
//! Azure storage accounts) against the live state of a cloud account.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  StoreFlow CLI                   │
//! │          (store plan/apply/refresh/destroy)      │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               storeflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │            Reconciler                     │   │
//! │  │  create / read / update / delete / apply  │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Plan / Diff  │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬───────────────────────┘
//!         │ trait ResourceOperations               │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  aws (S3)     │ │ azure storage │
//! │  flat         │ │ hierarchical  │
//! └───────────────┘ └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use storeflow_cloud::{DesiredResource, Reconciler};
//!
//! let reconciler = Reconciler::new(&ops, &ctx);
//! let result = reconciler.create(&[DesiredResource::new("logs", "team-a")]).await?;
//! for err in &result.errors {
//!     eprintln!("{}", err);
//! }
//! ```

pub mod action;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod operations;
pub mod reconciler;
pub mod state;
pub mod wait;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{
    CloudError, ErrorKind, ItemError, Phase, RemoteError, Result, UnknownProviderKind,
};
pub use model::{
    DesiredResource, MANAGED_TAG_KEY, ObservedResource, ProviderContext, ProviderKind,
    RemoteResource,
};
pub use operations::{
    CreateOutcome, ListPage, PendingOperation, PollStatus, RemoteResult, ResourceOperations,
};
pub use reconciler::{CycleResult, Reconciler};
pub use state::{Drift, StateLock, StateManager, StateSnapshot};
pub use tokio_util::sync::CancellationToken;
pub use wait::WaitConfig;
