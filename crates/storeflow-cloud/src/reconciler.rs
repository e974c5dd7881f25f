//! Lifecycle reconciler
//!
//! Drives create / read / update / delete for a batch of storage resources
//! against one [`ResourceOperations`] implementation.
//!
//! Items are processed sequentially in caller order. For hierarchical
//! providers the parent group is created once, before any child. A failure on
//! one item never stops the batch: it is recorded as an [`ItemError`] and the
//! item is left out of the returned snapshot. Fatal conditions (parent group
//! failure, listing failure, cancellation outside an item) abort with a
//! [`CloudError`] and no snapshot.

use crate::action::{ActionType, Plan};
use crate::error::{CloudError, ErrorKind, ItemError, Phase, RemoteError, Result};
use crate::model::{DesiredResource, ObservedResource, ProviderContext};
use crate::operations::{CreateOutcome, RemoteResult, ResourceOperations};
use crate::state::{StateSnapshot, next_timestamp};
use crate::wait::{WaitConfig, wait_for_create};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Snapshot plus the per-item failures of one lifecycle call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleResult {
    pub snapshot: StateSnapshot,
    pub errors: Vec<ItemError>,
}

impl CycleResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_parts(self) -> (StateSnapshot, Vec<ItemError>) {
        (self.snapshot, self.errors)
    }
}

/// Reconciles declared storage resources against one provider
pub struct Reconciler<'a, O: ResourceOperations + ?Sized> {
    ops: &'a O,
    ctx: &'a ProviderContext,
    wait: WaitConfig,
    cancel: CancellationToken,
}

impl<'a, O: ResourceOperations + ?Sized> Reconciler<'a, O> {
    pub fn new(ops: &'a O, ctx: &'a ProviderContext) -> Self {
        Self {
            ops,
            ctx,
            wait: WaitConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn context(&self) -> &ProviderContext {
        self.ctx
    }

    /// Create every desired resource and tag it
    pub async fn create(&self, desired: &[DesiredResource]) -> Result<CycleResult> {
        let group = self.ensure_parent().await?;
        let mut snapshot = StateSnapshot::new(self.ctx.clone(), Utc::now());
        let mut errors = Vec::new();

        for (index, resource) in desired.iter().enumerate() {
            if self.cancel.is_cancelled() {
                errors.extend(cancel_remaining(&desired[index..], Phase::Create));
                break;
            }

            match self.create_one(resource, group.as_deref()).await {
                Ok(observed) => {
                    tracing::info!(name = %observed.name, id = %observed.id, "Created storage resource");
                    snapshot.items.push(observed);
                }
                Err(err) => {
                    tracing::warn!(name = %err.name, phase = %err.phase, kind = %err.kind, "{}", err.cause);
                    errors.push(err);
                }
            }
        }

        snapshot.last_updated = next_timestamp(None);
        Ok(CycleResult { snapshot, errors })
    }

    /// Replace the previous snapshot with the full remote listing
    ///
    /// This is a drift resync rather than a merge: items missing remotely are
    /// dropped and unknown remote items are adopted. Only resources carrying
    /// the managed tag are considered, so other resources in the account never
    /// enter the snapshot (and are never planned for deletion).
    /// `last_updated` is kept.
    pub async fn read(&self, previous: &StateSnapshot) -> Result<StateSnapshot> {
        let group = self.managed_group()?;
        let observed_at = Utc::now();

        let mut remote = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                return Err(CloudError::Cancelled);
            }

            let page = self
                .call(self.ops.list_page(group, continuation.as_deref()))
                .await
                .map_err(|e| match e.kind {
                    ErrorKind::Cancelled => CloudError::Cancelled,
                    _ => CloudError::Remote {
                        phase: Phase::List,
                        source: e,
                    },
                })?;
            pages += 1;
            remote.extend(page.items);

            match page.next {
                Some(next) if !next.is_empty() => continuation = Some(next),
                _ => break,
            }
        }

        tracing::debug!(pages, items = remote.len(), "Listed remote storage resources");

        let previous_dates: HashMap<&str, _> = previous
            .items
            .iter()
            .map(|item| (item.id.as_str(), item.creation_timestamp))
            .collect();

        let items = remote
            .into_iter()
            .filter(|resource| {
                if resource.tags.is_none() {
                    tracing::debug!(name = %resource.name, "Skipping unmanaged resource");
                    return false;
                }
                if resource.id.is_empty() {
                    tracing::warn!(name = %resource.name, "Skipping listed resource without id");
                    return false;
                }
                true
            })
            .map(|resource| ObservedResource {
                creation_timestamp: resource
                    .created_at
                    .or_else(|| previous_dates.get(resource.id.as_str()).copied())
                    .unwrap_or(observed_at),
                tags: resource.tags.unwrap_or_default(),
                parent_group: resource.parent_group.or_else(|| group.map(str::to_string)),
                id: resource.id,
                name: resource.name,
            })
            .collect();

        Ok(StateSnapshot {
            version: previous.version,
            items,
            last_updated: previous.last_updated,
            provider_identity: self.ctx.clone(),
        })
    }

    /// Re-apply tags on resources that already exist remotely
    ///
    /// Resources are never created here; a missing one fails the item.
    pub async fn update(
        &self,
        desired: &[DesiredResource],
        previous: &StateSnapshot,
    ) -> Result<CycleResult> {
        let group = self.managed_group()?;
        let mut snapshot = StateSnapshot::new(self.ctx.clone(), previous.last_updated);
        let mut errors = Vec::new();

        for (index, resource) in desired.iter().enumerate() {
            if self.cancel.is_cancelled() {
                errors.extend(cancel_remaining(&desired[index..], Phase::Update));
                break;
            }

            match self.update_one(resource, group, previous).await {
                Ok(observed) => {
                    tracing::info!(name = %observed.name, "Updated storage resource tags");
                    snapshot.items.push(observed);
                }
                Err(err) => {
                    tracing::warn!(name = %err.name, phase = %err.phase, kind = %err.kind, "{}", err.cause);
                    errors.push(err);
                }
            }
        }

        snapshot.last_updated = next_timestamp(Some(previous.last_updated));
        Ok(CycleResult { snapshot, errors })
    }

    /// Delete every resource in the snapshot, best effort
    ///
    /// Successful deletions are not tracked; callers discard the snapshot.
    pub async fn delete(&self, previous: &StateSnapshot) -> Vec<ItemError> {
        let managed = self.managed_group().ok().flatten();
        let mut errors = Vec::new();

        for (index, item) in previous.items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                errors.extend(
                    previous.items[index..]
                        .iter()
                        .map(|item| ItemError::cancelled(item.name.clone(), Phase::Delete)),
                );
                break;
            }

            let group = if self.ops.is_hierarchical() {
                match item.parent_group.as_deref().or(managed) {
                    Some(group) => Some(group),
                    None => {
                        errors.push(ItemError::new(
                            item.name.clone(),
                            Phase::Delete,
                            RemoteError::unknown("no parent group recorded for this resource"),
                        ));
                        continue;
                    }
                }
            } else {
                None
            };

            match self.call(self.ops.delete_one(&item.name, group)).await {
                Ok(()) => tracing::info!(name = %item.name, "Deleted storage resource"),
                Err(e) => {
                    tracing::warn!(name = %item.name, kind = %e.kind, "Delete failed: {}", e.message);
                    errors.push(ItemError::new(item.name.clone(), Phase::Delete, e));
                }
            }
        }

        errors
    }

    /// Execute a plan produced by [`Plan::diff`]
    ///
    /// Creates run first so a parent group failure aborts before anything is
    /// changed, then updates, then deletions. The merged snapshot follows plan
    /// order; resources whose re-tag or deletion failed stay in it as
    /// previously recorded, unless the re-tag found them gone.
    pub async fn apply(
        &self,
        plan: &Plan,
        previous: Option<&StateSnapshot>,
    ) -> Result<CycleResult> {
        let empty = StateSnapshot::empty(self.ctx.clone());
        let base = previous.unwrap_or(&empty);
        let mut errors = Vec::new();

        let to_create = plan.resources_for(ActionType::Create);
        let created = if to_create.is_empty() {
            None
        } else {
            let result = self.create(&to_create).await?;
            errors.extend(result.errors);
            Some(result.snapshot)
        };

        let to_update = plan.resources_for(ActionType::Update);
        let mut update_errors = Vec::new();
        let updated = if to_update.is_empty() {
            None
        } else {
            let result = self.update(&to_update, base).await?;
            update_errors = result.errors;
            Some(result.snapshot)
        };

        let doomed = base.subset(
            plan.actions_by_type(ActionType::Delete)
                .into_iter()
                .map(|a| a.name.as_str()),
        );
        let delete_errors = if doomed.is_empty() {
            Vec::new()
        } else {
            self.delete(&doomed).await
        };

        let mut snapshot = StateSnapshot::new(self.ctx.clone(), base.last_updated);
        for action in &plan.actions {
            let source = match action.action_type {
                ActionType::Create => created.as_ref(),
                // A failed re-tag leaves the resource in place with its old tags
                ActionType::Update => match update_errors.iter().find(|e| e.name == action.name) {
                    Some(err) if err.kind != ErrorKind::NotFound => Some(base),
                    Some(_) => None,
                    None => updated.as_ref(),
                },
                ActionType::NoOp => Some(base),
                ActionType::Delete => {
                    if delete_errors.iter().any(|e| e.name == action.name) {
                        Some(base)
                    } else {
                        None
                    }
                }
            };
            if let Some(item) = source.and_then(|s| s.get(&action.name)) {
                snapshot.items.push(item.clone());
            }
        }
        errors.extend(update_errors);
        errors.extend(delete_errors);

        snapshot.last_updated = next_timestamp(previous.map(|p| p.last_updated));
        Ok(CycleResult { snapshot, errors })
    }

    async fn create_one(
        &self,
        resource: &DesiredResource,
        managed: Option<&str>,
    ) -> std::result::Result<ObservedResource, ItemError> {
        let name = resource.name.as_str();
        let group = self.item_group(resource, managed, Phase::Create)?;

        let outcome = self
            .call(self.ops.begin_create(name, group))
            .await
            .map_err(|e| ItemError::new(name, Phase::Create, e))?;

        let created = match outcome {
            CreateOutcome::Completed(created) => created,
            CreateOutcome::Pending(operation) => {
                tracing::debug!(name, monitor = %operation.monitor, "Waiting for provisioning");
                wait_for_create(self.ops, &operation, &self.wait, &self.cancel)
                    .await
                    .map_err(|e| ItemError::new(name, Phase::Create, e))?
            }
        };

        if created.id.is_empty() {
            return Err(ItemError::new(
                name,
                Phase::Create,
                RemoteError::unknown("remote returned no identifier"),
            ));
        }

        // Tags go to the canonical name the remote reported
        let tagged = self
            .call(self.ops.apply_tags(&created.name, group, &resource.tags))
            .await
            .map_err(|e| ItemError::new(name, Phase::Tag, e))?;

        Ok(ObservedResource {
            id: if tagged.id.is_empty() {
                created.id
            } else {
                tagged.id
            },
            name: created.name,
            creation_timestamp: Utc::now(),
            tags: tagged.tags.unwrap_or_else(|| resource.tags.clone()),
            parent_group: group.map(str::to_string),
        })
    }

    async fn update_one(
        &self,
        resource: &DesiredResource,
        managed: Option<&str>,
        previous: &StateSnapshot,
    ) -> std::result::Result<ObservedResource, ItemError> {
        let name = resource.name.as_str();
        let group = self.item_group(resource, managed, Phase::Update)?;
        let prior = previous.get(name);

        let updated = self
            .call(self.ops.apply_tags(name, group, &resource.tags))
            .await
            .map_err(|e| ItemError::new(name, Phase::Update, e))?;

        let id = if updated.id.is_empty() {
            prior.map(|p| p.id.clone()).unwrap_or_default()
        } else {
            updated.id
        };
        if id.is_empty() {
            return Err(ItemError::new(
                name,
                Phase::Update,
                RemoteError::unknown("remote returned no identifier"),
            ));
        }

        Ok(ObservedResource {
            id,
            name: updated.name,
            creation_timestamp: updated
                .created_at
                .or_else(|| prior.map(|p| p.creation_timestamp))
                .unwrap_or_else(Utc::now),
            tags: updated.tags.unwrap_or_else(|| resource.tags.clone()),
            parent_group: group.map(str::to_string),
        })
    }

    /// Create the parent group once, if the provider needs one
    async fn ensure_parent(&self) -> Result<Option<String>> {
        let Some(group) = self.managed_group()? else {
            return Ok(None);
        };
        if self.cancel.is_cancelled() {
            return Err(CloudError::Cancelled);
        }

        tracing::info!(group, region = %self.ctx.default_region, "Ensuring parent group");
        self.call(self.ops.create_parent(group, &self.ctx.default_region))
            .await
            .map_err(|e| match e.kind {
                ErrorKind::Cancelled => CloudError::Cancelled,
                _ => CloudError::ParentCreate {
                    group: group.to_string(),
                    source: e,
                },
            })?;

        Ok(Some(group.to_string()))
    }

    fn managed_group(&self) -> Result<Option<&'a str>> {
        if !self.ops.is_hierarchical() {
            return Ok(None);
        }
        match self.ctx.parent_group_name.as_deref() {
            Some(group) if !group.is_empty() => Ok(Some(group)),
            _ => Err(CloudError::InvalidConfig(format!(
                "provider {} requires a parent group name",
                self.ops.kind()
            ))),
        }
    }

    /// Parent group for one item; only the managed group is accepted
    fn item_group<'g>(
        &self,
        resource: &DesiredResource,
        managed: Option<&'g str>,
        phase: Phase,
    ) -> std::result::Result<Option<&'g str>, ItemError> {
        match (managed, resource.parent_group.as_deref()) {
            (Some(managed), Some(requested)) if requested != managed => Err(ItemError::new(
                resource.name.clone(),
                phase,
                RemoteError::conflict(format!(
                    "parent group {} is not managed by this configuration (expected {})",
                    requested, managed
                )),
            )),
            _ => Ok(managed),
        }
    }

    async fn call<T, F>(&self, fut: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RemoteError::cancelled()),
            result = fut => result,
        }
    }
}

fn cancel_remaining(rest: &[DesiredResource], phase: Phase) -> Vec<ItemError> {
    rest.iter()
        .map(|resource| ItemError::cancelled(resource.name.clone(), phase))
        .collect()
}
