use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use storeflow_cloud::{
    CancellationToken, CreateOutcome, ListPage, PendingOperation, PollStatus, ProviderContext,
    ProviderKind, RemoteError, RemoteResource, RemoteResult, ResourceOperations,
};

/// Remote call observed by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateParent(String),
    BeginCreate(String),
    Poll(String),
    ApplyTags(String, String),
    ListPage(Option<String>),
    Delete(String),
}

#[derive(Default)]
struct Remote {
    resources: Vec<RemoteResource>,
    pending: HashMap<String, usize>,
    calls: Vec<Call>,
}

/// In-memory operation set that records every call
pub struct FakeOperations {
    kind: ProviderKind,
    remote: Mutex<Remote>,
    pub fail_parent: bool,
    pub fail_create: HashSet<String>,
    pub fail_tags: HashSet<String>,
    pub fail_delete: HashSet<String>,
    /// Number of `InProgress` polls before a create succeeds
    pub polls_before_done: Option<usize>,
    /// Fixed listing pages; when empty the listing is one page of all resources
    pub pages: Vec<Vec<RemoteResource>>,
    /// Canonical name the remote reports for a requested one
    pub canonicalize: fn(&str) -> String,
    /// Cancel the token once the create call for this name has been issued
    pub cancel_on_create: Option<(String, CancellationToken)>,
}

impl FakeOperations {
    pub fn flat() -> Self {
        Self::new(ProviderKind::Aws)
    }

    pub fn hierarchical() -> Self {
        Self::new(ProviderKind::Azure)
    }

    fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            remote: Mutex::new(Remote::default()),
            fail_parent: false,
            fail_create: HashSet::new(),
            fail_tags: HashSet::new(),
            fail_delete: HashSet::new(),
            polls_before_done: None,
            pages: Vec::new(),
            canonicalize: |name| name.to_string(),
            cancel_on_create: None,
        }
    }

    pub fn with_existing(self, names: &[&str]) -> Self {
        {
            let mut remote = self.remote.lock().unwrap();
            for name in names {
                remote.resources.push(resource(name, "seed"));
            }
        }
        self
    }

    /// Resources in the same account that do not carry the managed tag
    pub fn with_unmanaged(self, names: &[&str]) -> Self {
        {
            let mut remote = self.remote.lock().unwrap();
            for name in names {
                remote
                    .resources
                    .push(RemoteResource::new(format!("id-{}", name), *name));
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.remote.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.remote
            .lock()
            .unwrap()
            .resources
            .iter()
            .any(|r| r.name == name)
    }

    fn record(&self, call: Call) {
        self.remote.lock().unwrap().calls.push(call);
    }

    fn insert(&self, name: &str) -> RemoteResource {
        let created = resource(name, "");
        let mut remote = self.remote.lock().unwrap();
        if !remote.resources.iter().any(|r| r.name == name) {
            remote.resources.push(created.clone());
        }
        created
    }
}

pub fn resource(name: &str, tags: &str) -> RemoteResource {
    RemoteResource::new(format!("id-{}", name), name)
        .with_created_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .with_tags(tags)
}

pub fn aws_context() -> ProviderContext {
    ProviderContext::new(ProviderKind::Aws, "123456789012", "us-east-1")
}

pub fn azure_context() -> ProviderContext {
    ProviderContext::new(ProviderKind::Azure, "sub-1", "eastus").with_parent_group("rg-storage")
}

#[async_trait]
impl ResourceOperations for FakeOperations {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn create_parent(&self, group: &str, _region: &str) -> RemoteResult<()> {
        self.record(Call::CreateParent(group.to_string()));
        if self.fail_parent {
            return Err(RemoteError::new(
                storeflow_cloud::ErrorKind::Denied,
                "AuthorizationFailed",
            ));
        }
        Ok(())
    }

    async fn begin_create(&self, name: &str, _group: Option<&str>) -> RemoteResult<CreateOutcome> {
        self.record(Call::BeginCreate(name.to_string()));
        if let Some((target, token)) = &self.cancel_on_create {
            if target == name {
                token.cancel();
            }
        }
        if self.fail_create.contains(name) {
            return Err(RemoteError::conflict(format!("{} is already taken", name)));
        }
        let canonical = (self.canonicalize)(name);
        match self.polls_before_done {
            Some(polls) => {
                self.remote
                    .lock()
                    .unwrap()
                    .pending
                    .insert(canonical.clone(), polls);
                Ok(CreateOutcome::Pending(PendingOperation::new(
                    canonical.clone(),
                    format!("op-{}", canonical),
                )))
            }
            None => Ok(CreateOutcome::Completed(self.insert(&canonical))),
        }
    }

    async fn poll_create(&self, operation: &PendingOperation) -> RemoteResult<PollStatus> {
        self.record(Call::Poll(operation.name.clone()));
        let remaining = {
            let mut remote = self.remote.lock().unwrap();
            let left = remote.pending.get_mut(&operation.name).map(|left| {
                let current = *left;
                *left = left.saturating_sub(1);
                current
            });
            left.unwrap_or(0)
        };
        if remaining == 0 {
            Ok(PollStatus::Succeeded(self.insert(&operation.name)))
        } else {
            Ok(PollStatus::InProgress)
        }
    }

    async fn apply_tags(
        &self,
        name: &str,
        _group: Option<&str>,
        tags: &str,
    ) -> RemoteResult<RemoteResource> {
        self.record(Call::ApplyTags(name.to_string(), tags.to_string()));
        if self.fail_tags.contains(name) {
            return Err(RemoteError::unknown("InvalidTag"));
        }
        let mut remote = self.remote.lock().unwrap();
        match remote.resources.iter_mut().find(|r| r.name == name) {
            Some(existing) => {
                existing.tags = Some(tags.to_string());
                Ok(existing.clone())
            }
            None => Err(RemoteError::not_found(format!("{} does not exist", name))),
        }
    }

    async fn list_page(
        &self,
        _group: Option<&str>,
        continuation: Option<&str>,
    ) -> RemoteResult<ListPage> {
        self.record(Call::ListPage(continuation.map(str::to_string)));
        if self.pages.is_empty() {
            let items = self.remote.lock().unwrap().resources.clone();
            return Ok(ListPage::last(items));
        }
        let index: usize = continuation.map(|c| c.parse().unwrap()).unwrap_or(0);
        let next = if index + 1 < self.pages.len() {
            Some((index + 1).to_string())
        } else {
            None
        };
        Ok(ListPage {
            items: self.pages[index].clone(),
            next,
        })
    }

    async fn delete_one(&self, name: &str, _group: Option<&str>) -> RemoteResult<()> {
        self.record(Call::Delete(name.to_string()));
        if self.fail_delete.contains(name) {
            return Err(RemoteError::new(
                storeflow_cloud::ErrorKind::Transient,
                "ServiceUnavailable",
            ));
        }
        self.remote
            .lock()
            .unwrap()
            .resources
            .retain(|r| r.name != name);
        Ok(())
    }
}
