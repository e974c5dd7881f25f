//! Azure Storage account operations over the ARM REST API
//!
//! Storage accounts live inside a resource group, which must exist first.
//! Account creation is a long-running operation: ARM answers `202 Accepted`
//! with an `Azure-AsyncOperation` (or `Location`) monitor URL that is polled
//! until it reports a terminal status.

use crate::credential::{ClientSecretCredential, DEFAULT_AUTHORITY_HOST};
use crate::error::{self, AzureError, ErrorBody, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use storeflow_cloud::{
    CreateOutcome, ErrorKind, ListPage, MANAGED_TAG_KEY, PendingOperation, PollStatus,
    ProviderKind, RemoteError, RemoteResource, RemoteResult, ResourceOperations,
};

pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_LOCATION: &str = "eastus";

const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";
const STORAGE_API_VERSION: &str = "2023-01-01";

/// Upper bound for a single ARM or token request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for Azure Resource Manager
#[derive(Clone)]
pub struct AzureConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
    /// Location for new resource groups and storage accounts
    pub location: String,
    pub management_endpoint: String,
    pub authority_host: String,
    pub request_timeout: Duration,
}

impl AzureConfig {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            subscription_id: subscription_id.into(),
            location: DEFAULT_LOCATION.to_string(),
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("tenant_id", &self.tenant_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("subscription_id", &self.subscription_id),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                return Err(AzureError::InvalidConfig(format!("{} is empty", field)));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("location", &self.location)
            .field("management_endpoint", &self.management_endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageAccount {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
    #[serde(default)]
    properties: Option<AccountProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
    #[serde(default)]
    creation_time: Option<DateTime<Utc>>,
}

impl StorageAccount {
    fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }

    fn into_remote(self) -> RemoteResource {
        let parent_group = resource_group_of(&self.id);
        let created_at = self.properties.and_then(|p| p.creation_time);
        let tags = self.tags.and_then(|mut t| t.remove(MANAGED_TAG_KEY));

        let mut resource = RemoteResource::new(self.id, self.name);
        resource.created_at = created_at;
        resource.tags = tags;
        resource.parent_group = parent_group;
        resource
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountList {
    #[serde(default)]
    value: Vec<StorageAccount>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorBody>,
}

/// Resource group segment of an ARM resource id
pub fn resource_group_of(id: &str) -> Option<String> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }
    }
    None
}

/// Request body for a new storage account
fn account_body(location: &str) -> serde_json::Value {
    json!({
        "kind": "StorageV2",
        "location": location,
        "sku": { "name": "Standard_LRS" },
        "properties": {
            "accessTier": "Cool",
            "encryption": {
                "keySource": "Microsoft.Storage",
                "services": {
                    "blob": { "enabled": true, "keyType": "Account" },
                    "file": { "enabled": true, "keyType": "Account" }
                }
            }
        }
    })
}

fn monitor_url(headers: &HeaderMap) -> Option<String> {
    ["azure-asyncoperation", "location"]
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> RemoteResult<T> {
    serde_json::from_str(body)
        .map_err(|e| RemoteError::unknown(format!("unexpected response body: {}", e)))
}

fn require_group(group: Option<&str>) -> RemoteResult<&str> {
    group.ok_or_else(|| RemoteError::unknown("storage accounts require a resource group"))
}

/// Azure Storage implementation of [`ResourceOperations`]
#[derive(Debug)]
pub struct AzureStorageOperations {
    http: reqwest::Client,
    credential: ClientSecretCredential,
    subscription_id: String,
    location: String,
    endpoint: String,
}

impl AzureStorageOperations {
    pub fn new(config: &AzureConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let credential = ClientSecretCredential::new(
            http.clone(),
            &config.tenant_id,
            &config.client_id,
            &config.client_secret,
        )
        .with_authority_host(&config.authority_host)
        .with_management_endpoint(&config.management_endpoint);

        Ok(Self {
            http,
            credential,
            subscription_id: config.subscription_id.clone(),
            location: config.location.clone(),
            endpoint: config.management_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Build the client and prove the credential by fetching a token
    pub async fn connect(config: &AzureConfig) -> Result<Self> {
        let ops = Self::new(config)?;
        ops.credential.token().await?;
        tracing::debug!(subscription = %ops.subscription_id, "Azure credential verified");
        Ok(ops)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn group_url(&self, group: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups/{}?api-version={}",
            self.endpoint, self.subscription_id, group, RESOURCE_GROUP_API_VERSION
        )
    }

    fn account_url(&self, group: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}?api-version={}",
            self.endpoint, self.subscription_id, group, name, STORAGE_API_VERSION
        )
    }

    fn accounts_url(&self, group: Option<&str>) -> String {
        match group {
            Some(group) => format!(
                "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts?api-version={}",
                self.endpoint, self.subscription_id, group, STORAGE_API_VERSION
            ),
            None => format!(
                "{}/subscriptions/{}/providers/Microsoft.Storage/storageAccounts?api-version={}",
                self.endpoint, self.subscription_id, STORAGE_API_VERSION
            ),
        }
    }

    /// Authenticate and send a request
    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let token = self.credential.token().await.map_err(|e| match e {
            AzureError::Http(err) => error::from_transport(err),
            other => RemoteError::new(ErrorKind::Denied, other.to_string()),
        })?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(error::from_transport)
    }

    async fn text(response: Response) -> RemoteResult<String> {
        response.text().await.map_err(error::from_transport)
    }

    /// Turn a non-success response into a remote error
    async fn failure(response: Response) -> RemoteError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        error::from_response(status, &body)
    }

    async fn get_account(&self, url: &str) -> RemoteResult<StorageAccount> {
        let response = self.send(self.http.get(url)).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        decode(&Self::text(response).await?)
    }
}

#[async_trait]
impl ResourceOperations for AzureStorageOperations {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    async fn create_parent(&self, group: &str, region: &str) -> RemoteResult<()> {
        let location = if region.is_empty() {
            self.location.as_str()
        } else {
            region
        };
        let response = self
            .send(
                self.http
                    .put(self.group_url(group))
                    .json(&json!({ "location": location })),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        tracing::debug!(group, location, "Resource group ready");
        Ok(())
    }

    async fn begin_create(&self, name: &str, group: Option<&str>) -> RemoteResult<CreateOutcome> {
        let group = require_group(group)?;
        let url = self.account_url(group, name);
        let response = self
            .send(self.http.put(&url).json(&account_body(&self.location)))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure(response).await);
        }

        let monitor = monitor_url(response.headers());
        let pending = |monitor: Option<String>| {
            CreateOutcome::Pending(
                PendingOperation::new(name, monitor.unwrap_or_else(|| url.clone()))
                    .with_target(url.clone()),
            )
        };

        if status == StatusCode::ACCEPTED {
            return Ok(pending(monitor));
        }

        let body = Self::text(response).await?;
        if body.trim().is_empty() {
            return Ok(pending(monitor));
        }

        let account: StorageAccount = decode(&body)?;
        match account.provisioning_state() {
            Some("Succeeded") => Ok(CreateOutcome::Completed(account.into_remote())),
            Some("Failed") => Err(RemoteError::unknown(format!(
                "provisioning of {} failed",
                name
            ))),
            _ => Ok(pending(monitor)),
        }
    }

    async fn poll_create(&self, operation: &PendingOperation) -> RemoteResult<PollStatus> {
        let response = self.send(self.http.get(&operation.monitor)).await?;
        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Ok(PollStatus::InProgress);
        }
        if !status.is_success() {
            return Err(Self::failure(response).await);
        }

        let target = operation.target.as_deref().unwrap_or(&operation.monitor);
        let body = Self::text(response).await?;
        if body.trim().is_empty() {
            return Ok(PollStatus::Succeeded(self.get_account(target).await?.into_remote()));
        }

        // Azure-AsyncOperation monitors return an operation status document
        if let Ok(op) = serde_json::from_str::<OperationStatus>(&body) {
            return match op.status.as_str() {
                "Succeeded" => Ok(PollStatus::Succeeded(
                    self.get_account(target).await?.into_remote(),
                )),
                "Failed" | "Canceled" => {
                    let detail = op.error.unwrap_or_default();
                    let kind = if op.status == "Canceled" {
                        ErrorKind::Cancelled
                    } else {
                        error::classify(0, detail.code.as_deref())
                    };
                    let message = detail
                        .describe()
                        .unwrap_or_else(|| format!("provisioning {}", op.status.to_lowercase()));
                    Ok(PollStatus::Failed(RemoteError::new(kind, message)))
                }
                _ => Ok(PollStatus::InProgress),
            };
        }

        // Location monitors and resource polls return the account itself
        let account: StorageAccount = decode(&body)?;
        match account.provisioning_state() {
            Some("Succeeded") | None => Ok(PollStatus::Succeeded(account.into_remote())),
            Some("Failed") => Ok(PollStatus::Failed(RemoteError::unknown(format!(
                "provisioning of {} failed",
                operation.name
            )))),
            Some(_) => Ok(PollStatus::InProgress),
        }
    }

    async fn apply_tags(
        &self,
        name: &str,
        group: Option<&str>,
        tags: &str,
    ) -> RemoteResult<RemoteResource> {
        let group = require_group(group)?;
        let mut managed = serde_json::Map::new();
        managed.insert(MANAGED_TAG_KEY.to_string(), json!(tags));
        let response = self
            .send(
                self.http
                    .patch(self.account_url(group, name))
                    .json(&json!({ "tags": managed })),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        let account: StorageAccount = decode(&Self::text(response).await?)?;
        Ok(account.into_remote())
    }

    async fn list_page(
        &self,
        group: Option<&str>,
        continuation: Option<&str>,
    ) -> RemoteResult<ListPage> {
        let url = match continuation {
            Some(next) => next.to_string(),
            None => self.accounts_url(group),
        };
        let response = self.send(self.http.get(&url)).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let list: AccountList = decode(&Self::text(response).await?)?;
        tracing::debug!(count = list.value.len(), more = list.next_link.is_some(), "Listed storage accounts");
        Ok(ListPage {
            items: list.value.into_iter().map(StorageAccount::into_remote).collect(),
            next: list.next_link.filter(|link| !link.is_empty()),
        })
    }

    async fn delete_one(&self, name: &str, group: Option<&str>) -> RemoteResult<()> {
        let group = require_group(group)?;
        let response = self
            .send(self.http.delete(self.account_url(group, name)))
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => {
                tracing::debug!(name, "Storage account was already gone");
                Ok(())
            }
            status if status.is_success() => Ok(()),
            _ => Err(Self::failure(response).await),
        }
    }
}
