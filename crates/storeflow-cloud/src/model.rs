//! Desired and observed resource model

use crate::error::UnknownProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag key under which the free-form tag payload is stored remotely
pub const MANAGED_TAG_KEY: &str = "storeflow";

/// Supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Aws,
    Azure,
}

impl std::str::FromStr for ProviderKind {
    type Err = UnknownProviderKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" | "s3" => Ok(Self::Aws),
            "azure" | "az" => Ok(Self::Azure),
            _ => Err(UnknownProviderKind(s.to_string())),
        }
    }
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
        }
    }

    /// Whether a parent management group must exist before a storage resource
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, Self::Azure)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the configured provider
///
/// Built once at configure time and shared read-only by every lifecycle call.
/// Its serialized form is persisted in the state snapshot as
/// `providerIdentity` so the next cycle can re-open clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderContext {
    pub provider_kind: ProviderKind,
    pub subscription_or_account_id: String,
    pub default_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_name: Option<String>,
}

impl ProviderContext {
    pub fn new(
        provider_kind: ProviderKind,
        subscription_or_account_id: impl Into<String>,
        default_region: impl Into<String>,
    ) -> Self {
        Self {
            provider_kind,
            subscription_or_account_id: subscription_or_account_id.into(),
            default_region: default_region.into(),
            parent_group_name: None,
        }
    }

    pub fn with_parent_group(mut self, group: impl Into<String>) -> Self {
        self.parent_group_name = Some(group.into());
        self
    }
}

/// One declared storage unit
///
/// Names are expected to be unique within a single cycle's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredResource {
    pub name: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group: Option<String>,
}

impl DesiredResource {
    pub fn new(name: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: tags.into(),
            parent_group: None,
        }
    }

    pub fn with_parent_group(mut self, group: impl Into<String>) -> Self {
        self.parent_group = Some(group.into());
        self
    }
}

/// A resource as last confirmed remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "date")]
    pub creation_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group: Option<String>,
}

/// Metadata returned by a provider for one remote resource
///
/// This is the operation layer's output type; it never sees
/// [`DesiredResource`] or [`ObservedResource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResource {
    pub id: String,
    /// Canonical name as reported by the remote, which may differ in casing
    /// or normalization from the requested one
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Managed tag payload; `None` when the resource does not carry the
    /// managed tag at all
    pub tags: Option<String>,
    pub parent_group: Option<String>,
}

impl RemoteResource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: None,
            tags: None,
            parent_group: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_parent_group(mut self, group: impl Into<String>) -> Self {
        self.parent_group = Some(group.into());
        self
    }
}
