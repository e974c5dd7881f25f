//! Configured provider handle

use crate::env::*;
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use storeflow_cloud::{
    CreateOutcome, ListPage, PendingOperation, PollStatus, ProviderContext, ProviderKind,
    RemoteResource, RemoteResult, ResourceOperations,
};
use storeflow_cloud_aws::{AwsError, S3Config, S3Operations};
use storeflow_cloud_azure::{AzureConfig, AzureError, AzureStorageOperations, DEFAULT_LOCATION};

/// Account id recorded when `AWS_ACCOUNT_ID` is not set
pub const DEFAULT_AWS_ACCOUNT: &str = "default";

/// A provider whose credentials have been verified
///
/// Built once per process and borrowed by every lifecycle call.
#[derive(Debug)]
pub enum ConfiguredProvider {
    Aws {
        ops: S3Operations,
        context: ProviderContext,
    },
    Azure {
        ops: AzureStorageOperations,
        context: ProviderContext,
    },
}

impl ConfiguredProvider {
    pub fn context(&self) -> &ProviderContext {
        match self {
            Self::Aws { context, .. } | Self::Azure { context, .. } => context,
        }
    }

    fn ops(&self) -> &dyn ResourceOperations {
        match self {
            Self::Aws { ops, .. } => ops,
            Self::Azure { ops, .. } => ops,
        }
    }
}

#[async_trait]
impl ResourceOperations for ConfiguredProvider {
    fn kind(&self) -> ProviderKind {
        self.context().provider_kind
    }

    async fn create_parent(&self, group: &str, region: &str) -> RemoteResult<()> {
        self.ops().create_parent(group, region).await
    }

    async fn begin_create(&self, name: &str, group: Option<&str>) -> RemoteResult<CreateOutcome> {
        self.ops().begin_create(name, group).await
    }

    async fn poll_create(&self, operation: &PendingOperation) -> RemoteResult<PollStatus> {
        self.ops().poll_create(operation).await
    }

    async fn apply_tags(
        &self,
        name: &str,
        group: Option<&str>,
        tags: &str,
    ) -> RemoteResult<RemoteResource> {
        self.ops().apply_tags(name, group, tags).await
    }

    async fn list_page(
        &self,
        group: Option<&str>,
        continuation: Option<&str>,
    ) -> RemoteResult<ListPage> {
        self.ops().list_page(group, continuation).await
    }

    async fn delete_one(&self, name: &str, group: Option<&str>) -> RemoteResult<()> {
        self.ops().delete_one(name, group).await
    }
}

/// Build and verify a provider from the environment
pub async fn configure(provider_name: &str, env: &CredentialsEnv) -> Result<ConfiguredProvider> {
    configure_with_group(provider_name, env, None).await
}

/// Like [`configure`], with a parent group that overrides `AZURE_RESOURCE_GROUP`
pub async fn configure_with_group(
    provider_name: &str,
    env: &CredentialsEnv,
    parent_group: Option<&str>,
) -> Result<ConfiguredProvider> {
    let kind: ProviderKind = provider_name
        .parse()
        .map_err(|_| ConfigError::UnknownProvider(provider_name.to_string()))?;

    let provider = match kind {
        ProviderKind::Aws => configure_aws(env).await?,
        ProviderKind::Azure => configure_azure(env, parent_group).await?,
    };

    let ctx = provider.context();
    tracing::info!(
        provider = %ctx.provider_kind,
        account = %ctx.subscription_or_account_id,
        region = %ctx.default_region,
        group = ctx.parent_group_name.as_deref().unwrap_or("-"),
        "Provider configured"
    );
    Ok(provider)
}

async fn configure_aws(env: &CredentialsEnv) -> Result<ConfiguredProvider> {
    let config = S3Config {
        region: env.get(S3_REGION).map(str::to_string),
    };
    let ops = S3Operations::connect(&config).await.map_err(|e| match e {
        AwsError::MissingRegion => ConfigError::MissingEnvVar(S3_REGION.to_string()),
        other => ConfigError::CredentialCheck {
            provider: "aws".to_string(),
            message: other.to_string(),
        },
    })?;

    let context = ProviderContext::new(ProviderKind::Aws, aws_account_id(env), ops.region());
    Ok(ConfiguredProvider::Aws { ops, context })
}

async fn configure_azure(
    env: &CredentialsEnv,
    parent_group: Option<&str>,
) -> Result<ConfiguredProvider> {
    let config = azure_config(env)?;
    let group = parent_group
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(Ok)
        .unwrap_or_else(|| env.require(AZURE_RESOURCE_GROUP))?
        .to_string();

    let ops = AzureStorageOperations::connect(&config)
        .await
        .map_err(|e| match e {
            AzureError::InvalidConfig(msg) => ConfigError::InvalidConfig(msg),
            other => ConfigError::CredentialCheck {
                provider: "azure".to_string(),
                message: other.to_string(),
            },
        })?;

    let context = ProviderContext::new(ProviderKind::Azure, &config.subscription_id, &config.location)
        .with_parent_group(group);
    Ok(ConfiguredProvider::Azure { ops, context })
}

/// Account id for the AWS provider context
pub fn aws_account_id(env: &CredentialsEnv) -> String {
    env.get(AWS_ACCOUNT_ID)
        .unwrap_or(DEFAULT_AWS_ACCOUNT)
        .to_string()
}

/// Azure connection settings; every required variable is checked before any
/// network call
pub fn azure_config(env: &CredentialsEnv) -> Result<AzureConfig> {
    let mut config = AzureConfig::new(
        env.require(AZURE_TENANT_ID)?,
        env.require(AZURE_CLIENT_ID)?,
        env.require(AZURE_CLIENT_SECRET)?,
        env.require(AZURE_SUBSCRIPTION_ID)?,
    );
    config.location = env.get(AZURE_LOCATION).unwrap_or(DEFAULT_LOCATION).to_string();
    if let Some(host) = env.get(AZURE_AUTHORITY_HOST) {
        config.authority_host = host.to_string();
    }
    if let Some(endpoint) = env.get(AZURE_MANAGEMENT_ENDPOINT) {
        config.management_endpoint = endpoint.to_string();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_env() -> CredentialsEnv {
        CredentialsEnv::new()
            .with(AZURE_TENANT_ID, "tenant")
            .with(AZURE_CLIENT_ID, "client")
            .with(AZURE_CLIENT_SECRET, "secret")
            .with(AZURE_SUBSCRIPTION_ID, "sub")
    }

    #[test]
    fn test_aws_account_id_defaults() {
        assert_eq!(aws_account_id(&CredentialsEnv::new()), "default");
        let env = CredentialsEnv::new().with(AWS_ACCOUNT_ID, "123456789012");
        assert_eq!(aws_account_id(&env), "123456789012");
    }

    #[test]
    fn test_azure_config_defaults_location() {
        let config = azure_config(&azure_env()).unwrap();
        assert_eq!(config.location, "eastus");
        assert_eq!(config.subscription_id, "sub");
    }

    #[test]
    fn test_azure_config_requires_every_secret() {
        for missing in [
            AZURE_TENANT_ID,
            AZURE_CLIENT_ID,
            AZURE_CLIENT_SECRET,
            AZURE_SUBSCRIPTION_ID,
        ] {
            let env = azure_env().with(missing, "");
            match azure_config(&env) {
                Err(ConfigError::MissingEnvVar(name)) => assert_eq!(name, missing),
                other => panic!("Expected MissingEnvVar for {}, got {:?}", missing, other),
            }
        }
    }
}
