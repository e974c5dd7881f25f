//! S3 bucket operations
//!
//! Buckets are flat: no parent group is involved and every create completes
//! synchronously. The tag payload is stored under a single managed tag key.

use crate::error::{AwsError, Result, remote_error};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, Tag, Tagging};
use chrono::{DateTime, Utc};
use storeflow_cloud::{
    CreateOutcome, ErrorKind, ListPage, MANAGED_TAG_KEY, PendingOperation, PollStatus,
    ProviderKind, RemoteError, RemoteResource, RemoteResult, ResourceOperations,
};

/// Region in which S3 rejects an explicit location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for S3
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    /// Explicit region; `None` uses the default provider chain
    pub region: Option<String>,
}

/// S3 implementation of [`ResourceOperations`]
#[derive(Debug, Clone)]
pub struct S3Operations {
    client: Client,
    region: String,
}

impl S3Operations {
    /// Load the shared AWS config and verify that credentials resolve
    pub async fn connect(config: &S3Config) -> Result<Self> {
        let loader = aws_config::defaults(BehaviorVersion::latest());
        let sdk_config = match &config.region {
            Some(region) => loader.region(Region::new(region.clone())).load().await,
            None => loader.load().await,
        };

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .ok_or(AwsError::MissingRegion)?;

        let provider = sdk_config
            .credentials_provider()
            .ok_or(AwsError::MissingCredentials)?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| AwsError::CredentialsUnavailable(e.to_string()))?;

        tracing::debug!(region = %region, "S3 client configured");

        Ok(Self {
            client: Client::new(&sdk_config),
            region,
        })
    }

    /// Wrap an existing client
    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn bucket_tags(&self, name: &str) -> RemoteResult<Option<String>> {
        match self.client.get_bucket_tagging().bucket(name).send().await {
            Ok(output) => Ok(find_managed_tag(
                output.tag_set().iter().map(|t| (t.key(), t.value())),
            )),
            Err(err) => match err.code() {
                Some("NoSuchTagSet") => Ok(None),
                // Buckets homed in another region answer with a redirect
                Some("PermanentRedirect" | "AuthorizationHeaderMalformed") => {
                    tracing::debug!(bucket = name, "Skipping tags of bucket outside region");
                    Ok(None)
                }
                _ => Err(remote_error(&err)),
            },
        }
    }
}

/// ARN used as the bucket identifier
pub fn bucket_arn(name: &str) -> String {
    format!("arn:aws:s3:::{}", name)
}

/// Location constraint for a create in `region`, if one must be sent
pub fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
    if region.is_empty() || region == DEFAULT_REGION {
        None
    } else {
        Some(BucketLocationConstraint::from(region))
    }
}

/// Tag set holding the payload under the managed key
pub fn managed_tagging(payload: &str) -> RemoteResult<Tagging> {
    let tag = Tag::builder()
        .key(MANAGED_TAG_KEY)
        .value(payload)
        .build()
        .map_err(|e| RemoteError::unknown(e.to_string()))?;
    Tagging::builder()
        .tag_set(tag)
        .build()
        .map_err(|e| RemoteError::unknown(e.to_string()))
}

fn find_managed_tag<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Option<String> {
    tags.into_iter()
        .find(|(key, _)| *key == MANAGED_TAG_KEY)
        .map(|(_, value)| value.to_string())
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl ResourceOperations for S3Operations {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    async fn create_parent(&self, _group: &str, _region: &str) -> RemoteResult<()> {
        Ok(())
    }

    async fn begin_create(&self, name: &str, _group: Option<&str>) -> RemoteResult<CreateOutcome> {
        let mut request = self.client.create_bucket().bucket(name);
        if let Some(constraint) = location_constraint(&self.region) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => tracing::debug!(bucket = name, "Bucket created"),
            Err(err) if err.code() == Some("BucketAlreadyOwnedByYou") => {
                tracing::debug!(bucket = name, "Bucket already owned; adopting");
            }
            Err(err) => return Err(remote_error(&err)),
        }

        Ok(CreateOutcome::Completed(
            RemoteResource::new(bucket_arn(name), name).with_created_at(Utc::now()),
        ))
    }

    async fn poll_create(&self, operation: &PendingOperation) -> RemoteResult<PollStatus> {
        // Creates never return Pending on S3
        Ok(PollStatus::Succeeded(RemoteResource::new(
            bucket_arn(&operation.name),
            operation.name.clone(),
        )))
    }

    async fn apply_tags(
        &self,
        name: &str,
        _group: Option<&str>,
        tags: &str,
    ) -> RemoteResult<RemoteResource> {
        self.client
            .put_bucket_tagging()
            .bucket(name)
            .tagging(managed_tagging(tags)?)
            .send()
            .await
            .map_err(|e| remote_error(&e))?;

        Ok(RemoteResource::new(bucket_arn(name), name).with_tags(tags))
    }

    async fn list_page(
        &self,
        _group: Option<&str>,
        _continuation: Option<&str>,
    ) -> RemoteResult<ListPage> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| remote_error(&e))?;

        let mut items = Vec::new();
        for bucket in output.buckets() {
            let Some(name) = bucket.name() else {
                continue;
            };
            // ListBuckets covers the whole account; only tagged buckets are ours
            let Some(tags) = self.bucket_tags(name).await? else {
                tracing::debug!(bucket = name, "Skipping bucket without managed tag");
                continue;
            };
            let mut resource = RemoteResource::new(bucket_arn(name), name).with_tags(tags);
            if let Some(created) = bucket.creation_date().and_then(to_chrono) {
                resource = resource.with_created_at(created);
            }
            items.push(resource);
        }

        tracing::debug!(count = items.len(), "Listed managed S3 buckets");
        Ok(ListPage::last(items))
    }

    async fn delete_one(&self, name: &str, _group: Option<&str>) -> RemoteResult<()> {
        match self.client.delete_bucket().bucket(name).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let remote = remote_error(&err);
                if remote.kind == ErrorKind::Conflict {
                    tracing::warn!(bucket = name, "Bucket is not empty and was left in place");
                }
                Err(remote)
            }
        }
    }
}
