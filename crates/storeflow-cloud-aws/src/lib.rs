//! AWS S3 provider for StoreFlow
//!
//! Implements [`storeflow_cloud::ResourceOperations`] for S3 buckets.
//!
//! # Requirements
//!
//! - Credentials from the AWS default provider chain (env vars, profile, IMDS)
//! - `S3_REGION` or a default region in the AWS config
//!
//! # Example
//!
//! ```ignore
//! use storeflow_cloud_aws::{S3Config, S3Operations};
//!
//! let ops = S3Operations::connect(&S3Config { region: Some("eu-west-1".into()) }).await?;
//! let page = ops.list_page(None, None).await?;
//! ```

pub mod error;
pub mod s3;

pub use error::{AwsError, Result};
pub use s3::{S3Config, S3Operations};
