//! Azure Storage provider for StoreFlow
//!
//! Implements [`storeflow_cloud::ResourceOperations`] for Azure storage
//! accounts, talking to Azure Resource Manager over REST.
//!
//! # Requirements
//!
//! A service principal: `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`,
//! `AZURE_CLIENT_SECRET` and `AZURE_SUBSCRIPTION_ID`.
//!
//! # Example
//!
//! ```ignore
//! use storeflow_cloud_azure::{AzureConfig, AzureStorageOperations};
//!
//! let config = AzureConfig::new(tenant, client_id, secret, subscription);
//! let ops = AzureStorageOperations::connect(&config).await?;
//! ops.create_parent("rg-storage", "eastus").await?;
//! ```

pub mod credential;
pub mod error;
pub mod storage;

pub use credential::ClientSecretCredential;
pub use error::{AzureError, Result};
pub use storage::{AzureConfig, AzureStorageOperations, DEFAULT_LOCATION, DEFAULT_REQUEST_TIMEOUT};
