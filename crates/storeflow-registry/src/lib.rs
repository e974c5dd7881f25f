//! Provider registry
//!
//! Turns a provider name and a credentials environment into a verified
//! [`ConfiguredProvider`]. Configuration fails closed: an unknown name, a
//! missing variable or a rejected credential yields a [`ConfigError`] and no
//! handle.
//!
//! | provider | variables |
//! |----------|-----------|
//! | `aws`    | `S3_REGION`, `AWS_ACCOUNT_ID` (optional), AWS default credential chain |
//! | `azure`  | `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`, `AZURE_SUBSCRIPTION_ID`, `AZURE_LOCATION` (optional), `AZURE_RESOURCE_GROUP` |

pub mod env;
pub mod error;
pub mod provider;

pub use env::CredentialsEnv;
pub use error::{ConfigError, Result};
pub use provider::{ConfiguredProvider, configure, configure_with_group};
