//! AWS provider error types

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use storeflow_cloud::{ErrorKind, RemoteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("No AWS region configured. Set S3_REGION or configure a default region")]
    MissingRegion,

    #[error("No AWS credentials found in the default provider chain")]
    MissingCredentials,

    #[error("AWS credentials could not be loaded: {0}")]
    CredentialsUnavailable(String),
}

pub type Result<T> = std::result::Result<T, AwsError>;

/// Map an S3 error code to an error kind
pub fn classify_code(code: Option<&str>) -> ErrorKind {
    match code {
        Some("NoSuchBucket" | "NoSuchTagSet" | "NotFound") => ErrorKind::NotFound,
        Some(
            "BucketAlreadyExists"
            | "BucketAlreadyOwnedByYou"
            | "BucketNotEmpty"
            | "OperationAborted"
            | "TooManyBuckets",
        ) => ErrorKind::Conflict,
        Some(
            "SlowDown" | "ServiceUnavailable" | "InternalError" | "RequestTimeout" | "Throttling",
        ) => ErrorKind::Transient,
        Some(
            "AccessDenied"
            | "AllAccessDisabled"
            | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch"
            | "ExpiredToken"
            | "InvalidToken",
        ) => ErrorKind::Denied,
        _ => ErrorKind::Unknown,
    }
}

/// Convert an SDK failure into a remote error, keeping the remote message
pub fn remote_error<E, R>(err: &SdkError<E, R>) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let kind = match err {
        SdkError::TimeoutError(_) => ErrorKind::Timeout,
        SdkError::DispatchFailure(_) => ErrorKind::Transient,
        _ => classify_code(err.code()),
    };

    let message = match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (Some(code), None) => code.to_string(),
        _ => DisplayErrorContext(err).to_string(),
    };

    RemoteError::new(kind, message)
}
