use thiserror::Error;

/// Errors raised while configuring a provider
///
/// All of them are fatal: no provider handle is produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown provider: {0} (expected aws or azure)")]
    UnknownProvider(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("{provider} credentials could not be verified: {message}")]
    CredentialCheck { provider: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
