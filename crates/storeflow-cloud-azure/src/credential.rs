//! Client secret credential for Azure Resource Manager
//!
//! Exchanges a service principal's secret for an ARM access token using the
//! OAuth2 client credentials grant and caches it until shortly before expiry.

use crate::error::{AzureError, Result};
use crate::storage::DEFAULT_MANAGEMENT_ENDPOINT;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN_SECS: i64 = 120;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Service principal credential
pub struct ClientSecretCredential {
    http: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            scope: management_scope(DEFAULT_MANAGEMENT_ENDPOINT),
            cache: Mutex::new(None),
        }
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Request tokens for the given ARM endpoint (sovereign clouds)
    pub fn with_management_endpoint(mut self, endpoint: &str) -> Self {
        self.scope = management_scope(endpoint);
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        )
    }

    /// Return a valid bearer token, fetching a new one when needed
    pub async fn token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
                return Ok(cached.value.clone());
            }
        }

        tracing::debug!(tenant = %self.tenant_id, "Requesting Azure access token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self.http.post(self.token_url()).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AzureError::TokenRequest {
                status: status.as_u16(),
                message: token_error_message(&body),
            });
        }

        let token: TokenResponse = response.json().await?;
        let fresh = CachedToken {
            value: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        };
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority_host", &self.authority_host)
            .finish()
    }
}

/// `.default` scope of an ARM endpoint
pub fn management_scope(endpoint: &str) -> String {
    format!("{}/.default", endpoint.trim_end_matches('/'))
}

/// Extract `error_description` from an AAD error body
fn token_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct TokenError {
        error: Option<String>,
        error_description: Option<String>,
    }

    match serde_json::from_str::<TokenError>(body) {
        Ok(TokenError {
            error_description: Some(description),
            ..
        }) => description,
        Ok(TokenError {
            error: Some(error), ..
        }) => error,
        _ => body.trim().to_string(),
    }
}
