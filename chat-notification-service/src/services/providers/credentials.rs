//! OAuth2 access tokens for the FCM HTTP v1 API.
//!
//! Tokens come from one of three places: a static token handed in through
//! configuration, a service-account key (JWT bearer grant) or the platform
//! metadata server. Fetched tokens are cached until shortly before they expire.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::ProviderError;
use crate::config::FcmConfig;

pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Service-account key as downloaded from the cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let key: ServiceAccountKey = serde_json::from_str(json).map_err(|e| {
            ProviderError::Configuration(format!("Invalid service account key: {}", e))
        })?;

        if let Some(kind) = key.key_type.as_deref() {
            if kind != "service_account" {
                return Err(ProviderError::Configuration(format!(
                    "Unsupported credential type '{}', expected 'service_account'",
                    kind
                )));
            }
        }

        Ok(key)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Configuration(format!(
                "Failed to read service account key from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }
}

enum CredentialSource {
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        encoding_key: EncodingKey,
    },
    Metadata {
        base_url: String,
    },
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    /// `None` never expires.
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > Instant::now() + REFRESH_MARGIN,
            None => true,
        }
    }
}

/// Hands out bearer tokens for FCM, shared by all concurrent sends.
pub struct AccessTokenProvider {
    source: CredentialSource,
    client: Client,
    cache: Mutex<Option<CachedToken>>,
}

impl AccessTokenProvider {
    fn with_source(source: CredentialSource, client: Client) -> Self {
        Self {
            source,
            client,
            cache: Mutex::new(None),
        }
    }

    pub fn static_token(token: impl Into<String>, client: Client) -> Self {
        Self::with_source(CredentialSource::Static(token.into()), client)
    }

    pub fn service_account(key: ServiceAccountKey, client: Client) -> Result<Self, ProviderError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ProviderError::Configuration(format!("Failed to parse service account private key: {}", e))
        })?;

        Ok(Self::with_source(
            CredentialSource::ServiceAccount { key, encoding_key },
            client,
        ))
    }

    pub fn metadata_server(base_url: impl Into<String>, client: Client) -> Self {
        Self::with_source(
            CredentialSource::Metadata {
                base_url: base_url.into(),
            },
            client,
        )
    }

    /// Pick the credential source the configuration asks for: a static token
    /// wins, then a key file, then the metadata server.
    pub fn from_config(config: &FcmConfig, client: Client) -> Result<Self, ProviderError> {
        if let Some(token) = &config.access_token {
            return Ok(Self::static_token(token.clone(), client));
        }

        if let Some(path) = &config.credentials_path {
            let key = ServiceAccountKey::from_file(path)?;
            return Self::service_account(key, client);
        }

        Ok(Self::metadata_server(config.metadata_base_url.clone(), client))
    }

    pub fn kind(&self) -> &'static str {
        match self.source {
            CredentialSource::Static(_) => "static",
            CredentialSource::ServiceAccount { .. } => "service_account",
            CredentialSource::Metadata { .. } => "metadata_server",
        }
    }

    /// Project declared by the service-account key, if any.
    pub fn project_id(&self) -> Option<&str> {
        match &self.source {
            CredentialSource::ServiceAccount { key, .. } => key.project_id.as_deref(),
            _ => None,
        }
    }

    pub async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.value.clone());
        }

        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *cache = Some(fresh);

        Ok(value)
    }

    async fn fetch(&self) -> Result<CachedToken, ProviderError> {
        let request = match &self.source {
            CredentialSource::Static(token) => {
                return Ok(CachedToken {
                    value: token.clone(),
                    expires_at: None,
                })
            }
            CredentialSource::ServiceAccount { key, encoding_key } => {
                let assertion = sign_assertion(key, encoding_key)?;
                self.client.post(&key.token_uri).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ])
            }
            CredentialSource::Metadata { base_url } => self
                .client
                .get(format!(
                    "{}{}",
                    base_url.trim_end_matches('/'),
                    METADATA_TOKEN_PATH
                ))
                .header("Metadata-Flavor", "Google"),
        };

        let response = request.send().await.map_err(|e| {
            ProviderError::Connection(format!("Failed to reach token endpoint: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "Token endpoint returned error status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::Authentication(format!("Failed to parse token response: {}", e))
        })?;

        tracing::debug!(
            source = self.kind(),
            expires_in = ?token.expires_in,
            "Fetched FCM access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Some(
                Instant::now() + Duration::from_secs(token.expires_in.unwrap_or(3600)),
            ),
        })
    }
}

fn sign_assertion(
    key: &ServiceAccountKey,
    encoding_key: &EncodingKey,
) -> Result<String, ProviderError> {
    let iat = Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: FCM_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    encode(&header, &claims, encoding_key)
        .map_err(|e| ProviderError::Authentication(format!("Failed to sign token assertion: {}", e)))
}
