use crate::config::ServiceAccountKey;
use crate::error::AnalysisError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Where the bearer token for a generation call comes from.
pub enum TokenSource {
    ServiceAccount(ServiceAccountAuth),
    /// A token minted elsewhere, e.g. by `gcloud auth print-access-token`.
    Static(String),
}

impl TokenSource {
    pub async fn access_token(&self, limit: Duration) -> Result<String, AnalysisError> {
        match self {
            TokenSource::ServiceAccount(auth) => auth.access_token(limit).await,
            TokenSource::Static(token) => Ok(token.clone()),
        }
    }
}

/// Exchanges a service-account key for OAuth2 access tokens and caches them.
pub struct ServiceAccountAuth {
    client: Client,
    key: ServiceAccountKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(client: Client, key: ServiceAccountKey) -> Self {
        Self {
            client,
            key,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self, limit: Duration) -> Result<String, AnalysisError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        log::info!("Requesting access token for {}", self.key.client_email);
        let assertion = self.signed_assertion()?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AnalysisError::from_transport(e, limit))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Backend(format!(
                "token exchange rejected ({}): {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::from_transport(e, limit))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    fn signed_assertion(&self) -> Result<String, AnalysisError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AnalysisError::Configuration(format!("system clock before epoch: {}", e)))?
            .as_secs();

        let claims = Claims {
            iss: &self.key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes()).map_err(|e| {
            AnalysisError::Configuration(format!("service account private key is unusable: {}", e))
        })?;

        encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| AnalysisError::Configuration(format!("cannot sign token request: {}", e)))
    }
}
