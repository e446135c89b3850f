use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};

use shared_config::AppConfig;

const SCOPES: &str =
    "https://www.googleapis.com/auth/calendar https://www.googleapis.com/auth/spreadsheets";

#[derive(Debug, Serialize)]
struct GrantClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Service-account token provider shared by the calendar and sheets clients.
/// The minted access token is cached until shortly before expiry.
pub struct GoogleAuth {
    client: reqwest::Client,
    sa_email: String,
    private_key: String,
    token_url: String,
    static_token: Option<String>,
    cached: RwLock<Option<(String, DateTime<Utc>)>>,
}

impl GoogleAuth {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            sa_email: config.google_sa_email.clone(),
            private_key: config.google_private_key.clone(),
            token_url: config.google_token_url.clone(),
            static_token: config.google_static_token.clone(),
            cached: RwLock::new(None),
        }
    }

    pub async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        if let Some((token, expires_at)) = self.cached.read().await.as_ref() {
            if *expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(token.clone());
            }
        }

        let (token, expires_at) = self.exchange_grant().await?;
        *self.cached.write().await = Some((token.clone(), expires_at));
        Ok(token)
    }

    async fn exchange_grant(&self) -> Result<(String, DateTime<Utc>)> {
        if self.sa_email.is_empty() || self.private_key.is_empty() {
            return Err(anyhow!("Google service account is not configured"));
        }

        let now = Utc::now();
        let claims = GrantClaims {
            iss: self.sa_email.clone(),
            scope: SCOPES.to_string(),
            aud: self.token_url.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        debug!("Exchanging service-account grant at {}", self.token_url);
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Token exchange failed ({}): {}", status, body);
            return Err(anyhow!("Token exchange failed ({}): {}", status, body));
        }

        let token: TokenResponse = response.json().await?;
        let expires_at = now + Duration::seconds(token.expires_in);
        Ok((token.access_token, expires_at))
    }
}
