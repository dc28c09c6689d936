//! OAuth2 token acquisition for the Dynamics 365 Web API

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use log::debug;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::models::{CredentialSet, TokenInfo};

const LOGIN_HOST: &str = "https://login.microsoftonline.com";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Hands out bearer tokens, fetching a new one when the cached token expires
#[derive(Debug)]
pub struct AuthManager {
    credentials: CredentialSet,
    resource: String,
    http: reqwest::Client,
    cached: Mutex<Option<TokenInfo>>,
}

impl AuthManager {
    /// `resource` is the organization URL the token is scoped to
    pub fn new(credentials: CredentialSet, resource: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            credentials,
            resource: resource.into(),
            http,
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String> {
        let (tenant_id, client_id, client_secret) = match &self.credentials {
            CredentialSet::AccessToken { token } => return Ok(token.clone()),
            CredentialSet::ClientCredentials {
                tenant_id,
                client_id,
                client_secret,
            } => (tenant_id, client_id, client_secret),
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting access token for {}", self.resource);
        let scope = format!("{}/.default", self.resource);
        let response = self
            .http
            .post(format!("{}/{}/oauth2/v2.0/token", LOGIN_HOST, tenant_id))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach the token endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Authentication failed ({}): {}", status, body);
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;
        let token = TokenInfo {
            access_token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        };
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}
