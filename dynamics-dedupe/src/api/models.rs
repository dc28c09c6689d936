//! Environment, credential and token models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A Dynamics 365 organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    /// Organization URL without trailing slash
    pub url: String,
}

/// How to obtain an access token
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSet {
    /// OAuth2 client credentials (app registration)
    ClientCredentials {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// Pre-acquired bearer token
    AccessToken { token: String },
}

// Keep secrets out of logs
impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientCredentials {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientCredentials")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
            Self::AccessToken { .. } => f.debug_struct("AccessToken").finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenInfo {
    /// Tokens are refreshed one minute before they expire
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(60) >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_margin() {
        let fresh = TokenInfo {
            access_token: "t".to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        };
        let nearly_expired = TokenInfo {
            access_token: "t".to_string(),
            expires_at: Utc::now() + Duration::seconds(30),
        };
        assert!(!fresh.is_expired());
        assert!(nearly_expired.is_expired());
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = CredentialSet::ClientCredentials {
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
