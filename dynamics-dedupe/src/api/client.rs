//! Dynamics 365 Web API client

use anyhow::{Context, Result};
use log::debug;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

use super::auth::AuthManager;
use super::models::{CredentialSet, Environment};
use super::operations::{Operation, OperationResult};
use super::query::{Query, QueryResult};

pub const API_VERSION: &str = "v9.2";

/// Upper bound on pages followed through `@odata.nextLink`
const MAX_PAGES: usize = 500;

#[derive(Debug)]
pub struct DynamicsClient {
    environment: Environment,
    http: reqwest::Client,
    auth: AuthManager,
}

impl DynamicsClient {
    pub fn new(environment: Environment, credentials: CredentialSet, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let auth = AuthManager::new(credentials, environment.url.clone(), http.clone());
        Ok(Self {
            environment,
            http,
            auth,
        })
    }

    /// Absolute URL for a path relative to the Web API root
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/api/data/{}/{}",
            self.environment.url,
            API_VERSION,
            path.trim_start_matches('/')
        )
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.auth.token().await?;
        Ok(self
            .http
            .request(method, self.api_url(path))
            .bearer_auth(token)
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .header("Accept", "application/json"))
    }

    pub async fn get_json(&self, path: &str) -> Result<Value> {
        debug!("GET {}", path);
        let response = self
            .request(Method::GET, path)
            .await?
            .send()
            .await
            .with_context(|| format!("Request failed: GET {}", path))?;
        let response = check_response(response).await?;
        response
            .json()
            .await
            .context("Failed to parse response body")
    }

    /// Single record with the given columns (all columns when empty)
    pub async fn fetch_record(&self, entity_set: &str, id: &str, select: &[String]) -> Result<Value> {
        let mut path = format!("{}({})", entity_set, id);
        if !select.is_empty() {
            path.push_str(&format!("?$select={}", select.join(",")));
        }
        self.get_json(&path).await
    }

    /// Run a query and follow `@odata.nextLink` until all records are read
    pub async fn query_all(&self, query: &Query) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut page = QueryResult::from_response(self.get_json(&query.to_path()).await?);

        for _ in 0..MAX_PAGES {
            records.append(&mut page.records);
            let Some(next) = page.next_link.take() else {
                return Ok(records);
            };
            page = QueryResult::from_response(self.get_json(&next).await?);
        }

        anyhow::bail!(
            "Query on {} returned more than {} pages",
            query.entity_set,
            MAX_PAGES
        )
    }

    /// Execute a write. Platform rejections come back as a failed
    /// [`OperationResult`], transport errors as `Err`.
    pub async fn execute(&self, operation: &Operation) -> Result<OperationResult> {
        let path = operation.path();
        debug!("{} {} ({})", operation.http_method(), path, operation.operation_type());

        let response = self
            .request(Method::PATCH, &path)
            .await?
            .header("If-Match", "*")
            .json(&operation.body())
            .send()
            .await
            .with_context(|| format!("Request failed: PATCH {}", path))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(OperationResult::success(operation.clone(), status));
        }

        let body = response.text().await.unwrap_or_default();
        Ok(OperationResult::error(
            operation.clone(),
            platform_message(&body).unwrap_or(body),
            Some(status),
        ))
    }
}

async fn check_response(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match platform_message(&body) {
        Some(message) => anyhow::bail!("{}", message),
        None => anyhow::bail!("HTTP {}: {}", status, body),
    }
}

/// Extract `error.message` from a Web API error body
pub fn platform_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DynamicsClient {
        DynamicsClient::new(
            Environment {
                name: "test".to_string(),
                url: "https://org.crm.dynamics.com".to_string(),
            },
            CredentialSet::AccessToken {
                token: "t".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_api_url() {
        let client = client();
        assert_eq!(
            client.api_url("accounts(abc)"),
            "https://org.crm.dynamics.com/api/data/v9.2/accounts(abc)"
        );
        assert_eq!(
            client.api_url("https://org.crm.dynamics.com/api/data/v9.2/contacts?$skiptoken=1"),
            "https://org.crm.dynamics.com/api/data/v9.2/contacts?$skiptoken=1"
        );
    }

    #[test]
    fn test_platform_message() {
        let body = r#"{"error":{"code":"0x80040265","message":"A validation rule blocked the update."}}"#;
        assert_eq!(
            platform_message(body).as_deref(),
            Some("A validation rule blocked the update.")
        );
        assert_eq!(platform_message("<html>Bad gateway</html>"), None);
    }
}
