//! Configuration file handling
//!
//! Settings live in a TOML file under the user's config directory. Secrets can
//! stay out of the file and come from the environment (or a `.env` file).

pub mod entities;

pub use entities::{ChildConfig, ColumnConfig, EntityConfig, ResolvedChild, ResolvedEntity};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{CredentialSet, Environment};
use crate::workflow::{DEFAULT_LIMIT_SIZE, ReparentMode};

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "DYNAMICS_DEDUPE_CONFIG";
pub const CLIENT_SECRET_ENV: &str = "DYNAMICS_CLIENT_SECRET";
pub const ACCESS_TOKEN_ENV: &str = "DYNAMICS_ACCESS_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub environment: EnvironmentConfig,
    pub workflow: WorkflowConfig,
    pub entities: BTreeMap<String, EntityConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub name: String,
    /// Organization URL, e.g. https://contoso.crm4.dynamics.com
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            url: String::new(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Duplicate candidates fetched per page
    pub limit_size: usize,
    /// Wait for re-parenting after a merge and report its failure
    pub await_reparenting: bool,
    pub request_timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            limit_size: DEFAULT_LIMIT_SIZE,
            await_reparenting: false,
            request_timeout_secs: 30,
        }
    }
}

impl WorkflowConfig {
    pub fn reparent_mode(&self) -> ReparentMode {
        if self.await_reparenting {
            ReparentMode::Await
        } else {
            ReparentMode::FireAndForget
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Default location: `<config dir>/dynamics-dedupe/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(dir.join("dynamics-dedupe").join("config.toml"))
    }

    /// Load from `path` (or the default location). A missing file yields the
    /// default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workflow.limit_size == 0 {
            anyhow::bail!("workflow.limit_size must be greater than zero");
        }
        for (name, entity) in &self.entities {
            entity.resolve(name)?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Settings for `logical_name`, with defaults for entities not listed
    pub fn entity(&self, logical_name: &str) -> Result<ResolvedEntity> {
        match self.entities.get(logical_name) {
            Some(entity) => entity.resolve(logical_name),
            None => EntityConfig::default().resolve(logical_name),
        }
    }

    pub fn environment(&self) -> Result<Environment> {
        if self.environment.url.trim().is_empty() {
            anyhow::bail!(
                "No environment URL configured. Set environment.url in {}",
                Self::default_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the config file".to_string())
            );
        }
        Ok(Environment {
            name: self.environment.name.clone(),
            url: self.environment.url.trim_end_matches('/').to_string(),
        })
    }

    /// A static token wins over client credentials
    pub fn credentials(&self) -> Result<CredentialSet> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(CredentialSet::AccessToken { token });
            }
        }

        let env = &self.environment;
        let tenant_id = env
            .tenant_id
            .clone()
            .context("environment.tenant_id is not configured")?;
        let client_id = env
            .client_id
            .clone()
            .context("environment.client_id is not configured")?;
        let client_secret = std::env::var(CLIENT_SECRET_ENV)
            .ok()
            .or_else(|| env.client_secret.clone())
            .with_context(|| {
                format!(
                    "No client secret: set {} or environment.client_secret",
                    CLIENT_SECRET_ENV
                )
            })?;

        Ok(CredentialSet::ClientCredentials {
            tenant_id,
            client_id,
            client_secret,
        })
    }

    /// Starter configuration written by `config init`
    pub fn sample() -> Self {
        let mut entities = BTreeMap::new();
        entities.insert(
            "account".to_string(),
            EntityConfig {
                primary_name: Some("name".to_string()),
                columns: vec![
                    ColumnConfig {
                        field: "name".to_string(),
                        label: Some("Account Name".to_string()),
                        data_type: None,
                    },
                    ColumnConfig {
                        field: "emailaddress1".to_string(),
                        label: Some("Email".to_string()),
                        data_type: Some("email".to_string()),
                    },
                    ColumnConfig {
                        field: "telephone1".to_string(),
                        label: Some("Phone".to_string()),
                        data_type: Some("phone".to_string()),
                    },
                ],
                compare_fields: vec![
                    "name".to_string(),
                    "emailaddress1".to_string(),
                    "telephone1".to_string(),
                    "websiteurl".to_string(),
                    "address1_city".to_string(),
                ],
                children: vec![ChildConfig {
                    entity: "contact".to_string(),
                    lookup: "parentcustomerid".to_string(),
                    navigation: Some("parentcustomerid_account".to_string()),
                    entity_set: None,
                }],
                ..Default::default()
            },
        );

        Self {
            environment: EnvironmentConfig {
                url: "https://contoso.crm4.dynamics.com".to_string(),
                tenant_id: Some("00000000-0000-0000-0000-000000000000".to_string()),
                client_id: Some("00000000-0000-0000-0000-000000000000".to_string()),
                ..Default::default()
            },
            workflow: WorkflowConfig::default(),
            entities,
        }
    }
}
