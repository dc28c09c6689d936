pub mod compare;
pub mod config;
pub mod duplicates;
pub mod merge;

use anyhow::Result;
use colored::*;
use log::debug;
use std::sync::Arc;

use crate::api::DynamicsClient;
use crate::config::Config;
use crate::services::dedupe::dynamics::DynamicsDedupeService;

/// Build the Dynamics-backed service for `entity`
pub fn connect(config: &Config, entity: &str) -> Result<DynamicsDedupeService> {
    let environment = config.environment()?;
    let entity = config.entity(entity)?;
    let credentials = config.credentials()?;

    debug!(
        "Connecting to {} ({}) for {}",
        environment.name, environment.url, entity.entity_set
    );
    println!(
        "Using environment: {}",
        environment.name.bright_green().bold()
    );

    let client = DynamicsClient::new(environment, credentials, config.workflow.request_timeout())?;
    Ok(DynamicsDedupeService::new(Arc::new(client), entity))
}
