//! Bootstrap helpers that build and initialize a role in one call.

use std::sync::Arc;
use tracing::info;

use crate::collector::{Consumer, Provider};
use crate::config::CollectorConfig;
use crate::contract::{ContractDocument, ContractSource};
use crate::errors::PactError;
use crate::transport::Transport;

/// Fills names missing from `config` with the contract's own.
fn with_document_names(mut config: CollectorConfig, document: &ContractDocument) -> CollectorConfig {
    if config.consumer.is_empty() {
        config.consumer.clone_from(&document.consumer);
    }
    if config.provider.is_empty() {
        config.provider.clone_from(&document.provider);
    }
    config
}

/// Builds a consumer seeded from `source` and initializes it.
pub async fn consumer(
    transport: Arc<dyn Transport>,
    config: CollectorConfig,
    source: impl Into<ContractSource>,
) -> Result<Consumer, PactError> {
    let document = source.into().load().await?;
    let config = with_document_names(config, &document);

    let mut consumer = Consumer::from_config(transport, &config)?;
    consumer.initialize(ContractSource::Document(document)).await?;
    info!(consumer = %config.consumer, provider = %config.provider, "Consumer registered");
    Ok(consumer)
}

/// Builds a provider and initializes it.
///
/// Without a `source`, the contract is fetched from the configured broker.
pub async fn provider(
    transport: Arc<dyn Transport>,
    config: CollectorConfig,
    source: Option<ContractSource>,
) -> Result<Provider, PactError> {
    let document = match source {
        Some(source) => source.load().await?,
        None => fetch(&config).await?,
    };
    let config = with_document_names(config, &document);

    let mut provider = Provider::from_config(transport, &config);
    provider.initialize(ContractSource::Document(document)).await?;
    info!(consumer = %config.consumer, provider = %config.provider, "Provider registered");
    Ok(provider)
}

#[cfg(feature = "broker")]
async fn fetch(config: &CollectorConfig) -> Result<ContractDocument, PactError> {
    if !config.broker.is_enabled() {
        return Err(crate::errors::DeclarationError::malformed(
            "no contract supplied and no broker configured",
        )
        .into());
    }
    Provider::fetch_contract(&config.broker, &config.provider, &config.consumer).await
}

#[cfg(not(feature = "broker"))]
async fn fetch(_config: &CollectorConfig) -> Result<ContractDocument, PactError> {
    Err(crate::errors::DeclarationError::malformed("no contract supplied").into())
}
