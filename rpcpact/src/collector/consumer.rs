//! The recording role.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::Collector;
use crate::config::CollectorConfig;
use crate::contract::ContractDocument;
use crate::diff::AssertOpts;
use crate::errors::{PactError, TransportError};
use crate::registry::{ExecOptions, ServiceFilter};
use crate::transport::Transport;

#[cfg(feature = "broker")]
use crate::broker::BrokerClient;

/// Where a consumer sends the contract it computed.
#[derive(Debug, Clone, Default)]
pub struct ConsumerSinks {
    /// Contract file to write.
    pub output_file: Option<PathBuf>,
    /// Broker to publish to.
    #[cfg(feature = "broker")]
    pub broker: Option<BrokerClient>,
}

/// Writes and publishes a computed contract.
///
/// Runs after replay. A failure is returned as [`PactError::Finalize`], which
/// still carries `document`.
pub async fn finalize_consumer(
    document: ContractDocument,
    sinks: &ConsumerSinks,
) -> Result<ContractDocument, PactError> {
    if let Some(ref path) = sinks.output_file {
        if let Err(source) = write_contract(&document, path).await {
            return Err(PactError::Finalize {
                document: Box::new(document),
                source,
            });
        }
    }

    #[cfg(feature = "broker")]
    if let Some(ref broker) = sinks.broker {
        if broker.config().is_enabled() {
            if let Err(source) = broker.publish(&document).await {
                return Err(PactError::Finalize {
                    document: Box::new(document),
                    source,
                });
            }
        }
    }

    Ok(document)
}

async fn write_contract(document: &ContractDocument, path: &Path) -> Result<(), TransportError> {
    let text = document
        .to_pretty_json()
        .map_err(|e| TransportError::io(path.display().to_string(), e.to_string()))?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| TransportError::io(path.display().to_string(), e.to_string()))?;
    info!(
        path = %path.display(),
        executions = document.execution_count(),
        "Wrote contract file"
    );
    Ok(())
}

/// Records interactions against mock handlers and emits the contract.
#[derive(Debug)]
pub struct Consumer {
    collector: Collector,
    sinks: ConsumerSinks,
    provider_opts: Option<AssertOpts>,
}

impl Consumer {
    /// Creates a consumer.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        consumer: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            collector: Collector::new(transport, consumer, provider),
            sinks: ConsumerSinks::default(),
            provider_opts: None,
        }
    }

    /// Creates a consumer from configuration.
    ///
    /// The configured assertion options describe what providers are expected
    /// to verify with.
    pub fn from_config(transport: Arc<dyn Transport>, config: &CollectorConfig) -> Result<Self, PactError> {
        #[cfg_attr(not(feature = "broker"), allow(unused_mut))]
        let mut consumer = Self {
            collector: Collector::from_config(transport, config),
            sinks: ConsumerSinks {
                output_file: config.output_file.clone(),
                ..Default::default()
            },
            provider_opts: (config.assert_opts != AssertOpts::default())
                .then(|| config.assert_opts.clone()),
        };
        #[cfg(feature = "broker")]
        if config.broker.is_enabled() {
            consumer.sinks.broker = Some(BrokerClient::new(config.broker.clone())?);
        }
        Ok(consumer)
    }

    /// Sets the contract output file.
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sinks.output_file = Some(path.into());
        self
    }

    /// Sets the broker to publish to.
    #[cfg(feature = "broker")]
    #[must_use]
    pub fn with_broker(mut self, broker: BrokerClient) -> Self {
        self.sinks.broker = Some(broker);
        self
    }

    /// Sets the policy providers are expected to verify with.
    #[must_use]
    pub fn with_provider_assert_opts(mut self, opts: AssertOpts) -> Self {
        self.provider_opts = Some(opts);
        self
    }

    /// Policy attached to emitted contracts.
    ///
    /// The seeding contract's `assertOpts` win over configured ones.
    #[must_use]
    pub fn provider_assert_opts(&self) -> Option<AssertOpts> {
        match self.collector.document_opts() {
            Some(opts) => Some(opts.clone().normalized()),
            None => self.provider_opts.clone().map(AssertOpts::normalized),
        }
    }

    /// Replays, then writes and publishes the resulting contract.
    ///
    /// `opts.output_file` overrides the configured file for this run.
    pub async fn exec(
        &self,
        filter: impl Into<ServiceFilter>,
        opts: &ExecOptions,
    ) -> Result<ContractDocument, PactError> {
        let mut document = self.collector.exec(filter, opts).await?;
        document.assert_opts = self.provider_assert_opts();

        let mut sinks = self.sinks.clone();
        if let Some(ref path) = opts.output_file {
            sinks.output_file = Some(path.clone());
        }
        finalize_consumer(document, &sinks).await
    }

    /// Runs [`Consumer::exec`], then always attempts clearup.
    pub async fn exec_and_clearup(
        &self,
        filter: impl Into<ServiceFilter>,
        opts: &ExecOptions,
    ) -> Result<ContractDocument, PactError> {
        let result = self.exec(filter, opts).await;
        self.collector.clearup_quietly().await;
        result
    }
}

impl Deref for Consumer {
    type Target = Collector;

    fn deref(&self) -> &Collector {
        &self.collector
    }
}

impl DerefMut for Consumer {
    fn deref_mut(&mut self) -> &mut Collector {
        &mut self.collector
    }
}
