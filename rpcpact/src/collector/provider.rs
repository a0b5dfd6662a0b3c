//! The verifying role.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::Collector;
use crate::config::CollectorConfig;
use crate::contract::ContractDocument;
use crate::diff::{AssertOpts, AssertPolicy};
use crate::errors::PactError;
use crate::registry::{ExecOptions, ServiceFilter};
use crate::transport::Transport;

#[cfg(feature = "broker")]
use crate::broker::BrokerClient;
#[cfg(feature = "broker")]
use crate::config::BrokerConfig;

/// Attaches the policy a provider verified with to its result.
#[must_use]
pub fn finalize_provider(mut document: ContractDocument, opts: &AssertOpts) -> ContractDocument {
    document.assert_opts = (*opts != AssertOpts::default()).then(|| opts.clone());
    document
}

/// Replays a contract against the real service and verifies the results.
#[derive(Debug)]
pub struct Provider {
    collector: Collector,
    policy: AssertPolicy,
}

impl Provider {
    /// Creates a provider.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        consumer: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            collector: Collector::new(transport, consumer, provider),
            policy: AssertPolicy::new(),
        }
    }

    /// Creates a provider from configuration.
    #[must_use]
    pub fn from_config(transport: Arc<dyn Transport>, config: &CollectorConfig) -> Self {
        Self {
            collector: Collector::from_config(transport, config),
            policy: AssertPolicy::from(config.assert_opts.clone()),
        }
    }

    /// Sets the provider's own policy.
    #[must_use]
    pub fn with_policy(mut self, policy: impl Into<AssertPolicy>) -> Self {
        self.policy = policy.into();
        self
    }

    /// Effective options: configured ones overlaid by the contract's
    /// `assertOpts`, normalized.
    #[must_use]
    pub fn assert_opts(&self) -> AssertOpts {
        match self.collector.document_opts() {
            Some(doc) => self.policy.opts.merged(&doc.clone().normalized()),
            None => self.policy.opts.clone(),
        }
    }

    /// Replays and verifies.
    ///
    /// The provider's own policy wins over `opts.assert` wherever both set
    /// something.
    pub async fn exec(
        &self,
        filter: impl Into<ServiceFilter>,
        opts: &ExecOptions,
    ) -> Result<ContractDocument, PactError> {
        let own = AssertPolicy {
            opts: self.assert_opts(),
            hooks: self.policy.hooks.clone(),
        };
        let mut opts = opts.clone();
        opts.assert = opts.assert.merged(&own);

        let document = self.collector.exec(filter, &opts).await?;
        Ok(finalize_provider(document, &own.opts))
    }

    /// Runs [`Provider::exec`], then always attempts clearup.
    pub async fn exec_and_clearup(
        &self,
        filter: impl Into<ServiceFilter>,
        opts: &ExecOptions,
    ) -> Result<ContractDocument, PactError> {
        let result = self.exec(filter, opts).await;
        self.collector.clearup_quietly().await;
        result
    }

    /// Fetches the contract between `provider` and `consumer` from a broker.
    #[cfg(feature = "broker")]
    pub async fn fetch_contract(
        config: &BrokerConfig,
        provider: &str,
        consumer: &str,
    ) -> Result<ContractDocument, PactError> {
        BrokerClient::new(config.clone())?.fetch(provider, consumer).await
    }
}

impl Deref for Provider {
    type Target = Collector;

    fn deref(&self) -> &Collector {
        &self.collector
    }
}

impl DerefMut for Provider {
    fn deref_mut(&mut self) -> &mut Collector {
        &mut self.collector
    }
}
