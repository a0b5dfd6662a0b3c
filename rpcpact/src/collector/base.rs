//! The collector shared by consumers and providers.

use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CollectorConfig;
use crate::contract::{normalize_contracts, ContractDocument, ContractSource, Contracts};
use crate::diff::{AssertOpts, AssertPolicy};
use crate::errors::{DeclarationError, PactError, TransportError};
use crate::registry::{ExecOptions, Interaction, PendingService, Picker, ServiceFilter, Suite};
use crate::transport::{HandlerTable, Transport};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]+[a-zA-Z0-9]$").expect("name pattern is valid"));

/// Checks a consumer or provider name.
///
/// Names start with a letter, hold only letters, digits and `_`, and do not
/// end with `_`.
pub fn validate_name(role: &str, name: &str) -> Result<(), DeclarationError> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(DeclarationError::invalid_name(role, name))
    }
}

/// Owns every suite of a run and the canonical contract they were seeded from.
pub struct Collector {
    consumer: String,
    provider: String,
    transport: Arc<dyn Transport>,
    suites: Picker<Suite>,
    contract: ContractDocument,
    default_filter: ServiceFilter,
    policy: AssertPolicy,
    document_opts: Option<AssertOpts>,
    call_timeout: Option<Duration>,
    initialized: bool,
}

impl Collector {
    /// Creates an uninitialized collector.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        consumer: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        let consumer = consumer.into();
        let provider = provider.into();
        Self {
            contract: ContractDocument::new(&consumer, &provider),
            consumer,
            provider,
            transport,
            suites: Picker::new(),
            default_filter: ServiceFilter::new(),
            policy: AssertPolicy::new(),
            document_opts: None,
            call_timeout: None,
            initialized: false,
        }
    }

    /// Creates a collector from configuration.
    ///
    /// Only identity and replay settings are taken; the roles decide what the
    /// configured assertion options mean.
    #[must_use]
    pub fn from_config(transport: Arc<dyn Transport>, config: &CollectorConfig) -> Self {
        let mut collector = Self::new(transport, &config.consumer, &config.provider);
        collector.call_timeout = config.replay.call_timeout();
        collector
    }

    /// Sets the policy every interaction starts from.
    #[must_use]
    pub fn with_policy(mut self, policy: impl Into<AssertPolicy>) -> Self {
        self.policy = policy.into();
        self
    }

    /// Bounds every real call made during replay.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Consumer name.
    #[must_use]
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Provider name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Whether `initialize` has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The base assertion policy.
    #[must_use]
    pub fn policy(&self) -> &AssertPolicy {
        &self.policy
    }

    /// `assertOpts` carried by the contract this collector was seeded from.
    #[must_use]
    pub fn document_opts(&self) -> Option<&AssertOpts> {
        self.document_opts.as_ref()
    }

    /// The canonical contract: everything declared so far.
    #[must_use]
    pub fn contract(&self) -> &ContractDocument {
        &self.contract
    }

    /// Service/method pairs holding at least one execution.
    #[must_use]
    pub fn default_filter(&self) -> &ServiceFilter {
        &self.default_filter
    }

    /// The suite of a service.
    #[must_use]
    pub fn suite(&self, service: &str) -> Option<&Suite> {
        self.suites.get(service)
    }

    /// The interaction of a service method.
    #[must_use]
    pub fn interaction(&self, service: &str, method: &str) -> Option<&Interaction> {
        self.suite(service)?.interaction(method)
    }

    /// Binds every transport service, seeds it from `source` and starts the
    /// transport. Calling it again is a no-op.
    pub async fn initialize(&mut self, source: impl Into<ContractSource>) -> Result<(), PactError> {
        if self.initialized {
            debug!(consumer = %self.consumer, provider = %self.provider, "Collector already initialized");
            return Ok(());
        }
        validate_name("Consumer", &self.consumer)?;
        validate_name("Provider", &self.provider)?;

        let document = source.into().load().await?;
        let services = self.transport.services();
        if let Some(service) = document
            .contracts
            .keys()
            .find(|s| !services.iter().any(|d| &d.path == *s))
        {
            return Err(DeclarationError::UnknownService {
                service: service.clone(),
            }
            .into());
        }

        // Built aside and swapped in once the transport is running, so a
        // failed attempt leaves nothing behind.
        let mut suites = Picker::new();
        let mut table = HandlerTable::new();
        for descriptor in &services {
            let client = self.transport.client(&descriptor.path)?;
            let suite = Suite::initialize(descriptor, client, &self.policy);
            table.insert(descriptor.path.clone(), suite.handlers());
            suites.insert(descriptor.path.clone(), suite);
        }

        let pending = prepare_contracts(&suites, &document.contracts)?;
        let mut contract = ContractDocument::new(&self.consumer, &self.provider);
        let mut default_filter = ServiceFilter::new();
        commit_contracts(&suites, pending, &document.contracts, &mut contract, &mut default_filter);

        self.transport.load_handlers(table)?;
        self.transport.start().await?;

        self.suites = suites;
        self.contract = contract;
        self.default_filter = default_filter;
        self.document_opts = document.assert_opts;
        self.initialized = true;

        info!(
            consumer = %self.consumer,
            provider = %self.provider,
            services = self.suites.len(),
            executions = self.contract.execution_count(),
            "Collector initialized"
        );
        Ok(())
    }

    /// Declares more interactions from a raw `service -> method -> executions`
    /// mapping, accepting the same shorthand forms as a contract file.
    pub fn add_interactions(&mut self, extra: Value) -> Result<(), PactError> {
        let contracts = normalize_contracts(extra)?;
        self.add_contracts(contracts)
    }

    /// Declares more interactions.
    pub fn add_contracts(&mut self, extra: Contracts) -> Result<(), PactError> {
        if !self.initialized {
            return Err(TransportError::Lifecycle(
                "interactions can only be added after initialize".to_string(),
            )
            .into());
        }
        let pending = prepare_contracts(&self.suites, &extra)?;
        commit_contracts(
            &self.suites,
            pending,
            &extra,
            &mut self.contract,
            &mut self.default_filter,
        );
        Ok(())
    }

    /// Replays the selected services concurrently.
    ///
    /// An empty filter runs the default filter. Services that produced no
    /// executions are left out of the returned document.
    pub async fn exec(
        &self,
        filter: impl Into<ServiceFilter>,
        opts: &ExecOptions,
    ) -> Result<ContractDocument, PactError> {
        let filter = filter.into();
        let filter = if filter.is_empty() {
            &self.default_filter
        } else {
            &filter
        };

        let mut opts = opts.clone();
        opts.call_timeout = opts.call_timeout.or(self.call_timeout);
        let opts = &opts;

        let mut contracts = self
            .suites
            .exec(&filter.service_filter(), |service, suite| {
                let methods = filter.method_filter(service);
                async move { suite.exec(&methods, opts).await }
            })
            .await?;
        contracts.retain(|_, suite| !suite.is_empty());

        Ok(ContractDocument {
            consumer: self.consumer.clone(),
            provider: self.provider.clone(),
            assert_opts: None,
            contracts,
        })
    }

    /// Stops the transport server and closes its clients.
    pub async fn clearup(&self) -> Result<(), PactError> {
        self.transport.shutdown().await?;
        self.transport.close_clients();
        info!(consumer = %self.consumer, provider = %self.provider, "Collector cleared up");
        Ok(())
    }

    pub(crate) async fn clearup_quietly(&self) {
        if let Err(err) = self.clearup().await {
            warn!(error = %err, "Clearup failed");
        }
    }

    /// Runs [`Collector::exec`], then always attempts [`Collector::clearup`].
    /// Teardown errors are logged and dropped.
    pub async fn exec_and_clearup(
        &self,
        filter: impl Into<ServiceFilter>,
        opts: &ExecOptions,
    ) -> Result<ContractDocument, PactError> {
        let result = self.exec(filter, opts).await;
        self.clearup_quietly().await;
        result
    }
}

/// Checks every service of `contracts` against `suites`, declaring nothing.
fn prepare_contracts(
    suites: &Picker<Suite>,
    contracts: &Contracts,
) -> Result<Vec<(String, PendingService)>, PactError> {
    let mut pending = Vec::with_capacity(contracts.len());
    for (service, methods) in contracts {
        let Some(suite) = suites.get(service) else {
            return Err(DeclarationError::UnknownService {
                service: service.clone(),
            }
            .into());
        };
        pending.push((service.clone(), suite.prepare(methods)?));
    }
    Ok(pending)
}

/// Declares checked batches and mirrors them into the canonical contract and
/// the default filter.
fn commit_contracts(
    suites: &Picker<Suite>,
    pending: Vec<(String, PendingService)>,
    contracts: &Contracts,
    contract: &mut ContractDocument,
    default_filter: &mut ServiceFilter,
) {
    for (service, batches) in pending {
        let Some(suite) = suites.get(&service) else {
            continue;
        };
        for method in suite.commit(batches) {
            let Some(declared) = contracts.get(&service).and_then(|m| m.get(&method)) else {
                continue;
            };
            contract
                .contracts
                .entry(service.clone())
                .or_default()
                .entry(method.clone())
                .or_default()
                .executions
                .extend(declared.executions.iter().cloned());
            default_filter.include_method(&service, &method);
            debug!(
                service = %service,
                method = %method,
                executions = declared.executions.len(),
                "Registered interactions"
            );
        }
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("consumer", &self.consumer)
            .field("provider", &self.provider)
            .field("suites", &self.suites)
            .field("default_filter", &self.default_filter)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}
