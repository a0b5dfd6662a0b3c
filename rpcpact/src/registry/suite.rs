//! Per-service registry.

use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{CallFn, ExecOptions, Filter, Interaction, Pending, Picker};
use crate::contract::{Metadata, ServiceContract};
use crate::diff::AssertPolicy;
use crate::errors::{DeclarationError, PactError};
use crate::transport::{MockHandler, ServiceClient, ServiceDescriptor};

/// Checked batches of one service, by method.
pub(crate) type PendingService = Vec<(String, Pending)>;

/// All interactions of one service, keyed by method name.
#[derive(Debug)]
pub struct Suite {
    service: String,
    interactions: Picker<Interaction>,
}

impl Suite {
    /// Builds one interaction per method of `descriptor`.
    ///
    /// Each interaction replays through `client`, the transport's real call
    /// path for the service.
    #[must_use]
    pub fn initialize(
        descriptor: &ServiceDescriptor,
        client: Arc<dyn ServiceClient>,
        policy: &AssertPolicy,
    ) -> Self {
        let mut interactions = Picker::new();
        for method in &descriptor.methods {
            let client = Arc::clone(&client);
            let name = method.name.clone();
            let call: CallFn = Arc::new(move |args, metadata: Metadata, call_options| {
                let client = Arc::clone(&client);
                let name = name.clone();
                async move { client.call(&name, args, metadata, call_options).await }.boxed()
            });
            interactions.insert(
                method.name.clone(),
                Interaction::new(&descriptor.path, method, call, policy.clone()),
            );
        }

        debug!(
            service = %descriptor.path,
            methods = interactions.len(),
            "Suite initialized"
        );
        Self {
            service: descriptor.path.clone(),
            interactions,
        }
    }

    /// Service path.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Mock handler table to install on the transport.
    #[must_use]
    pub fn handlers(&self) -> BTreeMap<String, MockHandler> {
        self.interactions
            .iter()
            .map(|(name, interaction)| (name.to_string(), interaction.handler()))
            .collect()
    }

    /// The interaction of one method.
    #[must_use]
    pub fn interaction(&self, method: &str) -> Option<&Interaction> {
        self.interactions.get(method)
    }

    /// Method names in order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.interactions.names()
    }

    /// Declares executions for several methods.
    ///
    /// Every method must exist and every batch must be free of collisions
    /// before anything is added. Returns the methods that received at least
    /// one execution.
    pub fn add_interactions(&self, contract: &ServiceContract) -> Result<Vec<String>, PactError> {
        let pending = self.prepare(contract)?;
        Ok(self.commit(pending))
    }

    /// Checks a whole service contract without declaring anything.
    pub(crate) fn prepare(&self, contract: &ServiceContract) -> Result<PendingService, PactError> {
        let mut pending = Vec::new();
        for (method, executions) in contract {
            let Some(interaction) = self.interactions.get(method) else {
                return Err(DeclarationError::UnknownMethod {
                    service: self.service.clone(),
                    method: method.clone(),
                }
                .into());
            };
            pending.push((method.clone(), interaction.prepare(executions.executions.iter().cloned())?));
        }
        Ok(pending)
    }

    /// Declares what [`Suite::prepare`] accepted, returning the methods that
    /// received at least one execution.
    pub(crate) fn commit(&self, pending: PendingService) -> Vec<String> {
        let mut touched = Vec::new();
        for (method, batch) in pending {
            let Some(interaction) = self.interactions.get(&method) else {
                continue;
            };
            if interaction.commit(batch) > 0 {
                touched.push(method);
            }
        }
        touched
    }

    /// Replays the selected methods concurrently.
    ///
    /// Methods without declared executions are left out of the result.
    pub async fn exec(&self, filter: &Filter, opts: &ExecOptions) -> Result<ServiceContract, PactError> {
        let mut results = self
            .interactions
            .exec(filter, |_, interaction| interaction.exec(opts))
            .await?;
        results.retain(|_, contract| !contract.executions.is_empty());
        Ok(results)
    }
}
