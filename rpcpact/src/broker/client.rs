//! HTTP client for the contract broker.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::contract::{normalize_document, ContractDocument};
use crate::errors::{PactError, TransportError};

/// Envelope every broker answer is wrapped in.
#[derive(Debug, Deserialize)]
struct BrokerReply {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

/// Publishes and fetches contracts, racing every configured mirror.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: reqwest::Client,
    config: BrokerConfig,
}

impl BrokerClient {
    /// Creates a client with the configured timeout.
    pub fn new(config: BrokerConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::broker("", e.to_string()))?;
        Ok(Self { http, config })
    }

    /// The broker settings.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// `{base}/contract/{provider}/{consumer}[/{tag}]`.
    #[must_use]
    pub fn contract_url(base: &str, provider: &str, consumer: &str, tag: Option<&str>) -> String {
        let base = base.trim_end_matches('/');
        match tag {
            Some(tag) => format!("{base}/contract/{provider}/{consumer}/{tag}"),
            None => format!("{base}/contract/{provider}/{consumer}"),
        }
    }

    fn urls(&self, provider: &str, consumer: &str) -> Vec<String> {
        self.config
            .urls
            .iter()
            .map(|base| Self::contract_url(base, provider, consumer, self.config.tag.as_deref()))
            .collect()
    }

    /// Posts `document` to every mirror; the first mirror to accept it wins.
    pub async fn publish(&self, document: &ContractDocument) -> Result<Value, TransportError> {
        let body = document
            .to_pretty_json()
            .map_err(|e| TransportError::broker("", e.to_string()))?;
        let requests = self
            .urls(&document.provider, &document.consumer)
            .into_iter()
            .map(|url| {
                let request = self
                    .http
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body.clone());
                (url, request)
            })
            .collect();

        let data = race(requests).await?;
        info!(
            provider = %document.provider,
            consumer = %document.consumer,
            "Published contract"
        );
        Ok(data)
    }

    /// Gets the contract between `provider` and `consumer` from the fastest
    /// mirror that has it.
    pub async fn fetch(&self, provider: &str, consumer: &str) -> Result<ContractDocument, PactError> {
        let requests = self
            .urls(provider, consumer)
            .into_iter()
            .map(|url| {
                let request = self.http.get(&url);
                (url, request)
            })
            .collect();

        let data = race(requests).await?;
        debug!(provider, consumer, "Fetched contract");
        normalize_document(data)
    }
}

fn send(request: reqwest::RequestBuilder) -> impl Future<Output = Result<Value, String>> + Send + 'static {
    async move {
        let resp = request.send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        let reply: BrokerReply = resp.json().await.map_err(|e| e.to_string())?;
        if !reply.ok {
            return Err(reply
                .message
                .unwrap_or_else(|| "broker answered without `ok`".to_string()));
        }
        Ok(reply.data)
    }
}

/// Spawns one task per mirror and returns the first success.
///
/// Remaining tasks are detached, not aborted; their results are discarded.
async fn race(requests: Vec<(String, reqwest::RequestBuilder)>) -> Result<Value, TransportError> {
    if requests.is_empty() {
        return Err(TransportError::broker("", "no broker url configured"));
    }

    let mut pending: FuturesUnordered<_> = requests
        .into_iter()
        .map(|(url, request)| {
            let handle = tokio::spawn(send(request));
            async move {
                let outcome = handle.await.map_err(|e| e.to_string()).and_then(|r| r);
                (url, outcome)
            }
        })
        .collect();

    let mut failures = Vec::new();
    while let Some((url, outcome)) = pending.next().await {
        match outcome {
            Ok(data) => {
                debug!(url = %url, "Broker mirror answered first");
                return Ok(data);
            }
            Err(reason) => {
                warn!(url = %url, reason = %reason, "Broker mirror failed");
                failures.push(format!("{url}: {reason}"));
            }
        }
    }
    Err(TransportError::AllBrokersFailed { failures })
}
