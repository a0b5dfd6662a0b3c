//! Per-method registry of recorded executions.
//!
//! An [`Interaction`] indexes the executions declared for one RPC method by
//! request fingerprint. It serves them back through a mock handler while the
//! consumer records, and replays them through the real call path while the
//! provider verifies.

use futures::future::{join_all, BoxFuture};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::contract::{
    ErrorRecord, Exchange, Execution, Fingerprint, Metadata, MethodContract, ReplyRecord,
};
use crate::diff::{diff, AssertPolicy, DiffEvent};
use crate::errors::{DeclarationError, PactError, TransportError, UnexpectedCallError, VerificationError};
use crate::transport::{status, HandlerError, MethodCodec, MethodDescriptor, MockHandler};

/// The real invocation path of one method: `(args, metadata, call_options)`.
pub type CallFn =
    Arc<dyn Fn(Value, Metadata, Value) -> BoxFuture<'static, Result<Value, ErrorRecord>> + Send + Sync>;

/// Options for one replay round.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Assertion policy for this round, layered over the registry's own.
    pub assert: AssertPolicy,
    /// Contract file to write (consumer only).
    pub output_file: Option<PathBuf>,
    /// Bound on each real call. Unbounded when `None`.
    pub call_timeout: Option<Duration>,
}

impl ExecOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the assertion policy.
    #[must_use]
    pub fn with_assert(mut self, assert: impl Into<AssertPolicy>) -> Self {
        self.assert = assert.into();
        self
    }

    /// Sets the contract output file.
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Bounds each real call.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

struct Entry {
    fingerprint: Fingerprint,
    /// Args after the codec round trip; the observed request starts from these.
    normalized_args: Value,
    execution: Execution,
}

/// A checked batch waiting to be declared.
pub(crate) struct Pending {
    entries: Vec<Entry>,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    index: HashMap<Fingerprint, usize>,
    results: Vec<Execution>,
    unexpected: Vec<UnexpectedCallError>,
}

fn blank_result() -> Execution {
    Execution {
        expectation: Some(Exchange::default()),
        ..Default::default()
    }
}

/// Registry of the executions declared for one method.
pub struct Interaction {
    service: String,
    method: String,
    url: String,
    codec: Arc<dyn MethodCodec>,
    call: CallFn,
    policy: AssertPolicy,
    state: Arc<RwLock<State>>,
}

impl Interaction {
    /// Creates an empty registry for `method` of `service`.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        method: &MethodDescriptor,
        call: CallFn,
        policy: AssertPolicy,
    ) -> Self {
        Self {
            service: service.into(),
            method: method.name.clone(),
            url: method.path.clone(),
            codec: Arc::clone(&method.codec),
            call,
            policy,
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Service path.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Method identifier used in messages.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of declared executions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// True when nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fingerprint of `args` under this method's codec.
    pub fn fingerprint(&self, args: &Value) -> Result<Fingerprint, TransportError> {
        Fingerprint::of(args, self.codec.as_ref())
    }

    /// Declared executions in declaration order.
    #[must_use]
    pub fn declared(&self) -> MethodContract {
        MethodContract {
            executions: self
                .state
                .read()
                .entries
                .iter()
                .map(|e| e.execution.clone())
                .collect(),
        }
    }

    /// Results of the latest replay round, by declaration index.
    #[must_use]
    pub fn results(&self) -> MethodContract {
        MethodContract {
            executions: self.state.read().results.clone(),
        }
    }

    /// Declares more executions.
    ///
    /// The batch is rejected as a whole if any request fingerprint collides
    /// with an existing declaration or with another member of the batch.
    pub fn add_executions(
        &self,
        executions: impl IntoIterator<Item = Execution>,
    ) -> Result<usize, PactError> {
        let pending = self.prepare(executions)?;
        Ok(self.commit(pending))
    }

    /// Fingerprints a batch and checks it for collisions without declaring
    /// anything.
    pub(crate) fn prepare(
        &self,
        executions: impl IntoIterator<Item = Execution>,
    ) -> Result<Pending, PactError> {
        let mut entries: Vec<Entry> = Vec::new();
        for execution in executions {
            let normalized_args = match execution.request.args {
                ref args @ (Value::Object(_) | Value::Array(_)) => self.codec.normalize_request(args)?,
                ref scalar => scalar.clone(),
            };
            let fingerprint = self.fingerprint(&normalized_args)?;
            entries.push(Entry {
                fingerprint,
                normalized_args,
                execution,
            });
        }

        let state = self.state.read();
        for (i, entry) in entries.iter().enumerate() {
            let seen_in_batch = entries[..i].iter().any(|e| e.fingerprint == entry.fingerprint);
            if seen_in_batch || state.index.contains_key(&entry.fingerprint) {
                return Err(DeclarationError::duplicate(&self.url, entry.fingerprint.as_str()).into());
            }
        }
        Ok(Pending { entries })
    }

    /// Declares a batch accepted by [`Interaction::prepare`].
    ///
    /// Nothing may be declared on this registry between the two calls.
    pub(crate) fn commit(&self, pending: Pending) -> usize {
        let added = pending.entries.len();
        let mut state = self.state.write();
        for entry in pending.entries {
            debug!(
                url = %self.url,
                fingerprint = %entry.fingerprint.digest(),
                "Declared execution"
            );
            let index = state.entries.len();
            state.index.insert(entry.fingerprint.clone(), index);
            state.entries.push(entry);
            state.results.push(blank_result());
        }
        added
    }

    /// Discards the previous round's results, keeping the declarations.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.results = state.entries.iter().map(|_| blank_result()).collect();
        state.unexpected.clear();
    }

    /// Mock implementation of this method.
    ///
    /// Looks up the live arguments' fingerprint, records them as the observed
    /// request and answers with the declared reply or error.
    #[must_use]
    pub fn handler(&self) -> MockHandler {
        let state = Arc::clone(&self.state);
        let codec = Arc::clone(&self.codec);
        let url = self.url.clone();

        Arc::new(move |args: Value, _metadata: Metadata| -> Result<Value, HandlerError> {
            let fingerprint = Fingerprint::of(&args, codec.as_ref()).map_err(|e| {
                HandlerError::Declared(ErrorRecord::new(status::INTERNAL, e.to_string()))
            })?;

            let mut state = state.write();
            let Some(&index) = state.index.get(&fingerprint) else {
                let err = UnexpectedCallError::new(&url, fingerprint.as_str());
                warn!(url = %url, fingerprint = %fingerprint.digest(), "Unexpected call");
                state.unexpected.push(err.clone());
                return Err(err.into());
            };

            let reply = state.entries[index].execution.reply.clone();
            if let Some(slot) = state.results.get_mut(index) {
                slot.expectation.get_or_insert_with(Exchange::default).request.args = args;
            }
            drop(state);

            match reply {
                ReplyRecord { error: Some(error), .. } => Err(HandlerError::Declared(error)),
                ReplyRecord { reply, .. } => Ok(reply.unwrap_or(Value::Null)),
            }
        })
    }

    /// Replays every declared execution and verifies the results.
    ///
    /// Executions run concurrently and all of them settle before this returns,
    /// even when some fail verification.
    pub async fn exec(&self, opts: &ExecOptions) -> Result<MethodContract, PactError> {
        self.reset();
        let count = self.len();
        let policy = self.policy.merged(&opts.assert);
        info!(url = %self.url, executions = count, "Replaying interaction");

        let outcomes = join_all((0..count).map(|i| self.replay(i, &policy, opts.call_timeout))).await;

        if let Some(err) = self.state.write().unexpected.drain(..).next() {
            return Err(err.into());
        }
        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        info!(url = %self.url, executions = count, failed, "Interaction settled");
        outcomes.into_iter().collect::<Result<Vec<()>, _>>()?;

        Ok(self.results())
    }

    /// Replays only the execution declared for `args`.
    pub async fn exec_one(&self, args: &Value, opts: &ExecOptions) -> Result<Execution, PactError> {
        let fingerprint = self.fingerprint(args)?;
        let index = self
            .state
            .read()
            .index
            .get(&fingerprint)
            .copied()
            .ok_or_else(|| UnexpectedCallError::new(&self.url, fingerprint.as_str()))?;

        let policy = self.policy.merged(&opts.assert);
        self.replay(index, &policy, opts.call_timeout).await?;
        Ok(self.state.read().results[index].clone())
    }

    async fn replay(
        &self,
        index: usize,
        policy: &AssertPolicy,
        call_timeout: Option<Duration>,
    ) -> Result<(), PactError> {
        let declared = {
            let mut state = self.state.write();
            let entry = &state.entries[index];
            let declared = entry.execution.clone();
            let mut observed_request = declared.request.clone();
            observed_request.args = entry.normalized_args.clone();

            let slot = &mut state.results[index];
            slot.request = declared.request.clone();
            slot.reply = declared.reply.clone();
            slot.expectation = Some(Exchange {
                request: observed_request,
                reply: ReplyRecord::default(),
            });
            declared
        };

        let call = (self.call)(
            declared.request.args.clone(),
            declared.request.metadata.clone(),
            declared.request.call_options.clone(),
        );
        let outcome = match call_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(ErrorRecord::new(status::DEADLINE_EXCEEDED, "deadline exceeded"))
            }),
            None => call.await,
        };

        let (declared_view, mut observed) = {
            let mut state = self.state.write();
            let slot = &mut state.results[index];
            let mut observed = slot.expectation.take().unwrap_or_default();
            observed.reply = ReplyRecord::from_result(outcome);
            redact_errors(&mut slot.reply, &mut observed.reply, policy.opts.error_fields());
            (
                Exchange {
                    request: slot.request.clone(),
                    reply: slot.reply.clone(),
                },
                observed,
            )
        };

        let mut events = Vec::new();
        let verified = self.compare(&declared_view, &mut observed, policy.opts.trim_uncovered(), &mut events);

        self.state.write().results[index].expectation = Some(observed.clone());
        verified?;

        policy.report(events)?;
        if let Some(ref assertion) = policy.hooks.assertion {
            assertion(&declared_view, &observed)
                .map_err(|message| VerificationError::custom(&self.url, message))?;
        }
        Ok(())
    }

    /// Diffs the request, reply payload and error, trimming `observed` in place.
    fn compare(
        &self,
        declared: &Exchange,
        observed: &mut Exchange,
        trim_uncovered: bool,
        events: &mut Vec<DiffEvent>,
    ) -> Result<(), PactError> {
        let mut sink = |e: DiffEvent| events.push(e);

        let expected_request = serde_json::to_value(&declared.request)?;
        let mut actual_request = serde_json::to_value(&observed.request)?;
        diff(&expected_request, &mut actual_request, trim_uncovered, &self.url, "request", &mut sink);
        observed.request = serde_json::from_value(actual_request)?;

        let expected_reply = declared.reply.reply.clone().unwrap_or(Value::Null);
        let mut actual_reply = observed.reply.reply.clone().unwrap_or(Value::Null);
        diff(&expected_reply, &mut actual_reply, trim_uncovered, &self.url, "reply", &mut sink);
        if observed.reply.reply.is_some() {
            observed.reply.reply = Some(actual_reply);
        }

        let expected_error = serde_json::to_value(&declared.reply.error)?;
        let mut actual_error = serde_json::to_value(&observed.reply.error)?;
        diff(&expected_error, &mut actual_error, trim_uncovered, &self.url, "error", &mut sink);
        observed.reply.error = serde_json::from_value(actual_error)?;

        Ok(())
    }
}

/// Narrows error records before comparison.
///
/// Explicit fields narrow both sides. Otherwise the observed error is narrowed
/// to the fields the declaration mentions.
fn redact_errors(declared: &mut ReplyRecord, observed: &mut ReplyRecord, error_fields: &[String]) {
    let Some(ref mut actual) = observed.error else {
        return;
    };

    if !error_fields.is_empty() {
        *actual = actual.pick(error_fields);
        if let Some(ref mut expected) = declared.error {
            *expected = expected.pick(error_fields);
        }
        return;
    }

    if let Some(ref expected) = declared.error {
        let fields: Vec<&str> = expected.fields().collect();
        if !fields.is_empty() {
            *actual = actual.pick(fields.as_slice());
        }
    }
}

impl std::fmt::Debug for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction")
            .field("service", &self.service)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("executions", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::AssertOpts;
    use crate::errors::MissingSide;
    use crate::transport::{JsonCodec, MockServiceClient, ServiceClient, ServiceDescriptor};
    use futures::FutureExt;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn descriptor() -> MethodDescriptor {
        ServiceDescriptor::new("helloworld.Greeter")
            .method("sayHello", Arc::new(JsonCodec))
            .methods
            .remove(0)
    }

    /// Call path that answers like the declared mock would.
    fn call_via(interaction_handler: Arc<Mutex<Option<MockHandler>>>) -> CallFn {
        Arc::new(move |args, metadata, _opts| {
            let handler = interaction_handler.lock().clone();
            async move {
                let handler = handler.expect("handler installed");
                handler(args, metadata).map_err(HandlerError::into_error_record)
            }
            .boxed()
        })
    }

    fn fixed_call(reply: Result<Value, ErrorRecord>) -> CallFn {
        Arc::new(move |_args, _metadata, _opts| {
            let reply = reply.clone();
            async move { reply }.boxed()
        })
    }

    fn nick() -> Execution {
        Execution::returning(json!({"name": "nick"}), json!({"message": "Hello, nick!"}))
    }

    fn jane() -> Execution {
        Execution::failing(json!({"name": "Jane"}), ErrorRecord::new(2000, "user `Jane` not exists"))
    }

    fn self_served() -> Interaction {
        let slot = Arc::new(Mutex::new(None));
        let interaction = Interaction::new(
            "helloworld.Greeter",
            &descriptor(),
            call_via(Arc::clone(&slot)),
            AssertPolicy::new(),
        );
        *slot.lock() = Some(interaction.handler());
        interaction
    }

    #[test]
    fn test_duplicate_fingerprint_rejected() {
        let interaction = self_served();
        interaction.add_executions([nick()]).unwrap();

        let again = Execution::returning(json!({"name": "nick"}), json!({"message": "other"}));
        let err = interaction.add_executions([again]).unwrap_err();
        assert!(matches!(
            err,
            PactError::Declaration(DeclarationError::DuplicateFingerprint { .. })
        ));
        assert_eq!(interaction.len(), 1);
    }

    #[test]
    fn test_duplicate_within_batch_rejects_whole_batch() {
        let interaction = self_served();
        let err = interaction.add_executions([jane(), nick(), nick()]).unwrap_err();
        assert!(err.to_string().contains("already declared on /helloworld.Greeter/SayHello"));
        assert!(interaction.is_empty());
    }

    #[test]
    fn test_handler_answers_declared_reply_and_error() {
        let interaction = self_served();
        interaction.add_executions([nick(), jane()]).unwrap();
        let handler = interaction.handler();

        assert_eq!(
            handler(json!({"name": "nick"}), Metadata::new()).unwrap(),
            json!({"message": "Hello, nick!"})
        );
        match handler(json!({"name": "Jane"}), Metadata::new()) {
            Err(HandlerError::Declared(err)) => assert_eq!(err.code(), Some(2000)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_handler_rejects_undeclared_args() {
        let interaction = self_served();
        interaction.add_executions([nick()]).unwrap();

        let err = interaction.handler()(json!({"name": "spock"}), Metadata::new()).unwrap_err();
        assert!(matches!(err, HandlerError::Unexpected(_)));
    }

    #[tokio::test]
    async fn test_exec_records_observed_exchange() {
        let interaction = self_served();
        interaction.add_executions([nick(), jane()]).unwrap();

        let result = interaction.exec(&ExecOptions::new()).await.unwrap();
        assert_eq!(result.executions.len(), 2);

        let first = &result.executions[0];
        let observed = first.expectation.as_ref().unwrap();
        assert_eq!(observed.reply.reply, Some(json!({"message": "Hello, nick!"})));
        assert_eq!(observed.request.args, json!({"name": "nick"}));

        let second = result.executions[1].expectation.as_ref().unwrap();
        assert_eq!(second.reply.error, Some(ErrorRecord::new(2000, "user `Jane` not exists")));
        assert!(second.reply.reply.is_none());
    }

    #[tokio::test]
    async fn test_exec_runs_every_execution_again_after_reset() {
        let interaction = self_served();
        interaction.add_executions([nick()]).unwrap();
        interaction.exec(&ExecOptions::new()).await.unwrap();
        interaction.add_executions([jane()]).unwrap();

        let result = interaction.exec(&ExecOptions::new()).await.unwrap();
        assert_eq!(result.executions.len(), 2);
        assert!(result.executions.iter().all(|e| e.expectation.is_some()));
    }

    #[tokio::test]
    async fn test_extra_reply_field_respects_trim_policy() {
        let interaction = Interaction::new(
            "helloworld.Greeter",
            &descriptor(),
            fixed_call(Ok(json!({"message": "Hello, nick!", "extra": "X"}))),
            AssertPolicy::from(AssertOpts::new().with_default_assertion_on(true)),
        );
        interaction.add_executions([nick()]).unwrap();

        let trimmed = interaction.exec(&ExecOptions::new()).await.unwrap();
        assert_eq!(
            trimmed.executions[0].expectation.as_ref().unwrap().reply.reply,
            Some(json!({"message": "Hello, nick!"}))
        );

        let strict = ExecOptions::new().with_assert(AssertOpts::new().with_trim_uncovered(false));
        let err = interaction.exec(&strict).await.unwrap_err();
        let verification = err.as_verification().unwrap();
        assert_eq!(verification.path, "reply.extra");
        assert_eq!(verification.missed_key_on, Some(MissingSide::Expected));
    }

    #[tokio::test]
    async fn test_failed_execution_keeps_sibling_results() {
        let call: CallFn = Arc::new(|args: Value, _metadata, _opts| {
            async move {
                if args["name"] == "nick" {
                    Ok(json!({"message": "Hello, nick!"}))
                } else {
                    Err(ErrorRecord::new(14, "Unknown Error"))
                }
            }
            .boxed()
        });
        let interaction = Interaction::new(
            "helloworld.Greeter",
            &descriptor(),
            call,
            AssertPolicy::from(AssertOpts::new().with_default_assertion_on(true)),
        );
        interaction.add_executions([nick(), jane()]).unwrap();

        let err = interaction.exec(&ExecOptions::new()).await.unwrap_err();
        assert!(err.as_verification().unwrap().path.starts_with("error."));

        let results = interaction.results();
        let sibling = results.executions[0].expectation.as_ref().unwrap();
        assert_eq!(sibling.reply.reply, Some(json!({"message": "Hello, nick!"})));
        let failed = results.executions[1].expectation.as_ref().unwrap();
        assert_eq!(failed.reply.error.as_ref().and_then(ErrorRecord::code), Some(14));
    }

    #[tokio::test]
    async fn test_error_fields_redaction() {
        let observed = ErrorRecord::new(2000, "different text").with_field("stack", json!("trace"));
        let interaction = Interaction::new(
            "helloworld.Greeter",
            &descriptor(),
            fixed_call(Err(observed)),
            AssertPolicy::from(AssertOpts::new().with_default_assertion_on(true)),
        );
        interaction.add_executions([jane()]).unwrap();

        let only_code = ExecOptions::new().with_assert(AssertOpts::new().with_error_fields(["code"]));
        let result = interaction.exec(&only_code).await.unwrap();
        assert_eq!(
            result.executions[0].reply.error,
            Some(ErrorRecord::from_map(
                json!({"code": 2000}).as_object().cloned().unwrap()
            ))
        );

        let err = interaction.exec(&ExecOptions::new()).await.unwrap_err();
        assert_eq!(err.as_verification().unwrap().path, "error.details");
    }

    #[tokio::test]
    async fn test_error_code_difference_fails() {
        let interaction = Interaction::new(
            "helloworld.Greeter",
            &descriptor(),
            fixed_call(Err(ErrorRecord::new(14, "user `Jane` not exists"))),
            AssertPolicy::from(AssertOpts::new().with_default_assertion_on(true)),
        );
        interaction.add_executions([jane()]).unwrap();

        let opts = ExecOptions::new().with_assert(AssertOpts::new().with_error_fields(["code"]));
        let err = interaction.exec(&opts).await.unwrap_err();
        assert_eq!(err.as_verification().unwrap().path, "error.code");
    }

    #[tokio::test]
    async fn test_default_redaction_ignores_additive_error_fields() {
        let observed = ErrorRecord::new(2000, "user `Jane` not exists").with_field("requestId", json!("r-1"));
        let interaction = Interaction::new(
            "helloworld.Greeter",
            &descriptor(),
            fixed_call(Err(observed)),
            AssertPolicy::from(
                AssertOpts::new()
                    .with_default_assertion_on(true)
                    .with_trim_uncovered(false),
            ),
        );
        interaction.add_executions([jane()]).unwrap();
        assert!(interaction.exec(&ExecOptions::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_assertion_hook_receives_declared_and_observed() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let interaction = self_served();
        interaction.add_executions([nick(), jane()]).unwrap();

        let opts = ExecOptions::new().with_assert(AssertPolicy::new().with_assertion(
            move |declared, observed| {
                *counter.lock() += 1;
                if declared.reply == observed.reply {
                    Ok(())
                } else {
                    Err("reply mismatch".to_string())
                }
            },
        ));
        interaction.exec(&opts).await.unwrap();
        assert_eq!(*seen.lock(), 2);
    }

    #[tokio::test]
    async fn test_exec_one_unknown_args() {
        let interaction = self_served();
        interaction.add_executions([nick()]).unwrap();

        let err = interaction
            .exec_one(&json!({"name": "nobody"}), &ExecOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PactError::UnexpectedCall(_)));

        let one = interaction
            .exec_one(&json!({"name": "nick"}), &ExecOptions::new())
            .await
            .unwrap();
        assert_eq!(
            one.expectation.unwrap().reply.reply,
            Some(json!({"message": "Hello, nick!"}))
        );
    }

    #[tokio::test]
    async fn test_call_timeout_records_deadline() {
        let slow: CallFn = Arc::new(|_a, _m, _o| {
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!({}))
            }
            .boxed()
        });
        let interaction = Interaction::new("helloworld.Greeter", &descriptor(), slow, AssertPolicy::new());
        interaction.add_executions([nick()]).unwrap();

        let opts = ExecOptions::new().with_call_timeout(Duration::from_millis(10));
        let result = interaction.exec(&opts).await.unwrap();
        let observed = result.executions[0].expectation.clone().unwrap();
        assert_eq!(observed.reply.error.unwrap().code(), Some(status::DEADLINE_EXCEEDED));
    }

    #[tokio::test]
    async fn test_call_path_through_mocked_client() {
        let mut client = MockServiceClient::new();
        client
            .expect_call()
            .withf(|method, args, _, _| method == "sayHello" && args == &json!({"name": "nick"}))
            .times(1)
            .returning(|_, _, _, _| Ok(json!({"message": "Hello, nick!"})));
        let client: Arc<dyn ServiceClient> = Arc::new(client);

        let call: CallFn = Arc::new(move |args, metadata, opts| {
            let client = Arc::clone(&client);
            async move { client.call("sayHello", args, metadata, opts).await }.boxed()
        });
        let interaction = Interaction::new(
            "helloworld.Greeter",
            &descriptor(),
            call,
            AssertPolicy::from(AssertOpts::new().with_default_assertion_on(true)),
        );
        interaction.add_executions([nick()]).unwrap();
        interaction.exec(&ExecOptions::new()).await.unwrap();
    }
}
