//! End-to-end tests: recording with a consumer, verifying with a provider.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::collector::{Consumer, Provider};
    use crate::contract::{ContractDocument, ErrorRecord, Metadata};
    use crate::diff::AssertOpts;
    use crate::errors::{DeclarationError, MissingSide, PactError};
    use crate::registry::{ExecOptions, ServiceFilter};
    use crate::testing::{
        assert_execution_count, assert_observed_reply, assert_replies_match_declarations,
        assert_verification_failed, consumer_transport, greeter_service, nest_message_service,
        observed, provider_transport, sample_contract, DiffRecorder, NestMessageVersion, CONSUMER,
        GREETER, NEST_MESSAGE, PROVIDER, SAMPLE_EXECUTIONS,
    };
    use crate::transport::{status, InMemoryTransport, ServiceClient, Transport};

    fn strict() -> ExecOptions {
        ExecOptions::new().with_assert(AssertOpts::new().with_default_assertion_on(true))
    }

    async fn recording_consumer() -> Consumer {
        let mut consumer = Consumer::new(Arc::new(consumer_transport()), CONSUMER, PROVIDER);
        consumer.initialize(sample_contract()).await.unwrap();
        consumer
    }

    async fn verifying_provider(version: NestMessageVersion) -> Provider {
        let mut provider = Provider::new(Arc::new(provider_transport(version)), CONSUMER, PROVIDER);
        provider.initialize(sample_contract()).await.unwrap();
        provider
    }

    fn danna() -> Value {
        json!({
            GREETER: {
                "sayHello": [{
                    "request": {"args": {"name": "Danna", "position": "122,322", "dbVal": 1.5}},
                    "reply": {"error": {"code": 2000, "details": "user `Danna` not exists"}}
                }]
            }
        })
    }

    #[tokio::test]
    async fn test_consumer_records_declared_replies() {
        let consumer = recording_consumer().await;
        let doc = consumer.exec(ServiceFilter::new(), &strict()).await.unwrap();

        assert_eq!(doc.consumer, CONSUMER);
        assert_eq!(doc.provider, PROVIDER);
        assert_eq!(doc.execution_count(), SAMPLE_EXECUTIONS);
        assert_execution_count(&doc, GREETER, "sayHello", 2);
        assert_execution_count(&doc, GREETER, "throwAnErr", 1);
        assert_execution_count(&doc, NEST_MESSAGE, "changeData", 2);
        assert_replies_match_declarations(&doc);
        assert_observed_reply(
            &doc,
            GREETER,
            "sayHello",
            0,
            &json!({"message": "Hello, nick!", "title": "CAO", "fltVal": 3.0}),
        );

        let jane = observed(&doc, GREETER, "sayHello", 1);
        assert_eq!(jane.request.args["name"], "Jane");
        assert_eq!(jane.reply.error.unwrap().code(), Some(2000));
    }

    #[tokio::test]
    async fn test_consumer_observed_request_passes_through_codec() {
        let consumer = recording_consumer().await;
        let doc = consumer
            .exec(ServiceFilter::new().with(NEST_MESSAGE, true), &strict())
            .await
            .unwrap();

        let spock = observed(&doc, NEST_MESSAGE, "changeData", 0);
        assert_eq!(spock.request.args["addressList"][0]["district"], "A1");
        assert!(spock.request.args["addressList"][1].get("district").is_none());
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let mut consumer = recording_consumer().await;
        consumer.initialize(danna()).await.unwrap();

        assert!(consumer.is_initialized());
        assert_eq!(consumer.contract().execution_count(), SAMPLE_EXECUTIONS);
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_names() {
        let mut consumer = Consumer::new(Arc::new(consumer_transport()), "bad_", PROVIDER);
        let err = consumer.initialize(sample_contract()).await.unwrap_err();
        assert!(matches!(
            err,
            PactError::Declaration(DeclarationError::InvalidName { ref role, .. }) if role == "Consumer"
        ));
        assert!(!consumer.is_initialized());

        let mut provider = Provider::new(Arc::new(provider_transport(NestMessageVersion::Current)), CONSUMER, "9lives");
        let err = provider.initialize(sample_contract()).await.unwrap_err();
        assert!(matches!(
            err,
            PactError::Declaration(DeclarationError::InvalidName { ref role, .. }) if role == "Provider"
        ));
    }

    #[tokio::test]
    async fn test_initialize_rejects_unknown_service() {
        let mut consumer = Consumer::new(Arc::new(consumer_transport()), CONSUMER, PROVIDER);
        let contract = json!({"contracts": {"no.such.Service": {"ping": []}}});

        let err = consumer.initialize(contract).await.unwrap_err();
        assert!(matches!(
            err,
            PactError::Declaration(DeclarationError::UnknownService { ref service }) if service == "no.such.Service"
        ));
    }

    #[tokio::test]
    async fn test_add_interactions_requires_initialize() {
        let mut consumer = Consumer::new(Arc::new(consumer_transport()), CONSUMER, PROVIDER);
        assert!(consumer.add_interactions(danna()).is_err());
    }

    #[tokio::test]
    async fn test_filters_select_services_and_methods() {
        let consumer = recording_consumer().await;

        let doc = consumer
            .exec(ServiceFilter::new().with(GREETER, "sayHello"), &ExecOptions::new())
            .await
            .unwrap();
        assert_eq!(doc.contracts.keys().collect::<Vec<_>>(), vec![GREETER]);
        assert_eq!(doc.contracts[GREETER].keys().collect::<Vec<_>>(), vec!["sayHello"]);

        let doc = consumer
            .exec(ServiceFilter::new().with(GREETER, false), &ExecOptions::new())
            .await
            .unwrap();
        assert_eq!(doc.contracts.keys().collect::<Vec<_>>(), vec![NEST_MESSAGE]);

        let doc = consumer.exec(ServiceFilter::new(), &ExecOptions::new()).await.unwrap();
        assert_eq!(doc.execution_count(), SAMPLE_EXECUTIONS);
    }

    #[tokio::test]
    async fn test_late_interactions_are_replayed() {
        let mut consumer = recording_consumer().await;
        consumer.add_interactions(danna()).unwrap();

        let doc = consumer.exec(ServiceFilter::new(), &strict()).await.unwrap();
        assert_execution_count(&doc, GREETER, "sayHello", 3);
        assert_eq!(consumer.contract().execution_count(), SAMPLE_EXECUTIONS + 1);

        let danna = observed(&doc, GREETER, "sayHello", 2);
        assert_eq!(danna.reply.error.unwrap().details(), Some("user `Danna` not exists"));
    }

    #[tokio::test]
    async fn test_late_duplicate_is_rejected() {
        let mut consumer = recording_consumer().await;
        let duplicate = json!({
            GREETER: {
                "sayHello": [{
                    "request": {"args": {"dbVal": 3.141_592_6, "position": "122,322", "name": "nick"}},
                    "reply": {"reply": {"message": "again"}}
                }]
            }
        });

        let err = consumer.add_interactions(duplicate).unwrap_err();
        assert!(matches!(
            err,
            PactError::Declaration(DeclarationError::DuplicateFingerprint { .. })
        ));
        assert_eq!(consumer.contract().execution_count(), SAMPLE_EXECUTIONS);
    }

    #[tokio::test]
    async fn test_rejected_batch_declares_nothing() {
        let mut consumer = recording_consumer().await;
        let mixed = json!({
            GREETER: {
                "sayHello": [{
                    "request": {"args": {"name": "Danna", "position": "122,322", "dbVal": 1.5}},
                    "reply": {"reply": {"message": "Hello, Danna!"}}
                }],
                "throwAnErr": [{
                    "request": {"args": {"name": "hanna", "position": "122,322", "dbVal": 32.3}},
                    "reply": {"error": {"code": 14, "details": "Unknown Error"}}
                }]
            }
        });

        let err = consumer.add_interactions(mixed).unwrap_err();
        assert!(err.to_string().contains("already declared on /helloworld.Greeter/ThrowAnErr"));

        let registered = consumer.interaction(GREETER, "sayHello").unwrap().len();
        assert_eq!(registered, 2);
        assert_eq!(consumer.contract().executions(GREETER, "sayHello").len(), registered);
        let doc = consumer.exec(ServiceFilter::new(), &strict()).await.unwrap();
        assert_execution_count(&doc, GREETER, "sayHello", 2);

        consumer.add_interactions(danna()).unwrap();
        assert_eq!(consumer.interaction(GREETER, "sayHello").unwrap().len(), 3);
        assert_eq!(consumer.contract().execution_count(), SAMPLE_EXECUTIONS + 1);
    }

    #[tokio::test]
    async fn test_failed_initialize_can_be_retried() {
        let hanna = json!({
            "request": {"args": {"name": "hanna", "position": "122,322", "dbVal": 32.3}},
            "reply": {"error": {"code": 14, "details": "Unknown Error"}}
        });
        let broken = json!({
            "contracts": {
                GREETER: {
                    "sayHello": [{"request": {"args": {"name": "nick"}}, "reply": {"reply": {"message": "Hello, nick!"}}}],
                    "throwAnErr": [hanna.clone(), hanna]
                }
            }
        });

        let mut consumer = Consumer::new(Arc::new(consumer_transport()), CONSUMER, PROVIDER);
        let err = consumer.initialize(broken).await.unwrap_err();
        assert!(matches!(
            err,
            PactError::Declaration(DeclarationError::DuplicateFingerprint { .. })
        ));
        assert!(!consumer.is_initialized());
        assert!(consumer.suite(GREETER).is_none());
        assert_eq!(consumer.contract().execution_count(), 0);

        consumer.initialize(sample_contract()).await.unwrap();
        assert_eq!(consumer.contract().execution_count(), SAMPLE_EXECUTIONS);
        assert_eq!(consumer.interaction(GREETER, "sayHello").unwrap().len(), 2);
        let doc = consumer.exec(ServiceFilter::new(), &strict()).await.unwrap();
        assert_eq!(doc.execution_count(), SAMPLE_EXECUTIONS);
    }

    #[tokio::test]
    async fn test_undeclared_call_answers_unknown() {
        let transport = Arc::new(consumer_transport());
        let mut consumer = Consumer::new(transport.clone(), CONSUMER, PROVIDER);
        consumer.initialize(sample_contract()).await.unwrap();

        let client = transport.client(GREETER).unwrap();
        let err = client
            .call("sayHello", json!({"name": "bob"}), Metadata::new(), Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(status::UNKNOWN));
        assert!(err.details().unwrap().contains("is not defined yet"));
    }

    #[tokio::test]
    async fn test_provider_verifies_sample_contract() {
        let provider = verifying_provider(NestMessageVersion::Current).await;
        let doc = provider.exec(ServiceFilter::new(), &strict()).await.unwrap();

        assert_eq!(doc.execution_count(), SAMPLE_EXECUTIONS);
        assert_replies_match_declarations(&doc);
        assert!(doc.assert_opts.is_none());
    }

    #[tokio::test]
    async fn test_removed_field_breaks_verification() {
        let provider = verifying_provider(NestMessageVersion::WithoutDistrict).await;
        let result = provider.exec(ServiceFilter::new(), &strict()).await;

        assert_verification_failed(
            &result,
            "request.args.addressList[0].district",
            Some(MissingSide::Actual),
        );
        let message = result.unwrap_err().to_string();
        assert!(message.starts_with(
            "/helloworld.nestmessage.NestMessage/ChangeData: verify failed on field `request.args.addressList[0].district`"
        ));
        assert!(message.contains("This field is missed in actual data"));
    }

    #[tokio::test]
    async fn test_removed_list_breaks_verification() {
        let provider = verifying_provider(NestMessageVersion::WithoutAddressList).await;
        let result = provider.exec(NEST_MESSAGE, &strict()).await;

        assert_verification_failed(&result, "request.args.addressList", Some(MissingSide::Actual));
    }

    #[tokio::test]
    async fn test_added_field_is_compatible() {
        let provider = verifying_provider(NestMessageVersion::WithZip).await;
        let doc = provider.exec(ServiceFilter::new(), &strict()).await.unwrap();

        let spock = observed(&doc, NEST_MESSAGE, "changeData", 0);
        assert!(spock.request.args["currentAddr"].get("zip").is_none());
    }

    #[tokio::test]
    async fn test_difference_hook_collects_instead_of_failing() {
        let provider = verifying_provider(NestMessageVersion::WithoutDistrict).await;
        let recorder = DiffRecorder::new();
        let opts = ExecOptions::new().with_assert(
            recorder
                .policy()
                .merged(&AssertOpts::new().with_default_assertion_on(true).into()),
        );

        provider.exec(NEST_MESSAGE, &opts).await.unwrap();

        let missed = recorder.missed_on(MissingSide::Actual);
        assert!(missed.contains(&"request.args.addressList[0].district".to_string()));
        assert!(missed.contains(&"reply.addressList[0].district".to_string()));
    }

    fn with_extra_reply() -> InMemoryTransport {
        InMemoryTransport::new(vec![
            greeter_service(),
            nest_message_service(NestMessageVersion::Current),
        ])
        .implement(GREETER, "sayHello", |args: Value, _: Metadata| async move {
            match args["name"].as_str() {
                Some("Jane") => Err(ErrorRecord::new(2000, "user `Jane` not exists")),
                _ => Ok(json!({"message": "Hello, nick!", "title": "CAO", "fltVal": 3.0, "extra": 1})),
            }
        })
    }

    #[tokio::test]
    async fn test_extra_reply_field_follows_trim_policy() {
        let filter = ServiceFilter::new().with(GREETER, "sayHello");

        let mut lenient = Provider::new(Arc::new(with_extra_reply()), CONSUMER, PROVIDER);
        lenient.initialize(sample_contract()).await.unwrap();
        let doc = lenient.exec(filter.clone(), &strict()).await.unwrap();
        assert!(observed(&doc, GREETER, "sayHello", 0).reply.reply.unwrap().get("extra").is_none());

        let mut exact = Provider::new(Arc::new(with_extra_reply()), CONSUMER, PROVIDER)
            .with_policy(AssertOpts::new().with_trim_uncovered(false));
        exact.initialize(sample_contract()).await.unwrap();
        let result = exact.exec(filter, &strict()).await;
        assert_verification_failed(&result, "reply.extra", Some(MissingSide::Expected));
    }

    #[tokio::test]
    async fn test_contract_options_override_provider_options() {
        let mut contract = sample_contract();
        contract["assertOpts"] = json!({"errorFields": ["code"]});

        let mut provider = Provider::new(Arc::new(provider_transport(NestMessageVersion::Current)), CONSUMER, PROVIDER)
            .with_policy(AssertOpts::new().with_trim_uncovered(false).with_error_fields(["details"]));
        provider.initialize(contract).await.unwrap();

        let opts = provider.assert_opts();
        assert_eq!(opts.trim_uncovered, Some(true));
        assert_eq!(opts.error_fields(), ["code".to_string()]);

        let doc = provider.exec(ServiceFilter::new(), &strict()).await.unwrap();
        assert_eq!(doc.assert_opts, Some(opts));
    }

    #[tokio::test]
    async fn test_call_timeout_records_deadline() {
        let slow = InMemoryTransport::new(vec![greeter_service()]).implement(
            GREETER,
            "sayHello",
            |_: Value, _: Metadata| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ErrorRecord>(json!({}))
            },
        );
        let mut provider = Provider::new(Arc::new(slow), CONSUMER, PROVIDER);
        provider
            .initialize(json!({"contracts": {GREETER: sample_contract()["contracts"][GREETER].clone()}}))
            .await
            .unwrap();

        let opts = ExecOptions::new().with_call_timeout(Duration::from_millis(50));
        let doc = provider
            .exec(ServiceFilter::new().with(GREETER, "sayHello"), &opts)
            .await
            .unwrap();

        let nick = observed(&doc, GREETER, "sayHello", 0);
        assert_eq!(nick.reply.error.unwrap().code(), Some(status::DEADLINE_EXCEEDED));
    }

    #[tokio::test]
    async fn test_contract_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeter_consumer-greeter_provider.json");

        let consumer = recording_consumer().await;
        let recorded = consumer
            .exec_and_clearup(ServiceFilter::new(), &ExecOptions::new().with_output_file(&path))
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let written: ContractDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(written, recorded);

        let mut provider = Provider::new(Arc::new(provider_transport(NestMessageVersion::Current)), CONSUMER, PROVIDER);
        provider.initialize(PathBuf::from(&path)).await.unwrap();
        let verified = provider.exec_and_clearup(ServiceFilter::new(), &strict()).await.unwrap();
        assert_eq!(verified.execution_count(), SAMPLE_EXECUTIONS);
    }

    #[tokio::test]
    async fn test_consumer_emits_contract_options() {
        let mut contract = sample_contract();
        contract["assertOpts"] = json!({"errorFields": ["code"]});
        let mut consumer = Consumer::new(Arc::new(consumer_transport()), CONSUMER, PROVIDER);
        consumer.initialize(contract).await.unwrap();

        let doc = consumer.exec(ServiceFilter::new(), &ExecOptions::new()).await.unwrap();
        assert_eq!(
            doc.assert_opts,
            Some(AssertOpts::new().with_trim_uncovered(true).with_error_fields(["code"]))
        );
    }

    #[tokio::test]
    async fn test_write_failure_keeps_document() {
        let dir = tempfile::tempdir().unwrap();
        let consumer = recording_consumer()
            .await
            .with_output_file(dir.path().join("missing").join("contract.json"));

        let err = consumer.exec(ServiceFilter::new(), &ExecOptions::new()).await.unwrap_err();
        match err {
            PactError::Finalize { document, .. } => {
                assert_eq!(document.execution_count(), SAMPLE_EXECUTIONS);
            }
            other => panic!("Expected a finalize error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clearup_stops_transport() {
        let transport = Arc::new(consumer_transport());
        let mut consumer = Consumer::new(transport.clone(), CONSUMER, PROVIDER);
        consumer.initialize(sample_contract()).await.unwrap();
        assert!(transport.is_running());

        consumer.clearup().await.unwrap();
        assert!(!transport.is_running());
    }
}
