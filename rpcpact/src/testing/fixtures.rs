//! Sample services, schemas and contracts.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::contract::{ErrorRecord, Metadata};
use crate::transport::{InMemoryTransport, JsonCodec, MessageSchema, SchemaCodec, ServiceDescriptor};

/// Path of the greeter service.
pub const GREETER: &str = "helloworld.Greeter";

/// Path of the nested-message service.
pub const NEST_MESSAGE: &str = "helloworld.nestmessage.NestMessage";

/// Consumer name used by the sample contract.
pub const CONSUMER: &str = "greeter_consumer";

/// Provider name used by the sample contract.
pub const PROVIDER: &str = "greeter_provider";

/// Schema revisions of the nested-message service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestMessageVersion {
    /// The revision the sample contract was recorded against.
    #[default]
    Current,
    /// Addresses lost their `district` field.
    WithoutDistrict,
    /// `addressList` was removed.
    WithoutAddressList,
    /// Addresses gained a `zip` field with a default.
    WithZip,
}

fn address(version: NestMessageVersion) -> MessageSchema {
    let mut fields = vec![
        ("name", MessageSchema::scalar()),
        ("province", MessageSchema::scalar()),
        ("city", MessageSchema::scalar()),
    ];
    if version != NestMessageVersion::WithoutDistrict {
        fields.push(("district", MessageSchema::scalar()));
    }
    if version == NestMessageVersion::WithZip {
        fields.push(("zip", MessageSchema::scalar_with_default(json!("000000"))));
    }
    MessageSchema::message(fields)
}

fn person(version: NestMessageVersion) -> MessageSchema {
    let mut fields = vec![
        ("name", MessageSchema::scalar()),
        ("currentAddr", address(version)),
    ];
    if version != NestMessageVersion::WithoutAddressList {
        fields.push(("addressList", MessageSchema::repeated(address(version))));
    }
    MessageSchema::message(fields)
}

/// The greeter service: `sayHello` and `throwAnErr`, plain JSON codec.
#[must_use]
pub fn greeter_service() -> ServiceDescriptor {
    ServiceDescriptor::new(GREETER)
        .method("sayHello", Arc::new(JsonCodec))
        .method("throwAnErr", Arc::new(JsonCodec))
}

/// The nested-message service at a given schema revision.
#[must_use]
pub fn nest_message_service(version: NestMessageVersion) -> ServiceDescriptor {
    ServiceDescriptor::new(NEST_MESSAGE).method(
        "changeData",
        Arc::new(SchemaCodec::new(person(version), person(version))),
    )
}

/// The sample contract, written with the shorthand forms a hand-authored
/// contract would use.
#[must_use]
pub fn sample_contract() -> Value {
    let addresses = json!([
        {"name": "kirk", "province": "A", "city": "enterprice", "district": "A1"},
        {"name": "spock", "province": "A", "city": "enterprice"}
    ]);
    let current = json!({"name": "spock", "province": "A", "city": "enterprice"});

    json!({
        "consumer": CONSUMER,
        "provider": PROVIDER,
        "contracts": {
            GREETER: {
                "sayHello": {
                    "executions": [
                        {
                            "request": {"args": {"name": "nick", "position": "122,322", "dbVal": 3.141_592_6}},
                            "reply": {"reply": {"message": "Hello, nick!", "title": "CAO", "fltVal": 3.0}}
                        },
                        {
                            "request": {"args": {"name": "Jane", "position": "122,322", "dbVal": 3.141_592_6}},
                            "reply": {"error": {"code": 2000, "details": "user `Jane` not exists"}}
                        }
                    ]
                },
                "throwAnErr": [
                    {
                        "request": {"args": {"name": "hanna", "position": "122,322", "dbVal": 32.3}},
                        "reply": {"error": {"code": 14, "details": "Unknown Error"}}
                    }
                ]
            },
            NEST_MESSAGE: {
                "changeData": [
                    {
                        "request": {"args": {"name": "spock", "addressList": addresses, "currentAddr": current}},
                        "reply": {"reply": {"name": "spock", "addressList": addresses, "currentAddr": current}}
                    },
                    {
                        "request": {"args": {"name": "hanna", "addressList": addresses, "currentAddr": current}},
                        "reply": {"error": {"code": 2000, "details": "hanna is not here."}}
                    }
                ]
            }
        }
    })
}

/// Number of executions in [`sample_contract`].
pub const SAMPLE_EXECUTIONS: usize = 5;

/// Transport for the recording side: both services, no real implementation.
#[must_use]
pub fn consumer_transport() -> InMemoryTransport {
    InMemoryTransport::new(vec![
        greeter_service(),
        nest_message_service(NestMessageVersion::Current),
    ])
}

fn name_of(args: &Value) -> String {
    args.get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Transport for the verifying side, with real implementations that satisfy
/// the sample contract.
#[must_use]
pub fn provider_transport(version: NestMessageVersion) -> InMemoryTransport {
    InMemoryTransport::new(vec![greeter_service(), nest_message_service(version)])
        .implement(GREETER, "sayHello", |args: Value, _: Metadata| async move {
            let name = name_of(&args);
            match name.as_str() {
                "Jane" | "Danna" => Err(ErrorRecord::new(2000, format!("user `{name}` not exists"))),
                _ => Ok(json!({"message": format!("Hello, {name}!"), "title": "CAO", "fltVal": 3.0})),
            }
        })
        .implement(GREETER, "throwAnErr", |_: Value, _: Metadata| async move {
            Err::<Value, _>(ErrorRecord::new(14, "Unknown Error"))
        })
        .implement(NEST_MESSAGE, "changeData", |args: Value, _: Metadata| async move {
            if name_of(&args) == "hanna" {
                Err(ErrorRecord::new(2000, "hanna is not here."))
            } else {
                Ok(args)
            }
        })
}
