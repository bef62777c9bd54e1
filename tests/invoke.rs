//! Invoker dispatch, the application/protocol error split, and signature
//! introspection.

use std::sync::Arc;

use bytes::Bytes;

use vom::rpc::{registry, Context, InterfaceDef, Invoker, MethodDef, ServerCall, ServiceBuilder};
use vom::{ApplicationError, Decoder, Encoder, InvokeError, Type, Value};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn encode_one(ty: Type, value: &Value) -> Bytes {
    let mut encoder = Encoder::new();
    encoder.encode(ty, value).unwrap();
    encoder.into_bytes()
}

fn decode_one(ty: Type, bytes: &Bytes) -> Value {
    Decoder::new(bytes.clone()).decode(ty).unwrap()
}

fn calculator_interface() -> Arc<InterfaceDef> {
    registry::global().resolve("Calculator", || {
        InterfaceDef::new(
            "Calculator",
            vec![
                MethodDef::new("Describe")
                    .arg(Type::INT32)
                    .result(Type::STRING)
                    .tag(Type::STRING, Value::String("read".into())),
                MethodDef::new("Stats")
                    .result(Type::STRING)
                    .result(Type::INT64),
                MethodDef::new("Fail"),
                MethodDef::new("Crash"),
            ],
        )
    })
}

fn calculator() -> Invoker {
    ServiceBuilder::new("calculator-impl")
        .interface(calculator_interface())
        .handler("Describe", |_ctx, _call, args| match args.as_slice() {
            [Value::Int32(n)] => Ok(vec![Value::String(format!("value is {n}"))]),
            _ => anyhow::bail!("unexpected arguments"),
        })
        .handler("Stats", |_ctx, _call, _args| {
            Ok(vec![Value::String("ok".into()), Value::Int64(42)])
        })
        .handler("Fail", |_ctx, _call, _args| {
            Err(anyhow::Error::new(ApplicationError::new("E1", "boom")))
        })
        .handler("Crash", |_ctx, _call, _args| {
            anyhow::bail!("secret internal state leaked")
        })
        .build()
        .unwrap()
}

#[test]
fn dispatch_decodes_invokes_and_encodes() {
    let invoker = calculator();
    let args = [encode_one(Type::INT32, &Value::Int32(7))];
    let results = invoker
        .invoke(&Context::background(), &ServerCall::default(), "Describe", &args)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(
        decode_one(Type::STRING, &results[0]),
        Value::String("value is 7".into())
    );
}

#[test]
fn multiple_results_come_back_in_declaration_order() {
    let invoker = calculator();
    let results = invoker
        .invoke(&Context::background(), &ServerCall::default(), "Stats", &[])
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(decode_one(Type::STRING, &results[0]), Value::String("ok".into()));
    assert_eq!(decode_one(Type::INT64, &results[1]), Value::Int64(42));
}

#[test]
fn missing_methods_name_the_method_and_service() {
    let invoker = calculator();
    let err = invoker
        .invoke(&Context::background(), &ServerCall::default(), "missing", &[])
        .unwrap_err();
    match &err {
        InvokeError::MethodNotFound { method, service } => {
            assert_eq!(method, "missing");
            assert_eq!(service, "calculator-impl");
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("missing"), "{message}");
    assert!(message.contains("calculator-impl"), "{message}");
}

#[test]
fn application_errors_propagate_as_structured_data() {
    init_logging();
    let invoker = calculator();
    let err = invoker
        .invoke(&Context::background(), &ServerCall::default(), "Fail", &[])
        .unwrap_err();
    match err {
        InvokeError::Application(app) => {
            assert_eq!(app, ApplicationError::new("E1", "boom"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn undeclared_errors_are_opaque_to_the_caller() {
    init_logging();
    let invoker = calculator();
    let err = invoker
        .invoke(&Context::background(), &ServerCall::default(), "Crash", &[])
        .unwrap_err();
    assert!(matches!(err, InvokeError::Internal { .. }));
    let message = err.to_string();
    assert!(message.contains("Crash"), "{message}");
    assert!(!message.contains("secret"), "leaked detail: {message}");
}

#[test]
fn argument_arity_is_checked() {
    let invoker = calculator();
    let err = invoker
        .invoke(&Context::background(), &ServerCall::default(), "Describe", &[])
        .unwrap_err();
    assert!(matches!(
        err,
        InvokeError::ArgumentCount { want: 1, got: 0, .. }
    ));
}

#[test]
fn bad_argument_bytes_are_reported_per_argument() {
    let invoker = calculator();
    let args = [Bytes::from_static(&[0x00, 0x01, 0x02])];
    let err = invoker
        .invoke(&Context::background(), &ServerCall::default(), "Describe", &args)
        .unwrap_err();
    assert!(matches!(
        err,
        InvokeError::BadArgument { index: 0, .. }
    ));
}

#[test]
fn signatures_are_introspectable() {
    let invoker = calculator();
    assert_eq!(invoker.arg_types("Describe").unwrap(), &[Type::INT32]);
    assert_eq!(invoker.result_types("Describe").unwrap(), &[Type::STRING]);
    assert_eq!(
        invoker.result_types("Stats").unwrap(),
        &[Type::STRING, Type::INT64]
    );
    assert_eq!(
        invoker.tags("Describe").unwrap(),
        &[(Type::STRING, Value::String("read".into()))]
    );
    assert!(invoker.tags("Stats").unwrap().is_empty());
    assert!(matches!(
        invoker.arg_types("nope").unwrap_err(),
        InvokeError::MethodNotFound { .. }
    ));
}

#[test]
fn builder_rejects_bad_wiring() {
    // No interfaces at all.
    let err = ServiceBuilder::new("empty").build().unwrap_err();
    assert!(err.to_string().contains("empty"), "{err}");

    // A declared method with no handler.
    let err = ServiceBuilder::new("partial")
        .interface(calculator_interface())
        .handler("Describe", |_, _, _| Ok(vec![]))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("has no handler"), "{err}");

    // A handler that matches no declared method.
    let iface = Arc::new(InterfaceDef::new(
        "Single",
        vec![MethodDef::new("Only")],
    ));
    let err = ServiceBuilder::new("stray")
        .interface(iface)
        .handler("Only", |_, _, _| Ok(vec![]))
        .handler("Extra", |_, _, _| Ok(vec![]))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("Extra"), "{err}");
}

#[test]
fn wrong_result_count_is_a_protocol_violation() {
    let iface = Arc::new(InterfaceDef::new(
        "Sloppy",
        vec![MethodDef::new("Two").result(Type::INT64).result(Type::INT64)],
    ));
    let invoker = ServiceBuilder::new("sloppy-impl")
        .interface(iface)
        .handler("Two", |_, _, _| Ok(vec![Value::Int64(1)]))
        .build()
        .unwrap();
    let err = invoker
        .invoke(&Context::background(), &ServerCall::default(), "Two", &[])
        .unwrap_err();
    assert!(matches!(err, InvokeError::Internal { .. }));
}

#[test]
fn interface_descriptors_are_cached_process_wide() {
    let first = calculator_interface();
    let second = calculator_interface();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn concurrent_invocations_share_one_invoker() {
    let invoker = calculator();
    std::thread::scope(|scope| {
        for n in 0..8 {
            let invoker = &invoker;
            scope.spawn(move || {
                let args = [encode_one(Type::INT32, &Value::Int32(n))];
                let results = invoker
                    .invoke(
                        &Context::background(),
                        &ServerCall::default(),
                        "Describe",
                        &args,
                    )
                    .unwrap();
                assert_eq!(
                    decode_one(Type::STRING, &results[0]),
                    Value::String(format!("value is {n}"))
                );
            });
        }
    });
}
