//! Encode/decode round trips over every kind, including empty, zero, and
//! self-referential values.

use vom::{Decoder, Encoder, ProtoNode, Type, TypeBuilder, Value};

fn roundtrip(ty: Type, value: &Value) {
    let mut encoder = Encoder::new();
    encoder.encode(ty, value).unwrap();
    let mut decoder = Decoder::new(encoder.into_bytes());
    let decoded = decoder.decode(ty).unwrap();
    assert_eq!(decoded, *value);
}

#[test]
fn scalars() {
    roundtrip(Type::BOOL, &Value::Bool(true));
    roundtrip(Type::BOOL, &Value::Bool(false));
    roundtrip(Type::BYTE, &Value::Byte(0));
    roundtrip(Type::BYTE, &Value::Byte(255));
    roundtrip(Type::UINT16, &Value::Uint16(65535));
    roundtrip(Type::UINT32, &Value::Uint32(1 << 30));
    roundtrip(Type::UINT64, &Value::Uint64(u64::MAX));
    roundtrip(Type::INT16, &Value::Int16(-32768));
    roundtrip(Type::INT32, &Value::Int32(-1));
    roundtrip(Type::INT64, &Value::Int64(i64::MIN));
    roundtrip(Type::FLOAT32, &Value::Float32(1.25));
    roundtrip(Type::FLOAT64, &Value::Float64(-2.5e300));
    roundtrip(Type::COMPLEX64, &Value::Complex64 { re: 1.5, im: -2.0 });
    roundtrip(
        Type::COMPLEX128,
        &Value::Complex128 { re: 0.0, im: 3.25 },
    );
    roundtrip(Type::STRING, &Value::String(String::new()));
    roundtrip(Type::STRING, &Value::String("héllo, wörld".to_string()));
}

#[test]
fn named_scalars() {
    let celsius = Type::named("Celsius", Type::FLOAT64);
    roundtrip(celsius, &Value::Float64(37.5));
    let flag = Type::named("Flag", Type::BOOL);
    roundtrip(flag, &Value::Bool(true));
}

#[test]
fn enums() {
    let color = Type::enum_of("Color", &["Red", "Green", "Blue"]);
    roundtrip(color, &Value::Enum(0));
    roundtrip(color, &Value::Enum(2));
}

#[test]
fn sequences() {
    let ints = Type::list_of(Type::INT32);
    roundtrip(ints, &Value::List(vec![]));
    roundtrip(
        ints,
        &Value::List(vec![Value::Int32(1), Value::Int32(-2), Value::Int32(3)]),
    );

    let arr = Type::array_of(3, Type::STRING);
    roundtrip(
        arr,
        &Value::Array(vec![
            Value::String("a".into()),
            Value::String(String::new()),
            Value::String("c".into()),
        ]),
    );

    let bytes = Type::list_of(Type::BYTE);
    roundtrip(bytes, &Value::byte_list(b""));
    roundtrip(bytes, &Value::byte_list(b"\x00\x01\xfe\xff"));

    let byte_arr = Type::array_of(4, Type::BYTE);
    let bytes_value = Value::Array(b"\xde\xad\xbe\xef".iter().map(|b| Value::Byte(*b)).collect());
    roundtrip(byte_arr, &bytes_value);
}

#[test]
fn sets_and_maps() {
    let names = Type::set_of(Type::STRING);
    roundtrip(names, &Value::Set(vec![]));
    roundtrip(
        names,
        &Value::Set(vec![
            Value::String("a".into()),
            Value::String("b".into()),
        ]),
    );

    let ages = Type::map_of(Type::STRING, Type::INT32);
    roundtrip(ages, &Value::Map(vec![]));
    roundtrip(
        ages,
        &Value::Map(vec![
            (Value::String("ada".into()), Value::Int32(36)),
            (Value::String("grace".into()), Value::Int32(85)),
        ]),
    );
}

#[test]
fn structs() {
    let point = Type::struct_of("Point", &[("X", Type::INT64), ("Y", Type::INT64)]);
    roundtrip(point, &Value::zero_of(point));
    roundtrip(
        point,
        &Value::Struct(vec![Value::Int64(3), Value::Int64(-4)]),
    );

    let nested = Type::struct_of(
        "Line",
        &[("From", point), ("To", point), ("Label", Type::STRING)],
    );
    roundtrip(
        nested,
        &Value::Struct(vec![
            Value::Struct(vec![Value::Int64(0), Value::Int64(0)]),
            Value::Struct(vec![Value::Int64(1), Value::Int64(1)]),
            Value::String("diagonal".into()),
        ]),
    );
}

#[test]
fn unions() {
    let shape = Type::union_of(
        "Shape",
        &[("Radius", Type::FLOAT64), ("Side", Type::INT64)],
    );
    // Discriminated at index zero with a zero payload: the union's own
    // zero value.
    roundtrip(shape, &Value::zero_of(shape));
    roundtrip(
        shape,
        &Value::Union {
            index: 0,
            value: Box::new(Value::Float64(2.5)),
        },
    );
    roundtrip(
        shape,
        &Value::Union {
            index: 1,
            value: Box::new(Value::Int64(7)),
        },
    );
}

#[test]
fn optionals() {
    let opt = Type::optional_of(Type::STRING);
    roundtrip(opt, &Value::Optional(None));
    roundtrip(opt, &Value::some(Value::String("present".into())));

    let point = Type::struct_of("P", &[("X", Type::INT64)]);
    let opt_struct = Type::optional_of(point);
    roundtrip(opt_struct, &Value::some(Value::Struct(vec![Value::Int64(9)])));
}

#[test]
fn any_values() {
    roundtrip(Type::ANY, &Value::Any(None));
    roundtrip(Type::ANY, &Value::any(Type::INT64, Value::Int64(42)));
    roundtrip(
        Type::ANY,
        &Value::any(
            Type::list_of(Type::STRING),
            Value::List(vec![Value::String("x".into())]),
        ),
    );

    // An any-typed struct field carrying a dynamically-typed payload.
    let holder = Type::struct_of("Holder", &[("Item", Type::ANY)]);
    roundtrip(
        holder,
        &Value::Struct(vec![Value::any(Type::BOOL, Value::Bool(true))]),
    );
}

#[test]
fn typeobjects() {
    roundtrip(Type::TYPEOBJECT, &Value::TypeObject(Type::ANY));
    roundtrip(Type::TYPEOBJECT, &Value::TypeObject(Type::INT64));
    let point = Type::struct_of("Pt", &[("X", Type::INT32)]);
    roundtrip(Type::TYPEOBJECT, &Value::TypeObject(point));
}

#[test]
fn self_referential_struct() {
    // Node struct { Value int64; Children []Node }
    let mut builder = TypeBuilder::new();
    let node_slot = builder.slot();
    let list_slot = builder.add(ProtoNode::list_of("", node_slot.into()));
    builder.fill(
        node_slot,
        ProtoNode::struct_of(
            "Node",
            vec![
                ("Value".to_string(), Type::INT64.into()),
                ("Children".to_string(), list_slot.into()),
            ],
        ),
    );
    let built = builder.build().unwrap();
    let node = built[0];

    let leaf = |v: i64| Value::Struct(vec![Value::Int64(v), Value::List(vec![])]);
    let tree = Value::Struct(vec![
        Value::Int64(1),
        Value::List(vec![leaf(2), leaf(3)]),
    ]);
    roundtrip(node, &tree);
}

#[test]
fn several_values_share_one_stream() {
    let point = Type::struct_of("Point", &[("X", Type::INT64), ("Y", Type::INT64)]);
    let a = Value::Struct(vec![Value::Int64(1), Value::Int64(2)]);
    let b = Value::Struct(vec![Value::Int64(3), Value::Int64(4)]);

    let mut encoder = Encoder::new();
    encoder.encode(point, &a).unwrap();
    encoder.encode(point, &b).unwrap();
    encoder.encode(Type::STRING, &Value::String("tail".into())).unwrap();

    let mut decoder = Decoder::new(encoder.into_bytes());
    assert_eq!(decoder.decode(point).unwrap(), a);
    assert_eq!(decoder.decode(point).unwrap(), b);
    assert_eq!(
        decoder.decode(Type::STRING).unwrap(),
        Value::String("tail".into())
    );
}

#[test]
fn dynamic_decode_recovers_the_wire_type() {
    let point = Type::struct_of("Point", &[("X", Type::INT64), ("Y", Type::INT64)]);
    let value = Value::Struct(vec![Value::Int64(5), Value::Int64(6)]);

    let mut encoder = Encoder::new();
    encoder.encode(point, &value).unwrap();
    let mut decoder = Decoder::new(encoder.into_bytes());
    let (ty, decoded) = decoder.decode_dynamic().unwrap();
    assert_eq!(ty, point);
    assert_eq!(decoded, value);
}
