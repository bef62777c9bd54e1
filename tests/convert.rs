//! Decoding under a target representation that differs from the wire type.

use vom::{DecodeFault, Decoder, Encoder, Type, Value};

fn encode_one(ty: Type, value: &Value) -> bytes::Bytes {
    let mut encoder = Encoder::new();
    encoder.encode(ty, value).unwrap();
    encoder.into_bytes()
}

fn decode_as(ty: Type, value: &Value, target: Type) -> Result<Value, vom::DecodeError> {
    Decoder::new(encode_one(ty, value)).decode(target)
}

#[test]
fn widening_numbers() {
    assert_eq!(
        decode_as(Type::INT32, &Value::Int32(-7), Type::INT64).unwrap(),
        Value::Int64(-7)
    );
    assert_eq!(
        decode_as(Type::BYTE, &Value::Byte(200), Type::UINT32).unwrap(),
        Value::Uint32(200)
    );
    assert_eq!(
        decode_as(Type::UINT16, &Value::Uint16(1000), Type::FLOAT64).unwrap(),
        Value::Float64(1000.0)
    );
}

#[test]
fn narrowing_numbers_when_lossless() {
    assert_eq!(
        decode_as(Type::INT64, &Value::Int64(255), Type::BYTE).unwrap(),
        Value::Byte(255)
    );
    assert_eq!(
        decode_as(Type::FLOAT64, &Value::Float64(12.0), Type::INT16).unwrap(),
        Value::Int16(12)
    );
}

#[test]
fn lossy_narrowing_is_a_conversion_error() {
    let err = decode_as(Type::INT64, &Value::Int64(256), Type::BYTE).unwrap_err();
    assert_eq!(err.fault(), DecodeFault::Incompatible);

    let err = decode_as(Type::FLOAT64, &Value::Float64(0.5), Type::INT64).unwrap_err();
    assert_eq!(err.fault(), DecodeFault::Incompatible);

    let err = decode_as(Type::INT32, &Value::Int32(-1), Type::UINT64).unwrap_err();
    assert_eq!(err.fault(), DecodeFault::Incompatible);
}

#[test]
fn incompatible_shapes_name_both_types() {
    let err = decode_as(Type::BOOL, &Value::Bool(true), Type::STRING).unwrap_err();
    assert_eq!(err.fault(), DecodeFault::Incompatible);
    let message = err.to_string();
    assert!(message.contains("bool"), "{message}");
    assert!(message.contains("string"), "{message}");
}

#[test]
fn strings_and_byte_lists_interconvert() {
    let bytes = Type::list_of(Type::BYTE);
    assert_eq!(
        decode_as(Type::STRING, &Value::String("abc".into()), bytes).unwrap(),
        Value::byte_list(b"abc")
    );
    assert_eq!(
        decode_as(bytes, &Value::byte_list(b"abc"), Type::STRING).unwrap(),
        Value::String("abc".into())
    );
}

#[test]
fn enums_and_strings_interconvert() {
    let color = Type::enum_of("Color", &["Red", "Green", "Blue"]);
    assert_eq!(
        decode_as(color, &Value::Enum(1), Type::STRING).unwrap(),
        Value::String("Green".into())
    );
    // A reordered enum on the receiving side matches by label, not index.
    let reordered = Type::enum_of("Color", &["Blue", "Green", "Red"]);
    assert_eq!(
        decode_as(color, &Value::Enum(2), reordered).unwrap(),
        Value::Enum(0)
    );
    let other = Type::enum_of("Color", &["Cyan"]);
    assert!(decode_as(color, &Value::Enum(0), other).is_err());
}

#[test]
fn maps_decode_into_structs() {
    let wire = Type::map_of(Type::STRING, Type::INT64);
    let target = Type::struct_of("Point", &[("X", Type::INT64), ("Y", Type::INT64)]);
    let value = Value::Map(vec![
        (Value::String("Y".into()), Value::Int64(4)),
        (Value::String("X".into()), Value::Int64(3)),
        // Keys with no matching field are dropped.
        (Value::String("Z".into()), Value::Int64(9)),
    ]);
    assert_eq!(
        decode_as(wire, &value, target).unwrap(),
        Value::Struct(vec![Value::Int64(3), Value::Int64(4)])
    );
}

#[test]
fn sets_decode_into_bool_structs() {
    let wire = Type::set_of(Type::STRING);
    let target = Type::struct_of("Flags", &[("A", Type::BOOL), ("B", Type::BOOL)]);
    let value = Value::Set(vec![Value::String("B".into())]);
    assert_eq!(
        decode_as(wire, &value, target).unwrap(),
        Value::Struct(vec![Value::Bool(false), Value::Bool(true)])
    );
}

#[test]
fn bool_maps_and_sets_interconvert() {
    let map = Type::map_of(Type::STRING, Type::BOOL);
    let set = Type::set_of(Type::STRING);
    let value = Value::Map(vec![
        (Value::String("on".into()), Value::Bool(true)),
        (Value::String("off".into()), Value::Bool(false)),
    ]);
    assert_eq!(
        decode_as(map, &value, set).unwrap(),
        Value::Set(vec![Value::String("on".into())])
    );
    assert_eq!(
        decode_as(set, &Value::Set(vec![Value::String("k".into())]), map).unwrap(),
        Value::Map(vec![(Value::String("k".into()), Value::Bool(true))])
    );
}

#[test]
fn struct_schema_evolution() {
    let wire = Type::struct_of(
        "V2",
        &[
            ("Name", Type::STRING),
            ("Age", Type::INT32),
            ("Extra", Type::STRING),
        ],
    );
    // The receiver's older struct lacks Extra and keeps a field of its own.
    let target = Type::struct_of(
        "V1",
        &[("Age", Type::INT64), ("Name", Type::STRING), ("Local", Type::BOOL)],
    );
    let value = Value::Struct(vec![
        Value::String("ada".into()),
        Value::Int32(36),
        Value::String("dropped".into()),
    ]);
    assert_eq!(
        decode_as(wire, &value, target).unwrap(),
        Value::Struct(vec![
            Value::Int64(36),
            Value::String("ada".into()),
            Value::Bool(false),
        ])
    );
}

#[test]
fn unions_match_variants_by_name() {
    let wire = Type::union_of("U", &[("A", Type::INT32), ("B", Type::STRING)]);
    let target = Type::union_of("U", &[("B", Type::STRING), ("A", Type::INT64)]);
    let value = Value::Union {
        index: 0,
        value: Box::new(Value::Int32(5)),
    };
    assert_eq!(
        decode_as(wire, &value, target).unwrap(),
        Value::Union {
            index: 1,
            value: Box::new(Value::Int64(5)),
        }
    );

    let missing = Type::union_of("U", &[("B", Type::STRING)]);
    let err = decode_as(wire, &value, missing).unwrap_err();
    assert_eq!(err.fault(), DecodeFault::Incompatible);
}

#[test]
fn optionals_wrap_and_unwrap() {
    let opt = Type::optional_of(Type::INT32);
    // Non-optional wire into an optional target wraps.
    assert_eq!(
        decode_as(Type::INT32, &Value::Int32(3), opt).unwrap(),
        Value::some(Value::Int32(3))
    );
    // Present optional wire into a plain target unwraps.
    assert_eq!(
        decode_as(opt, &Value::some(Value::Int32(3)), Type::INT64).unwrap(),
        Value::Int64(3)
    );
    // Nil into a non-optional target cannot be represented.
    let err = decode_as(opt, &Value::Optional(None), Type::INT64).unwrap_err();
    assert_eq!(err.fault(), DecodeFault::Incompatible);
}

#[test]
fn arrays_and_lists_interconvert() {
    let arr = Type::array_of(3, Type::INT32);
    let list = Type::list_of(Type::INT64);
    let value = Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
    assert_eq!(
        decode_as(arr, &value, list).unwrap(),
        Value::List(vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)])
    );

    // A list longer than the target array is a conversion error.
    let short = Type::array_of(1, Type::INT32);
    let long = Value::List(vec![Value::Int64(1), Value::Int64(2)]);
    let err = decode_as(list, &long, short).unwrap_err();
    assert_eq!(err.fault(), DecodeFault::Incompatible);
}

#[test]
fn any_wire_values_convert_to_concrete_targets() {
    let value = Value::any(Type::INT32, Value::Int32(11));
    assert_eq!(
        decode_as(Type::ANY, &value, Type::INT64).unwrap(),
        Value::Int64(11)
    );
    let err = decode_as(Type::ANY, &value, Type::STRING).unwrap_err();
    assert_eq!(err.fault(), DecodeFault::Incompatible);
}
