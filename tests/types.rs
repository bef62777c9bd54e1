//! Structural type identity and out-of-order type-definition decoding.

use std::collections::HashMap;

use bytes::{Buf, Bytes};

use vom::primitives::{decode_int, decode_uint};
use vom::{Decoder, Encoder, ProtoNode, Type, TypeBuilder, Value};

/// Node struct { Value int64; Children []Node }, built fresh each call so
/// two calls yield distinct arena handles with identical structure.
fn tree_type() -> Type {
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
    builder.build().unwrap()[0]
}

/// Mutually recursive A struct { B []B } and B struct { A []A }.
fn mutual_types() -> (Type, Type) {
    let mut builder = TypeBuilder::new();
    let a_slot = builder.slot();
    let b_slot = builder.slot();
    let list_b = builder.add(ProtoNode::list_of("", b_slot.into()));
    let list_a = builder.add(ProtoNode::list_of("", a_slot.into()));
    builder.fill(
        a_slot,
        ProtoNode::struct_of("A", vec![("B".to_string(), list_b.into())]),
    );
    builder.fill(
        b_slot,
        ProtoNode::struct_of("B", vec![("A".to_string(), list_a.into())]),
    );
    let built = builder.build().unwrap();
    (built[0], built[1])
}

#[test]
fn equality_is_structural() {
    assert_eq!(Type::list_of(Type::INT32), Type::list_of(Type::INT32));
    assert_ne!(Type::list_of(Type::INT32), Type::list_of(Type::INT64));
    assert_ne!(
        Type::struct_of("S", &[("A", Type::BOOL)]),
        Type::struct_of("T", &[("A", Type::BOOL)])
    );
}

#[test]
fn cyclic_equality_terminates() {
    let first = tree_type();
    let second = tree_type();
    assert_eq!(first, second);

    let (a1, b1) = mutual_types();
    let (a2, b2) = mutual_types();
    assert_eq!(a1, a2);
    assert_eq!(b1, b2);
    assert_ne!(a1, b1);
}

#[test]
fn equal_types_hash_alike() {
    let mut ids: HashMap<Type, u32> = HashMap::new();
    ids.insert(tree_type(), 7);
    // A structurally identical handle must find the same entry.
    assert_eq!(ids.get(&tree_type()), Some(&7));
}

#[test]
fn display_names_named_types() {
    assert_eq!(tree_type().to_string(), "Node");
    assert_eq!(Type::list_of(Type::INT32).to_string(), "[]int32");
    assert_eq!(
        Type::map_of(Type::STRING, Type::BOOL).to_string(),
        "map[string]bool"
    );
    assert_eq!(Type::optional_of(Type::STRING).to_string(), "?string");
}

/// Split an encoded stream into its type-definition messages and the final
/// value message, so tests can reorder definitions at the byte level.
fn split_messages(stream: &[u8]) -> (Vec<Vec<u8>>, Vec<u8>) {
    assert_eq!(stream[0], 0x80, "stream magic");
    let body = &stream[1..];
    let mut rest = Bytes::copy_from_slice(body);
    let mut defs = Vec::new();
    loop {
        let before = rest.len();
        let id = decode_int(&mut rest).unwrap();
        let start = body.len() - before;
        if id < 0 {
            let len = decode_uint(&mut rest).unwrap() as usize;
            let header = before - rest.len();
            defs.push(body[start..start + header + len].to_vec());
            rest.advance(len);
        } else {
            return (defs, body[start..].to_vec());
        }
    }
}

#[test]
fn definitions_decode_in_either_order() {
    let (a, _b) = mutual_types();
    let value = Value::Struct(vec![Value::List(vec![Value::Struct(vec![Value::List(
        vec![],
    )])])]);

    let mut encoder = Encoder::new();
    encoder.encode(a, &value).unwrap();
    let stream = encoder.into_bytes();

    let (defs, value_msg) = split_messages(&stream);
    assert!(defs.len() >= 2, "expected several type definitions");

    // Forward order, as encoded.
    let mut decoder = Decoder::new(stream.clone());
    let (ty_fwd, got_fwd) = decoder.decode_dynamic().unwrap();
    assert_eq!(got_fwd, value);

    // Reversed definition order: same value, structurally equal type.
    let mut reordered = vec![0x80];
    for def in defs.iter().rev() {
        reordered.extend_from_slice(def);
    }
    reordered.extend_from_slice(&value_msg);
    let mut decoder = Decoder::new(reordered);
    let (ty_rev, got_rev) = decoder.decode_dynamic().unwrap();
    assert_eq!(got_rev, value);
    assert_eq!(ty_fwd, ty_rev);
    assert_eq!(ty_fwd, a);
}

#[test]
fn type_definitions_are_emitted_once_per_stream() {
    let point = Type::struct_of("Point", &[("X", Type::INT64), ("Y", Type::INT64)]);
    let value = Value::Struct(vec![Value::Int64(1), Value::Int64(2)]);

    let mut encoder = Encoder::new();
    encoder.encode(point, &value).unwrap();
    let after_first = encoder.as_bytes().len();
    encoder.encode(point, &value).unwrap();
    let stream = encoder.into_bytes();

    let (defs, _) = split_messages(&stream[..after_first]);
    assert_eq!(defs.len(), 1, "one definition for the first encode");

    // The second encode appends no further definitions: every message in
    // the remainder has a positive id.
    let mut rest = Bytes::copy_from_slice(&stream[after_first..]);
    let id = decode_int(&mut rest).unwrap();
    assert!(id > 0, "second encode reuses the cached type id");
}

#[test]
fn unresolvable_type_ids_are_corrupt() {
    let point = Type::struct_of("Point", &[("X", Type::INT64), ("Y", Type::INT64)]);
    let value = Value::Struct(vec![Value::Int64(1), Value::Int64(2)]);
    let mut encoder = Encoder::new();
    encoder.encode(point, &value).unwrap();
    let stream = encoder.into_bytes();

    // Drop the definition message and keep only the value message.
    let (_defs, value_msg) = split_messages(&stream);
    let mut broken = vec![0x80];
    broken.extend_from_slice(&value_msg);
    let mut decoder = Decoder::new(broken);
    let err = decoder.decode(point).unwrap_err();
    assert_eq!(err.fault(), vom::DecodeFault::Corrupt);
    assert!(err.to_string().contains("undefined type id"), "{err}");
}
