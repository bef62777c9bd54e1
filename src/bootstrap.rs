//! Wire constants shared by every compatible peer: the stream magic byte,
//! the control sentinels, and the bootstrap type-ID table.
//!
//! The format is self-describing: the descriptors used to define new types
//! on the wire are themselves types with well-known IDs, seeded into the
//! arena at startup. Interoperating with another implementation requires
//! reproducing this table byte-for-byte.

use crate::kind::Kind;
use crate::types::{Field, Node, Type};

/// First byte of every stream.
pub const MAGIC: u8 = 0x80;

/// Control byte marking an absent optional or any value.
pub const CTRL_NIL: u8 = 0xE0;

/// Control byte terminating a struct body.
pub const CTRL_END: u8 = 0xE1;

/// A stream-local type identifier. IDs below [`FIRST_USER_ID`] are
/// reserved for the bootstrap table; the rest are allocated sequentially
/// by one encoder or decoder and are meaningless outside that stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(pub u64);

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// The first type ID an encoder or decoder may assign to a user type.
pub const FIRST_USER_ID: TypeId = TypeId(41);

// Bootstrap arena handles. `seed` must publish nodes in exactly this order.
impl Type {
    pub const BOOL: Type = Type(0);
    pub const BYTE: Type = Type(1);
    pub const STRING: Type = Type(2);
    pub const UINT16: Type = Type(3);
    pub const UINT32: Type = Type(4);
    pub const UINT64: Type = Type(5);
    pub const INT16: Type = Type(6);
    pub const INT32: Type = Type(7);
    pub const INT64: Type = Type(8);
    pub const FLOAT32: Type = Type(9);
    pub const FLOAT64: Type = Type(10);
    pub const COMPLEX64: Type = Type(11);
    pub const COMPLEX128: Type = Type(12);
    pub const TYPEOBJECT: Type = Type(13);
    pub const ANY: Type = Type(14);
}

/// The named uint64 carrying type references inside wire descriptors.
pub(crate) const TYPE_ID: Type = Type(15);
pub(crate) const BYTE_LIST: Type = Type(16);
pub(crate) const STRING_LIST: Type = Type(17);
pub(crate) const TYPE_ID_LIST: Type = Type(18);
pub(crate) const WIRE_FIELD: Type = Type(19);
pub(crate) const WIRE_FIELD_LIST: Type = Type(20);
pub(crate) const WIRE_NAMED: Type = Type(21);
pub(crate) const WIRE_ENUM: Type = Type(22);
pub(crate) const WIRE_ARRAY: Type = Type(23);
pub(crate) const WIRE_LIST: Type = Type(24);
pub(crate) const WIRE_SET: Type = Type(25);
pub(crate) const WIRE_MAP: Type = Type(26);
pub(crate) const WIRE_STRUCT: Type = Type(27);
pub(crate) const WIRE_UNION: Type = Type(28);
pub(crate) const WIRE_OPTIONAL: Type = Type(29);

/// The implicit union a type-definition message body is decoded against.
/// It has no wire ID of its own: both peers already know its shape.
pub(crate) const WIRE_TYPE: Type = Type(30);

/// Discriminant order of [`WIRE_TYPE`]; fixed by the format.
pub(crate) const WIRE_TYPE_NAMED: usize = 0;
pub(crate) const WIRE_TYPE_ENUM: usize = 1;
pub(crate) const WIRE_TYPE_ARRAY: usize = 2;
pub(crate) const WIRE_TYPE_LIST: usize = 3;
pub(crate) const WIRE_TYPE_SET: usize = 4;
pub(crate) const WIRE_TYPE_MAP: usize = 5;
pub(crate) const WIRE_TYPE_STRUCT: usize = 6;
pub(crate) const WIRE_TYPE_UNION: usize = 7;
pub(crate) const WIRE_TYPE_OPTIONAL: usize = 8;

/// The fixed wire-ID table. Every compatible peer shares this mapping.
const BOOTSTRAP: &[(TypeId, Type)] = &[
    (TypeId(1), Type::BOOL),
    (TypeId(2), Type::BYTE),
    (TypeId(3), Type::STRING),
    (TypeId(4), Type::UINT16),
    (TypeId(5), Type::UINT32),
    (TypeId(6), Type::UINT64),
    (TypeId(7), Type::INT16),
    (TypeId(8), Type::INT32),
    (TypeId(9), Type::INT64),
    (TypeId(10), Type::FLOAT32),
    (TypeId(11), Type::FLOAT64),
    (TypeId(12), Type::COMPLEX64),
    (TypeId(13), Type::COMPLEX128),
    (TypeId(14), Type::TYPEOBJECT),
    (TypeId(15), Type::ANY),
    (TypeId(16), WIRE_NAMED),
    (TypeId(17), WIRE_ENUM),
    (TypeId(18), WIRE_ARRAY),
    (TypeId(19), WIRE_LIST),
    (TypeId(20), WIRE_SET),
    (TypeId(21), WIRE_MAP),
    (TypeId(22), WIRE_STRUCT),
    (TypeId(23), WIRE_FIELD),
    (TypeId(24), WIRE_FIELD_LIST),
    (TypeId(25), WIRE_UNION),
    (TypeId(26), WIRE_OPTIONAL),
    (TypeId(27), BYTE_LIST),
    (TypeId(28), STRING_LIST),
    (TypeId(29), TYPE_ID_LIST),
];

/// Resolve a bootstrap wire ID to its type.
pub(crate) fn bootstrap_type(id: TypeId) -> Option<Type> {
    BOOTSTRAP.iter().find(|(bid, _)| *bid == id).map(|(_, t)| *t)
}

/// Resolve a type to its bootstrap wire ID, by structural comparison.
pub(crate) fn bootstrap_id(ty: Type) -> Option<TypeId> {
    BOOTSTRAP.iter().find(|(_, bt)| *bt == ty).map(|(id, _)| *id)
}

/// The unnamed type of a scalar kind, used as the base of named scalars.
pub(crate) fn primitive_type(kind: Kind) -> Option<Type> {
    Some(match kind {
        Kind::Bool => Type::BOOL,
        Kind::Byte => Type::BYTE,
        Kind::String => Type::STRING,
        Kind::Uint16 => Type::UINT16,
        Kind::Uint32 => Type::UINT32,
        Kind::Uint64 => Type::UINT64,
        Kind::Int16 => Type::INT16,
        Kind::Int32 => Type::INT32,
        Kind::Int64 => Type::INT64,
        Kind::Float32 => Type::FLOAT32,
        Kind::Float64 => Type::FLOAT64,
        Kind::Complex64 => Type::COMPLEX64,
        Kind::Complex128 => Type::COMPLEX128,
        Kind::TypeObject => Type::TYPEOBJECT,
        Kind::Any => Type::ANY,
        _ => return None,
    })
}

/// Whether a value message of this type carries an explicit body length.
/// Fixed-size and byte-string-like payloads delimit themselves; everything
/// variable-shaped is length-prefixed.
pub(crate) fn has_binary_msg_len(ty: Type) -> bool {
    match ty.kind() {
        Kind::Any
        | Kind::Complex64
        | Kind::Complex128
        | Kind::Map
        | Kind::Optional
        | Kind::Set
        | Kind::Struct
        | Kind::Union => true,
        Kind::Array | Kind::List => ty
            .elem()
            .map(|e| e.kind() != Kind::Byte)
            .unwrap_or(false),
        _ => false,
    }
}

fn list_node(name: &str, elem: Type) -> Node {
    let mut node = Node::scalar(Kind::List, name);
    node.elem = Some(elem);
    node
}

fn struct_node(name: &str, fields: &[(&str, Type)]) -> Node {
    let mut node = Node::scalar(Kind::Struct, name);
    node.fields = fields
        .iter()
        .map(|(fname, ty)| Field {
            name: fname.to_string(),
            ty: *ty,
        })
        .collect();
    node
}

/// The bootstrap nodes, in the exact order the handle constants above
/// assume. Called once to seed the global arena.
pub(crate) fn seed() -> Vec<Node> {
    let type_id = Node::scalar(Kind::Uint64, "typeId");

    let mut wire_type = Node::scalar(Kind::Union, "wireType");
    wire_type.fields = [
        ("NamedT", WIRE_NAMED),
        ("EnumT", WIRE_ENUM),
        ("ArrayT", WIRE_ARRAY),
        ("ListT", WIRE_LIST),
        ("SetT", WIRE_SET),
        ("MapT", WIRE_MAP),
        ("StructT", WIRE_STRUCT),
        ("UnionT", WIRE_UNION),
        ("OptionalT", WIRE_OPTIONAL),
    ]
    .iter()
    .map(|(name, ty)| Field {
        name: name.to_string(),
        ty: *ty,
    })
    .collect();

    vec![
        Node::scalar(Kind::Bool, ""),
        Node::scalar(Kind::Byte, ""),
        Node::scalar(Kind::String, ""),
        Node::scalar(Kind::Uint16, ""),
        Node::scalar(Kind::Uint32, ""),
        Node::scalar(Kind::Uint64, ""),
        Node::scalar(Kind::Int16, ""),
        Node::scalar(Kind::Int32, ""),
        Node::scalar(Kind::Int64, ""),
        Node::scalar(Kind::Float32, ""),
        Node::scalar(Kind::Float64, ""),
        Node::scalar(Kind::Complex64, ""),
        Node::scalar(Kind::Complex128, ""),
        Node::scalar(Kind::TypeObject, ""),
        Node::scalar(Kind::Any, ""),
        type_id,
        list_node("", Type::BYTE),
        list_node("", Type::STRING),
        list_node("", TYPE_ID),
        struct_node("wireField", &[("Name", Type::STRING), ("Type", TYPE_ID)]),
        list_node("", WIRE_FIELD),
        struct_node("wireNamed", &[("Name", Type::STRING), ("Base", TYPE_ID)]),
        struct_node("wireEnum", &[("Name", Type::STRING), ("Labels", STRING_LIST)]),
        struct_node(
            "wireArray",
            &[
                ("Name", Type::STRING),
                ("Elem", TYPE_ID),
                ("Len", Type::UINT64),
            ],
        ),
        struct_node("wireList", &[("Name", Type::STRING), ("Elem", TYPE_ID)]),
        struct_node("wireSet", &[("Name", Type::STRING), ("Key", TYPE_ID)]),
        struct_node(
            "wireMap",
            &[
                ("Name", Type::STRING),
                ("Key", TYPE_ID),
                ("Elem", TYPE_ID),
            ],
        ),
        struct_node(
            "wireStruct",
            &[("Name", Type::STRING), ("Fields", WIRE_FIELD_LIST)],
        ),
        struct_node(
            "wireUnion",
            &[("Name", Type::STRING), ("Fields", WIRE_FIELD_LIST)],
        ),
        struct_node("wireOptional", &[("Name", Type::STRING), ("Elem", TYPE_ID)]),
        wire_type,
    ]
}
