//! The dynamic runtime value, the uniform currency between the codec and
//! the invoker. A `Value` is always interpreted relative to a [`Type`]:
//! struct fields are positional against the type's field order, enum values
//! are label indices, and union values carry their discriminant index.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::kind::Kind;
use crate::types::Type;

#[derive(Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Complex64 { re: f32, im: f32 },
    Complex128 { re: f64, im: f64 },
    String(String),
    /// Label index into the type's label list.
    Enum(usize),
    Array(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    /// Entries in iteration order; the order carries no meaning but stays
    /// stable within one encode call.
    Map(Vec<(Value, Value)>),
    /// Field values positional against the type's field order.
    Struct(Vec<Value>),
    Union { index: usize, value: Box<Value> },
    Optional(Option<Box<Value>>),
    /// A dynamically-typed value, or `None` for any-null.
    Any(Option<Box<(Type, Value)>>),
    TypeObject(Type),
}

impl Value {
    /// The canonical zero value of `ty`: empty collections, absent
    /// optionals, a union discriminated at index zero with a zero payload.
    pub fn zero_of(ty: Type) -> Value {
        match ty.kind() {
            Kind::Bool => Value::Bool(false),
            Kind::Byte => Value::Byte(0),
            Kind::Uint16 => Value::Uint16(0),
            Kind::Uint32 => Value::Uint32(0),
            Kind::Uint64 => Value::Uint64(0),
            Kind::Int16 => Value::Int16(0),
            Kind::Int32 => Value::Int32(0),
            Kind::Int64 => Value::Int64(0),
            Kind::Float32 => Value::Float32(0.0),
            Kind::Float64 => Value::Float64(0.0),
            Kind::Complex64 => Value::Complex64 { re: 0.0, im: 0.0 },
            Kind::Complex128 => Value::Complex128 { re: 0.0, im: 0.0 },
            Kind::String => Value::String(String::new()),
            Kind::Enum => Value::Enum(0),
            Kind::Array => {
                let elem = ty.elem().map(Value::zero_of);
                Value::Array(match elem {
                    Some(zero) => vec![zero; ty.len()],
                    None => Vec::new(),
                })
            }
            Kind::List => Value::List(Vec::new()),
            Kind::Set => Value::Set(Vec::new()),
            Kind::Map => Value::Map(Vec::new()),
            Kind::Struct => {
                Value::Struct(ty.fields().iter().map(|f| Value::zero_of(f.ty)).collect())
            }
            Kind::Union => {
                let payload = ty
                    .fields()
                    .first()
                    .map(|f| Value::zero_of(f.ty))
                    .unwrap_or(Value::Bool(false));
                Value::Union {
                    index: 0,
                    value: Box::new(payload),
                }
            }
            Kind::Optional => Value::Optional(None),
            Kind::Any => Value::Any(None),
            Kind::TypeObject => Value::TypeObject(Type::ANY),
        }
    }

    /// The name of this value's runtime variant, for error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Uint16(_) => "uint16",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Complex64 { .. } => "complex64",
            Value::Complex128 { .. } => "complex128",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Union { .. } => "union",
            Value::Optional(_) => "optional",
            Value::Any(_) => "any",
            Value::TypeObject(_) => "typeobject",
        }
    }

    /// Convenience for building a list of bytes from a slice.
    pub fn byte_list(bytes: &[u8]) -> Value {
        Value::List(bytes.iter().map(|b| Value::Byte(*b)).collect())
    }

    /// Convenience for wrapping a value in a present optional.
    pub fn some(value: Value) -> Value {
        Value::Optional(Some(Box::new(value)))
    }

    /// Convenience for wrapping a dynamically-typed value.
    pub fn any(ty: Type, value: Value) -> Value {
        Value::Any(Some(Box::new((ty, value))))
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::Bool(v) => Debug::fmt(v, f),
            Value::Byte(v) => write!(f, "{v}b"),
            Value::Uint16(v) => Debug::fmt(v, f),
            Value::Uint32(v) => Debug::fmt(v, f),
            Value::Uint64(v) => Debug::fmt(v, f),
            Value::Int16(v) => Debug::fmt(v, f),
            Value::Int32(v) => Debug::fmt(v, f),
            Value::Int64(v) => Debug::fmt(v, f),
            Value::Float32(v) => Debug::fmt(v, f),
            Value::Float64(v) => Debug::fmt(v, f),
            Value::Complex64 { re, im } => write!(f, "({re}+{im}i)"),
            Value::Complex128 { re, im } => write!(f, "({re}+{im}i)"),
            Value::String(v) => Debug::fmt(v, f),
            Value::Enum(i) => write!(f, "enum#{i}"),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Set(items) => f.debug_set().entries(items).finish(),
            Value::Map(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            Value::Struct(fields) => f.debug_list().entries(fields).finish(),
            Value::Union { index, value } => write!(f, "union#{index}({value:?})"),
            Value::Optional(None) => f.write_str("nil"),
            Value::Optional(Some(v)) => write!(f, "some({v:?})"),
            Value::Any(None) => f.write_str("any(nil)"),
            Value::Any(Some(tv)) => write!(f, "any({}, {:?})", tv.0, tv.1),
            Value::TypeObject(t) => write!(f, "typeobject({t})"),
        }
    }
}
