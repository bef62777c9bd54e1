//! The closed set of wire kinds a type can have.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// The shape of a type, independent of any host-language representation.
///
/// Every [`Type`](crate::types::Type) has exactly one kind; composite kinds
/// additionally carry sub-types, labels, lengths, or fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Byte,
    Uint16,
    Uint32,
    Uint64,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    Enum,
    Array,
    List,
    Set,
    Map,
    Struct,
    Union,
    Optional,
    Any,
    TypeObject,
}

impl Kind {
    /// Whether values of this kind are plain numbers
    /// (and therefore convertible between each other when lossless).
    pub fn is_number(self) -> bool {
        matches!(
            self,
            Kind::Byte
                | Kind::Uint16
                | Kind::Uint32
                | Kind::Uint64
                | Kind::Int16
                | Kind::Int32
                | Kind::Int64
                | Kind::Float32
                | Kind::Float64
        )
    }

    /// Whether this kind carries no sub-types, labels, or fields.
    pub fn is_scalar(self) -> bool {
        !matches!(
            self,
            Kind::Enum
                | Kind::Array
                | Kind::List
                | Kind::Set
                | Kind::Map
                | Kind::Struct
                | Kind::Union
                | Kind::Optional
        )
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Kind::Bool => "bool",
            Kind::Byte => "byte",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::String => "string",
            Kind::Enum => "enum",
            Kind::Array => "array",
            Kind::List => "list",
            Kind::Set => "set",
            Kind::Map => "map",
            Kind::Struct => "struct",
            Kind::Union => "union",
            Kind::Optional => "optional",
            Kind::Any => "any",
            Kind::TypeObject => "typeobject",
        })
    }
}
