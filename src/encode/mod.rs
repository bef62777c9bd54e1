//! Encode typed values into a self-describing binary stream.
//!
//! An [`Encoder`] owns one output stream and the type-ID table scoped to
//! it. The first time a type is seen, its definition is emitted as its own
//! message (negative ID) ahead of the value message that references it;
//! later encodes of the same type reuse the cached ID.

mod compound;
mod scalar;

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::bootstrap::{self, TypeId, FIRST_USER_ID, MAGIC};
use crate::error::EncodeError;
use crate::kind::Kind;
use crate::primitives::{encode_int, encode_uint};
use crate::types::Type;
use crate::value::Value;

/// Encodes values onto one binary stream. Not shareable: the type-ID table
/// is scoped to this instance and grows monotonically for its lifetime.
pub struct Encoder {
    out: BytesMut,
    ids: HashMap<Type, TypeId>,
    next_id: u64,
    magic_written: bool,
}

impl Encoder {
    pub fn new() -> Encoder {
        Encoder {
            out: BytesMut::new(),
            ids: HashMap::new(),
            next_id: FIRST_USER_ID.0,
            magic_written: false,
        }
    }

    /// Encode one value of type `ty`, emitting any type definitions it
    /// needs first.
    pub fn encode(&mut self, ty: Type, value: &Value) -> Result<(), EncodeError> {
        self.ensure_magic();
        let id = self.type_id(ty)?;
        let mut body = BytesMut::new();
        write_value(self, &mut body, ty, value)?;
        self.write_message(id.0 as i64, bootstrap::has_binary_msg_len(ty), &body);
        Ok(())
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Consume the encoder and return the finished stream.
    pub fn into_bytes(self) -> Bytes {
        self.out.freeze()
    }

    fn ensure_magic(&mut self) {
        if !self.magic_written {
            self.out.put_u8(MAGIC);
            self.magic_written = true;
        }
    }

    fn write_message(&mut self, id: i64, has_len: bool, body: &[u8]) {
        encode_int(&mut self.out, id);
        if has_len {
            encode_uint(&mut self.out, body.len() as u64);
        }
        self.out.put_slice(body);
    }

    /// Resolve the stream-local ID for `ty`, defining it on the wire first
    /// if this is the first time the stream has seen it.
    pub(crate) fn type_id(&mut self, ty: Type) -> Result<TypeId, EncodeError> {
        if let Some(id) = bootstrap::bootstrap_id(ty) {
            return Ok(id);
        }
        if let Some(id) = self.ids.get(&ty) {
            return Ok(*id);
        }
        let id = TypeId(self.next_id);
        self.next_id += 1;
        // Cache before recursing so self-referential types terminate.
        self.ids.insert(ty, id);
        let def = self.lower(ty)?;
        let mut body = BytesMut::new();
        write_value(self, &mut body, bootstrap::WIRE_TYPE, &def)?;
        self.write_message(-(id.0 as i64), true, &body);
        Ok(id)
    }

    /// Lower a type to the wire descriptor value defining it, resolving
    /// (and thereby emitting) every sub-type it references.
    fn lower(&mut self, ty: Type) -> Result<Value, EncodeError> {
        let name = Value::String(ty.name());
        let (tag, payload) = match ty.kind() {
            Kind::Enum => {
                let labels = ty.labels().into_iter().map(Value::String).collect();
                (
                    bootstrap::WIRE_TYPE_ENUM,
                    vec![name, Value::List(labels)],
                )
            }
            Kind::Array => {
                let elem = self.sub_type_id(ty.elem(), ty)?;
                (
                    bootstrap::WIRE_TYPE_ARRAY,
                    vec![name, elem, Value::Uint64(ty.len() as u64)],
                )
            }
            Kind::List => {
                let elem = self.sub_type_id(ty.elem(), ty)?;
                (bootstrap::WIRE_TYPE_LIST, vec![name, elem])
            }
            Kind::Set => {
                let key = self.sub_type_id(ty.key(), ty)?;
                (bootstrap::WIRE_TYPE_SET, vec![name, key])
            }
            Kind::Map => {
                let key = self.sub_type_id(ty.key(), ty)?;
                let elem = self.sub_type_id(ty.elem(), ty)?;
                (bootstrap::WIRE_TYPE_MAP, vec![name, key, elem])
            }
            Kind::Struct | Kind::Union => {
                let mut fields = Vec::new();
                for field in ty.fields() {
                    let id = self.type_id(field.ty)?;
                    fields.push(Value::Struct(vec![
                        Value::String(field.name),
                        Value::Uint64(id.0),
                    ]));
                }
                let tag = if ty.kind() == Kind::Struct {
                    bootstrap::WIRE_TYPE_STRUCT
                } else {
                    bootstrap::WIRE_TYPE_UNION
                };
                (tag, vec![name, Value::List(fields)])
            }
            Kind::Optional => {
                let elem = self.sub_type_id(ty.elem(), ty)?;
                (bootstrap::WIRE_TYPE_OPTIONAL, vec![name, elem])
            }
            kind => {
                // A named scalar: the base is the unnamed type of its kind.
                if !ty.is_named() {
                    return Err(EncodeError::new(format!(
                        "type {ty} has no wire definition"
                    )));
                }
                let base = bootstrap::primitive_type(kind)
                    .and_then(bootstrap::bootstrap_id)
                    .ok_or_else(|| {
                        EncodeError::new(format!("type {ty} has no wire definition"))
                    })?;
                (
                    bootstrap::WIRE_TYPE_NAMED,
                    vec![name, Value::Uint64(base.0)],
                )
            }
        };
        Ok(Value::Union {
            index: tag,
            value: Box::new(Value::Struct(payload)),
        })
    }

    fn sub_type_id(&mut self, sub: Option<Type>, parent: Type) -> Result<Value, EncodeError> {
        let sub = sub.ok_or_else(|| {
            EncodeError::new(format!("type {parent} is missing a sub-type"))
        })?;
        Ok(Value::Uint64(self.type_id(sub)?.0))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new()
    }
}

/// Write one value's body, dispatching on its declared kind. Returns
/// whether the value is non-zero, which struct encoding uses for elision.
pub(crate) fn write_value(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    match ty.kind() {
        Kind::Bool => scalar::write_bool(buf, ty, value),
        Kind::Byte => scalar::write_byte(buf, ty, value),
        Kind::Uint16 | Kind::Uint32 | Kind::Uint64 => scalar::write_uint(buf, ty, value),
        Kind::Int16 | Kind::Int32 | Kind::Int64 => scalar::write_int(buf, ty, value),
        Kind::Float32 | Kind::Float64 => scalar::write_float(buf, ty, value),
        Kind::Complex64 | Kind::Complex128 => scalar::write_complex(buf, ty, value),
        Kind::String => scalar::write_string(buf, ty, value),
        Kind::Enum => scalar::write_enum(buf, ty, value),
        Kind::TypeObject => scalar::write_typeobject(enc, buf, ty, value),
        Kind::Array => compound::write_array(enc, buf, ty, value),
        Kind::List => compound::write_list(enc, buf, ty, value),
        Kind::Set => compound::write_set(enc, buf, ty, value),
        Kind::Map => compound::write_map(enc, buf, ty, value),
        Kind::Struct => compound::write_struct(enc, buf, ty, value),
        Kind::Union => compound::write_union(enc, buf, ty, value),
        Kind::Optional => compound::write_optional(enc, buf, ty, value),
        Kind::Any => compound::write_any(enc, buf, value),
    }
}

/// A value whose runtime representation does not match its declared kind.
#[cold]
pub(crate) fn unsupported(ty: Type, value: &Value) -> EncodeError {
    EncodeError::new(format!(
        "unsupported value for {} type {ty}: {} {value:?}",
        ty.kind(),
        value.variant_name(),
    ))
}
