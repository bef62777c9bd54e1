//! Decode a self-describing binary stream back into typed values.
//!
//! A [`Decoder`] owns one input stream and the type tables scoped to it.
//! The message loop consumes type-definition messages (negative IDs) into a
//! pending map until it reaches a value message; resolution of a pending ID
//! walks its full dependency closure first, so definitions may arrive in
//! any order and may reference each other cyclically.

mod compound;
mod scalar;
pub(crate) mod types;

use std::collections::HashMap;

use bytes::Bytes;

use crate::bootstrap::{self, TypeId, MAGIC, WIRE_TYPE};
use crate::convert::compatible;
use crate::error::DecodeError;
use crate::kind::Kind;
use crate::primitives::{decode_int, decode_uint, read_u8};
use crate::types::Type;
use crate::value::Value;

use types::WireTypeDef;

/// Decodes values from one binary stream. Not shareable: the type tables
/// are scoped to this instance and grow monotonically for its lifetime.
pub struct Decoder {
    pub(crate) buf: Bytes,
    /// Fully resolved stream-local types.
    pub(crate) resolved: HashMap<u64, Type>,
    /// Definitions received but not yet built into arena types.
    pub(crate) pending: HashMap<u64, WireTypeDef>,
    magic_checked: bool,
}

impl Decoder {
    pub fn new(bytes: impl Into<Bytes>) -> Decoder {
        Decoder {
            buf: bytes.into(),
            resolved: HashMap::new(),
            pending: HashMap::new(),
            magic_checked: false,
        }
    }

    /// Decode the next value message as a `target`-typed value, applying
    /// conversion rules where the wire type differs. Pass [`Type::ANY`] to
    /// take whatever type the stream declares.
    pub fn decode(&mut self, target: Type) -> Result<Value, DecodeError> {
        self.check_magic()?;
        loop {
            let id = decode_int(&mut self.buf)?;
            if id == 0 {
                return Err(DecodeError::corrupt("message with type id 0"));
            }
            if id < 0 {
                // A type definition: stash it and keep reading.
                let def_id = id.unsigned_abs();
                let _body_len = decode_uint(&mut self.buf)?;
                let def_value = read_value(self, WIRE_TYPE, WIRE_TYPE)?;
                let def = WireTypeDef::from_value(&def_value)?;
                self.pending.insert(def_id, def);
                continue;
            }
            let wire = self.resolve_type(id as u64)?;
            if !compatible(wire, target) {
                return Err(DecodeError::incompatible(wire, target));
            }
            if bootstrap::has_binary_msg_len(wire) {
                // Present to allow skip-without-decode, which we never do.
                let _body_len = decode_uint(&mut self.buf)?;
            }
            return read_value(self, wire, target);
        }
    }

    /// Decode the next value message under the type the stream declares,
    /// returning the type alongside the value.
    pub fn decode_dynamic(&mut self) -> Result<(Type, Value), DecodeError> {
        match self.decode(Type::ANY)? {
            Value::Any(Some(boxed)) => Ok(*boxed),
            Value::Any(None) => Ok((Type::ANY, Value::Any(None))),
            // `decode` with an any target always wraps.
            _ => Err(DecodeError::corrupt("dynamic decode produced a bare value")),
        }
    }

    fn check_magic(&mut self) -> Result<(), DecodeError> {
        if self.magic_checked {
            return Ok(());
        }
        let first = read_u8(&mut self.buf)?;
        if first != MAGIC {
            return Err(DecodeError::corrupt(format!(
                "stream starts with 0x{first:02x}, want magic 0x{MAGIC:02x}"
            )));
        }
        self.magic_checked = true;
        Ok(())
    }

    /// Resolve a stream-local type ID, building the dependency closure of
    /// pending definitions if needed.
    pub(crate) fn resolve_type(&mut self, id: u64) -> Result<Type, DecodeError> {
        if let Some(ty) = bootstrap::bootstrap_type(TypeId(id)) {
            return Ok(ty);
        }
        if let Some(ty) = self.resolved.get(&id) {
            return Ok(*ty);
        }
        types::build_closure(self, id)
    }
}

/// Read one value body, dispatching on the wire kind and adapting to the
/// target representation.
pub(crate) fn read_value(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let wire_kind = wire.kind();
    // Nil-carrying wire kinds do their own target wrapping; for everything
    // else, an optional or dynamic target wraps the decoded value.
    if wire_kind != Kind::Optional && wire_kind != Kind::Any {
        match target.kind() {
            Kind::Optional => {
                let inner = target
                    .elem()
                    .ok_or_else(|| DecodeError::incompatible(wire, target))?;
                return Ok(Value::some(read_value(dec, wire, inner)?));
            }
            Kind::Any => {
                let value = read_value(dec, wire, wire)?;
                return Ok(Value::any(wire, value));
            }
            _ => {}
        }
    }
    match wire_kind {
        Kind::Bool => scalar::read_bool(dec, wire, target),
        Kind::Byte => scalar::read_byte(dec, target),
        Kind::Uint16 | Kind::Uint32 | Kind::Uint64 => scalar::read_uint(dec, target),
        Kind::Int16 | Kind::Int32 | Kind::Int64 => scalar::read_int(dec, target),
        Kind::Float32 | Kind::Float64 => scalar::read_float(dec, target),
        Kind::Complex64 | Kind::Complex128 => scalar::read_complex(dec, wire, target),
        Kind::String => scalar::read_string(dec, wire, target),
        Kind::Enum => scalar::read_enum(dec, wire, target),
        Kind::TypeObject => scalar::read_typeobject(dec, wire, target),
        Kind::Array | Kind::List => compound::read_sequence(dec, wire, target),
        Kind::Set => compound::read_set(dec, wire, target),
        Kind::Map => compound::read_map(dec, wire, target),
        Kind::Struct => compound::read_struct(dec, wire, target),
        Kind::Union => compound::read_union(dec, wire, target),
        Kind::Optional => compound::read_optional(dec, wire, target),
        Kind::Any => compound::read_any(dec, target),
    }
}

/// Read an element count and sanity-check it against the bytes left; every
/// element needs at least one byte, so a larger count is a corrupt stream
/// rather than a reason to allocate.
pub(crate) fn read_count(dec: &mut Decoder, what: &str) -> Result<usize, DecodeError> {
    let count = decode_uint(&mut dec.buf)?;
    if count > dec.buf.len() as u64 {
        return Err(DecodeError::corrupt(format!(
            "{what} count {count} exceeds the {} bytes left in the stream",
            dec.buf.len()
        )));
    }
    Ok(count as usize)
}
