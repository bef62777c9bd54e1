//! Value readers for compound kinds.

use crate::bootstrap::{CTRL_END, CTRL_NIL};
use crate::convert::compatible;
use crate::decode::{read_count, read_value, Decoder};
use crate::error::DecodeError;
use crate::kind::Kind;
use crate::primitives::{decode_uint, peek_u8, read_exact, read_u8};
use crate::types::Type;
use crate::value::Value;

/// Arrays and lists share one reader: the only difference is where the
/// element count comes from. Byte elements are a raw-bytes fast path that
/// can also convert into a string.
pub(super) fn read_sequence(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let wire_elem = wire
        .elem()
        .ok_or_else(|| DecodeError::corrupt("sequence type without an element type"))?;
    let count = match wire.kind() {
        Kind::List => read_count(dec, "element")?,
        _ => {
            // Arrays carry a literal zero where a list carries its count.
            let marker = decode_uint(&mut dec.buf)?;
            if marker != 0 {
                return Err(DecodeError::corrupt(format!(
                    "array length marker is {marker}, want 0"
                )));
            }
            wire.len()
        }
    };

    if wire_elem.kind() == Kind::Byte {
        let bytes = read_exact(&mut dec.buf, count)?;
        return match target.kind() {
            Kind::String => Ok(Value::String(super::scalar::utf8(&bytes)?)),
            Kind::List => Ok(Value::byte_list(&bytes)),
            Kind::Array => super::scalar::bytes_to_array(&bytes, wire, target),
            _ => Err(DecodeError::incompatible(wire, target)),
        };
    }

    let (target_elem, fixed_len) = match target.kind() {
        Kind::List => (target.elem(), None),
        Kind::Array => (target.elem(), Some(target.len())),
        _ => return Err(DecodeError::incompatible(wire, target)),
    };
    let target_elem =
        target_elem.ok_or_else(|| DecodeError::incompatible(wire, target))?;
    if let Some(len) = fixed_len {
        if len < count {
            return Err(DecodeError::conversion(format!(
                "{count} elements do not fit in {target}"
            )));
        }
    }

    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        items.push(read_value(dec, wire_elem, target_elem).map_err(|e| e.with_index(i))?);
    }
    if let Some(len) = fixed_len {
        items.resize(len, Value::zero_of(target_elem));
        Ok(Value::Array(items))
    } else {
        Ok(Value::List(items))
    }
}

pub(super) fn read_set(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let wire_key = wire
        .key()
        .ok_or_else(|| DecodeError::corrupt("set type without a key type"))?;
    let count = read_count(dec, "set key")?;
    match target.kind() {
        Kind::Set => {
            let target_key = target
                .key()
                .ok_or_else(|| DecodeError::incompatible(wire, target))?;
            let mut keys = Vec::with_capacity(count);
            for i in 0..count {
                keys.push(read_value(dec, wire_key, target_key).map_err(|e| e.with_index(i))?);
            }
            Ok(Value::Set(keys))
        }
        Kind::Map => {
            // set[K] becomes map[K]bool with every key present.
            let target_key = target
                .key()
                .ok_or_else(|| DecodeError::incompatible(wire, target))?;
            let mut entries = Vec::with_capacity(count);
            for i in 0..count {
                let key =
                    read_value(dec, wire_key, target_key).map_err(|e| e.with_index(i))?;
                entries.push((key, Value::Bool(true)));
            }
            Ok(Value::Map(entries))
        }
        Kind::Struct => {
            let fields = target.fields();
            let mut vals = zero_struct_vals(target);
            for i in 0..count {
                let key = read_value(dec, wire_key, Type::STRING).map_err(|e| e.with_index(i))?;
                let name = string_key(key)?;
                match fields.iter().position(|f| f.name == name) {
                    Some(pos) => {
                        if fields[pos].ty.kind() != Kind::Bool {
                            return Err(DecodeError::conversion(format!(
                                "set key {name:?} targets non-bool field of {target}"
                            )));
                        }
                        vals[pos] = Value::Bool(true);
                    }
                    // Keys with no matching field are dropped.
                    None => {}
                }
            }
            Ok(Value::Struct(vals))
        }
        _ => Err(DecodeError::incompatible(wire, target)),
    }
}

pub(super) fn read_map(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let wire_key = wire
        .key()
        .ok_or_else(|| DecodeError::corrupt("map type without a key type"))?;
    let wire_elem = wire
        .elem()
        .ok_or_else(|| DecodeError::corrupt("map type without an element type"))?;
    let count = read_count(dec, "map entry")?;
    match target.kind() {
        Kind::Map => {
            let target_key = target
                .key()
                .ok_or_else(|| DecodeError::incompatible(wire, target))?;
            let target_elem = target
                .elem()
                .ok_or_else(|| DecodeError::incompatible(wire, target))?;
            let mut entries = Vec::with_capacity(count);
            for i in 0..count {
                let key =
                    read_value(dec, wire_key, target_key).map_err(|e| e.with_index(i))?;
                let val =
                    read_value(dec, wire_elem, target_elem).map_err(|e| e.with_index(i))?;
                entries.push((key, val));
            }
            Ok(Value::Map(entries))
        }
        Kind::Set => {
            // map[K]bool collapses to set[K], keeping only `true` keys.
            let target_key = target
                .key()
                .ok_or_else(|| DecodeError::incompatible(wire, target))?;
            let mut keys = Vec::new();
            for i in 0..count {
                let key =
                    read_value(dec, wire_key, target_key).map_err(|e| e.with_index(i))?;
                let val =
                    read_value(dec, wire_elem, wire_elem).map_err(|e| e.with_index(i))?;
                if val == Value::Bool(true) {
                    keys.push(key);
                }
            }
            Ok(Value::Set(keys))
        }
        Kind::Struct => {
            let fields = target.fields();
            let mut vals = zero_struct_vals(target);
            for i in 0..count {
                let key = read_value(dec, wire_key, Type::STRING).map_err(|e| e.with_index(i))?;
                let name = string_key(key)?;
                match fields.iter().position(|f| f.name == name) {
                    Some(pos) => {
                        vals[pos] = read_value(dec, wire_elem, fields[pos].ty)
                            .map_err(|e| e.with_key(name))?;
                    }
                    None => {
                        // No matching field: consume the value and drop it.
                        let _ = read_value(dec, wire_elem, wire_elem)
                            .map_err(|e| e.with_key(name))?;
                    }
                }
            }
            Ok(Value::Struct(vals))
        }
        _ => Err(DecodeError::incompatible(wire, target)),
    }
}

pub(super) fn read_struct(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    if target.kind() != Kind::Struct {
        return Err(DecodeError::incompatible(wire, target));
    }
    let wire_fields = wire.fields();
    let target_fields = target.fields();
    let mut vals = zero_struct_vals(target);
    loop {
        match peek_u8(&dec.buf) {
            None => return Err(DecodeError::eof("struct field index")),
            Some(CTRL_END) => {
                let _ = read_u8(&mut dec.buf)?;
                return Ok(Value::Struct(vals));
            }
            Some(_) => {}
        }
        let index = decode_uint(&mut dec.buf)?;
        if index == 0 {
            return Err(DecodeError::corrupt("struct field index 0"));
        }
        let wire_field = wire_fields
            .get((index - 1) as usize)
            .ok_or_else(|| {
                DecodeError::corrupt(format!(
                    "struct field index {index} out of range for {} fields",
                    wire_fields.len()
                ))
            })?;
        match target_fields
            .iter()
            .position(|f| f.name == wire_field.name)
        {
            Some(pos) => {
                vals[pos] = read_value(dec, wire_field.ty, target_fields[pos].ty)
                    .map_err(|e| e.with_field(&wire_field.name))?;
            }
            None => {
                // Unknown in the target: decode under the wire's own type
                // and drop, so schema evolution skips cleanly.
                let _ = read_value(dec, wire_field.ty, wire_field.ty)
                    .map_err(|e| e.with_field(&wire_field.name))?;
            }
        }
    }
}

pub(super) fn read_union(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    if target.kind() != Kind::Union {
        return Err(DecodeError::incompatible(wire, target));
    }
    let index = decode_uint(&mut dec.buf)?;
    let wire_fields = wire.fields();
    let wire_field = wire_fields
        .get(usize::try_from(index).unwrap_or(usize::MAX))
        .ok_or_else(|| {
            DecodeError::corrupt(format!(
                "union index {index} out of range for {} fields",
                wire_fields.len()
            ))
        })?;
    let target_fields = target.fields();
    let pos = target_fields
        .iter()
        .position(|f| f.name == wire_field.name)
        .ok_or_else(|| {
            DecodeError::conversion(format!(
                "union variant {:?} is not part of {target}",
                wire_field.name
            ))
        })?;
    let payload = read_value(dec, wire_field.ty, target_fields[pos].ty)
        .map_err(|e| e.with_field(&wire_field.name))?;
    Ok(Value::Union {
        index: pos,
        value: Box::new(payload),
    })
}

pub(super) fn read_optional(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    if peek_u8(&dec.buf) == Some(CTRL_NIL) {
        let _ = read_u8(&mut dec.buf)?;
        return match target.kind() {
            Kind::Optional => Ok(Value::Optional(None)),
            Kind::Any => Ok(Value::Any(None)),
            _ => Err(DecodeError::conversion(format!(
                "nil cannot convert to non-optional {target}"
            ))),
        };
    }
    let wire_elem = wire
        .elem()
        .ok_or_else(|| DecodeError::corrupt("optional type without an element type"))?;
    match target.kind() {
        Kind::Optional => {
            let target_elem = target
                .elem()
                .ok_or_else(|| DecodeError::incompatible(wire, target))?;
            Ok(Value::some(read_value(dec, wire_elem, target_elem)?))
        }
        Kind::Any => {
            let value = read_value(dec, wire_elem, wire_elem)?;
            Ok(Value::any(wire, Value::some(value)))
        }
        _ => read_value(dec, wire_elem, target),
    }
}

pub(super) fn read_any(dec: &mut Decoder, target: Type) -> Result<Value, DecodeError> {
    if peek_u8(&dec.buf) == Some(CTRL_NIL) {
        let _ = read_u8(&mut dec.buf)?;
        return match target.kind() {
            Kind::Any => Ok(Value::Any(None)),
            Kind::Optional => Ok(Value::Optional(None)),
            _ => Err(DecodeError::conversion(format!(
                "any-null cannot convert to {target}"
            ))),
        };
    }
    let id = decode_uint(&mut dec.buf)?;
    let dyn_ty = dec.resolve_type(id)?;
    if target.kind() == Kind::Any {
        let value = read_value(dec, dyn_ty, dyn_ty)?;
        return Ok(Value::any(dyn_ty, value));
    }
    if !compatible(dyn_ty, target) {
        return Err(DecodeError::incompatible(dyn_ty, target));
    }
    read_value(dec, dyn_ty, target)
}

fn zero_struct_vals(target: Type) -> Vec<Value> {
    match Value::zero_of(target) {
        Value::Struct(vals) => vals,
        // `zero_of` always yields a struct for struct types.
        _ => Vec::new(),
    }
}

fn string_key(key: Value) -> Result<String, DecodeError> {
    match key {
        Value::String(s) => Ok(s),
        other => Err(DecodeError::conversion(format!(
            "key {other:?} cannot name a struct field"
        ))),
    }
}
