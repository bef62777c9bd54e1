//! Value readers for scalar kinds, with representation conversion.

use crate::convert::{double_to_value, int_to_value, uint_to_value};
use crate::decode::Decoder;
use crate::error::DecodeError;
use crate::kind::Kind;
use crate::primitives::{decode_bool, decode_double, decode_int, decode_uint, read_exact, read_u8};
use crate::types::Type;
use crate::value::Value;

pub(super) fn read_bool(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let v = decode_bool(&mut dec.buf)?;
    if target.kind() == Kind::Bool {
        Ok(Value::Bool(v))
    } else {
        Err(DecodeError::incompatible(wire, target))
    }
}

pub(super) fn read_byte(dec: &mut Decoder, target: Type) -> Result<Value, DecodeError> {
    let b = read_u8(&mut dec.buf)?;
    uint_to_value(b as u64, target)
}

pub(super) fn read_uint(dec: &mut Decoder, target: Type) -> Result<Value, DecodeError> {
    let u = decode_uint(&mut dec.buf)?;
    uint_to_value(u, target)
}

pub(super) fn read_int(dec: &mut Decoder, target: Type) -> Result<Value, DecodeError> {
    let i = decode_int(&mut dec.buf)?;
    int_to_value(i, target)
}

pub(super) fn read_float(dec: &mut Decoder, target: Type) -> Result<Value, DecodeError> {
    let d = decode_double(&mut dec.buf)?;
    double_to_value(d, target)
}

pub(super) fn read_complex(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let re = decode_double(&mut dec.buf)?;
    let im = decode_double(&mut dec.buf)?;
    match target.kind() {
        Kind::Complex128 => Ok(Value::Complex128 { re, im }),
        Kind::Complex64 => {
            let (re32, im32) = (re as f32, im as f32);
            if re32 as f64 != re || im32 as f64 != im {
                return Err(DecodeError::conversion(format!(
                    "complex value ({re}+{im}i) does not fit in {target}"
                )));
            }
            Ok(Value::Complex64 {
                re: re32,
                im: im32,
            })
        }
        _ => Err(DecodeError::incompatible(wire, target)),
    }
}

pub(super) fn read_string(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let len = super::read_count(dec, "string byte")?;
    let bytes = read_exact(&mut dec.buf, len)?;
    match target.kind() {
        Kind::String => Ok(Value::String(utf8(&bytes)?)),
        Kind::Enum => {
            let label = utf8(&bytes)?;
            match target.labels().iter().position(|l| *l == label) {
                Some(index) => Ok(Value::Enum(index)),
                None => Err(DecodeError::conversion(format!(
                    "label {label:?} is not part of {target}"
                ))),
            }
        }
        Kind::List => Ok(Value::byte_list(&bytes)),
        Kind::Array => bytes_to_array(&bytes, wire, target),
        _ => Err(DecodeError::incompatible(wire, target)),
    }
}

pub(super) fn read_enum(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let index = decode_uint(&mut dec.buf)?;
    let labels = wire.labels();
    let label = labels
        .get(usize::try_from(index).unwrap_or(usize::MAX))
        .ok_or_else(|| {
            DecodeError::corrupt(format!(
                "enum index {index} out of range for {} labels",
                labels.len()
            ))
        })?;
    match target.kind() {
        Kind::Enum => match target.labels().iter().position(|l| l == label) {
            Some(index) => Ok(Value::Enum(index)),
            None => Err(DecodeError::conversion(format!(
                "label {label:?} is not part of {target}"
            ))),
        },
        Kind::String => Ok(Value::String(label.clone())),
        _ => Err(DecodeError::incompatible(wire, target)),
    }
}

pub(super) fn read_typeobject(
    dec: &mut Decoder,
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    let id = decode_uint(&mut dec.buf)?;
    let ty = dec.resolve_type(id)?;
    if target.kind() == Kind::TypeObject {
        Ok(Value::TypeObject(ty))
    } else {
        Err(DecodeError::incompatible(wire, target))
    }
}

pub(super) fn utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| DecodeError::corrupt("string bytes are not valid UTF-8"))
}

/// Convert a raw byte payload into a fixed-length byte array value,
/// zero-padding up to the target's declared length.
pub(super) fn bytes_to_array(
    bytes: &[u8],
    wire: Type,
    target: Type,
) -> Result<Value, DecodeError> {
    if target.len() < bytes.len() {
        return Err(DecodeError::conversion(format!(
            "{} bytes do not fit in {target}",
            bytes.len()
        )));
    }
    if target.elem().map(|e| e.kind()) != Some(Kind::Byte) {
        return Err(DecodeError::incompatible(wire, target));
    }
    let mut items: Vec<Value> = bytes.iter().map(|b| Value::Byte(*b)).collect();
    items.resize(target.len(), Value::Byte(0));
    Ok(Value::Array(items))
}
