//! Value writers for scalar kinds.

use bytes::{BufMut, BytesMut};

use crate::encode::{unsupported, Encoder};
use crate::error::EncodeError;
use crate::kind::Kind;
use crate::primitives::{encode_bool, encode_double, encode_uint};
use crate::types::Type;
use crate::value::Value;

pub(super) fn write_bool(
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    match value {
        Value::Bool(v) => Ok(encode_bool(buf, *v)),
        _ => Err(unsupported(ty, value)),
    }
}

pub(super) fn write_byte(
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    match value {
        Value::Byte(v) => {
            buf.put_u8(*v);
            Ok(*v != 0)
        }
        _ => Err(unsupported(ty, value)),
    }
}

pub(super) fn write_uint(
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let v = match (ty.kind(), value) {
        (Kind::Uint16, Value::Uint16(v)) => *v as u64,
        (Kind::Uint32, Value::Uint32(v)) => *v as u64,
        (Kind::Uint64, Value::Uint64(v)) => *v,
        _ => return Err(unsupported(ty, value)),
    };
    Ok(encode_uint(buf, v))
}

pub(super) fn write_int(
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let v = match (ty.kind(), value) {
        (Kind::Int16, Value::Int16(v)) => *v as i64,
        (Kind::Int32, Value::Int32(v)) => *v as i64,
        (Kind::Int64, Value::Int64(v)) => *v,
        _ => return Err(unsupported(ty, value)),
    };
    Ok(crate::primitives::encode_int(buf, v))
}

pub(super) fn write_float(
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let v = match (ty.kind(), value) {
        (Kind::Float32, Value::Float32(v)) => *v as f64,
        (Kind::Float64, Value::Float64(v)) => *v,
        _ => return Err(unsupported(ty, value)),
    };
    Ok(encode_double(buf, v))
}

pub(super) fn write_complex(
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let (re, im) = match (ty.kind(), value) {
        (Kind::Complex64, Value::Complex64 { re, im }) => (*re as f64, *im as f64),
        (Kind::Complex128, Value::Complex128 { re, im }) => (*re, *im),
        _ => return Err(unsupported(ty, value)),
    };
    let nonzero_re = encode_double(buf, re);
    let nonzero_im = encode_double(buf, im);
    Ok(nonzero_re || nonzero_im)
}

pub(super) fn write_string(
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    match value {
        Value::String(s) => {
            encode_uint(buf, s.len() as u64);
            buf.put_slice(s.as_bytes());
            Ok(!s.is_empty())
        }
        _ => Err(unsupported(ty, value)),
    }
}

pub(super) fn write_enum(
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    match value {
        Value::Enum(index) if *index < ty.labels().len() => {
            Ok(encode_uint(buf, *index as u64))
        }
        _ => Err(unsupported(ty, value)),
    }
}

pub(super) fn write_typeobject(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    match value {
        Value::TypeObject(t) => {
            let id = enc.type_id(*t)?;
            encode_uint(buf, id.0);
            Ok(*t != Type::ANY)
        }
        _ => Err(unsupported(ty, value)),
    }
}
