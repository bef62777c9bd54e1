//! Value writers for compound kinds.

use bytes::{BufMut, BytesMut};

use crate::bootstrap::{CTRL_END, CTRL_NIL};
use crate::encode::{unsupported, write_value, Encoder};
use crate::error::EncodeError;
use crate::primitives::encode_uint;
use crate::types::Type;
use crate::value::Value;

pub(super) fn write_array(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let items = match value {
        Value::Array(items) if items.len() == ty.len() => items,
        _ => return Err(unsupported(ty, value)),
    };
    let elem = ty.elem().ok_or_else(|| unsupported(ty, value))?;
    // Arrays carry no element count; the length is fixed by the type.
    encode_uint(buf, 0);
    let mut nonzero = false;
    for (i, item) in items.iter().enumerate() {
        nonzero |= write_value(enc, buf, elem, item).map_err(|e| e.with_index(i))?;
    }
    Ok(nonzero)
}

pub(super) fn write_list(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let items = match value {
        Value::List(items) => items,
        _ => return Err(unsupported(ty, value)),
    };
    let elem = ty.elem().ok_or_else(|| unsupported(ty, value))?;
    encode_uint(buf, items.len() as u64);
    for (i, item) in items.iter().enumerate() {
        write_value(enc, buf, elem, item).map_err(|e| e.with_index(i))?;
    }
    Ok(!items.is_empty())
}

pub(super) fn write_set(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let keys = match value {
        Value::Set(keys) => keys,
        _ => return Err(unsupported(ty, value)),
    };
    let key_ty = ty.key().ok_or_else(|| unsupported(ty, value))?;
    encode_uint(buf, keys.len() as u64);
    for (i, key) in keys.iter().enumerate() {
        write_value(enc, buf, key_ty, key).map_err(|e| e.with_index(i))?;
    }
    Ok(!keys.is_empty())
}

pub(super) fn write_map(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let entries = match value {
        Value::Map(entries) => entries,
        _ => return Err(unsupported(ty, value)),
    };
    let key_ty = ty.key().ok_or_else(|| unsupported(ty, value))?;
    let elem_ty = ty.elem().ok_or_else(|| unsupported(ty, value))?;
    encode_uint(buf, entries.len() as u64);
    for (i, (key, val)) in entries.iter().enumerate() {
        write_value(enc, buf, key_ty, key).map_err(|e| e.with_index(i))?;
        write_value(enc, buf, elem_ty, val).map_err(|e| e.with_index(i))?;
    }
    Ok(!entries.is_empty())
}

pub(super) fn write_struct(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let fields = ty.fields();
    let vals = match value {
        Value::Struct(vals) if vals.len() == fields.len() => vals,
        _ => return Err(unsupported(ty, value)),
    };
    let mut any_written = false;
    for (i, (field, val)) in fields.iter().zip(vals.iter()).enumerate() {
        // Each field goes to its own scratch buffer first; zero-valued
        // fields are dropped rather than written.
        let mut scratch = BytesMut::new();
        let nonzero =
            write_value(enc, &mut scratch, field.ty, val).map_err(|e| e.with_field(&field.name))?;
        if nonzero {
            encode_uint(buf, (i + 1) as u64);
            buf.put_slice(&scratch);
            any_written = true;
        }
    }
    buf.put_u8(CTRL_END);
    Ok(any_written)
}

pub(super) fn write_union(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    let (index, payload) = match value {
        Value::Union { index, value } => (*index, value.as_ref()),
        _ => return Err(unsupported(ty, value)),
    };
    let fields = ty.fields();
    let field = fields.get(index).ok_or_else(|| unsupported(ty, value))?;
    encode_uint(buf, index as u64);
    let nonzero =
        write_value(enc, buf, field.ty, payload).map_err(|e| e.with_field(&field.name))?;
    Ok(index != 0 || nonzero)
}

pub(super) fn write_optional(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    ty: Type,
    value: &Value,
) -> Result<bool, EncodeError> {
    match value {
        Value::Optional(None) => {
            buf.put_u8(CTRL_NIL);
            Ok(false)
        }
        Value::Optional(Some(inner)) => {
            let elem = ty.elem().ok_or_else(|| unsupported(ty, value))?;
            write_value(enc, buf, elem, inner)?;
            Ok(true)
        }
        _ => Err(unsupported(ty, value)),
    }
}

pub(super) fn write_any(
    enc: &mut Encoder,
    buf: &mut BytesMut,
    value: &Value,
) -> Result<bool, EncodeError> {
    match value {
        Value::Any(None) => {
            buf.put_u8(CTRL_NIL);
            Ok(false)
        }
        Value::Any(Some(boxed)) => {
            let (dyn_ty, dyn_value) = boxed.as_ref();
            let id = enc.type_id(*dyn_ty)?;
            encode_uint(buf, id.0);
            write_value(enc, buf, *dyn_ty, dyn_value)?;
            Ok(true)
        }
        _ => Err(unsupported(Type::ANY, value)),
    }
}
