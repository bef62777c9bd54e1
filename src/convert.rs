//! Compatibility and representation-conversion rules applied when the
//! decoder's target type differs from the type that arrived on the wire.
//!
//! Compatibility is a shape-level check done once before decoding begins;
//! per-value conversions (range checks, label lookups) happen as values are
//! read and fail with conversion errors naming the offending value.

use crate::error::DecodeError;
use crate::kind::Kind;
use crate::types::Type;
use crate::value::Value;

/// Strip optional wrappers; nil-ness is handled at decode time.
fn unwrap_optional(mut ty: Type) -> Type {
    while ty.kind() == Kind::Optional {
        match ty.elem() {
            Some(elem) => ty = elem,
            None => break,
        }
    }
    ty
}

fn is_byte_string(ty: Type) -> bool {
    matches!(ty.kind(), Kind::Array | Kind::List)
        && ty.elem().map(|e| e.kind() == Kind::Byte).unwrap_or(false)
}

/// Whether a value of wire type `wire` can in principle be represented as
/// `target`. Per-value failures (out-of-range numbers, unknown labels,
/// absent union variants) are still possible afterwards.
pub(crate) fn compatible(wire: Type, target: Type) -> bool {
    let wire = unwrap_optional(wire);
    let target = unwrap_optional(target);
    if wire.kind() == Kind::Any || target.kind() == Kind::Any {
        return true;
    }
    let (wk, tk) = (wire.kind(), target.kind());
    if wk.is_number() && tk.is_number() {
        return true;
    }
    match (wk, tk) {
        (Kind::Bool, Kind::Bool) => true,
        (Kind::Complex64 | Kind::Complex128, Kind::Complex64 | Kind::Complex128) => true,
        (Kind::String, Kind::String | Kind::Enum) => true,
        (Kind::String, _) => is_byte_string(target),
        (Kind::Enum, Kind::Enum | Kind::String) => true,
        (Kind::Array | Kind::List, Kind::String) => is_byte_string(wire),
        (Kind::Array | Kind::List, Kind::Array | Kind::List) => {
            match (wire.elem(), target.elem()) {
                (Some(we), Some(te)) => compatible(we, te),
                _ => false,
            }
        }
        (Kind::Set, Kind::Set) => match (wire.key(), target.key()) {
            (Some(wk), Some(tk)) => compatible(wk, tk),
            _ => false,
        },
        (Kind::Set, Kind::Map) => {
            // set[K] fills map[K]bool with `true` entries.
            match (wire.key(), target.key(), target.elem()) {
                (Some(wk), Some(tk), Some(te)) => compatible(wk, tk) && te.kind() == Kind::Bool,
                _ => false,
            }
        }
        (Kind::Set, Kind::Struct) => wire
            .key()
            .map(|k| compatible(k, Type::STRING))
            .unwrap_or(false),
        (Kind::Map, Kind::Map) => {
            match (wire.key(), target.key(), wire.elem(), target.elem()) {
                (Some(wk), Some(tk), Some(we), Some(te)) => {
                    compatible(wk, tk) && compatible(we, te)
                }
                _ => false,
            }
        }
        (Kind::Map, Kind::Set) => {
            // map[K]bool collapses to set[K], keeping the `true` keys.
            match (wire.key(), target.key(), wire.elem()) {
                (Some(wk), Some(tk), Some(we)) => compatible(wk, tk) && we.kind() == Kind::Bool,
                _ => false,
            }
        }
        (Kind::Map, Kind::Struct) => wire
            .key()
            .map(|k| compatible(k, Type::STRING))
            .unwrap_or(false),
        // Fields are matched by name while decoding; disjoint field sets
        // legitimately decode to the target's zero value.
        (Kind::Struct, Kind::Struct) => true,
        (Kind::Union, Kind::Union) => true,
        (Kind::TypeObject, Kind::TypeObject) => true,
        _ => false,
    }
}

/// Adapt a decoded unsigned integer to the target's representation.
pub(crate) fn uint_to_value(u: u64, target: Type) -> Result<Value, DecodeError> {
    let out_of_range = || DecodeError::conversion(format!("value {u} does not fit in {target}"));
    Ok(match target.kind() {
        Kind::Byte => Value::Byte(u8::try_from(u).map_err(|_| out_of_range())?),
        Kind::Uint16 => Value::Uint16(u16::try_from(u).map_err(|_| out_of_range())?),
        Kind::Uint32 => Value::Uint32(u32::try_from(u).map_err(|_| out_of_range())?),
        Kind::Uint64 => Value::Uint64(u),
        Kind::Int16 => Value::Int16(i16::try_from(u).map_err(|_| out_of_range())?),
        Kind::Int32 => Value::Int32(i32::try_from(u).map_err(|_| out_of_range())?),
        Kind::Int64 => Value::Int64(i64::try_from(u).map_err(|_| out_of_range())?),
        Kind::Float32 => {
            let f = u as f32;
            if f as u64 != u {
                return Err(out_of_range());
            }
            Value::Float32(f)
        }
        Kind::Float64 => {
            let f = u as f64;
            if f as u64 != u {
                return Err(out_of_range());
            }
            Value::Float64(f)
        }
        _ => {
            return Err(DecodeError::conversion(format!(
                "cannot convert unsigned integer to {target}"
            )))
        }
    })
}

/// Adapt a decoded signed integer to the target's representation.
pub(crate) fn int_to_value(i: i64, target: Type) -> Result<Value, DecodeError> {
    let out_of_range = || DecodeError::conversion(format!("value {i} does not fit in {target}"));
    Ok(match target.kind() {
        Kind::Byte => Value::Byte(u8::try_from(i).map_err(|_| out_of_range())?),
        Kind::Uint16 => Value::Uint16(u16::try_from(i).map_err(|_| out_of_range())?),
        Kind::Uint32 => Value::Uint32(u32::try_from(i).map_err(|_| out_of_range())?),
        Kind::Uint64 => Value::Uint64(u64::try_from(i).map_err(|_| out_of_range())?),
        Kind::Int16 => Value::Int16(i16::try_from(i).map_err(|_| out_of_range())?),
        Kind::Int32 => Value::Int32(i32::try_from(i).map_err(|_| out_of_range())?),
        Kind::Int64 => Value::Int64(i),
        Kind::Float32 => {
            let f = i as f32;
            if f as i64 != i {
                return Err(out_of_range());
            }
            Value::Float32(f)
        }
        Kind::Float64 => {
            let f = i as f64;
            if f as i64 != i {
                return Err(out_of_range());
            }
            Value::Float64(f)
        }
        _ => {
            return Err(DecodeError::conversion(format!(
                "cannot convert signed integer to {target}"
            )))
        }
    })
}

/// Adapt a decoded float to the target's representation. Integral targets
/// accept only exactly-representable values.
pub(crate) fn double_to_value(d: f64, target: Type) -> Result<Value, DecodeError> {
    let out_of_range = || DecodeError::conversion(format!("value {d} does not fit in {target}"));
    Ok(match target.kind() {
        Kind::Float64 => Value::Float64(d),
        Kind::Float32 => {
            let f = d as f32;
            if f as f64 != d {
                return Err(out_of_range());
            }
            Value::Float32(f)
        }
        Kind::Byte | Kind::Uint16 | Kind::Uint32 | Kind::Uint64 => {
            if d.fract() != 0.0 || d < 0.0 || d > u64::MAX as f64 {
                return Err(out_of_range());
            }
            let u = d as u64;
            if u as f64 != d {
                return Err(out_of_range());
            }
            uint_to_value(u, target)?
        }
        Kind::Int16 | Kind::Int32 | Kind::Int64 => {
            if d.fract() != 0.0 || d < i64::MIN as f64 || d > i64::MAX as f64 {
                return Err(out_of_range());
            }
            let i = d as i64;
            if i as f64 != d {
                return Err(out_of_range());
            }
            int_to_value(i, target)?
        }
        _ => {
            return Err(DecodeError::conversion(format!(
                "cannot convert float to {target}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_mutually_compatible() {
        assert!(compatible(Type::BYTE, Type::INT64));
        assert!(compatible(Type::INT32, Type::FLOAT64));
        assert!(!compatible(Type::BOOL, Type::INT32));
    }

    #[test]
    fn strings_and_byte_lists() {
        let bytes = Type::list_of(Type::BYTE);
        assert!(compatible(Type::STRING, bytes));
        assert!(compatible(bytes, Type::STRING));
        assert!(!compatible(Type::list_of(Type::INT32), Type::STRING));
    }

    #[test]
    fn optionals_unwrap_for_compatibility() {
        let opt = Type::optional_of(Type::INT32);
        assert!(compatible(opt, Type::INT64));
        assert!(compatible(Type::INT64, opt));
    }

    #[test]
    fn uint_range_checks() {
        assert_eq!(uint_to_value(255, Type::BYTE).unwrap(), Value::Byte(255));
        assert!(uint_to_value(256, Type::BYTE).is_err());
        assert!(uint_to_value(u64::MAX, Type::INT64).is_err());
        assert_eq!(
            uint_to_value(1 << 24, Type::FLOAT32).unwrap(),
            Value::Float32(16777216.0)
        );
        assert!(uint_to_value((1 << 24) + 1, Type::FLOAT32).is_err());
    }

    #[test]
    fn double_integral_checks() {
        assert_eq!(double_to_value(3.0, Type::INT32).unwrap(), Value::Int32(3));
        assert!(double_to_value(3.5, Type::INT32).is_err());
        assert!(double_to_value(-1.0, Type::UINT16).is_err());
    }
}
