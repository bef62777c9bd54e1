//! Wire type descriptors and the two-phase builder that turns a batch of
//! possibly mutually-referential descriptors into arena types.

use std::collections::HashMap;

use crate::bootstrap::{self, TypeId};
use crate::decode::Decoder;
use crate::error::DecodeError;
use crate::types::{PendingType, ProtoNode, Type, TypeBuilder, TypeRef};
use crate::value::Value;

/// One type definition as it arrived on the wire, with sub-types still as
/// raw stream-local IDs.
#[derive(Clone, Debug)]
pub(crate) enum WireTypeDef {
    Named { name: String, base: u64 },
    Enum { name: String, labels: Vec<String> },
    Array { name: String, elem: u64, len: u64 },
    List { name: String, elem: u64 },
    Set { name: String, key: u64 },
    Map { name: String, key: u64, elem: u64 },
    Struct { name: String, fields: Vec<(String, u64)> },
    Union { name: String, fields: Vec<(String, u64)> },
    Optional { name: String, elem: u64 },
}

impl WireTypeDef {
    /// Lift a decoded `wireType` union value into a descriptor.
    pub(crate) fn from_value(value: &Value) -> Result<WireTypeDef, DecodeError> {
        let (tag, payload) = match value {
            Value::Union { index, value } => (*index, value.as_ref()),
            _ => return Err(malformed("definition is not a union")),
        };
        let parts = match payload {
            Value::Struct(parts) => parts,
            _ => return Err(malformed("definition payload is not a struct")),
        };
        Ok(match tag {
            bootstrap::WIRE_TYPE_NAMED => WireTypeDef::Named {
                name: string_part(parts, 0)?,
                base: id_part(parts, 1)?,
            },
            bootstrap::WIRE_TYPE_ENUM => WireTypeDef::Enum {
                name: string_part(parts, 0)?,
                labels: labels_part(parts, 1)?,
            },
            bootstrap::WIRE_TYPE_ARRAY => WireTypeDef::Array {
                name: string_part(parts, 0)?,
                elem: id_part(parts, 1)?,
                len: id_part(parts, 2)?,
            },
            bootstrap::WIRE_TYPE_LIST => WireTypeDef::List {
                name: string_part(parts, 0)?,
                elem: id_part(parts, 1)?,
            },
            bootstrap::WIRE_TYPE_SET => WireTypeDef::Set {
                name: string_part(parts, 0)?,
                key: id_part(parts, 1)?,
            },
            bootstrap::WIRE_TYPE_MAP => WireTypeDef::Map {
                name: string_part(parts, 0)?,
                key: id_part(parts, 1)?,
                elem: id_part(parts, 2)?,
            },
            bootstrap::WIRE_TYPE_STRUCT => WireTypeDef::Struct {
                name: string_part(parts, 0)?,
                fields: fields_part(parts, 1)?,
            },
            bootstrap::WIRE_TYPE_UNION => WireTypeDef::Union {
                name: string_part(parts, 0)?,
                fields: fields_part(parts, 1)?,
            },
            bootstrap::WIRE_TYPE_OPTIONAL => WireTypeDef::Optional {
                name: string_part(parts, 0)?,
                elem: id_part(parts, 1)?,
            },
            tag => {
                return Err(DecodeError::corrupt(format!(
                    "unknown wire type tag {tag}"
                )))
            }
        })
    }

    /// Stream-local IDs this definition structurally depends on.
    fn dep_ids(&self) -> Vec<u64> {
        match self {
            WireTypeDef::Named { base, .. } => vec![*base],
            WireTypeDef::Enum { .. } => Vec::new(),
            WireTypeDef::Array { elem, .. } => vec![*elem],
            WireTypeDef::List { elem, .. } => vec![*elem],
            WireTypeDef::Set { key, .. } => vec![*key],
            WireTypeDef::Map { key, elem, .. } => vec![*key, *elem],
            WireTypeDef::Struct { fields, .. } | WireTypeDef::Union { fields, .. } => {
                fields.iter().map(|(_, id)| *id).collect()
            }
            WireTypeDef::Optional { elem, .. } => vec![*elem],
        }
    }
}

#[cold]
fn malformed(what: &str) -> DecodeError {
    DecodeError::corrupt(format!("malformed type definition: {what}"))
}

fn string_part(parts: &[Value], index: usize) -> Result<String, DecodeError> {
    match parts.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(malformed("expected a string part")),
    }
}

fn id_part(parts: &[Value], index: usize) -> Result<u64, DecodeError> {
    match parts.get(index) {
        Some(Value::Uint64(id)) => Ok(*id),
        _ => Err(malformed("expected an id part")),
    }
}

fn labels_part(parts: &[Value], index: usize) -> Result<Vec<String>, DecodeError> {
    let items = match parts.get(index) {
        Some(Value::List(items)) => items,
        _ => return Err(malformed("expected a label list")),
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            _ => Err(malformed("expected a string label")),
        })
        .collect()
}

fn fields_part(parts: &[Value], index: usize) -> Result<Vec<(String, u64)>, DecodeError> {
    let items = match parts.get(index) {
        Some(Value::List(items)) => items,
        _ => return Err(malformed("expected a field list")),
    };
    items
        .iter()
        .map(|item| match item {
            Value::Struct(field_parts) => {
                Ok((string_part(field_parts, 0)?, id_part(field_parts, 1)?))
            }
            _ => Err(malformed("expected a field struct")),
        })
        .collect()
}

/// Resolve `root` by building every pending definition it transitively
/// depends on. Definitions may reference each other in any order, including
/// cyclically, so this allocates a placeholder slot per unresolved ID first
/// and only then populates them.
pub(crate) fn build_closure(dec: &mut Decoder, root: u64) -> Result<Type, DecodeError> {
    // Phase 1: walk the dependency closure of ids that still need building.
    let mut order: Vec<u64> = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if order.contains(&id)
            || dec.resolved.contains_key(&id)
            || bootstrap::bootstrap_type(TypeId(id)).is_some()
        {
            continue;
        }
        let def = dec
            .pending
            .get(&id)
            .ok_or_else(|| undefined_id(id))?;
        stack.extend(def.dep_ids());
        order.push(id);
    }

    // Phase 2: one placeholder slot per id in the closure.
    let mut builder = TypeBuilder::new();
    let mut slots: HashMap<u64, PendingType> = HashMap::with_capacity(order.len());
    for id in &order {
        slots.insert(*id, builder.slot());
    }

    // Phase 3: populate every slot from its definition.
    for id in &order {
        let def = dec.pending.get(id).ok_or_else(|| undefined_id(*id))?;
        let proto = match def {
            WireTypeDef::Named { name, base } => named_proto(dec, &slots, *id, name, *base)?,
            other => proto_from(dec, &slots, other, None)?,
        };
        builder.fill(slots[id], proto);
    }

    // Phase 4: publish the batch and move it to the resolved table.
    let built = builder
        .build()
        .map_err(|e| DecodeError::corrupt(e.to_string()))?;
    for (id, ty) in order.iter().zip(built) {
        dec.resolved.insert(*id, ty);
        dec.pending.remove(id);
    }
    dec.resolved
        .get(&root)
        .copied()
        .ok_or_else(|| undefined_id(root))
}

#[cold]
fn undefined_id(id: u64) -> DecodeError {
    DecodeError::corrupt(format!("reference to undefined type id {id}"))
}

/// A named definition takes the structure of whatever its base chain ends
/// at, under its own name. A chain that never reaches a structure is a
/// corrupt stream.
fn named_proto(
    dec: &Decoder,
    slots: &HashMap<u64, PendingType>,
    id: u64,
    name: &str,
    base: u64,
) -> Result<ProtoNode, DecodeError> {
    let mut seen = vec![id];
    let mut current = base;
    loop {
        if let Some(ty) = existing_type(dec, current) {
            return Ok(ProtoNode::renamed(ty, name));
        }
        match dec.pending.get(&current) {
            Some(WireTypeDef::Named { base, .. }) => {
                if seen.contains(&current) {
                    return Err(DecodeError::corrupt(format!(
                        "named type {name:?} is defined as a cycle of names"
                    )));
                }
                seen.push(current);
                current = *base;
            }
            Some(def) => return proto_from(dec, slots, def, Some(name)),
            None => return Err(undefined_id(current)),
        }
    }
}

fn proto_from(
    dec: &Decoder,
    slots: &HashMap<u64, PendingType>,
    def: &WireTypeDef,
    rename: Option<&str>,
) -> Result<ProtoNode, DecodeError> {
    let name = |own: &str| rename.unwrap_or(own).to_string();
    Ok(match def {
        WireTypeDef::Enum { name: own, labels } => {
            ProtoNode::enum_of(&name(own), labels.clone())
        }
        WireTypeDef::Array {
            name: own,
            elem,
            len,
        } => {
            let len = usize::try_from(*len)
                .map_err(|_| DecodeError::corrupt(format!("array length {len} overflows")))?;
            ProtoNode::array_of(&name(own), len, resolve_ref(dec, slots, *elem)?)
        }
        WireTypeDef::List { name: own, elem } => {
            ProtoNode::list_of(&name(own), resolve_ref(dec, slots, *elem)?)
        }
        WireTypeDef::Set { name: own, key } => {
            ProtoNode::set_of(&name(own), resolve_ref(dec, slots, *key)?)
        }
        WireTypeDef::Map {
            name: own,
            key,
            elem,
        } => ProtoNode::map_of(
            &name(own),
            resolve_ref(dec, slots, *key)?,
            resolve_ref(dec, slots, *elem)?,
        ),
        WireTypeDef::Struct { name: own, fields } => {
            ProtoNode::struct_of(&name(own), resolve_fields(dec, slots, fields)?)
        }
        WireTypeDef::Union { name: own, fields } => {
            ProtoNode::union_of(&name(own), resolve_fields(dec, slots, fields)?)
        }
        WireTypeDef::Optional { name: own, elem } => {
            ProtoNode::optional_of(&name(own), resolve_ref(dec, slots, *elem)?)
        }
        // Callers chase named definitions before getting here.
        WireTypeDef::Named { .. } => {
            return Err(malformed("nested named definition"))
        }
    })
}

fn resolve_fields(
    dec: &Decoder,
    slots: &HashMap<u64, PendingType>,
    fields: &[(String, u64)],
) -> Result<Vec<(String, TypeRef)>, DecodeError> {
    fields
        .iter()
        .map(|(name, id)| Ok((name.clone(), resolve_ref(dec, slots, *id)?)))
        .collect()
}

fn resolve_ref(
    dec: &Decoder,
    slots: &HashMap<u64, PendingType>,
    id: u64,
) -> Result<TypeRef, DecodeError> {
    if let Some(ty) = existing_type(dec, id) {
        return Ok(ty.into());
    }
    if let Some(slot) = slots.get(&id) {
        return Ok((*slot).into());
    }
    Err(undefined_id(id))
}

fn existing_type(dec: &Decoder, id: u64) -> Option<Type> {
    bootstrap::bootstrap_type(TypeId(id)).or_else(|| dec.resolved.get(&id).copied())
}
