//! The runtime type model.
//!
//! Types live in a process-global, append-only arena and are addressed by
//! small copyable [`Type`] handles. Cyclic and mutually-referential type
//! graphs are expressed through handles rather than owned pointers, so
//! structural equality, hashing, and rendering are plain index-graph
//! traversals carrying a visited set. Nodes are immutable once published:
//! [`TypeBuilder`] resolves every forward reference *before* appending to
//! the arena, which is what makes self-referential types constructible
//! without interior mutability.

use std::fmt::{Debug, Display, Formatter, Result as FmtResult, Write};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::bootstrap;
use crate::kind::Kind;

const POISONED_ARENA_MSG: &str = "another thread panicked while holding the type arena lock";

/// A handle to a type in the global arena.
///
/// Equality and hashing are structural: two handles compare equal iff their
/// (kind, name, labels, length, key, elem, fields) trees are equal, with
/// cycles handled by bisimulation rather than infinite recursion.
#[derive(Clone, Copy)]
pub struct Type(pub(crate) u32);

/// A named struct or union member.
#[derive(Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

/// One immutable node in the arena. Which parts are populated depends on
/// the kind, mirroring the wire descriptor language.
pub(crate) struct Node {
    pub kind: Kind,
    /// Empty for unnamed types.
    pub name: String,
    /// Enum only.
    pub labels: Vec<String>,
    /// Array only.
    pub len: usize,
    /// Set and map only.
    pub key: Option<Type>,
    /// Array, list, map, and optional only.
    pub elem: Option<Type>,
    /// Struct and union only; order is part of the type's identity.
    pub fields: Vec<Field>,
}

impl Node {
    pub(crate) fn scalar(kind: Kind, name: &str) -> Node {
        Node {
            kind,
            name: name.to_string(),
            labels: Vec::new(),
            len: 0,
            key: None,
            elem: None,
            fields: Vec::new(),
        }
    }
}

struct Arena {
    nodes: Vec<Arc<Node>>,
}

lazy_static! {
    static ref ARENA: RwLock<Arena> = RwLock::new(Arena {
        nodes: bootstrap::seed().into_iter().map(Arc::new).collect(),
    });
}

impl Type {
    /// Snapshot this handle's node. The returned `Arc` keeps the node alive
    /// and borrowable without holding the arena lock.
    pub(crate) fn node(self) -> Arc<Node> {
        ARENA.read().expect(POISONED_ARENA_MSG).nodes[self.0 as usize].clone()
    }

    pub fn kind(self) -> Kind {
        self.node().kind
    }

    /// The wire-visible name, or `""` for unnamed types.
    pub fn name(self) -> String {
        self.node().name.clone()
    }

    pub fn is_named(self) -> bool {
        !self.node().name.is_empty()
    }

    /// Enum labels, in declaration order. Empty for non-enums.
    pub fn labels(self) -> Vec<String> {
        self.node().labels.clone()
    }

    /// Fixed element count. Zero for non-arrays.
    pub fn len(self) -> usize {
        self.node().len
    }

    /// Key type of a set or map.
    pub fn key(self) -> Option<Type> {
        self.node().key
    }

    /// Element type of an array, list, map, or optional.
    pub fn elem(self) -> Option<Type> {
        self.node().elem
    }

    /// Struct or union fields, in declaration order.
    pub fn fields(self) -> Vec<Field> {
        self.node().fields.clone()
    }

    /// Append a single node to the arena and return its handle.
    fn append(node: Node) -> Type {
        let mut arena = ARENA.write().expect(POISONED_ARENA_MSG);
        let handle = Type(arena.nodes.len() as u32);
        arena.nodes.push(Arc::new(node));
        handle
    }

    /// A named copy of `base`: same structure, different wire-visible name.
    pub fn named(name: &str, base: Type) -> Type {
        let node = base.node();
        Type::append(Node {
            kind: node.kind,
            name: name.to_string(),
            labels: node.labels.clone(),
            len: node.len,
            key: node.key,
            elem: node.elem,
            fields: node.fields.clone(),
        })
    }

    /// A named enum. Panics if `labels` is empty.
    pub fn enum_of(name: &str, labels: &[&str]) -> Type {
        assert!(!labels.is_empty(), "enum types need at least one label");
        let mut node = Node::scalar(Kind::Enum, name);
        node.labels = labels.iter().map(|l| l.to_string()).collect();
        Type::append(node)
    }

    pub fn array_of(len: usize, elem: Type) -> Type {
        let mut node = Node::scalar(Kind::Array, "");
        node.len = len;
        node.elem = Some(elem);
        Type::append(node)
    }

    pub fn list_of(elem: Type) -> Type {
        let mut node = Node::scalar(Kind::List, "");
        node.elem = Some(elem);
        Type::append(node)
    }

    pub fn set_of(key: Type) -> Type {
        let mut node = Node::scalar(Kind::Set, "");
        node.key = Some(key);
        Type::append(node)
    }

    pub fn map_of(key: Type, elem: Type) -> Type {
        let mut node = Node::scalar(Kind::Map, "");
        node.key = Some(key);
        node.elem = Some(elem);
        Type::append(node)
    }

    /// A struct with the given fields in order. Panics on duplicate or
    /// empty field names.
    pub fn struct_of(name: &str, fields: &[(&str, Type)]) -> Type {
        let mut node = Node::scalar(Kind::Struct, name);
        node.fields = collect_fields(fields);
        Type::append(node)
    }

    /// A union with the given variants in order. Panics if `fields` is
    /// empty or contains duplicate or empty names.
    pub fn union_of(name: &str, fields: &[(&str, Type)]) -> Type {
        assert!(!fields.is_empty(), "union types need at least one field");
        let mut node = Node::scalar(Kind::Union, name);
        node.fields = collect_fields(fields);
        Type::append(node)
    }

    pub fn optional_of(elem: Type) -> Type {
        let mut node = Node::scalar(Kind::Optional, "");
        node.elem = Some(elem);
        Type::append(node)
    }
}

fn collect_fields(fields: &[(&str, Type)]) -> Vec<Field> {
    let mut out = Vec::with_capacity(fields.len());
    for (name, ty) in fields {
        assert!(!name.is_empty(), "field names must be non-empty");
        assert!(
            !out.iter().any(|f: &Field| f.name == *name),
            "duplicate field name {name:?}"
        );
        out.push(Field {
            name: name.to_string(),
            ty: *ty,
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Structural equality, hashing, display.

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if self.0 == other.0 {
            return true;
        }
        let arena = ARENA.read().expect(POISONED_ARENA_MSG);
        structural_eq(&arena, *self, *other, &mut Vec::new())
    }
}

impl Eq for Type {}

/// Bisimulation equality: a pair already under comparison is assumed equal,
/// which terminates cyclic graphs and is exactly the equality of their
/// infinite unfoldings.
fn structural_eq(arena: &Arena, a: Type, b: Type, assumed: &mut Vec<(u32, u32)>) -> bool {
    if a.0 == b.0 {
        return true;
    }
    if assumed.contains(&(a.0, b.0)) {
        return true;
    }
    assumed.push((a.0, b.0));
    let na = &arena.nodes[a.0 as usize];
    let nb = &arena.nodes[b.0 as usize];
    na.kind == nb.kind
        && na.name == nb.name
        && na.labels == nb.labels
        && na.len == nb.len
        && sub_eq(arena, na.key, nb.key, assumed)
        && sub_eq(arena, na.elem, nb.elem, assumed)
        && na.fields.len() == nb.fields.len()
        && na
            .fields
            .iter()
            .zip(nb.fields.iter())
            .all(|(fa, fb)| fa.name == fb.name && structural_eq(arena, fa.ty, fb.ty, assumed))
}

fn sub_eq(arena: &Arena, a: Option<Type>, b: Option<Type>, assumed: &mut Vec<(u32, u32)>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => structural_eq(arena, a, b, assumed),
        _ => false,
    }
}

impl Hash for Type {
    /// A shallow structural hash: this node's own shape plus the kind and
    /// name of its immediate sub-types. Going deeper would have to give
    /// bisimilar-but-differently-shaped graphs identical hashes to stay
    /// consistent with `Eq`; stopping at depth one sidesteps that while
    /// still separating unrelated types.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let arena = ARENA.read().expect(POISONED_ARENA_MSG);
        let node = &arena.nodes[self.0 as usize];
        node.kind.hash(state);
        node.name.hash(state);
        node.labels.hash(state);
        node.len.hash(state);
        shallow_hash(&arena, node.key, state);
        shallow_hash(&arena, node.elem, state);
        node.fields.len().hash(state);
        for field in &node.fields {
            field.name.hash(state);
            shallow_hash(&arena, Some(field.ty), state);
        }
    }
}

fn shallow_hash<H: Hasher>(arena: &Arena, ty: Option<Type>, state: &mut H) {
    match ty {
        None => 0u8.hash(state),
        Some(t) => {
            1u8.hash(state);
            let node = &arena.nodes[t.0 as usize];
            node.kind.hash(state);
            node.name.hash(state);
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let arena = ARENA.read().expect(POISONED_ARENA_MSG);
        write_type(&arena, *self, f, &mut Vec::new())
    }
}

impl Debug for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(self, f)
    }
}

fn write_type(arena: &Arena, t: Type, f: &mut Formatter<'_>, path: &mut Vec<u32>) -> FmtResult {
    let node = &arena.nodes[t.0 as usize];
    if !node.name.is_empty() {
        return f.write_str(&node.name);
    }
    if path.contains(&t.0) {
        // An unnamed cycle; cut it off rather than recursing forever.
        return f.write_str("...");
    }
    path.push(t.0);
    let result = write_unnamed(arena, node, f, path);
    path.pop();
    result
}

fn write_unnamed(arena: &Arena, node: &Node, f: &mut Formatter<'_>, path: &mut Vec<u32>) -> FmtResult {
    match node.kind {
        Kind::Enum => {
            f.write_str("enum{")?;
            for (i, label) in node.labels.iter().enumerate() {
                if i > 0 {
                    f.write_char(';')?;
                }
                f.write_str(label)?;
            }
            f.write_char('}')
        }
        Kind::Array => {
            write!(f, "[{}]", node.len)?;
            write_sub(arena, node.elem, f, path)
        }
        Kind::List => {
            f.write_str("[]")?;
            write_sub(arena, node.elem, f, path)
        }
        Kind::Set => {
            f.write_str("set[")?;
            write_sub(arena, node.key, f, path)?;
            f.write_char(']')
        }
        Kind::Map => {
            f.write_str("map[")?;
            write_sub(arena, node.key, f, path)?;
            f.write_char(']')?;
            write_sub(arena, node.elem, f, path)
        }
        Kind::Struct | Kind::Union => {
            f.write_str(if node.kind == Kind::Struct {
                "struct{"
            } else {
                "union{"
            })?;
            for (i, field) in node.fields.iter().enumerate() {
                if i > 0 {
                    f.write_char(';')?;
                }
                f.write_str(&field.name)?;
                f.write_char(' ')?;
                write_type(arena, field.ty, f, path)?;
            }
            f.write_char('}')
        }
        Kind::Optional => {
            f.write_char('?')?;
            write_sub(arena, node.elem, f, path)
        }
        kind => Display::fmt(&kind, f),
    }
}

fn write_sub(arena: &Arena, ty: Option<Type>, f: &mut Formatter<'_>, path: &mut Vec<u32>) -> FmtResult {
    match ty {
        Some(t) => write_type(arena, t, f, path),
        // Unreachable for well-formed nodes; render something greppable.
        None => f.write_str("<missing>"),
    }
}

// ---------------------------------------------------------------------------
// Two-phase construction of cyclic graphs.

/// A reference to a type from inside a [`TypeBuilder`]: either an already
/// published handle or a local slot of the same builder.
#[derive(Clone, Copy)]
pub enum TypeRef {
    Built(Type),
    Pending(PendingType),
}

/// A forward-declared slot in a [`TypeBuilder`].
#[derive(Clone, Copy)]
pub struct PendingType(usize);

impl From<Type> for TypeRef {
    fn from(t: Type) -> TypeRef {
        TypeRef::Built(t)
    }
}

impl From<PendingType> for TypeRef {
    fn from(p: PendingType) -> TypeRef {
        TypeRef::Pending(p)
    }
}

/// An unpublished node whose sub-type references may point at other slots
/// of the same builder.
pub struct ProtoNode {
    kind: Kind,
    name: String,
    labels: Vec<String>,
    len: usize,
    key: Option<TypeRef>,
    elem: Option<TypeRef>,
    fields: Vec<(String, TypeRef)>,
}

impl ProtoNode {
    fn new(kind: Kind, name: &str) -> ProtoNode {
        ProtoNode {
            kind,
            name: name.to_string(),
            labels: Vec::new(),
            len: 0,
            key: None,
            elem: None,
            fields: Vec::new(),
        }
    }

    pub fn enum_of(name: &str, labels: Vec<String>) -> ProtoNode {
        let mut proto = ProtoNode::new(Kind::Enum, name);
        proto.labels = labels;
        proto
    }

    pub fn array_of(name: &str, len: usize, elem: TypeRef) -> ProtoNode {
        let mut proto = ProtoNode::new(Kind::Array, name);
        proto.len = len;
        proto.elem = Some(elem);
        proto
    }

    pub fn list_of(name: &str, elem: TypeRef) -> ProtoNode {
        let mut proto = ProtoNode::new(Kind::List, name);
        proto.elem = Some(elem);
        proto
    }

    pub fn set_of(name: &str, key: TypeRef) -> ProtoNode {
        let mut proto = ProtoNode::new(Kind::Set, name);
        proto.key = Some(key);
        proto
    }

    pub fn map_of(name: &str, key: TypeRef, elem: TypeRef) -> ProtoNode {
        let mut proto = ProtoNode::new(Kind::Map, name);
        proto.key = Some(key);
        proto.elem = Some(elem);
        proto
    }

    pub fn struct_of(name: &str, fields: Vec<(String, TypeRef)>) -> ProtoNode {
        let mut proto = ProtoNode::new(Kind::Struct, name);
        proto.fields = fields;
        proto
    }

    pub fn union_of(name: &str, fields: Vec<(String, TypeRef)>) -> ProtoNode {
        let mut proto = ProtoNode::new(Kind::Union, name);
        proto.fields = fields;
        proto
    }

    pub fn optional_of(name: &str, elem: TypeRef) -> ProtoNode {
        let mut proto = ProtoNode::new(Kind::Optional, name);
        proto.elem = Some(elem);
        proto
    }

    /// The same structure as an already published type, under a new name.
    pub fn renamed(base: Type, name: &str) -> ProtoNode {
        let node = base.node();
        ProtoNode {
            kind: node.kind,
            name: name.to_string(),
            labels: node.labels.clone(),
            len: node.len,
            key: node.key.map(TypeRef::Built),
            elem: node.elem.map(TypeRef::Built),
            fields: node
                .fields
                .iter()
                .map(|f| (f.name.clone(), TypeRef::Built(f.ty)))
                .collect(),
        }
    }
}

/// An attempt to publish a structurally invalid set of nodes.
#[derive(Debug)]
pub struct InvalidTypeError(String);

impl Display for InvalidTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "invalid type: {}", self.0)
    }
}

impl std::error::Error for InvalidTypeError {}

/// Builds one or more mutually-referential types in two phases: reserve
/// slots, fill each slot with a [`ProtoNode`], then publish the whole batch
/// atomically with [`TypeBuilder::build`].
pub struct TypeBuilder {
    protos: Vec<Option<ProtoNode>>,
}

impl TypeBuilder {
    pub fn new() -> TypeBuilder {
        TypeBuilder { protos: Vec::new() }
    }

    /// Reserve a slot that other nodes may reference before it is filled.
    pub fn slot(&mut self) -> PendingType {
        self.protos.push(None);
        PendingType(self.protos.len() - 1)
    }

    pub fn fill(&mut self, slot: PendingType, proto: ProtoNode) {
        self.protos[slot.0] = Some(proto);
    }

    /// Reserve and fill in one step, for nodes with no forward references
    /// into them.
    pub fn add(&mut self, proto: ProtoNode) -> PendingType {
        let slot = self.slot();
        self.fill(slot, proto);
        slot
    }

    /// Validate and publish every slot. Returns handles in slot order.
    pub fn build(self) -> Result<Vec<Type>, InvalidTypeError> {
        let slots = self.protos.len();
        let mut protos = Vec::with_capacity(slots);
        for (i, proto) in self.protos.into_iter().enumerate() {
            match proto {
                Some(p) => protos.push(p),
                None => return Err(InvalidTypeError(format!("slot {i} was never filled"))),
            }
        }
        for proto in &protos {
            validate(proto, slots)?;
        }

        let mut arena = ARENA.write().expect(POISONED_ARENA_MSG);
        let base = arena.nodes.len() as u32;
        let resolve = |r: TypeRef| match r {
            TypeRef::Built(t) => t,
            TypeRef::Pending(p) => Type(base + p.0 as u32),
        };
        let mut handles = Vec::with_capacity(slots);
        for proto in protos {
            handles.push(Type(arena.nodes.len() as u32));
            arena.nodes.push(Arc::new(Node {
                kind: proto.kind,
                name: proto.name,
                labels: proto.labels,
                len: proto.len,
                key: proto.key.map(resolve),
                elem: proto.elem.map(resolve),
                fields: proto
                    .fields
                    .into_iter()
                    .map(|(name, ty)| Field {
                        name,
                        ty: resolve(ty),
                    })
                    .collect(),
            }));
        }
        Ok(handles)
    }
}

impl Default for TypeBuilder {
    fn default() -> Self {
        TypeBuilder::new()
    }
}

fn validate(proto: &ProtoNode, slots: usize) -> Result<(), InvalidTypeError> {
    let check_ref = |r: &Option<TypeRef>, what: &str| match r {
        Some(TypeRef::Pending(PendingType(i))) if *i >= slots => Err(InvalidTypeError(format!(
            "{what} references slot {i} of a builder with {slots} slots"
        ))),
        Some(_) => Ok(()),
        None => Err(InvalidTypeError(format!(
            "{} type {:?} is missing its {what}",
            proto.kind, proto.name
        ))),
    };
    match proto.kind {
        Kind::Enum => {
            if proto.labels.is_empty() {
                return Err(InvalidTypeError(format!(
                    "enum {:?} has no labels",
                    proto.name
                )));
            }
        }
        Kind::Array | Kind::List | Kind::Optional => check_ref(&proto.elem, "element type")?,
        Kind::Set => check_ref(&proto.key, "key type")?,
        Kind::Map => {
            check_ref(&proto.key, "key type")?;
            check_ref(&proto.elem, "element type")?;
        }
        Kind::Struct | Kind::Union => {
            if proto.kind == Kind::Union && proto.fields.is_empty() {
                return Err(InvalidTypeError(format!(
                    "union {:?} has no fields",
                    proto.name
                )));
            }
            for (i, (name, r)) in proto.fields.iter().enumerate() {
                if name.is_empty() {
                    return Err(InvalidTypeError(format!(
                        "{} {:?} field {i} has an empty name",
                        proto.kind, proto.name
                    )));
                }
                if let TypeRef::Pending(PendingType(slot)) = r {
                    if *slot >= slots {
                        return Err(InvalidTypeError(format!(
                            "field {name:?} references slot {slot} of a builder with {slots} slots"
                        )));
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}
