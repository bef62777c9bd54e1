//! A self-describing binary codec for typed values, plus the method
//! invocation layer that marshals service calls through it.
//!
//! Type information travels on the wire: the first time an encoder sees a
//! type it emits a definition message, so a decoder in another process can
//! reconstruct values without sharing any type declarations with the
//! encoder. Types are modelled as handles into a global arena
//! ([`types::Type`]), values as a dynamic enum ([`value::Value`]), and one
//! [`encode::Encoder`]/[`decode::Decoder`] pair owns each stream.
//!
//! The [`rpc`] module sits on top: services register their interfaces and
//! handlers explicitly at startup, and the resulting [`rpc::Invoker`]
//! decodes argument payloads, dispatches, and encodes results.

pub mod bootstrap;
mod convert;
pub mod decode;
pub mod encode;
pub mod error;
pub mod kind;
pub mod primitives;
pub mod rpc;
pub mod types;
pub mod value;

pub use bootstrap::TypeId;
pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{ApplicationError, DecodeError, DecodeFault, EncodeError, InvokeError};
pub use kind::Kind;
pub use types::{Field, PendingType, ProtoNode, Type, TypeBuilder, TypeRef};
pub use value::Value;
