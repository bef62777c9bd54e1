//! Error types for the codec and the invoker.
//!
//! Codec errors carry a traceback of the nesting levels that were being
//! encoded or decoded when the failure occurred, so an error deep inside a
//! compound value renders as `DecodeError(.path[3].field): message`.

use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult, Write};

use crate::types::Type;

/// One level of nesting in an error traceback (most recent first).
#[derive(Clone)]
pub enum ErrorLevel {
    /// Struct or union field name.
    Field(String),
    /// Collection element index.
    Index(usize),
    /// Map or set key, rendered for the message.
    Key(String),
}

fn write_trail(trail: &[ErrorLevel], f: &mut Formatter<'_>) -> FmtResult {
    for level in trail.iter().rev() {
        match level {
            ErrorLevel::Field(name) => {
                f.write_char('.')?;
                f.write_str(name)?;
            }
            ErrorLevel::Index(index) => {
                f.write_char('[')?;
                Display::fmt(index, f)?;
                f.write_char(']')?;
            }
            ErrorLevel::Key(key) => {
                f.write_str("[\"")?;
                f.write_str(key)?;
                f.write_str("\"]")?;
            }
        }
    }
    Ok(())
}

/// An error encountered while encoding a value.
///
/// Encoding fails only when a value's runtime representation does not match
/// its declared kind; all such failures are deterministic and non-retryable.
pub struct EncodeError {
    message: String,
    trail: Vec<ErrorLevel>,
}

impl EncodeError {
    #[cold]
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trail: Vec::new(),
        }
    }

    #[cold]
    pub(crate) fn with_field(mut self, name: &str) -> Self {
        self.trail.push(ErrorLevel::Field(name.to_string()));
        self
    }

    #[cold]
    pub(crate) fn with_index(mut self, i: usize) -> Self {
        self.trail.push(ErrorLevel::Index(i));
        self
    }
}

impl Debug for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("EncodeError(")?;
        write_trail(&self.trail, f)?;
        f.write_str("): ")?;
        f.write_str(&self.message)
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(self, f)
    }
}

impl StdError for EncodeError {}

/// What went wrong during a decode: the bytes themselves are broken, or the
/// bytes are fine but cannot be represented as the requested target type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeFault {
    /// Malformed varint, unexpected EOF, unknown wire tag, out-of-range
    /// discriminant, or a type id that never resolves.
    Corrupt,
    /// The wire type's shape cannot be mapped onto the target type.
    Incompatible,
}

/// An error encountered while decoding a stream.
pub struct DecodeError {
    fault: DecodeFault,
    message: String,
    trail: Vec<ErrorLevel>,
}

impl DecodeError {
    #[cold]
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self {
            fault: DecodeFault::Corrupt,
            message: message.into(),
            trail: Vec::new(),
        }
    }

    #[cold]
    pub(crate) fn eof(reading: &str) -> Self {
        Self::corrupt(format!("unexpected end of stream reading {reading}"))
    }

    /// A wire type whose shape cannot be mapped onto the requested target.
    #[cold]
    pub(crate) fn incompatible(wire: Type, target: Type) -> Self {
        Self {
            fault: DecodeFault::Incompatible,
            message: format!("cannot convert wire type {wire} to target type {target}"),
            trail: Vec::new(),
        }
    }

    /// A conversion failure with extra detail about the offending value.
    #[cold]
    pub(crate) fn conversion(message: impl Into<String>) -> Self {
        Self {
            fault: DecodeFault::Incompatible,
            message: message.into(),
            trail: Vec::new(),
        }
    }

    #[cold]
    pub(crate) fn with_field(mut self, name: &str) -> Self {
        self.trail.push(ErrorLevel::Field(name.to_string()));
        self
    }

    #[cold]
    pub(crate) fn with_index(mut self, i: usize) -> Self {
        self.trail.push(ErrorLevel::Index(i));
        self
    }

    #[cold]
    pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
        self.trail.push(ErrorLevel::Key(key.into()));
        self
    }

    /// Which class of failure this is.
    pub fn fault(&self) -> DecodeFault {
        self.fault
    }
}

impl Debug for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("DecodeError(")?;
        write_trail(&self.trail, f)?;
        f.write_str("): ")?;
        f.write_str(&self.message)
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(self, f)
    }
}

impl StdError for DecodeError {}

/// A domain-level failure reported by a service method itself.
///
/// This is the one error kind the invoker propagates to remote callers as
/// structured data instead of an opaque failure. Handlers report it through
/// their [`anyhow::Error`] return channel; the invoker recovers it by
/// downcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationError {
    /// Stable error identifier, e.g. `"v.io/v23/verror.NoExist"`.
    pub id: String,
    /// Human-readable message.
    pub msg: String,
}

impl ApplicationError {
    pub fn new(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            msg: msg.into(),
        }
    }
}

impl Display for ApplicationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.id, self.msg)
    }
}

impl StdError for ApplicationError {}

/// An error reported by [`Invoker`](crate::rpc::Invoker) operations.
#[derive(Debug)]
pub enum InvokeError {
    /// No method with this name is registered on the target service.
    MethodNotFound { method: String, service: String },
    /// A service was assembled inconsistently (no interfaces, missing or
    /// stray handlers, duplicate method names).
    InvalidService { service: String, reason: String },
    /// The caller supplied the wrong number of argument payloads.
    ArgumentCount {
        method: String,
        want: usize,
        got: usize,
    },
    /// An argument payload failed to decode against its declared type.
    BadArgument {
        method: String,
        index: usize,
        source: DecodeError,
    },
    /// A result value failed to encode against its declared type.
    BadResult {
        method: String,
        index: usize,
        source: EncodeError,
    },
    /// The method reported a structured domain-level failure.
    Application(ApplicationError),
    /// The method failed in a way it is not allowed to: the details are in
    /// the server's own logs, never in this error.
    Internal { method: String },
}

impl Display for InvokeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            InvokeError::MethodNotFound { method, service } => {
                write!(f, "method \"{method}\" not found on service \"{service}\"")
            }
            InvokeError::InvalidService { service, reason } => {
                write!(f, "invalid service \"{service}\": {reason}")
            }
            InvokeError::ArgumentCount { method, want, got } => {
                write!(f, "method \"{method}\" takes {want} argument(s), got {got}")
            }
            InvokeError::BadArgument {
                method,
                index,
                source,
            } => {
                write!(f, "method \"{method}\" argument {index}: {source}")
            }
            InvokeError::BadResult {
                method,
                index,
                source,
            } => {
                write!(f, "method \"{method}\" result {index}: {source}")
            }
            InvokeError::Application(err) => Display::fmt(err, f),
            InvokeError::Internal { method } => {
                write!(f, "internal error invoking method \"{method}\"")
            }
        }
    }
}

impl StdError for InvokeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            InvokeError::BadArgument { source, .. } => Some(source),
            InvokeError::BadResult { source, .. } => Some(source),
            InvokeError::Application(err) => Some(err),
            _ => None,
        }
    }
}
