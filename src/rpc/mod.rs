//! Route incoming (method name, argument bytes) calls to registered
//! service methods, marshalling through the codec.
//!
//! Services are wired explicitly at startup: an [`InterfaceDef`] declares
//! each method's argument types, result types, and tags, and a
//! [`ServiceBuilder`] binds one handler closure per method. The resulting
//! [`Invoker`]'s method index is immutable and safe for unlimited
//! concurrent calls.
//!
//! Handlers report domain-level failures by returning an
//! [`ApplicationError`] through their `anyhow::Error` channel; those are
//! propagated to the caller as structured data. Any other handler error is
//! a bug in the service: it is logged here in full and reported to the
//! caller as an opaque internal error that leaks nothing.

pub mod registry;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{ApplicationError, InvokeError};
use crate::types::Type;
use crate::value::Value;

pub use registry::InterfaceRegistry;

/// Per-call context passed to every handler. The transport that would
/// populate richer state lives outside this crate.
#[derive(Clone, Debug, Default)]
pub struct Context {
    /// Optional wall-clock deadline for the call.
    pub deadline: Option<SystemTime>,
}

impl Context {
    /// A context with no deadline.
    pub fn background() -> Context {
        Context::default()
    }
}

/// Call metadata passed to every handler alongside the [`Context`].
#[derive(Clone, Debug, Default)]
pub struct ServerCall {
    /// The invoked method name.
    pub method: String,
    /// The name suffix the call was addressed to.
    pub suffix: String,
    pub local_endpoint: String,
    pub remote_endpoint: String,
}

/// The declared shape of one remotely invokable method.
#[derive(Clone)]
pub struct MethodDef {
    pub name: String,
    /// Argument types, excluding the context/call convention parameters.
    pub args: Vec<Type>,
    /// Result types; a multi-result method declares one entry per result,
    /// in declaration order.
    pub results: Vec<Type>,
    /// Method tags, e.g. access-control annotations.
    pub tags: Vec<(Type, Value)>,
}

impl MethodDef {
    pub fn new(name: &str) -> MethodDef {
        MethodDef {
            name: name.to_string(),
            args: Vec::new(),
            results: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn arg(mut self, ty: Type) -> MethodDef {
        self.args.push(ty);
        self
    }

    pub fn result(mut self, ty: Type) -> MethodDef {
        self.results.push(ty);
        self
    }

    pub fn tag(mut self, ty: Type, value: Value) -> MethodDef {
        self.tags.push((ty, value));
        self
    }
}

/// The declared methods of one service interface.
#[derive(Clone)]
pub struct InterfaceDef {
    pub name: String,
    pub methods: Vec<MethodDef>,
}

impl InterfaceDef {
    pub fn new(name: &str, methods: Vec<MethodDef>) -> InterfaceDef {
        InterfaceDef {
            name: name.to_string(),
            methods,
        }
    }
}

/// The uniform calling convention every bound method presents.
pub type HandlerFn =
    dyn Fn(&Context, &ServerCall, Vec<Value>) -> Result<Vec<Value>, anyhow::Error> + Send + Sync;

struct MethodEntry {
    def: MethodDef,
    handler: Arc<HandlerFn>,
}

/// Assembles an [`Invoker`] from interface descriptors and handlers.
pub struct ServiceBuilder {
    service: String,
    interfaces: Vec<Arc<InterfaceDef>>,
    handlers: HashMap<String, Arc<HandlerFn>>,
}

impl ServiceBuilder {
    /// `service` names the implementation, for error messages and logs.
    pub fn new(service: &str) -> ServiceBuilder {
        ServiceBuilder {
            service: service.to_string(),
            interfaces: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    pub fn interface(mut self, def: Arc<InterfaceDef>) -> ServiceBuilder {
        self.interfaces.push(def);
        self
    }

    pub fn handler<F>(mut self, method: &str, handler: F) -> ServiceBuilder
    where
        F: Fn(&Context, &ServerCall, Vec<Value>) -> Result<Vec<Value>, anyhow::Error>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(method.to_string(), Arc::new(handler));
        self
    }

    /// Validate the wiring and build the immutable method index.
    pub fn build(mut self) -> Result<Invoker, InvokeError> {
        let invalid = |reason: String| InvokeError::InvalidService {
            service: self.service.clone(),
            reason,
        };
        if self.interfaces.is_empty() {
            return Err(invalid("implements no service interfaces".to_string()));
        }
        let mut methods = HashMap::new();
        for iface in &self.interfaces {
            for def in &iface.methods {
                if methods.contains_key(&def.name) {
                    return Err(invalid(format!(
                        "method \"{}\" is declared more than once",
                        def.name
                    )));
                }
                let handler = match self.handlers.remove(&def.name) {
                    Some(handler) => handler,
                    None => {
                        return Err(invalid(format!(
                            "method \"{}\" of interface \"{}\" has no handler",
                            def.name, iface.name
                        )))
                    }
                };
                methods.insert(
                    def.name.clone(),
                    MethodEntry {
                        def: def.clone(),
                        handler,
                    },
                );
            }
        }
        if let Some(stray) = self.handlers.keys().next() {
            return Err(invalid(format!(
                "handler \"{stray}\" matches no declared method"
            )));
        }
        tracing::debug!(
            service = %self.service,
            methods = methods.len(),
            "service method index built"
        );
        Ok(Invoker {
            service: self.service,
            methods,
        })
    }
}

/// An immutable name-to-method index over one service object. Safe to
/// share and call from any number of threads.
pub struct Invoker {
    service: String,
    methods: HashMap<String, MethodEntry>,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("service", &self.service)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Invoker {
    fn entry(&self, method: &str) -> Result<&MethodEntry, InvokeError> {
        self.methods
            .get(method)
            .ok_or_else(|| InvokeError::MethodNotFound {
                method: method.to_string(),
                service: self.service.clone(),
            })
    }

    /// Decode the argument payloads, invoke the bound handler, and encode
    /// the results, one payload per declared result.
    pub fn invoke(
        &self,
        ctx: &Context,
        call: &ServerCall,
        method: &str,
        args: &[Bytes],
    ) -> Result<Vec<Bytes>, InvokeError> {
        let entry = self.entry(method)?;
        if args.len() != entry.def.args.len() {
            return Err(InvokeError::ArgumentCount {
                method: method.to_string(),
                want: entry.def.args.len(),
                got: args.len(),
            });
        }
        let mut decoded = Vec::with_capacity(args.len());
        for (index, (bytes, ty)) in args.iter().zip(entry.def.args.iter()).enumerate() {
            let mut decoder = Decoder::new(bytes.clone());
            decoded.push(decoder.decode(*ty).map_err(|source| {
                InvokeError::BadArgument {
                    method: method.to_string(),
                    index,
                    source,
                }
            })?);
        }

        let results = match (entry.handler)(ctx, call, decoded) {
            Ok(results) => results,
            Err(err) => return Err(self.classify(method, err)),
        };

        if results.len() != entry.def.results.len() {
            tracing::error!(
                service = %self.service,
                method = %method,
                want = entry.def.results.len(),
                got = results.len(),
                "method returned the wrong number of results"
            );
            return Err(InvokeError::Internal {
                method: method.to_string(),
            });
        }
        let mut encoded = Vec::with_capacity(results.len());
        for (index, (value, ty)) in results.iter().zip(entry.def.results.iter()).enumerate() {
            let mut encoder = Encoder::new();
            encoder.encode(*ty, value).map_err(|source| {
                InvokeError::BadResult {
                    method: method.to_string(),
                    index,
                    source,
                }
            })?;
            encoded.push(encoder.into_bytes());
        }
        Ok(encoded)
    }

    /// Separate declared application errors from everything else. The
    /// everything-else case is logged in full here and reported opaquely.
    fn classify(&self, method: &str, err: anyhow::Error) -> InvokeError {
        match err.downcast::<ApplicationError>() {
            Ok(app) => {
                tracing::debug!(
                    service = %self.service,
                    method = %method,
                    id = %app.id,
                    "method reported an application error"
                );
                InvokeError::Application(app)
            }
            Err(other) => {
                tracing::error!(
                    service = %self.service,
                    method = %method,
                    error = ?other,
                    "method failed with an undeclared error"
                );
                InvokeError::Internal {
                    method: method.to_string(),
                }
            }
        }
    }

    /// Declared argument types of a method.
    pub fn arg_types(&self, method: &str) -> Result<&[Type], InvokeError> {
        Ok(&self.entry(method)?.def.args)
    }

    /// Declared result types of a method.
    pub fn result_types(&self, method: &str) -> Result<&[Type], InvokeError> {
        Ok(&self.entry(method)?.def.results)
    }

    /// Declared tags of a method.
    pub fn tags(&self, method: &str) -> Result<&[(Type, Value)], InvokeError> {
        Ok(&self.entry(method)?.def.tags)
    }

    /// Every declared method, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.values().map(|entry| &entry.def)
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}
