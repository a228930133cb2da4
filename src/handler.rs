//! Handler references and the call-adapter that invokes them.
//!
//! The dispatcher never calls a handler itself. It hands each event to an
//! [`Invoker`], which decides how a [`Handler`] reference is resolved and run.
//! A handler returning `None` (or JSON `null`) completes its step normally;
//! any other value is an abnormal return.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::{DispatchError, HookError, HookResult};
use crate::event::Event;

/// Shared handler closure.
pub type HandlerFn = Arc<dyn Fn(&mut Event, &Value) -> Option<Value> + Send + Sync>;

/// A handler reference as stored in a binding.
#[derive(Clone)]
pub enum Handler {
    /// A closure invoked directly.
    Callable(HandlerFn),
    /// A name that an [`Invoker`] resolves at dispatch time.
    Named(String),
}

impl Handler {
    /// Wraps a closure.
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&mut Event, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    /// Creates a named reference.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Human-readable label used in logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Callable(f) => format!("<callable {:p}>", Arc::as_ptr(f).cast::<()>()),
            Self::Named(name) => name.clone(),
        }
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Callable(a), Self::Callable(b)) => Arc::ptr_eq(a, b),
            (Self::Named(a), Self::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Handler::Callable(..)"),
            Self::Named(name) => f.debug_tuple("Handler::Named").field(name).finish(),
        }
    }
}

impl From<HandlerFn> for Handler {
    fn from(f: HandlerFn) -> Self {
        Self::Callable(f)
    }
}

impl From<&str> for Handler {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for Handler {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Call-adapter used by the dispatcher to run one event's handler.
pub trait Invoker: Send + Sync {
    /// Invokes the handler of `event` with `data`.
    ///
    /// Returns the handler's result, or `DispatchError::HandlerNotInvocable`
    /// if the reference cannot be resolved.
    fn invoke(&self, event: &mut Event, data: &Value) -> HookResult<Option<Value>>;
}

/// Runs callables directly and rejects named handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectInvoker;

impl Invoker for DirectInvoker {
    fn invoke(&self, event: &mut Event, data: &Value) -> HookResult<Option<Value>> {
        match event.handler().clone() {
            Handler::Callable(f) => Ok(f(event, data)),
            Handler::Named(name) => Err(HookError::Dispatch(DispatchError::HandlerNotInvocable {
                handler: name,
                reason: "named handler without a resolver".to_string(),
            })),
        }
    }
}

/// Resolves named handlers to closures.
pub trait HandlerResolver: Send + Sync {
    /// Looks up the closure registered under `name`.
    fn resolve(&self, name: &str) -> Option<HandlerFn>;
}

/// In-memory name → closure table.
#[derive(Default)]
pub struct NamedHandlers {
    handlers: RwLock<HashMap<String, HandlerFn>>,
}

impl NamedHandlers {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the closure for `name`.
    pub fn insert<F>(&self, name: impl Into<String>, f: F) -> HookResult<()>
    where
        F: Fn(&mut Event, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        let mut guard = self
            .handlers
            .write()
            .map_err(|_| HookError::internal("named handler lock poisoned"))?;
        guard.insert(name.into(), Arc::new(f));
        Ok(())
    }

    /// Removes the closure for `name`, returning true if it existed.
    pub fn remove(&self, name: &str) -> HookResult<bool> {
        let mut guard = self
            .handlers
            .write()
            .map_err(|_| HookError::internal("named handler lock poisoned"))?;
        Ok(guard.remove(name).is_some())
    }
}

impl fmt::Debug for NamedHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .handlers
            .read()
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("NamedHandlers").field("names", &names).finish()
    }
}

impl HandlerResolver for NamedHandlers {
    fn resolve(&self, name: &str) -> Option<HandlerFn> {
        self.handlers.read().ok()?.get(name).cloned()
    }
}

/// Invoker that delegates named handlers to a [`HandlerResolver`].
#[derive(Debug)]
pub struct ResolvingInvoker<R> {
    resolver: R,
}

impl<R: HandlerResolver> ResolvingInvoker<R> {
    /// Wraps a resolver.
    pub const fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// The wrapped resolver.
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }
}

impl<R: HandlerResolver> Invoker for ResolvingInvoker<R> {
    fn invoke(&self, event: &mut Event, data: &Value) -> HookResult<Option<Value>> {
        let f = match event.handler() {
            Handler::Callable(f) => Arc::clone(f),
            Handler::Named(name) => self.resolver.resolve(name).ok_or_else(|| {
                HookError::Dispatch(DispatchError::HandlerNotInvocable {
                    handler: name.clone(),
                    reason: "resolver has no handler with this name".to_string(),
                })
            })?,
        };
        Ok(f(event, data))
    }
}

impl<R: HandlerResolver> HandlerResolver for Arc<R> {
    fn resolve(&self, name: &str) -> Option<HandlerFn> {
        (**self).resolve(name)
    }
}
