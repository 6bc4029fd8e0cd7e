//! Handler registry for dispatching decoded messages by protocol id.
//!
//! Handlers run on the thread that drives [`Client::tick`](crate::Client::tick),
//! never on the receive task, so the map itself needs no locking.
//!
//! # Example
//!
//! ```
//! use gamewire_client::handler::{DispatchOutcome, HandlerRegistry};
//! use gamewire_client::protocol::Message;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_typed(7, |greeting: &String| {
//!     assert_eq!(greeting, "hi");
//!     Ok(())
//! });
//!
//! let outcome = registry.dispatch(&Message::new(7, "hi".to_string()));
//! assert_eq!(outcome, DispatchOutcome::Handled);
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{Result, TransportError};
use crate::protocol::Message;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Trait for message handlers.
pub trait Handler: Send + 'static {
    /// Handle one decoded message.
    fn call(&mut self, message: &Message) -> HandlerResult;
}

impl<F> Handler for F
where
    F: FnMut(&Message) -> HandlerResult + Send + 'static,
{
    fn call(&mut self, message: &Message) -> HandlerResult {
        self(message)
    }
}

/// Wrapper that downcasts the decoded message before calling the handler.
pub struct TypedHandler<F, T>
where
    F: FnMut(&T) -> HandlerResult + Send + 'static,
    T: Any,
{
    handler: F,
    _phantom: PhantomData<fn(&T)>,
}

impl<F, T> TypedHandler<F, T>
where
    F: FnMut(&T) -> HandlerResult + Send + 'static,
    T: Any,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T> Handler for TypedHandler<F, T>
where
    F: FnMut(&T) -> HandlerResult + Send + 'static,
    T: Any,
{
    fn call(&mut self, message: &Message) -> HandlerResult {
        match message.downcast_ref::<T>() {
            Some(value) => (self.handler)(value),
            None => Err(TransportError::Handler(format!(
                "protocol {} was not decoded as {}",
                message.protocol_id(),
                type_name::<T>()
            ))),
        }
    }
}

/// What happened to one dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler ran and returned `Ok`.
    Handled,
    /// Handler returned an error (logged).
    Failed,
    /// Handler panicked (caught and logged).
    Panicked,
    /// No handler registered; message discarded.
    NoHandler,
}

/// Registry mapping protocol ids to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<u16, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a closure, replacing any previous handler for `protocol_id`.
    pub fn register<F>(&mut self, protocol_id: u16, handler: F)
    where
        F: FnMut(&Message) -> HandlerResult + Send + 'static,
    {
        self.register_handler(protocol_id, handler);
    }

    /// Register any [`Handler`] implementation.
    pub fn register_handler<H: Handler>(&mut self, protocol_id: u16, handler: H) {
        if self.handlers.insert(protocol_id, Box::new(handler)).is_some() {
            tracing::debug!(protocol_id, "Replaced existing handler");
        }
    }

    /// Register a handler that receives the decoded value as `&T`.
    pub fn register_typed<T, F>(&mut self, protocol_id: u16, handler: F)
    where
        T: Any,
        F: FnMut(&T) -> HandlerResult + Send + 'static,
    {
        self.register_handler(protocol_id, TypedHandler::new(handler));
    }

    /// Remove the handler for `protocol_id`. Returns whether one existed.
    pub fn unregister(&mut self, protocol_id: u16) -> bool {
        self.handlers.remove(&protocol_id).is_some()
    }

    /// Whether a handler is registered for `protocol_id`.
    pub fn contains(&self, protocol_id: u16) -> bool {
        self.handlers.contains_key(&protocol_id)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch a message to its handler.
    ///
    /// Errors and panics from the handler are logged and reported through
    /// the outcome; they never propagate to the caller.
    pub fn dispatch(&mut self, message: &Message) -> DispatchOutcome {
        let protocol_id = message.protocol_id();
        let Some(handler) = self.handlers.get_mut(&protocol_id) else {
            tracing::debug!(protocol_id, "No handler registered, message discarded");
            return DispatchOutcome::NoHandler;
        };

        match catch_unwind(AssertUnwindSafe(|| handler.call(message))) {
            Ok(Ok(())) => DispatchOutcome::Handled,
            Ok(Err(e)) => {
                tracing::error!(protocol_id, "Handler error: {}", e);
                DispatchOutcome::Failed
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(protocol_id, "Handler panicked: {}", reason);
                DispatchOutcome::Panicked
            }
        }
    }
}
