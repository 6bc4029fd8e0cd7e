//! Handler module - message dispatch on the cooperative thread.
//!
//! Provides [`HandlerRegistry`], which maps protocol ids to handlers and
//! isolates handler failures from each other.

mod registry;

pub use registry::{DispatchOutcome, Handler, HandlerRegistry, HandlerResult, TypedHandler};
