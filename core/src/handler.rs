//! Pluggable per-request response handlers.
//!
//! # Design
//! A request record names its handler type as a string. The `HandlerRegistry`
//! maps those names to factories, and the dispatcher instantiates a fresh
//! handler for every completed request, passing a `HandlerContext` that ties
//! the instance to the owning dispatcher. Both trait methods default to
//! no-ops, so a handler only overrides the side it cares about.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::RowKey;
use crate::http::ResponseData;
use crate::status::StatusKind;

/// Receives the outcome of one completed request.
pub trait ResponseHandler: Send {
    /// Called when the transport connected, whatever the HTTP status.
    fn handle_success(&mut self, _status: StatusKind, _response: Option<&ResponseData>) {}

    /// Called when the transport failed to connect or produced no response.
    fn handle_failure(&mut self, _status: StatusKind, _response: Option<&ResponseData>) {}
}

/// Handler that ignores both outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl ResponseHandler for NoopHandler {}

/// The owning dispatcher a handler instance is created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContext {
    pub dispatch_id: Uuid,
    pub request_key: RowKey,
}

/// Creates a handler instance for one completion.
pub type HandlerFactory = Arc<dyn Fn(&HandlerContext) -> Box<dyn ResponseHandler> + Send + Sync>;

/// Handler factories keyed by the type name stored in request records.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `type_name`, replacing any earlier entry.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&HandlerContext) -> Box<dyn ResponseHandler> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Arc::new(factory));
        self
    }

    /// Register a handler type constructed with `Default::default()`.
    pub fn register_default<H>(&mut self, type_name: impl Into<String>) -> &mut Self
    where
        H: ResponseHandler + Default + 'static,
    {
        self.register(type_name, |_| Box::new(H::default()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Create a fresh handler, or `None` if `type_name` is not registered.
    pub fn instantiate(
        &self,
        type_name: &str,
        context: &HandlerContext,
    ) -> Option<Box<dyn ResponseHandler>> {
        self.factories.get(type_name).map(|factory| factory(context))
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn context() -> HandlerContext {
        HandlerContext {
            dispatch_id: Uuid::nil(),
            request_key: "req".to_string(),
        }
    }

    #[test]
    fn noop_handler_accepts_both_outcomes() {
        let mut handler = NoopHandler;
        handler.handle_success(StatusKind::Ok, None);
        handler.handle_failure(StatusKind::Unrecognized, None);
    }

    #[test]
    fn unregistered_type_instantiates_nothing() {
        let registry = HandlerRegistry::new();
        assert!(!registry.contains("Missing"));
        assert!(registry.instantiate("Missing", &context()).is_none());
    }

    #[test]
    fn each_instantiation_calls_the_factory() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let mut registry = HandlerRegistry::new();
        registry.register("Counting", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(NoopHandler)
        });

        assert!(registry.instantiate("Counting", &context()).is_some());
        assert!(registry.instantiate("Counting", &context()).is_some());
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn factory_receives_the_context() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let slot = Arc::clone(&seen);
        let mut registry = HandlerRegistry::new();
        registry.register("Capture", move |ctx| {
            *slot.lock() = Some(ctx.clone());
            Box::new(NoopHandler)
        });

        registry.instantiate("Capture", &context());
        assert_eq!(seen.lock().as_ref(), Some(&context()));
    }

    #[test]
    fn register_default_uses_default_constructor() {
        let mut registry = HandlerRegistry::new();
        registry.register_default::<NoopHandler>("Noop");
        assert!(registry.contains("Noop"));
        assert_eq!(format!("{registry:?}"), r#"HandlerRegistry { types: ["Noop"] }"#);
    }
}
