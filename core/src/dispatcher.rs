//! Sends one configured request and fans its outcome out to listeners.
//!
//! # Design
//! A `RequestDispatcher` is bound to one request row and performs at most one
//! send: `Idle → Building → InFlight → Completed`, or `Building → Abandoned`
//! when the row cannot be resolved. Everything the completion needs (store,
//! registry, channels, state) lives in an `Arc` captured by the transport
//! continuation, so completion may run on any thread after `send` returned.
//!
//! On completion the bound handler type is looked up again from the request
//! row and instantiated fresh, the result is routed to an `Outcome`, the
//! handler runs, then exactly one broadcast channel fires. Handler panics are
//! caught so the broadcast still happens.
//!
//! A misconfigured request produces no notification at all. The only trace
//! is a `warn!` log and the `Abandoned` state.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::broadcast::Broadcast;
use crate::config::{ConfigStore, RowKey};
use crate::handler::{HandlerContext, HandlerRegistry, ResponseHandler};
use crate::http::{HttpResponse, RequestPlan};
use crate::outcome::Outcome;
use crate::resolver::RequestResolver;
use crate::transport::{Completion, Transport};

/// Lifecycle of a dispatcher's single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Building,
    InFlight,
    Completed,
    /// Resolution failed; nothing was sent and nothing will be notified.
    Abandoned,
}

/// Dispatches the request configured under one row key.
pub struct RequestDispatcher {
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
}

struct Shared {
    id: Uuid,
    request_key: RowKey,
    store: Arc<dyn ConfigStore>,
    handlers: Arc<HandlerRegistry>,
    state: Mutex<DispatchState>,
    on_request_failed: Broadcast,
    on_request_succeeded: Broadcast,
}

impl RequestDispatcher {
    pub fn new(
        request_key: impl Into<RowKey>,
        store: Arc<dyn ConfigStore>,
        handlers: Arc<HandlerRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                request_key: request_key.into(),
                store,
                handlers,
                state: Mutex::new(DispatchState::Idle),
                on_request_failed: Broadcast::new(),
                on_request_succeeded: Broadcast::new(),
            }),
            transport,
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn request_key(&self) -> &str {
        &self.shared.request_key
    }

    pub fn state(&self) -> DispatchState {
        *self.shared.state.lock()
    }

    /// Fires when the transport failed to connect or produced no response.
    pub fn on_request_failed(&self) -> &Broadcast {
        &self.shared.on_request_failed
    }

    /// Fires when the transport connected, whatever the HTTP status.
    pub fn on_request_succeeded(&self) -> &Broadcast {
        &self.shared.on_request_succeeded
    }

    /// Resolve the bound request row without sending it.
    pub fn build_request(&self) -> Option<RequestPlan> {
        RequestResolver::new(self.shared.store.as_ref()).resolve(&self.shared.request_key)
    }

    /// Send the bound request with `body`.
    ///
    /// Returns immediately; the outcome arrives through the bound handler and
    /// the broadcast channels. Only the first call on a dispatcher sends.
    pub fn send(&self, body: impl Into<String>) {
        let shared = &self.shared;
        {
            let mut state = shared.state.lock();
            if *state != DispatchState::Idle {
                warn!(
                    dispatch_id = %shared.id,
                    request = %shared.request_key,
                    state = ?*state,
                    "dispatcher already used; send ignored"
                );
                return;
            }
            *state = DispatchState::Building;
        }

        let plan = match RequestResolver::new(shared.store.as_ref()).try_resolve(&shared.request_key)
        {
            Ok(plan) => plan,
            Err(err) => {
                warn!(
                    dispatch_id = %shared.id,
                    request = %shared.request_key,
                    error = %err,
                    "request misconfigured; send abandoned"
                );
                *shared.state.lock() = DispatchState::Abandoned;
                return;
            }
        };

        debug!(
            dispatch_id = %shared.id,
            request = %shared.request_key,
            method = %plan.method,
            url = %plan.url,
            timeout_seconds = plan.timeout_seconds,
            "submitting request"
        );
        *shared.state.lock() = DispatchState::InFlight;

        let continuation = Arc::clone(shared);
        let completion = Completion::new(move |connected, response| {
            continuation.complete(connected, response);
        });
        self.transport.submit(plan.into_request(body), completion);
    }
}

impl Shared {
    fn complete(&self, connected: bool, response: Option<HttpResponse>) {
        {
            let mut state = self.state.lock();
            if *state != DispatchState::InFlight {
                warn!(
                    dispatch_id = %self.id,
                    state = ?*state,
                    "completion outside of flight ignored"
                );
                return;
            }
            *state = DispatchState::Completed;
        }

        let handler = self.instantiate_handler();
        let outcome = Outcome::route(connected, response);
        debug!(
            dispatch_id = %self.id,
            request = %self.request_key,
            connected,
            status = %outcome.status(),
            success = outcome.is_success(),
            "request completed"
        );

        if let Some(handler) = handler {
            self.run_handler(handler, &outcome);
        }

        match &outcome {
            Outcome::Succeeded { status, data } => {
                self.on_request_succeeded.emit(*status, Some(data));
            }
            Outcome::Failed { status, data } => {
                self.on_request_failed.emit(*status, data.as_ref());
            }
        }
    }

    fn instantiate_handler(&self) -> Option<Box<dyn ResponseHandler>> {
        let record = self.store.request(&self.request_key)?;
        let type_name = record.response_handler.as_deref()?;
        let context = HandlerContext {
            dispatch_id: self.id,
            request_key: self.request_key.clone(),
        };
        let handler = self.handlers.instantiate(type_name, &context);
        if handler.is_none() {
            warn!(
                dispatch_id = %self.id,
                handler = type_name,
                "response handler type is not registered"
            );
        }
        handler
    }

    fn run_handler(&self, mut handler: Box<dyn ResponseHandler>, outcome: &Outcome) {
        let result = catch_unwind(AssertUnwindSafe(|| match outcome {
            Outcome::Succeeded { status, data } => handler.handle_success(*status, Some(data)),
            Outcome::Failed { status, data } => handler.handle_failure(*status, data.as_ref()),
        }));
        if result.is_err() {
            error!(
                dispatch_id = %self.id,
                request = %self.request_key,
                "response handler panicked"
            );
        }
    }
}

impl fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("id", &self.shared.id)
            .field("request_key", &self.shared.request_key)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InMemoryConfigStore, RequestRecord, ServiceRecord};
    use crate::http::{HttpMethod, ResponseData};
    use crate::status::StatusKind;
    use crate::transport::HostTransport;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recording {
        log: Log,
    }

    impl ResponseHandler for Recording {
        fn handle_success(&mut self, status: StatusKind, _response: Option<&ResponseData>) {
            self.log.lock().push(format!("handler success {status}"));
        }

        fn handle_failure(&mut self, status: StatusKind, _response: Option<&ResponseData>) {
            self.log.lock().push(format!("handler failure {status}"));
        }
    }

    struct Fixture {
        dispatcher: RequestDispatcher,
        transport: Arc<HostTransport>,
        log: Log,
    }

    fn fixture(request_key: &str) -> Fixture {
        let store = InMemoryConfigStore::default()
            .with_service(
                "svc",
                ServiceRecord::new("svc", "http://api.test")
                    .with_header("Accept", "application/json")
                    .with_timeout(5),
            )
            .with_request(
                "create",
                RequestRecord::new("create", "svc", HttpMethod::Post, "/things")
                    .with_timeout(3)
                    .with_handler("Recording"),
            )
            .with_request(
                "orphan",
                RequestRecord::new("orphan", "missing", HttpMethod::Get, "/"),
            );

        let log: Log = Arc::default();
        let handler_log = Arc::clone(&log);
        let mut handlers = HandlerRegistry::new();
        handlers.register("Recording", move |_| {
            Box::new(Recording {
                log: Arc::clone(&handler_log),
            })
        });

        let transport = Arc::new(HostTransport::new());
        let dispatcher = RequestDispatcher::new(
            request_key,
            Arc::new(store),
            Arc::new(handlers),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );

        let failed = Arc::clone(&log);
        dispatcher
            .on_request_failed()
            .subscribe(move |status, _| failed.lock().push(format!("broadcast failed {status}")));
        let succeeded = Arc::clone(&log);
        dispatcher.on_request_succeeded().subscribe(move |status, _| {
            succeeded.lock().push(format!("broadcast succeeded {status}"))
        });

        Fixture {
            dispatcher,
            transport,
            log,
        }
    }

    #[test]
    fn send_submits_the_resolved_plan_with_body() {
        let f = fixture("create");
        assert_eq!(f.dispatcher.state(), DispatchState::Idle);
        f.dispatcher.send(r#"{"name":"widget"}"#);
        assert_eq!(f.dispatcher.state(), DispatchState::InFlight);

        let pending = f.transport.take_pending().unwrap();
        let req = pending.request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://api.test/things");
        assert_eq!(req.headers["Accept"], "application/json");
        assert_eq!(req.body, r#"{"name":"widget"}"#);
        assert_eq!(req.timeout_seconds, 3.0);
        assert!(f.log.lock().is_empty());
    }

    #[test]
    fn handler_runs_before_success_broadcast() {
        let f = fixture("create");
        f.dispatcher.send("");
        f.transport
            .take_pending()
            .unwrap()
            .complete(true, Some(HttpResponse::new(201, "{}")));

        assert_eq!(f.dispatcher.state(), DispatchState::Completed);
        assert_eq!(
            *f.log.lock(),
            vec![
                "handler success HTTP_CREATED_201".to_string(),
                "broadcast succeeded HTTP_CREATED_201".to_string(),
            ]
        );
    }

    #[test]
    fn missing_response_routes_to_failure() {
        let f = fixture("create");
        f.dispatcher.send("");
        f.transport.take_pending().unwrap().complete(true, None);
        assert_eq!(
            *f.log.lock(),
            vec![
                "handler failure HTTP_UNRECOGNIZED".to_string(),
                "broadcast failed HTTP_UNRECOGNIZED".to_string(),
            ]
        );
    }

    #[test]
    fn misconfigured_request_sends_and_notifies_nothing() {
        for key in ["orphan", "no-such-row"] {
            let f = fixture(key);
            assert!(f.dispatcher.build_request().is_none());
            f.dispatcher.send("body");
            assert_eq!(f.dispatcher.state(), DispatchState::Abandoned);
            assert_eq!(f.transport.pending_len(), 0);
            assert!(f.log.lock().is_empty());
        }
    }

    #[test]
    fn second_send_is_ignored() {
        let f = fixture("create");
        f.dispatcher.send("first");
        f.dispatcher.send("second");
        assert_eq!(f.transport.pending_len(), 1);
        assert_eq!(f.transport.take_pending().unwrap().request().body, "first");
    }

    #[test]
    fn build_request_does_not_send() {
        let f = fixture("create");
        let plan = f.dispatcher.build_request().unwrap();
        assert_eq!(plan.url, "http://api.test/things");
        assert_eq!(f.transport.pending_len(), 0);
        assert_eq!(f.dispatcher.state(), DispatchState::Idle);
    }

    #[test]
    fn panicking_handler_still_broadcasts() {
        struct Exploding;
        impl ResponseHandler for Exploding {
            fn handle_success(&mut self, _: StatusKind, _: Option<&ResponseData>) {
                panic!("handler bug");
            }
        }

        let store = InMemoryConfigStore::default()
            .with_service("svc", ServiceRecord::new("svc", "http://api.test"))
            .with_request(
                "get",
                RequestRecord::new("get", "svc", HttpMethod::Get, "/").with_handler("Exploding"),
            );
        let mut handlers = HandlerRegistry::new();
        handlers.register("Exploding", |_| Box::new(Exploding));
        let transport = Arc::new(HostTransport::new());
        let dispatcher = RequestDispatcher::new(
            "get",
            Arc::new(store),
            Arc::new(handlers),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        let fired = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&fired);
        dispatcher
            .on_request_succeeded()
            .subscribe(move |_, _| *counter.lock() += 1);

        dispatcher.send("");
        transport
            .take_pending()
            .unwrap()
            .complete(true, Some(HttpResponse::new(200, "")));
        assert_eq!(*fired.lock(), 1);
        assert_eq!(dispatcher.state(), DispatchState::Completed);
    }
}
