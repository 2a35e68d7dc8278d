//! The transport seam and the host-driven transport.
//!
//! # Design
//! A transport receives an `HttpRequest` together with a `Completion` and
//! must eventually call `Completion::complete` exactly once, from any thread.
//! `complete` consumes the completion, so firing it twice does not compile.
//! A transport that drops a completion without firing it leaves the
//! dispatcher in flight forever; there is no cancellation.
//!
//! `HostTransport` implements the host-does-IO pattern: submissions are
//! parked in a queue, the embedding program takes them, performs the network
//! round trip itself and reports the result through the `PendingRequest`.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use crate::http::{HttpRequest, HttpResponse};

/// Single-shot continuation run when a submitted request finishes.
pub struct Completion {
    callback: Box<dyn FnOnce(bool, Option<HttpResponse>) + Send>,
}

impl Completion {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(bool, Option<HttpResponse>) + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report the result of the round trip.
    ///
    /// `connected` is false when the transport could not complete the
    /// exchange; `response` is `None` when no response object exists at all.
    pub fn complete(self, connected: bool, response: Option<HttpResponse>) {
        (self.callback)(connected, response);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

/// Executes HTTP requests on behalf of a dispatcher.
pub trait Transport: Send + Sync {
    /// Start `request`. Must not block on the network; the result is
    /// delivered through `completion`.
    fn submit(&self, request: HttpRequest, completion: Completion);
}

/// A submitted request waiting for the host to execute it.
#[derive(Debug)]
pub struct PendingRequest {
    request: HttpRequest,
    completion: Completion,
}

impl PendingRequest {
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Report the result of executing `request()`.
    pub fn complete(self, connected: bool, response: Option<HttpResponse>) {
        self.completion.complete(connected, response);
    }

    pub fn into_parts(self) -> (HttpRequest, Completion) {
        (self.request, self.completion)
    }
}

/// Transport that hands every submission to the embedding host.
#[derive(Debug, Default)]
pub struct HostTransport {
    pending: Mutex<VecDeque<PendingRequest>>,
}

impl HostTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest submission, if any.
    pub fn take_pending(&self) -> Option<PendingRequest> {
        self.pending.lock().pop_front()
    }

    /// Copy of the oldest submission's request, leaving it queued.
    pub fn front_request(&self) -> Option<HttpRequest> {
        self.pending.lock().front().map(|p| p.request.clone())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Transport for HostTransport {
    fn submit(&self, request: HttpRequest, completion: Completion) {
        self.pending
            .lock()
            .push_back(PendingRequest { request, completion });
    }
}
