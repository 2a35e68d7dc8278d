//! C-ABI wrapper around `tablehttp-core`.
//!
//! # Overview
//! Exposes table loading, plan resolution, status classification and
//! host-driven dispatch through `extern "C"` functions, so any language with
//! a C FFI can drive configured requests while performing the network I/O
//! itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Dispatch uses the core's `HostTransport`: `tablehttp_dispatcher_send`
//!   returns the request to execute, `tablehttp_dispatcher_complete` feeds the
//!   result back and runs the subscribed callbacks synchronously.
//! - The C caller owns all returned pointers and must call the matching
//!   `tablehttp_*_free` function to release them.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};

use tablehttp_core::{
    classify, HandlerRegistry, HostTransport, InMemoryConfigStore, RequestDispatcher,
    DispatchState, RequestResolver, StatusKind, Transport,
};
use tracing::warn;

use types::*;

// ---------------------------------------------------------------------------
// Configuration store
// ---------------------------------------------------------------------------

/// Load the service and request tables from their JSON exports.
///
/// Returns null if either pointer is null, either table is malformed, or an
/// internal panic occurs. Free with `tablehttp_store_free`.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_store_from_json(
    services_json: *const c_char,
    requests_json: *const c_char,
) -> *mut FfiConfigStore {
    catch_unwind(|| {
        if services_json.is_null() || requests_json.is_null() {
            return std::ptr::null_mut();
        }
        let services = unsafe { CStr::from_ptr(services_json) }.to_str().unwrap_or("");
        let requests = unsafe { CStr::from_ptr(requests_json) }.to_str().unwrap_or("");
        match InMemoryConfigStore::from_json(services, requests) {
            Ok(store) => Box::into_raw(Box::new(FfiConfigStore {
                inner: Arc::new(store),
            })),
            Err(err) => {
                warn!(error = %err, "failed to load data tables");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a store created by `tablehttp_store_from_json`. Safe to call with
/// null. Dispatchers created from the store keep their own reference.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_store_free(store: *mut FfiConfigStore) {
    if !store.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(store) });
        });
    }
}

// ---------------------------------------------------------------------------
// Plans and classification
// ---------------------------------------------------------------------------

/// Resolve the request row `request_key` into a plan without sending it.
///
/// Returns null if an argument is null or the request is misconfigured.
/// Free with `tablehttp_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_build_request(
    store: *const FfiConfigStore,
    request_key: *const c_char,
) -> *mut FfiRequestPlan {
    catch_unwind(|| {
        if store.is_null() || request_key.is_null() {
            return std::ptr::null_mut();
        }
        let store = unsafe { &*store };
        let key = unsafe { CStr::from_ptr(request_key) }.to_str().unwrap_or("");
        match RequestResolver::new(store.inner.as_ref()).resolve(key) {
            Some(plan) => FfiRequestPlan::from_plan(plan),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Classify a transport result. `has_response` false means no response
/// object exists, which is always `Unrecognized`.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_classify(
    connected: bool,
    has_response: bool,
    status_code: u16,
) -> FfiStatusKind {
    classify(connected, has_response.then_some(status_code)).into()
}

/// Stable display name of a status kind, e.g. `HTTP_NOT_FOUND_404`.
///
/// The returned string is static and must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_status_name(status: FfiStatusKind) -> *const c_char {
    status_name(status.to_core()).as_ptr()
}

/// C copies of `StatusKind::name`, in `StatusKind::ALL` order.
static STATUS_NAMES: LazyLock<Vec<CString>> = LazyLock::new(|| {
    StatusKind::ALL
        .iter()
        .map(|kind| CString::new(kind.name()).unwrap_or_default())
        .collect()
});

fn status_name(status: StatusKind) -> &'static CStr {
    StatusKind::ALL
        .iter()
        .position(|kind| *kind == status)
        .and_then(|index| STATUS_NAMES.get(index))
        .map_or(c"HTTP_UNRECOGNIZED", CString::as_c_str)
}

// ---------------------------------------------------------------------------
// Dispatcher lifecycle
// ---------------------------------------------------------------------------

/// Create a dispatcher for the request row `request_key`.
///
/// The row is not resolved until `tablehttp_dispatcher_send`. Returns null if
/// an argument is null. Free with `tablehttp_dispatcher_free`.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_dispatcher_new(
    store: *const FfiConfigStore,
    request_key: *const c_char,
) -> *mut FfiDispatcher {
    catch_unwind(|| {
        if store.is_null() || request_key.is_null() {
            return std::ptr::null_mut();
        }
        let store = unsafe { &*store };
        let key = unsafe { CStr::from_ptr(request_key) }.to_str().unwrap_or("");
        let transport = Arc::new(HostTransport::new());
        let dispatcher = RequestDispatcher::new(
            key,
            store.inner.clone(),
            Arc::new(HandlerRegistry::new()),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        Box::into_raw(Box::new(FfiDispatcher {
            inner: dispatcher,
            transport,
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a dispatcher. Safe to call with null. A request still waiting for
/// `tablehttp_dispatcher_complete` is dropped without notification.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_dispatcher_free(dispatcher: *mut FfiDispatcher) {
    if !dispatcher.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(dispatcher) });
        }));
    }
}

/// Subscribe `callback` to one of the dispatcher's outcome channels.
///
/// Callbacks run in subscription order during `tablehttp_dispatcher_complete`.
/// Returns false if `dispatcher` or `callback` is null.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_dispatcher_subscribe(
    dispatcher: *const FfiDispatcher,
    channel: FfiChannel,
    callback: Option<FfiOutcomeCallback>,
    user_data: *mut c_void,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(callback) = callback else {
            return false;
        };
        if dispatcher.is_null() {
            return false;
        }
        let dispatcher = unsafe { &*dispatcher };
        let target = CallbackTarget::new(callback, user_data);
        let broadcast = match channel {
            FfiChannel::Failed => dispatcher.inner.on_request_failed(),
            FfiChannel::Succeeded => dispatcher.inner.on_request_succeeded(),
        };
        broadcast.subscribe(move |status, data| target.call(status, data));
        true
    }))
    .unwrap_or(false)
}

/// Send the dispatcher's request with `body` (null means empty).
///
/// Returns the request the host must execute, body included, or null if the
/// request is misconfigured or the dispatcher was already used. Free with
/// `tablehttp_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_dispatcher_send(
    dispatcher: *const FfiDispatcher,
    body: *const c_char,
) -> *mut FfiRequestPlan {
    catch_unwind(AssertUnwindSafe(|| {
        if dispatcher.is_null() {
            return std::ptr::null_mut();
        }
        let dispatcher = unsafe { &*dispatcher };
        if dispatcher.inner.state() != DispatchState::Idle {
            return std::ptr::null_mut();
        }
        dispatcher.inner.send(read_c_str(body));
        // The request stays queued until the host completes it.
        match dispatcher.transport.front_request() {
            Some(request) => FfiRequestPlan::from_request(&request),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Report the result of executing the request returned by
/// `tablehttp_dispatcher_send`.
///
/// `response` is null when the host got no response object at all. Runs the
/// subscribed callbacks before returning. Returns false if there is no
/// request waiting for completion.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_dispatcher_complete(
    dispatcher: *const FfiDispatcher,
    connected: bool,
    response: *const FfiHttpResponse,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if dispatcher.is_null() {
            return false;
        }
        let dispatcher = unsafe { &*dispatcher };
        let Some(pending) = dispatcher.transport.take_pending() else {
            return false;
        };
        let response = if response.is_null() {
            None
        } else {
            Some(unsafe { &*response }.to_core())
        };
        pending.complete(connected, response);
        true
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiRequestPlan` returned by `tablehttp_build_request` or
/// `tablehttp_dispatcher_send`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn tablehttp_free_request(plan: *mut FfiRequestPlan) {
    if plan.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let plan = unsafe { Box::from_raw(plan) };
        free_c_string(plan.url);
        free_c_string(plan.body);
        if !plan.headers.is_null() && plan.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    plan.headers,
                    plan.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { std::ffi::CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
