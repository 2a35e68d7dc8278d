//! Blocking `ureq` transport driven from a worker thread per request.
//!
//! Status codes are treated as data (`http_status_as_error(false)`), so 4xx
//! and 5xx responses reach the dispatcher as connected round trips. Transport
//! errors (refused connection, DNS, timeout) are reported as not connected
//! with no response.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Completion, Transport};

/// Runs each submitted request on its own named thread.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for UreqTransport {
    fn submit(&self, request: HttpRequest, completion: Completion) {
        let slot = Arc::new(Mutex::new(Some(completion)));
        let worker_slot = Arc::clone(&slot);

        let spawned = thread::Builder::new()
            .name("tablehttp-ureq".to_string())
            .spawn(move || {
                let (connected, response) =
                    catch_unwind(AssertUnwindSafe(|| execute(&request))).unwrap_or_else(|_| {
                        error!(url = %request.url, "transport worker panicked");
                        (false, None)
                    });
                if let Some(completion) = worker_slot.lock().take() {
                    completion.complete(connected, response);
                }
            });

        if let Err(err) = spawned {
            error!(error = %err, "failed to spawn transport thread");
            if let Some(completion) = slot.lock().take() {
                completion.complete(false, None);
            }
        }
    }
}

/// Perform the round trip, returning the connectivity flag and response.
fn execute(request: &HttpRequest) -> (bool, Option<HttpResponse>) {
    let timeout = if request.timeout_seconds > 0.0 {
        Duration::try_from_secs_f32(request.timeout_seconds).ok()
    } else {
        None
    };
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build()
        .new_agent();

    let url = request.url.as_str();
    let body = request.body.as_bytes();
    if matches!(request.method, HttpMethod::Get | HttpMethod::Delete) && !body.is_empty() {
        debug!(method = %request.method, url, "dropping body of bodiless verb");
    }

    let result = match request.method {
        HttpMethod::Get => with_headers(agent.get(url), &request.headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(url), &request.headers).call(),
        HttpMethod::Put => with_headers(agent.put(url), &request.headers).send(body),
        HttpMethod::Post => with_headers(agent.post(url), &request.headers).send(body),
        HttpMethod::Patch => with_headers(agent.patch(url), &request.headers).send(body),
    };

    let mut response = match result {
        Ok(response) => response,
        Err(err) => {
            warn!(method = %request.method, url, error = %err, "transport error");
            return (false, None);
        }
    };

    let status = response.status().as_u16();
    let headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    match response.body_mut().read_to_string() {
        Ok(body) => (true, Some(HttpResponse { status, headers, body })),
        Err(err) => {
            warn!(url, status, error = %err, "failed to read response body");
            (
                false,
                Some(HttpResponse {
                    status,
                    headers,
                    body: String::new(),
                }),
            )
        }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &Headers,
) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}
