//! Merges a service record and a request record into a `RequestPlan`.
//!
//! # Design
//! Resolution is a pure function of the two looked-up records. Header maps
//! are merged service-first so request values win on collision, with names
//! compared ASCII case-insensitively; the URL is
//! the verbatim concatenation of base URL and path (configuration owns its
//! slashes); the timeout is the lower of the two layers.

use crate::config::{ConfigStore, RequestRecord, ServiceRecord};
use crate::error::ConfigError;
use crate::http::RequestPlan;

/// Resolves request row keys against a read-only `ConfigStore`.
#[derive(Clone, Copy)]
pub struct RequestResolver<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> RequestResolver<'a> {
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self { store }
    }

    /// Resolve `request_key` into a plan, or `None` if the request row or its
    /// service row is missing. A `None` plan must not be sent.
    pub fn resolve(&self, request_key: &str) -> Option<RequestPlan> {
        self.try_resolve(request_key).ok()
    }

    /// Like `resolve`, but reports which row is missing.
    pub fn try_resolve(&self, request_key: &str) -> Result<RequestPlan, ConfigError> {
        let request = self
            .store
            .request(request_key)
            .ok_or_else(|| ConfigError::RequestNotFound(request_key.to_string()))?;
        let service =
            self.store
                .service(&request.service)
                .ok_or_else(|| ConfigError::ServiceNotFound {
                    request: request_key.to_string(),
                    service: request.service.clone(),
                })?;
        Ok(merge(service, request))
    }
}

/// Build the plan for `request` sent to `service`.
pub fn merge(service: &ServiceRecord, request: &RequestRecord) -> RequestPlan {
    let mut headers = service.default_headers.clone();
    for (key, value) in &request.headers {
        // Header names compare case-insensitively; the request's spelling wins.
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
        headers.insert(key.clone(), value.clone());
    }

    let timeout = service
        .request_timeout_seconds
        .min(request.timeout_seconds);

    RequestPlan {
        method: request.verb,
        url: format!("{}{}", service.base_url, request.path),
        headers,
        timeout_seconds: timeout as f32,
    }
}
