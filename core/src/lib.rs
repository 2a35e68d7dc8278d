//! Table-driven HTTP request dispatch.
//!
//! # Overview
//! Requests are described by two layers of configuration rows: a service row
//! (base URL, default headers, default timeout) and a request row (verb, path,
//! header and timeout overrides, response handler binding). The core merges
//! the layers into a `RequestPlan`, submits it through a pluggable
//! `Transport`, and maps the transport result onto a closed `StatusKind`
//! taxonomy that fans out to a per-request `ResponseHandler` and two
//! broadcast channels.
//!
//! # Design
//! - Configuration is looked up through the injected `ConfigStore` trait; no
//!   global state.
//! - `RequestResolver` is pure; `StatusKind` classification is total.
//! - `RequestDispatcher` performs one asynchronous send per instance and
//!   completes exactly once, on whatever thread the transport chooses.
//! - Connectivity, not HTTP status, selects success versus failure.
//! - `HostTransport` lets the embedding program perform the I/O itself;
//!   `UreqTransport` (feature `ureq`) performs it on worker threads.

pub mod broadcast;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod http;
pub mod outcome;
pub mod resolver;
pub mod status;
pub mod transport;
#[cfg(feature = "ureq")]
pub mod ureq_transport;

pub use broadcast::Broadcast;
pub use config::{
    ConfigStore, DataTable, InMemoryConfigStore, RequestRecord, RowKey, ServiceRecord,
};
pub use dispatcher::{DispatchState, RequestDispatcher};
pub use error::ConfigError;
pub use handler::{HandlerContext, HandlerFactory, HandlerRegistry, NoopHandler, ResponseHandler};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse, RequestPlan, ResponseData};
pub use outcome::Outcome;
pub use resolver::RequestResolver;
pub use status::{classify, StatusKind};
pub use transport::{Completion, HostTransport, PendingRequest, Transport};
#[cfg(feature = "ureq")]
pub use ureq_transport::UreqTransport;
