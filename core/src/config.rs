//! Service and request records, data tables, and the configuration store.
//!
//! # Design
//! Records are loaded once and read-only afterwards. A `DataTable` is a
//! row-key → record map, loadable from the JSON export format used by data
//! table editors: an array of row objects, each carrying its row key under
//! `Name` and its fields in PascalCase. `InMemoryConfigStore` pairs a service
//! table with a request table and implements `ConfigStore`, the seam the
//! resolver and dispatcher look records up through.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::http::{Headers, HttpMethod};

/// Opaque identifier of a row in a data table.
pub type RowKey = String;

/// Timeout applied when a row does not specify one.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 5;

fn default_timeout_seconds() -> u32 {
    DEFAULT_TIMEOUT_SECONDS
}

/// Configuration for a logical backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRecord {
    /// Conventionally the same as the row key.
    #[serde(default)]
    pub record_name: String,
    pub base_url: String,
    /// Overridable per request.
    #[serde(default, rename = "DefaultRequestHeaders")]
    pub default_headers: Headers,
    /// The lower of this and the request timeout is used.
    #[serde(default = "default_timeout_seconds")]
    pub request_timeout_seconds: u32,
}

impl ServiceRecord {
    pub fn new(record_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            record_name: record_name.into(),
            base_url: base_url.into(),
            default_headers: Headers::new(),
            request_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }
}

/// Configuration for one endpoint call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestRecord {
    #[serde(default)]
    pub record_name: String,
    /// Row key of the owning `ServiceRecord`.
    pub service: RowKey,
    #[serde(default)]
    pub verb: HttpMethod,
    #[serde(default)]
    pub path: String,
    #[serde(default, rename = "RequestHeaders")]
    pub headers: Headers,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
    /// Registered name of the `ResponseHandler` type bound to this request.
    #[serde(default)]
    pub response_handler: Option<String>,
}

impl RequestRecord {
    pub fn new(
        record_name: impl Into<String>,
        service: impl Into<RowKey>,
        verb: HttpMethod,
        path: impl Into<String>,
    ) -> Self {
        Self {
            record_name: record_name.into(),
            service: service.into(),
            verb,
            path: path.into(),
            headers: Headers::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            response_handler: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_handler(mut self, type_name: impl Into<String>) -> Self {
        self.response_handler = Some(type_name.into());
        self
    }
}

/// Row-key → record map.
#[derive(Debug, Clone)]
pub struct DataTable<T> {
    rows: HashMap<RowKey, T>,
}

impl<T> Default for DataTable<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

#[derive(Deserialize)]
struct ExportedRow<T> {
    #[serde(rename = "Name")]
    name: RowKey,
    #[serde(flatten)]
    record: T,
}

impl<T> DataTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, returning the record previously stored under `key`.
    pub fn insert(&mut self, key: impl Into<RowKey>, record: T) -> Option<T> {
        self.rows.insert(key.into(), record)
    }

    pub fn with_row(mut self, key: impl Into<RowKey>, record: T) -> Self {
        self.insert(key, record);
        self
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.rows.keys()
    }
}

impl<T: DeserializeOwned> DataTable<T> {
    /// Parse a data-table JSON export. Row names must be unique.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let exported: Vec<ExportedRow<T>> = serde_json::from_str(json)?;
        let mut rows = HashMap::with_capacity(exported.len());
        for row in exported {
            match rows.entry(row.name) {
                Entry::Occupied(entry) => {
                    return Err(ConfigError::DuplicateRow(entry.key().clone()));
                }
                Entry::Vacant(entry) => {
                    entry.insert(row.record);
                }
            }
        }
        Ok(Self { rows })
    }
}

/// Read-only record lookup keyed by row identifiers.
pub trait ConfigStore: Send + Sync {
    fn service(&self, key: &str) -> Option<&ServiceRecord>;
    fn request(&self, key: &str) -> Option<&RequestRecord>;
}

/// A `ConfigStore` backed by one service table and one request table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    services: DataTable<ServiceRecord>,
    requests: DataTable<RequestRecord>,
}

impl InMemoryConfigStore {
    pub fn new(services: DataTable<ServiceRecord>, requests: DataTable<RequestRecord>) -> Self {
        Self { services, requests }
    }

    /// Load both tables from their JSON exports.
    pub fn from_json(services_json: &str, requests_json: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(
            DataTable::from_json(services_json)?,
            DataTable::from_json(requests_json)?,
        ))
    }

    pub fn with_service(mut self, key: impl Into<RowKey>, record: ServiceRecord) -> Self {
        self.services.insert(key, record);
        self
    }

    pub fn with_request(mut self, key: impl Into<RowKey>, record: RequestRecord) -> Self {
        self.requests.insert(key, record);
        self
    }

    pub fn services(&self) -> &DataTable<ServiceRecord> {
        &self.services
    }

    pub fn requests(&self) -> &DataTable<RequestRecord> {
        &self.requests
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn service(&self, key: &str) -> Option<&ServiceRecord> {
        self.services.get(key)
    }

    fn request(&self, key: &str) -> Option<&RequestRecord> {
        self.requests.get(key)
    }
}
