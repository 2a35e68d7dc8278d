//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of maps, and enums
//! with explicit discriminants. Types the C side owns (`FfiRequestPlan`) are
//! heap-allocated here and released by `tablehttp_free_request`; types the C
//! side lends us (`FfiHttpResponse`) or we lend to callbacks
//! (`FfiResponseData`) use `*const` views that are only valid for the call.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use tablehttp_core::{
    Headers, HostTransport, HttpMethod, HttpRequest, HttpResponse, InMemoryConfigStore,
    RequestDispatcher, RequestPlan, ResponseData, StatusKind,
};

/// Opaque handle to a loaded pair of service and request tables.
pub struct FfiConfigStore {
    pub(crate) inner: Arc<InMemoryConfigStore>,
}

/// Opaque handle to a dispatcher whose I/O is performed by the C host.
pub struct FfiDispatcher {
    pub(crate) inner: RequestDispatcher,
    pub(crate) transport: Arc<HostTransport>,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP verb as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Put = 1,
    Post = 2,
    Patch = 3,
    Delete = 4,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Patch => FfiHttpMethod::Patch,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// An owned header pair; freed together with its `FfiRequestPlan`.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A borrowed header pair.
#[repr(C)]
pub struct FfiHeaderView {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// A resolved request as C-compatible plain data.
///
/// `method_name` is the wire verb (static, never freed). `body` is null for
/// plans returned by `tablehttp_build_request`.
#[repr(C)]
pub struct FfiRequestPlan {
    pub method: FfiHttpMethod,
    pub method_name: *const c_char,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
    pub timeout_seconds: f32,
}

impl FfiRequestPlan {
    /// Convert a resolved plan into a heap-allocated `FfiRequestPlan`.
    pub(crate) fn from_plan(plan: RequestPlan) -> *mut Self {
        Self::build(plan.method, plan.url, plan.headers, None, plan.timeout_seconds)
    }

    /// Convert a submitted request, body included.
    pub(crate) fn from_request(req: &HttpRequest) -> *mut Self {
        Self::build(
            req.method,
            req.url.clone(),
            req.headers.clone(),
            Some(req.body.clone()),
            req.timeout_seconds,
        )
    }

    fn build(
        method: HttpMethod,
        url: String,
        headers: Headers,
        body: Option<String>,
        timeout_seconds: f32,
    ) -> *mut Self {
        let headers_len = headers.len() as u32;
        let headers = if headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiRequestPlan {
            method: method.into(),
            method_name: method_name(method).as_ptr(),
            url: to_c_string(url),
            headers,
            headers_len,
            body: body.map_or(std::ptr::null_mut(), to_c_string),
            timeout_seconds,
        }))
    }
}

fn method_name(method: HttpMethod) -> &'static CStr {
    match method {
        HttpMethod::Get => c"GET",
        HttpMethod::Put => c"PUT",
        HttpMethod::Post => c"POST",
        HttpMethod::Patch => c"PATCH",
        HttpMethod::Delete => c"DELETE",
    }
}

/// Convert to an owned C string, cutting at the first interior NUL.
pub(crate) fn to_c_string(s: String) -> *mut c_char {
    let s = match CString::new(s) {
        Ok(c) => c,
        Err(err) => {
            let nul = err.nul_position();
            let mut bytes = err.into_vec();
            bytes.truncate(nul);
            CString::new(bytes).unwrap_or_default()
        }
    };
    s.into_raw()
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// An HTTP response described by the C host after executing a plan.
///
/// Read but never freed by the FFI layer. `headers` may be null when
/// `headers_len` is 0; `body` may be null for an empty body.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub headers: *const FfiHeaderView,
    pub headers_len: u32,
    pub body: *const c_char,
}

impl FfiHttpResponse {
    /// Copy into a core `HttpResponse`. Null or non-UTF-8 strings become
    /// empty; header pairs with a null key are skipped.
    pub(crate) fn to_core(&self) -> HttpResponse {
        let mut headers = Headers::new();
        if !self.headers.is_null() && self.headers_len > 0 {
            let views =
                unsafe { std::slice::from_raw_parts(self.headers, self.headers_len as usize) };
            for view in views {
                if view.key.is_null() {
                    continue;
                }
                headers.insert(read_c_str(view.key), read_c_str(view.value));
            }
        }
        HttpResponse {
            status: self.status,
            headers,
            body: read_c_str(self.body),
        }
    }
}

pub(crate) fn read_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .unwrap_or("")
        .to_string()
}

/// Response headers and content lent to an outcome callback.
///
/// Every pointer is valid only for the duration of the callback.
#[repr(C)]
pub struct FfiResponseData {
    pub headers: *const FfiHeaderView,
    pub headers_len: u32,
    pub content: *const c_char,
}

/// Owns the C strings behind an `FfiResponseData` while a callback runs.
pub(crate) struct ResponseDataView {
    _strings: Vec<CString>,
    views: Vec<FfiHeaderView>,
    content: CString,
}

impl ResponseDataView {
    pub(crate) fn new(data: &ResponseData) -> Self {
        let mut strings = Vec::with_capacity(data.headers.len() * 2);
        let mut views = Vec::with_capacity(data.headers.len());
        for (key, value) in &data.headers {
            let (Ok(key), Ok(value)) = (CString::new(key.as_str()), CString::new(value.as_str()))
            else {
                continue;
            };
            views.push(FfiHeaderView {
                key: key.as_ptr(),
                value: value.as_ptr(),
            });
            strings.push(key);
            strings.push(value);
        }
        let content = CString::new(data.content.as_str()).unwrap_or_default();
        Self {
            _strings: strings,
            views,
            content,
        }
    }

    pub(crate) fn as_ffi(&self) -> FfiResponseData {
        FfiResponseData {
            headers: if self.views.is_empty() {
                std::ptr::null()
            } else {
                self.views.as_ptr()
            },
            headers_len: self.views.len() as u32,
            content: self.content.as_ptr(),
        }
    }
}

// ---------------------------------------------------------------------------
// Status and outcome types
// ---------------------------------------------------------------------------

/// Outcome kind as a C enum; each discriminant is its HTTP code, and
/// `Unrecognized` is 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatusKind {
    Unrecognized = 0,
    Ok = 200,
    Created = 201,
    NoContent = 204,
    MovedPermanently = 301,
    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    TooManyRequests = 429,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
}

impl From<StatusKind> for FfiStatusKind {
    fn from(status: StatusKind) -> Self {
        match status {
            StatusKind::Ok => FfiStatusKind::Ok,
            StatusKind::Created => FfiStatusKind::Created,
            StatusKind::NoContent => FfiStatusKind::NoContent,
            StatusKind::MovedPermanently => FfiStatusKind::MovedPermanently,
            StatusKind::BadRequest => FfiStatusKind::BadRequest,
            StatusKind::Unauthorized => FfiStatusKind::Unauthorized,
            StatusKind::PaymentRequired => FfiStatusKind::PaymentRequired,
            StatusKind::Forbidden => FfiStatusKind::Forbidden,
            StatusKind::NotFound => FfiStatusKind::NotFound,
            StatusKind::MethodNotAllowed => FfiStatusKind::MethodNotAllowed,
            StatusKind::RequestTimeout => FfiStatusKind::RequestTimeout,
            StatusKind::TooManyRequests => FfiStatusKind::TooManyRequests,
            StatusKind::InternalServerError => FfiStatusKind::InternalServerError,
            StatusKind::NotImplemented => FfiStatusKind::NotImplemented,
            StatusKind::BadGateway => FfiStatusKind::BadGateway,
            StatusKind::ServiceUnavailable => FfiStatusKind::ServiceUnavailable,
            StatusKind::GatewayTimeout => FfiStatusKind::GatewayTimeout,
            StatusKind::Unrecognized => FfiStatusKind::Unrecognized,
        }
    }
}

impl FfiStatusKind {
    pub(crate) fn to_core(self) -> StatusKind {
        StatusKind::from_code(self as u16)
    }
}

/// Which broadcast channel a callback subscribes to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiChannel {
    Failed = 0,
    Succeeded = 1,
}

/// Outcome callback. `data` is null when no response object exists.
pub type FfiOutcomeCallback =
    extern "C" fn(user_data: *mut c_void, status: FfiStatusKind, data: *const FfiResponseData);

/// A C callback plus the opaque pointer handed back to it.
pub(crate) struct CallbackTarget {
    callback: FfiOutcomeCallback,
    user_data: *mut c_void,
}

// The C caller guarantees `user_data` may be used from the completing thread.
unsafe impl Send for CallbackTarget {}
unsafe impl Sync for CallbackTarget {}

impl CallbackTarget {
    pub(crate) fn new(callback: FfiOutcomeCallback, user_data: *mut c_void) -> Self {
        Self {
            callback,
            user_data,
        }
    }

    pub(crate) fn call(&self, status: StatusKind, data: Option<&ResponseData>) {
        match data {
            Some(data) => {
                let view = ResponseDataView::new(data);
                let ffi = view.as_ffi();
                (self.callback)(self.user_data, status.into(), &ffi);
            }
            None => (self.callback)(self.user_data, status.into(), std::ptr::null()),
        }
    }
}
