//! Classification of transport results into a closed set of status kinds.

use std::fmt;

/// Outcome kind of a completed request.
///
/// One member per well-known HTTP status, plus `Unrecognized` for connection
/// failures and any code outside the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Ok,
    Created,
    NoContent,
    MovedPermanently,
    BadRequest,
    Unauthorized,
    PaymentRequired,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    TooManyRequests,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    Unrecognized,
}

impl StatusKind {
    /// Every member, in table order.
    pub const ALL: [StatusKind; 18] = [
        StatusKind::Ok,
        StatusKind::Created,
        StatusKind::NoContent,
        StatusKind::MovedPermanently,
        StatusKind::BadRequest,
        StatusKind::Unauthorized,
        StatusKind::PaymentRequired,
        StatusKind::Forbidden,
        StatusKind::NotFound,
        StatusKind::MethodNotAllowed,
        StatusKind::RequestTimeout,
        StatusKind::TooManyRequests,
        StatusKind::InternalServerError,
        StatusKind::NotImplemented,
        StatusKind::BadGateway,
        StatusKind::ServiceUnavailable,
        StatusKind::GatewayTimeout,
        StatusKind::Unrecognized,
    ];

    pub fn from_code(code: u16) -> Self {
        match code {
            200 => StatusKind::Ok,
            201 => StatusKind::Created,
            204 => StatusKind::NoContent,
            301 => StatusKind::MovedPermanently,
            400 => StatusKind::BadRequest,
            401 => StatusKind::Unauthorized,
            402 => StatusKind::PaymentRequired,
            403 => StatusKind::Forbidden,
            404 => StatusKind::NotFound,
            405 => StatusKind::MethodNotAllowed,
            408 => StatusKind::RequestTimeout,
            429 => StatusKind::TooManyRequests,
            500 => StatusKind::InternalServerError,
            501 => StatusKind::NotImplemented,
            502 => StatusKind::BadGateway,
            503 => StatusKind::ServiceUnavailable,
            504 => StatusKind::GatewayTimeout,
            _ => StatusKind::Unrecognized,
        }
    }

    /// The HTTP code this kind stands for; `None` for `Unrecognized`.
    pub fn code(self) -> Option<u16> {
        let code = match self {
            StatusKind::Ok => 200,
            StatusKind::Created => 201,
            StatusKind::NoContent => 204,
            StatusKind::MovedPermanently => 301,
            StatusKind::BadRequest => 400,
            StatusKind::Unauthorized => 401,
            StatusKind::PaymentRequired => 402,
            StatusKind::Forbidden => 403,
            StatusKind::NotFound => 404,
            StatusKind::MethodNotAllowed => 405,
            StatusKind::RequestTimeout => 408,
            StatusKind::TooManyRequests => 429,
            StatusKind::InternalServerError => 500,
            StatusKind::NotImplemented => 501,
            StatusKind::BadGateway => 502,
            StatusKind::ServiceUnavailable => 503,
            StatusKind::GatewayTimeout => 504,
            StatusKind::Unrecognized => return None,
        };
        Some(code)
    }

    /// Stable display name, e.g. `HTTP_NOT_FOUND_404`.
    pub fn name(self) -> &'static str {
        match self {
            StatusKind::Ok => "HTTP_OK_200",
            StatusKind::Created => "HTTP_CREATED_201",
            StatusKind::NoContent => "HTTP_NO_CONTENT_204",
            StatusKind::MovedPermanently => "HTTP_MOVED_PERMANENTLY_301",
            StatusKind::BadRequest => "HTTP_BAD_REQUEST_400",
            StatusKind::Unauthorized => "HTTP_UNAUTHORIZED_401",
            StatusKind::PaymentRequired => "HTTP_PAYMENT_REQUIRED_402",
            StatusKind::Forbidden => "HTTP_FORBIDDEN_403",
            StatusKind::NotFound => "HTTP_NOT_FOUND_404",
            StatusKind::MethodNotAllowed => "HTTP_METHOD_NOT_ALLOWED_405",
            StatusKind::RequestTimeout => "HTTP_REQUEST_TIMEOUT_408",
            StatusKind::TooManyRequests => "HTTP_TOO_MANY_REQUESTS_429",
            StatusKind::InternalServerError => "HTTP_INTERNAL_SERVER_ERROR_500",
            StatusKind::NotImplemented => "HTTP_NOT_IMPLEMENTED_501",
            StatusKind::BadGateway => "HTTP_BAD_GATEWAY_502",
            StatusKind::ServiceUnavailable => "HTTP_SERVICE_UNAVAILABLE_503",
            StatusKind::GatewayTimeout => "HTTP_GATEWAY_TIMEOUT_504",
            StatusKind::Unrecognized => "HTTP_UNRECOGNIZED",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a transport result.
///
/// `response_status` is `None` when the transport produced no response object
/// at all; that is always `Unrecognized`, whatever the connectivity flag says.
/// Connectivity does not influence the kind otherwise; it selects the
/// success or failure branch in the dispatcher instead.
pub fn classify(_connected: bool, response_status: Option<u16>) -> StatusKind {
    match response_status {
        Some(code) => StatusKind::from_code(code),
        None => StatusKind::Unrecognized,
    }
}
