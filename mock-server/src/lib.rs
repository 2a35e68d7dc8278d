use std::{collections::BTreeMap, time::Duration};

use axum::{
    extract::Path,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Body returned by `/status/{code}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    pub code: u16,
}

/// Body returned by `/echo` and `/delay/{ms}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/status/{code}", any(status))
        .route("/echo", any(echo))
        .route("/delay/{ms}", any(delay))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn status(Path(code): Path<u16>) -> Response {
    if code < 200 {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let Ok(status) = StatusCode::from_u16(code) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    tracing::debug!(code, "answering with requested status");
    // These statuses must not carry a body.
    if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return status.into_response();
    }
    (status, Json(StatusBody { code })).into_response()
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    Json(to_echo(method, &headers, body))
}

async fn delay(
    Path(ms): Path<u64>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> Json<Echo> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(to_echo(method, &headers, body))
}

fn to_echo(method: Method, headers: &HeaderMap, body: String) -> Echo {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Echo {
        method: method.to_string(),
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn echo_collects_headers_by_lowercase_name() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Trace", HeaderValue::from_static("abc"));
        let echo = to_echo(Method::PATCH, &headers, "payload".to_string());
        assert_eq!(echo.method, "PATCH");
        assert_eq!(echo.headers.get("x-trace").map(String::as_str), Some("abc"));
        assert_eq!(echo.body, "payload");
    }

    #[test]
    fn echo_skips_non_text_header_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-bin", HeaderValue::from_bytes(&[0xff]).unwrap());
        let echo = to_echo(Method::GET, &headers, String::new());
        assert!(echo.headers.is_empty());
    }

    #[test]
    fn status_body_serializes_code() {
        let json = serde_json::to_value(StatusBody { code: 503 }).unwrap();
        assert_eq!(json["code"], 503);
    }
}
