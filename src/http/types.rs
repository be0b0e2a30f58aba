use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Header map keyed by header name, last value wins
pub type Headers = BTreeMap<String, String>;

/// Status reported when the transfer itself failed (DNS, connect, TLS, timeout)
pub const TRANSPORT_FAILURE_STATUS: i64 = -1;

/// Status reported when no pooled connection was available for the task
pub const POOL_EXHAUSTED_STATUS: i64 = -2;

/// Diagnostic attached to pool exhaustion responses
pub const POOL_EXHAUSTED_MESSAGE: &str = "connection pool exhausted";

/// HTTP method supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: Method,
    /// Request body, only sent for POST
    pub body: Option<Vec<u8>>,
    /// Caller supplied headers
    pub headers: Headers,
}

impl Request {
    /// Build a GET request
    pub fn get(url: impl Into<String>, headers: Headers) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            body: None,
            headers,
        }
    }

    /// Build a POST request carrying a serialized JSON document.
    /// `Content-Type` defaults to `application/json` unless the caller set it.
    pub fn post_json(url: impl Into<String>, json_body: &serde_json::Value, mut headers: Headers) -> Self {
        let has_content_type = headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }

        Self {
            url: url.into(),
            method: Method::Post,
            body: Some(json_body.to_string().into_bytes()),
            headers,
        }
    }

    /// Length of the body in bytes (0 when there is none)
    pub fn content_length(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }
}

/// Outcome of one transfer.
///
/// A negative `status_code` means the transfer never produced an HTTP status and
/// `error` then carries the diagnostic. Any non-negative status, 4xx and 5xx
/// included, is a completed transfer whose body and headers are as received.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub status_code: i64,
    pub body: Vec<u8>,
    pub headers: Headers,
    pub error: Option<String>,
}

impl Response {
    /// Response for a transfer that failed below the HTTP layer
    pub fn transport_failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "unknown transport error".to_string();
        }
        Self {
            status_code: TRANSPORT_FAILURE_STATUS,
            body: Vec::new(),
            headers: Headers::new(),
            error: Some(message),
        }
    }

    /// Response for a task that found no free connection
    pub fn pool_exhausted() -> Self {
        Self {
            status_code: POOL_EXHAUSTED_STATUS,
            body: Vec::new(),
            headers: Headers::new(),
            error: Some(POOL_EXHAUSTED_MESSAGE.to_string()),
        }
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// True when the transfer failed before any HTTP status was received
    pub fn is_transport_failure(&self) -> bool {
        self.status_code < 0
    }

    pub fn is_pool_exhausted(&self) -> bool {
        self.status_code == POOL_EXHAUSTED_STATUS
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Decode the body as JSON regardless of status
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Look up a header by exact name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_json_sets_default_content_type() {
        let request = Request::post_json("http://localhost/orders", &json!({"qty": 1}), Headers::new());

        assert_eq!(request.method, Method::Post);
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.body.as_deref(), Some(br#"{"qty":1}"#.as_slice()));
        assert_eq!(request.content_length(), 9);
    }

    #[test]
    fn test_post_json_keeps_caller_content_type() {
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        let request = Request::post_json("http://localhost", &json!("x"), headers);

        assert_eq!(request.headers.len(), 1);
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("text/plain")
        );
    }

    #[test]
    fn test_get_has_no_body() {
        let request = Request::get("http://localhost", Headers::new());
        assert!(request.body.is_none());
        assert_eq!(request.content_length(), 0);
        assert_eq!(request.method.to_string(), "GET");
    }

    #[test]
    fn test_failure_responses_carry_error() {
        let failed = Response::transport_failure("");
        assert!(failed.is_transport_failure());
        assert!(!failed.error.as_deref().unwrap_or_default().is_empty());

        let exhausted = Response::pool_exhausted();
        assert!(exhausted.is_transport_failure());
        assert!(exhausted.is_pool_exhausted());
        assert_eq!(exhausted.error.as_deref(), Some(POOL_EXHAUSTED_MESSAGE));
    }

    #[test]
    fn test_success_range() {
        let mut response = Response {
            status_code: 204,
            ..Response::default()
        };
        assert!(response.is_success());

        response.status_code = 404;
        assert!(!response.is_success());
        assert!(!response.is_transport_failure());
    }
}
