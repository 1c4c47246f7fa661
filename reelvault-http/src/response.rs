//! The response taxonomy and its translation to wire responses.
//!
//! Handlers return exactly one `Outcome`; the translator owns the mapping to
//! status, content type, and body, then copies the request's protocol
//! version and keep-alive onto the wire response. The match is exhaustive:
//! adding a variant without a translation is a compile error.

use serde_json::Value;

use crate::request::{Method, Request, Version};

/// Closed set of results a handler may produce.
#[derive(Debug, Clone)]
pub enum Outcome {
    NotFound(String),
    ServerError(String),
    InvalidRequest(String),
    Json(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// A fully-determined HTTP response ready for serialization.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: StatusCode,
    pub version: Version,
    pub keep_alive: bool,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Serialize status line, headers, and body into wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.body.len() + 256);
        bytes.extend_from_slice(
            format!(
                "{} {} {}\r\n",
                self.version.as_str(),
                self.status.as_u16(),
                self.status.reason()
            )
            .as_bytes(),
        );
        for (name, value) in &self.headers {
            bytes.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        bytes.extend_from_slice(format!("Connection: {connection}\r\n").as_bytes());
        bytes.extend_from_slice(b"\r\n");
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

/// Translate a handler outcome into a wire response for this request.
///
/// After status and headers are fixed, the request's version and keep-alive
/// are copied over and the fixed server identifier is set. A HEAD request
/// keeps every header (Content-Length included) but sends no body.
pub fn translate(outcome: Outcome, request: &Request) -> WireResponse {
    let (status, content_type, body) = match outcome {
        Outcome::NotFound(message) => (StatusCode::NotFound, "text/html", message.into_bytes()),
        Outcome::ServerError(message) => (
            StatusCode::InternalServerError,
            "text/html",
            message.into_bytes(),
        ),
        Outcome::InvalidRequest(message) => {
            (StatusCode::BadRequest, "text/html", message.into_bytes())
        }
        Outcome::Json(payload) => (
            StatusCode::Ok,
            "application/json",
            payload.to_string().into_bytes(),
        ),
    };

    let headers = vec![
        ("Content-Type".to_string(), content_type.to_string()),
        ("Content-Length".to_string(), body.len().to_string()),
        (
            "Server".to_string(),
            concat!("reelvault/", env!("CARGO_PKG_VERSION")).to_string(),
        ),
    ];

    let body = if request.method() == Method::Head {
        Vec::new()
    } else {
        body
    };

    WireResponse {
        status,
        version: request.version(),
        keep_alive: request.keep_alive(),
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(raw: &[u8]) -> Request {
        Request::parse(raw).unwrap()
    }

    fn header<'a>(response: &'a WireResponse, name: &str) -> &'a str {
        response
            .headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn not_found_maps_to_404_html() {
        let req = request(b"GET /x HTTP/1.1\r\n");
        let res = translate(Outcome::NotFound("Route /x is not found.".into()), &req);
        assert_eq!(res.status, StatusCode::NotFound);
        assert_eq!(header(&res, "Content-Type"), "text/html");
        assert_eq!(res.body, b"Route /x is not found.");
    }

    #[test]
    fn server_error_maps_to_500_html() {
        let req = request(b"GET / HTTP/1.1\r\n");
        let res = translate(Outcome::ServerError("boom".into()), &req);
        assert_eq!(res.status, StatusCode::InternalServerError);
        assert_eq!(header(&res, "Content-Type"), "text/html");
    }

    #[test]
    fn invalid_request_maps_to_400_html() {
        let req = request(b"GET / HTTP/1.1\r\n");
        let res = translate(Outcome::InvalidRequest("bad".into()), &req);
        assert_eq!(res.status, StatusCode::BadRequest);
    }

    #[test]
    fn json_maps_to_200_with_serialized_payload() {
        let req = request(b"GET / HTTP/1.1\r\n");
        let res = translate(Outcome::Json(json!({"abc": "def"})), &req);
        assert_eq!(res.status, StatusCode::Ok);
        assert_eq!(header(&res, "Content-Type"), "application/json");
        assert_eq!(res.body, br#"{"abc":"def"}"#);
    }

    #[test]
    fn response_copies_version_and_keep_alive() {
        let req = request(b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n");
        let res = translate(Outcome::Json(json!({})), &req);
        assert_eq!(res.version, Version::Http10);
        assert!(res.keep_alive);

        let req = request(b"GET / HTTP/1.1\r\nConnection: close\r\n");
        let res = translate(Outcome::Json(json!({})), &req);
        assert!(!res.keep_alive);
    }

    #[test]
    fn head_request_strips_body_but_keeps_headers() {
        let req = request(b"HEAD / HTTP/1.1\r\n");
        let res = translate(Outcome::Json(json!({"abc": "def"})), &req);
        assert!(res.body.is_empty());
        // Content-Length still describes the body a GET would have carried.
        assert_eq!(header(&res, "Content-Length"), "13");
    }

    #[test]
    fn server_header_is_set() {
        let req = request(b"GET / HTTP/1.1\r\n");
        let res = translate(Outcome::Json(json!({})), &req);
        assert!(header(&res, "Server").starts_with("reelvault/"));
    }

    #[test]
    fn wire_bytes_carry_status_line_and_connection() {
        let req = request(b"GET / HTTP/1.1\r\nConnection: close\r\n");
        let res = translate(Outcome::NotFound("missing".into()), &req);
        let text = String::from_utf8(res.to_bytes()).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\nmissing"));
    }
}
