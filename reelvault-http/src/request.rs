//! HTTP/1.x request parsing, from scratch.
//!
//! The session engine reads the header block off the socket and hands it
//! here; the body (if Content-Length says there is one) is read afterwards
//! and attached. Header names are stored lowercased so lookups are
//! case-insensitive.

use std::collections::HashMap;

use thiserror::Error;

/// Request methods the router can key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Method {
    fn from_token(token: &str) -> Result<Self, ParseError> {
        match token {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(ParseError::UnsupportedMethod(token.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Protocol versions the engine speaks. The response echoes the request's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    fn from_token(token: &str) -> Result<Self, ParseError> {
        match token {
            "HTTP/1.0" => Ok(Version::Http10),
            "HTTP/1.1" => Ok(Version::Http11),
            _ => Err(ParseError::UnsupportedVersion(token.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("request is not valid UTF-8")]
    InvalidEncoding,
    #[error("malformed request line: '{0}'")]
    InvalidRequestLine(String),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),
    #[error("malformed header line: '{0}'")]
    InvalidHeader(String),
    #[error("invalid Content-Length: '{0}'")]
    InvalidContentLength(String),
    #[error("header block exceeds {0} bytes")]
    HeadersTooLarge(usize),
    #[error("body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

/// One parsed request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    version: Version,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Request {
    /// Parse a request line plus headers (everything before the blank line).
    pub fn parse(head: &[u8]) -> Result<Self, ParseError> {
        let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidEncoding)?;
        let mut lines = head.split("\r\n");

        let request_line = lines
            .next()
            .ok_or_else(|| ParseError::InvalidRequestLine(String::new()))?;
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::InvalidRequestLine(request_line.to_string()));
        };
        let method = Method::from_token(method)?;
        let version = Version::from_token(version)?;

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(ParseError::InvalidHeader(line.to_string()));
            };
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(Request {
            method,
            path: target.to_string(),
            version,
            headers,
            body: Vec::new(),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Header lookup by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the connection should stay open after this exchange.
    ///
    /// HTTP/1.1 defaults to keep-alive, HTTP/1.0 to close; an explicit
    /// Connection header overrides either way.
    pub fn keep_alive(&self) -> bool {
        match self.header("connection").map(str::to_ascii_lowercase) {
            Some(value) if value == "close" => false,
            Some(value) if value == "keep-alive" => true,
            _ => self.version == Version::Http11,
        }
    }

    /// Declared body length; absent means zero.
    pub fn content_length(&self) -> Result<usize, ParseError> {
        match self.header("content-length") {
            None => Ok(0),
            Some(value) => value
                .parse()
                .map_err(|_| ParseError::InvalidContentLength(value.to_string())),
        }
    }

    pub(crate) fn attach_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }
}
