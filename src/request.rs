//! Request normalization.
//!
//! The host middleware hands the engine a [`RawRequest`]; matching and
//! handlers work against the derived, read-only [`MockRequest`].

use serde::Serialize;
use std::collections::HashMap;

/// Raw request as captured by the host middleware.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    /// Full URL path including any query string
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Fully buffered request body, if any
    pub body: Option<Vec<u8>>,
}

impl RawRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_json_body(self, value: &serde_json::Value) -> Self {
        self.with_body(value.to_string().into_bytes())
    }

    /// Path-only portion of the URL (query stripped).
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }

    /// Query-string portion of the URL, if present.
    pub fn query_string(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, q)| q)
    }
}

/// Parsed request body: JSON when it parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BodyContent {
    None,
    Json(serde_json::Value),
    Text(String),
}

impl BodyContent {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            BodyContent::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, BodyContent::None)
    }

    /// The body as a JSON value; text becomes a string value.
    pub fn to_value(&self) -> Option<serde_json::Value> {
        match self {
            BodyContent::None => None,
            BodyContent::Json(v) => Some(v.clone()),
            BodyContent::Text(s) => Some(serde_json::Value::String(s.clone())),
        }
    }
}

/// Read-only view of one matched request. Created per request,
/// discarded after handling.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Full URL as received (query string included)
    pub url: String,
    /// Path-only portion
    pub path: String,
    /// HTTP method, uppercased
    pub method: String,
    /// Path parameters bound by the matcher
    pub params: HashMap<String, String>,
    /// Query parameters; on duplicate keys the last value wins
    pub query: HashMap<String, String>,
    /// Request headers, keys lowercased
    pub headers: HashMap<String, String>,
    /// Parsed body for methods conventionally carrying one
    pub body: BodyContent,
}

/// Methods whose bodies are buffered and parsed.
const BODY_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];

impl MockRequest {
    /// Normalize a raw request, attaching matcher params verbatim.
    ///
    /// Body parsing never fails: invalid JSON falls back to raw text.
    pub fn normalize(raw: &RawRequest, params: HashMap<String, String>) -> Self {
        let method = raw.method.to_uppercase();
        let query = parse_query_string(raw.query_string().unwrap_or(""));
        let headers = raw
            .headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();

        let body = if BODY_METHODS.contains(&method.as_str()) {
            match &raw.body {
                Some(bytes) if !bytes.is_empty() => {
                    match serde_json::from_slice::<serde_json::Value>(bytes) {
                        Ok(value) => BodyContent::Json(value),
                        Err(_) => BodyContent::Text(String::from_utf8_lossy(bytes).into_owned()),
                    }
                }
                _ => BodyContent::None,
            }
        } else {
            BodyContent::None
        };

        Self {
            url: raw.url.clone(),
            path: raw.path().to_string(),
            method,
            params,
            query,
            headers,
            body,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Parse a query string into key-value pairs; the last value wins on
/// duplicate keys.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        if let Some((key, value)) = part.split_once('=') {
            params.insert(percent_decode(key), percent_decode(value));
        } else {
            params.insert(percent_decode(part), String::new());
        }
    }

    params
}

/// Percent-decoding with `+` treated as space.
fn percent_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    bytes.push(byte);
                    continue;
                }
            }
            bytes.push(b'%');
            bytes.extend_from_slice(hex.as_bytes());
        } else if ch == '+' {
            bytes.push(b' ');
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}
