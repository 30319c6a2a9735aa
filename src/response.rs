//! Response write side.
//!
//! [`MockResponse`] collects the response a mock produces: chainable
//! mutators for status and headers, and terminal writers that fix the
//! body. At most one terminal writer fires per request; a second attempt
//! is logged and suppressed so a misbehaving handler cannot corrupt the
//! stream the host is about to write.

use std::collections::HashMap;
use tracing::warn;

/// The write side handed to handlers and read back by the host.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
    finished: bool,
}

impl MockResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: None,
            finished: false,
        }
    }

    /// Set the status code. Chainable, idempotent, no effect after a
    /// terminal write.
    pub fn status(&mut self, status: u16) -> &mut Self {
        if !self.finished {
            self.status = status;
        }
        self
    }

    /// Set a response header. Chainable; later values replace earlier
    /// ones for the same (lowercased) name.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if !self.finished {
            self.headers.insert(name.into().to_lowercase(), value.into());
        }
        self
    }

    /// Terminal writer: serialize a JSON value as the body.
    ///
    /// Sets `content-type: application/json` unless one was already set.
    pub fn json(&mut self, value: &serde_json::Value) {
        if self.reject_double_write("json") {
            return;
        }
        self.headers
            .entry("content-type".to_string())
            .or_insert_with(|| "application/json".to_string());
        self.body = Some(value.to_string().into_bytes());
        self.finished = true;
    }

    /// Terminal writer: raw bytes with an explicit content type.
    ///
    /// An earlier `header("content-type", ...)` call wins over
    /// `content_type`.
    pub fn raw(&mut self, body: impl Into<Vec<u8>>, content_type: &str) {
        if self.reject_double_write("raw") {
            return;
        }
        self.headers
            .entry("content-type".to_string())
            .or_insert_with(|| content_type.to_string());
        self.body = Some(body.into());
        self.finished = true;
    }

    /// Terminal writer: finish with no body.
    pub fn end(&mut self) {
        if self.reject_double_write("end") {
            return;
        }
        self.finished = true;
    }

    fn reject_double_write(&self, writer: &str) -> bool {
        if self.finished {
            warn!(writer, "Second terminal write suppressed");
            true
        } else {
            false
        }
    }

    /// Whether a terminal writer has fired.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Body as UTF-8 text (lossy), empty string when bodyless.
    pub fn body_string(&self) -> String {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// Body parsed back as JSON, if it is JSON.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(self.body.as_deref()?).ok()
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutators_chain() {
        let mut res = MockResponse::new();
        res.status(201).header("X-Mocked", "1").header("x-trace", "t");
        assert_eq!(res.status_code(), 201);
        assert_eq!(res.headers().get("x-mocked"), Some(&"1".to_string()));
        assert_eq!(res.headers().get("x-trace"), Some(&"t".to_string()));
        assert!(!res.is_finished());
    }

    #[test]
    fn test_json_writer() {
        let mut res = MockResponse::new();
        res.json(&serde_json::json!({"id": "7"}));
        assert!(res.is_finished());
        assert_eq!(
            res.headers().get("content-type"),
            Some(&"application/json".to_string())
        );
        assert_eq!(res.body_json().unwrap()["id"], "7");
    }

    #[test]
    fn test_raw_writer_respects_existing_content_type() {
        let mut res = MockResponse::new();
        res.header("content-type", "text/csv");
        res.raw("a,b\n1,2", "text/plain");
        assert_eq!(
            res.headers().get("content-type"),
            Some(&"text/csv".to_string())
        );
        assert_eq!(res.body_string(), "a,b\n1,2");
    }

    #[test]
    fn test_second_terminal_write_suppressed() {
        let mut res = MockResponse::new();
        res.json(&serde_json::json!({"first": true}));
        res.json(&serde_json::json!({"second": true}));
        assert_eq!(res.body_json().unwrap()["first"], true);

        res.raw("late", "text/plain");
        assert_eq!(res.body_json().unwrap()["first"], true);
    }

    #[test]
    fn test_mutators_frozen_after_write() {
        let mut res = MockResponse::new();
        res.status(200);
        res.end();
        res.status(500).header("late", "x");
        assert_eq!(res.status_code(), 200);
        assert!(!res.headers().contains_key("late"));
    }

    #[test]
    fn test_end_without_body() {
        let mut res = MockResponse::new();
        res.status(204);
        res.end();
        assert!(res.is_finished());
        assert!(res.body_bytes().is_none());
        assert_eq!(res.body_string(), "");
    }
}
