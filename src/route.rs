//! Route definitions and compiled patterns.
//!
//! A [`RouteDef`] is the pure-data form that route files and scenarios
//! persist. A [`MockRoute`] is its compiled runtime counterpart: the URL
//! pattern compiled to a regex once, plus an optional native handler for
//! routes registered programmatically.

use crate::error::{MockError, Result};
use crate::request::MockRequest;
use crate::response::MockResponse;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A single route definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouteDef {
    /// Literal path with optional `:name` segments, or a regular
    /// expression when `regex` is set
    pub url: String,

    /// Treat `url` as a regular expression instead of a literal pattern
    #[serde(default, skip_serializing_if = "is_false")]
    pub regex: bool,

    /// HTTP method to match (unset = any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Latency simulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,

    /// Status code override (default 200)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Fixed response headers
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodySpec>,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl RouteDef {
    /// Create a definition matching any method on `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            regex: false,
            method: None,
            delay: None,
            status: None,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Restrict the route to one HTTP method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Mark `url` as a regular expression.
    pub fn regex(mut self) -> Self {
        self.regex = true;
        self
    }

    /// Set a fixed delay in milliseconds.
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Delay::Fixed(ms));
        self
    }

    /// Override the response status code.
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a fixed response header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Respond with a static JSON value.
    pub fn json_body(mut self, value: serde_json::Value) -> Self {
        self.body = Some(BodySpec::Json { content: value });
        self
    }

    /// Validate the definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            anyhow::bail!("Route url cannot be empty");
        }
        if let Some(status) = self.status {
            if !(100..=599).contains(&status) {
                anyhow::bail!("Invalid status code: {}", status);
            }
        }
        Ok(())
    }
}

/// Latency simulation: a fixed wait or a random range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Delay {
    /// Fixed delay in milliseconds
    Fixed(u64),
    /// Uniform random delay between `min_ms` and `max_ms`
    Range { min_ms: u64, max_ms: u64 },
}

impl Delay {
    /// Calculate the actual delay to apply.
    pub fn millis(&self) -> u64 {
        match *self {
            Delay::Fixed(ms) => ms,
            Delay::Range { min_ms, max_ms } => {
                if max_ms > min_ms {
                    use rand::Rng;
                    rand::thread_rng().gen_range(min_ms..=max_ms)
                } else {
                    min_ms
                }
            }
        }
    }
}

/// Response body configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodySpec {
    /// Plain text body
    Text { content: String },
    /// Static JSON body
    Json { content: serde_json::Value },
    /// Base64 encoded binary
    Base64 { content: String },
    /// JSON body whose string fields are rendered as Handlebars templates
    /// against the request context
    Template { content: serde_json::Value },
    /// Synthetic payload from a named data template
    DataTemplate {
        name: String,
        #[serde(default = "default_count")]
        count: usize,
    },
}

fn default_count() -> usize {
    1
}

impl BodySpec {
    /// Content type sent when the route headers carry none.
    pub fn content_type(&self) -> &'static str {
        match self {
            BodySpec::Text { .. } => "text/plain",
            BodySpec::Base64 { .. } => "application/octet-stream",
            BodySpec::Json { .. } | BodySpec::Template { .. } | BodySpec::DataTemplate { .. } => {
                "application/json"
            }
        }
    }
}

/// Response generator for programmatically registered routes.
///
/// A handler may write the response itself through [`MockResponse`], or
/// return a value for the engine to serialize as JSON. Returning a value
/// after writing terminally is ignored; the write wins.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn respond(
        &self,
        req: &MockRequest,
        res: &mut MockResponse,
    ) -> anyhow::Result<Option<serde_json::Value>>;
}

/// Adapter turning a plain closure into a [`Handler`].
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(&MockRequest, &mut MockResponse) -> anyhow::Result<Option<serde_json::Value>>
        + Send
        + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&MockRequest, &mut MockResponse) -> anyhow::Result<Option<serde_json::Value>>
        + Send
        + Sync,
{
    async fn respond(
        &self,
        req: &MockRequest,
        res: &mut MockResponse,
    ) -> anyhow::Result<Option<serde_json::Value>> {
        (self.0)(req, res)
    }
}

/// A compiled URL pattern.
///
/// Literal patterns rewrite each `:name` segment into a single-segment
/// capture and bind captures back to the token names in order. Regex
/// patterns contribute only their named capture groups as params.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    /// Token names for literal patterns, in capture order; empty for
    /// regex patterns (which use named groups instead)
    tokens: Vec<String>,
}

impl CompiledPattern {
    /// Compile a literal pattern with optional `:name` segments.
    pub fn literal(pattern: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        let mut parts = Vec::new();

        for segment in pattern.split('/') {
            if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(MockError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: format!("bad parameter segment {:?}", segment),
                    });
                }
                tokens.push(name.to_string());
                parts.push("([^/]+)".to_string());
            } else {
                parts.push(regex::escape(segment));
            }
        }

        let source = format!("^{}$", parts.join("/"));
        let regex = Regex::new(&source).map_err(|e| MockError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { regex, tokens })
    }

    /// Compile a raw regular expression pattern.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| MockError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            regex,
            tokens: Vec::new(),
        })
    }

    /// Test the path-only portion of a URL, binding params on match.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        let mut params = HashMap::new();

        if self.tokens.is_empty() {
            for name in self.regex.capture_names().flatten() {
                if let Some(m) = captures.name(name) {
                    params.insert(name.to_string(), m.as_str().to_string());
                }
            }
        } else {
            for (token, capture) in self.tokens.iter().zip(captures.iter().skip(1)) {
                if let Some(m) = capture {
                    params.insert(token.clone(), m.as_str().to_string());
                }
            }
        }

        Some(params)
    }
}

/// A compiled route: definition, pattern, optional native handler.
#[derive(Clone)]
pub struct MockRoute {
    def: RouteDef,
    pattern: CompiledPattern,
    handler: Option<Arc<dyn Handler>>,
}

impl MockRoute {
    /// Compile a definition into a matchable route.
    pub fn new(def: RouteDef) -> Result<Self> {
        let pattern = if def.regex {
            CompiledPattern::regex(&def.url)?
        } else {
            CompiledPattern::literal(&def.url)?
        };

        if let Some(BodySpec::Base64 { content }) = &def.body {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(content)
                .map_err(|e| MockError::InvalidPattern {
                    pattern: def.url.clone(),
                    reason: format!("invalid base64 body: {}", e),
                })?;
        }

        Ok(Self {
            def,
            pattern,
            handler: None,
        })
    }

    /// Attach a native response handler.
    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn def(&self) -> &RouteDef {
        &self.def
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn handler(&self) -> Option<&Arc<dyn Handler>> {
        self.handler.as_ref()
    }

    /// Method filter: unset matches any, set compares case-insensitively.
    pub fn matches_method(&self, method: &str) -> bool {
        match &self.def.method {
            Some(m) => m.eq_ignore_ascii_case(method),
            None => true,
        }
    }
}

impl fmt::Debug for MockRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRoute")
            .field("def", &self.def)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
