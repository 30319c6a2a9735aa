//! Template engine for dynamic responses.
//!
//! Uses Handlebars to render response bodies against the request context:
//! `{{params.id}}`, `{{query.page}}`, `{{headers.x-request-id}}`,
//! `{{method}}`, `{{path}}`, `{{json.field}}` for a parsed JSON body,
//! plus the `uuid`, `now`, `random`, `default`, `upper` and `lower`
//! helpers.

use crate::request::{BodyContent, MockRequest};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashMap;

/// Template engine for rendering dynamic responses.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

/// Context for template rendering.
#[derive(Debug, Serialize)]
struct TemplateContext<'a> {
    /// Path parameters bound by the matcher
    params: &'a HashMap<String, String>,
    /// Query parameters
    query: &'a HashMap<String, String>,
    /// Request headers (lowercased keys)
    headers: &'a HashMap<String, String>,
    /// Request method
    method: &'a str,
    /// Request path
    path: &'a str,
    /// Request body as text
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    /// Request body as JSON, when it parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    json: Option<&'a serde_json::Value>,
}

impl<'a> TemplateContext<'a> {
    fn from_request(req: &'a MockRequest) -> Self {
        let (body, json) = match &req.body {
            BodyContent::None => (None, None),
            BodyContent::Json(v) => (Some(v.to_string()), Some(v)),
            BodyContent::Text(s) => (Some(s.clone()), None),
        };

        Self {
            params: &req.params,
            query: &req.query,
            headers: &req.headers,
            method: &req.method,
            path: &req.path,
            body,
            json,
        }
    }
}

impl TemplateEngine {
    /// Create a new template engine with all helpers registered.
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        handlebars.register_helper("uuid", Box::new(uuid_helper));
        handlebars.register_helper("now", Box::new(now_helper));
        handlebars.register_helper("random", Box::new(random_helper));
        handlebars.register_helper("default", Box::new(default_helper));
        handlebars.register_helper("upper", Box::new(upper_helper));
        handlebars.register_helper("lower", Box::new(lower_helper));

        // Responses are JSON or plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        Self { handlebars }
    }

    /// Render a template string against the request context.
    pub fn render(
        &self,
        template: &str,
        req: &MockRequest,
    ) -> Result<String, handlebars::RenderError> {
        let ctx = TemplateContext::from_request(req);
        self.handlebars.render_template(template, &ctx)
    }

    /// Render a JSON value, substituting templates in its string fields.
    pub fn render_json(
        &self,
        value: &serde_json::Value,
        req: &MockRequest,
    ) -> Result<serde_json::Value, handlebars::RenderError> {
        let ctx = TemplateContext::from_request(req);
        self.render_value(value, &ctx)
    }

    fn render_value(
        &self,
        value: &serde_json::Value,
        ctx: &TemplateContext<'_>,
    ) -> Result<serde_json::Value, handlebars::RenderError> {
        match value {
            serde_json::Value::String(s) => {
                if s.contains("{{") {
                    let rendered = self.handlebars.render_template(s, ctx)?;
                    Ok(serde_json::Value::String(rendered))
                } else {
                    Ok(value.clone())
                }
            }
            serde_json::Value::Array(arr) => {
                let rendered: Result<Vec<_>, _> =
                    arr.iter().map(|v| self.render_value(v, ctx)).collect();
                Ok(serde_json::Value::Array(rendered?))
            }
            serde_json::Value::Object(obj) => {
                let mut rendered = serde_json::Map::new();
                for (k, v) in obj {
                    rendered.insert(k.clone(), self.render_value(v, ctx)?);
                }
                Ok(serde_json::Value::Object(rendered))
            }
            _ => Ok(value.clone()),
        }
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

// Custom Handlebars helpers

fn uuid_helper(
    _: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    out.write(&crate::datagen::random_uuid())?;
    Ok(())
}

fn now_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    use chrono::Utc;

    let format = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .unwrap_or("%Y-%m-%dT%H:%M:%S%.3fZ");

    out.write(&Utc::now().format(format).to_string())?;
    Ok(())
}

fn random_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    use rand::Rng;

    let min = h.param(0).and_then(|v| v.value().as_i64()).unwrap_or(0);
    let max = h.param(1).and_then(|v| v.value().as_i64()).unwrap_or(100);

    let value = rand::thread_rng().gen_range(min..=max.max(min));
    out.write(&value.to_string())?;
    Ok(())
}

fn default_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let value = h.param(0).map(|v| v.value());
    let fallback = h.param(1).and_then(|v| v.value().as_str()).unwrap_or("");

    match value {
        Some(v) if !v.is_null() => {
            if let Some(s) = v.as_str() {
                if !s.is_empty() {
                    out.write(s)?;
                    return Ok(());
                }
            } else {
                out.write(&v.to_string())?;
                return Ok(());
            }
        }
        _ => {}
    }

    out.write(fallback)?;
    Ok(())
}

fn upper_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let value = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&value.to_uppercase())?;
    Ok(())
}

fn lower_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let value = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&value.to_lowercase())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RawRequest;

    fn request_with_params(pairs: &[(&str, &str)]) -> MockRequest {
        let params = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MockRequest::normalize(&RawRequest::new("GET", "/users/123"), params)
    }

    #[test]
    fn test_params_substitution() {
        let engine = TemplateEngine::new();
        let req = request_with_params(&[("id", "123")]);
        let result = engine.render("User ID: {{params.id}}", &req).unwrap();
        assert_eq!(result, "User ID: 123");
    }

    #[test]
    fn test_query_substitution() {
        let engine = TemplateEngine::new();
        let raw = RawRequest::new("GET", "/list?page=4");
        let req = MockRequest::normalize(&raw, Default::default());
        let result = engine.render("Page: {{query.page}}", &req).unwrap();
        assert_eq!(result, "Page: 4");
    }

    #[test]
    fn test_header_substitution() {
        let engine = TemplateEngine::new();
        let raw = RawRequest::new("GET", "/").with_header("User-Agent", "test-client");
        let req = MockRequest::normalize(&raw, Default::default());
        let result = engine
            .render("Client: {{headers.user-agent}}", &req)
            .unwrap();
        assert_eq!(result, "Client: test-client");
    }

    #[test]
    fn test_json_body_substitution() {
        let engine = TemplateEngine::new();
        let raw =
            RawRequest::new("POST", "/users").with_json_body(&serde_json::json!({"name": "John"}));
        let req = MockRequest::normalize(&raw, Default::default());
        let result = engine.render("Name: {{json.name}}", &req).unwrap();
        assert_eq!(result, "Name: John");
    }

    #[test]
    fn test_uuid_helper_shape() {
        let engine = TemplateEngine::new();
        let req = request_with_params(&[]);
        let result = engine.render("{{uuid}}", &req).unwrap();
        assert_eq!(result.len(), 36);
        assert_eq!(result.chars().nth(8), Some('-'));
        assert_eq!(result.chars().nth(14), Some('4'));
    }

    #[test]
    fn test_default_helper() {
        let engine = TemplateEngine::new();
        let req = request_with_params(&[]);
        let result = engine
            .render("Value: {{default query.missing \"fallback\"}}", &req)
            .unwrap();
        assert_eq!(result, "Value: fallback");
    }

    #[test]
    fn test_upper_lower_helpers() {
        let engine = TemplateEngine::new();
        let req = request_with_params(&[("name", "John")]);
        let result = engine
            .render("{{upper params.name}}/{{lower params.name}}", &req)
            .unwrap();
        assert_eq!(result, "JOHN/john");
    }

    #[test]
    fn test_render_json_only_touches_templated_strings() {
        let engine = TemplateEngine::new();
        let req = request_with_params(&[("id", "123")]);

        let value = serde_json::json!({
            "id": "{{params.id}}",
            "name": "User {{params.id}}",
            "static": "no template",
            "count": 3,
            "nested": [{"ref": "{{params.id}}"}]
        });

        let result = engine.render_json(&value, &req).unwrap();
        assert_eq!(result["id"], "123");
        assert_eq!(result["name"], "User 123");
        assert_eq!(result["static"], "no template");
        assert_eq!(result["count"], 3);
        assert_eq!(result["nested"][0]["ref"], "123");
    }
}
