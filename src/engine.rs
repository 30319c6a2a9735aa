//! The mock engine.
//!
//! [`MockEngine`] wires the registry, scenario manager, recorder and
//! template engine together behind one explicit handle. The host
//! middleware calls [`handle`](MockEngine::handle) per request; `false`
//! means the request was not intercepted and the caller continues its own
//! pipeline. Several independent engines per process are fine; there is
//! no global state.

use crate::config::EngineConfig;
use crate::datagen;
use crate::error::{MockError, Result};
use crate::loader::DirLoader;
use crate::matcher::{find_match, RouteMatch};
use crate::recording::{
    routes_from_recording, RecordedRequest, Recorder, RequestSnapshot, ResponseSnapshot,
};
use crate::registry::RouteRegistry;
use crate::request::{MockRequest, RawRequest};
use crate::response::MockResponse;
use crate::route::{BodySpec, MockRoute};
use crate::scenario::ScenarioManager;
use crate::template::TemplateEngine;
use crate::watcher::{spawn_watcher, WatchHandle};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct MockEngine {
    config: EngineConfig,
    loader: Arc<DirLoader>,
    registry: Arc<RouteRegistry>,
    scenarios: ScenarioManager,
    recorder: Recorder,
    templates: TemplateEngine,
    /// Total requests offered to the engine (prefix matched).
    requests_total: AtomicU64,
    /// Requests answered by a mock route.
    requests_matched: AtomicU64,
    /// Requests passed back to the caller's pipeline.
    requests_unmatched: AtomicU64,
}

impl MockEngine {
    /// Build an engine: validates the config, loads persisted scenarios
    /// and performs the initial route load.
    pub async fn new(config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| MockError::Config(e.to_string()))?;

        let loader = Arc::new(DirLoader::new(&config.root, &config.ignore)?);
        let registry = Arc::new(RouteRegistry::new(loader.clone()));
        let scenarios = ScenarioManager::new(config.scenarios_dir());
        let recorder = Recorder::new(config.recordings_dir());

        scenarios.init().await?;
        let routes = registry.reload().await?;

        info!(
            root = %config.root.display(),
            prefix = %config.url_prefix,
            routes,
            watch = config.watch,
            "Mock engine initialized"
        );

        Ok(Self {
            config,
            loader,
            registry,
            scenarios,
            recorder,
            templates: TemplateEngine::new(),
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
        })
    }

    /// Start the hot-reload watcher, if enabled. The caller keeps the
    /// handle; dropping it stops watching.
    pub fn watch(&self) -> Option<WatchHandle> {
        if !self.config.watch {
            return None;
        }
        Some(spawn_watcher(
            self.loader.clone(),
            self.registry.clone(),
            Duration::from_millis(self.config.watch_interval_ms),
        ))
    }

    /// Answer one request.
    ///
    /// Returns `true` when a mock route produced the response in `res`;
    /// `false` when the request is not intercepted (engine disabled,
    /// prefix mismatch, or no matching route) and the caller should
    /// continue its own pipeline.
    pub async fn handle(&self, raw: &RawRequest, res: &mut MockResponse) -> bool {
        if !self.config.enabled {
            return false;
        }

        let path = raw.path();
        if !path.starts_with(&self.config.url_prefix) {
            return false;
        }
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        // Both snapshots stay consistent for the rest of this request,
        // however many reloads race with us.
        let scenario_routes = self.scenarios.active_routes().await;
        let registry_routes = self.registry.snapshot().await;

        let matched = find_match(&scenario_routes, &raw.method, path)
            .or_else(|| find_match(&registry_routes, &raw.method, path));

        let Some(RouteMatch { route, params }) = matched else {
            self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
            if self.config.log_unmatched {
                debug!(method = %raw.method, path = %path, "No matching mock route");
            }
            return false;
        };

        self.requests_matched.fetch_add(1, Ordering::Relaxed);
        if self.config.log_matches {
            info!(
                method = %raw.method,
                path = %path,
                route = %route.def().url,
                "Request matched mock route"
            );
        }

        let req = MockRequest::normalize(raw, params);

        let delay_ms = route
            .def()
            .delay
            .map(|d| d.millis())
            .unwrap_or(self.config.default_delay_ms);
        if delay_ms > 0 {
            debug!(delay_ms, "Applying delay");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        res.status(route.def().status.unwrap_or(200));
        for (name, value) in &route.def().headers {
            res.header(name.clone(), value.clone());
        }

        self.dispatch(route, &req, res).await;

        if !res.is_finished() {
            res.end();
        }

        if self.recorder.is_recording() {
            self.recorder.record(capture(&req, res, delay_ms)).await;
        }

        true
    }

    /// Produce the response body for a matched route.
    async fn dispatch(&self, route: &MockRoute, req: &MockRequest, res: &mut MockResponse) {
        if let Some(handler) = route.handler() {
            match handler.respond(req, res).await {
                // Auto-serialize a returned value only when the handler
                // did not write terminally itself
                Ok(Some(value)) => {
                    if !res.is_finished() {
                        res.json(&value);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(route = %route.def().url, error = %e, "Mock handler failed");
                    res.status(500);
                    res.json(&serde_json::json!({
                        "error": "handler_error",
                        "message": e.to_string(),
                    }));
                }
            }
            return;
        }

        match &route.def().body {
            None => res.end(),
            Some(BodySpec::Text { content }) => res.raw(content.clone(), "text/plain"),
            Some(BodySpec::Json { content }) => res.json(content),
            Some(BodySpec::Base64 { content }) => {
                use base64::Engine;
                match base64::engine::general_purpose::STANDARD.decode(content) {
                    Ok(bytes) => res.raw(bytes, "application/octet-stream"),
                    Err(e) => {
                        warn!(route = %route.def().url, error = %e, "Undecodable base64 body");
                        res.status(500);
                        res.json(&serde_json::json!({"error": "invalid_body"}));
                    }
                }
            }
            Some(BodySpec::Template { content }) => match self.templates.render_json(content, req)
            {
                Ok(rendered) => res.json(&rendered),
                Err(e) => {
                    warn!(route = %route.def().url, error = %e, "Template render failed, sending unrendered body");
                    res.json(content);
                }
            },
            Some(BodySpec::DataTemplate { name, count }) => match datagen::generate(name, *count) {
                Ok(value) => res.json(&value),
                Err(e) => {
                    warn!(route = %route.def().url, error = %e, "Data template failed");
                    res.status(500);
                    res.json(&serde_json::json!({
                        "error": "template_not_found",
                        "message": e.to_string(),
                    }));
                }
            },
        }
    }

    /// Register a programmatic route (usually handler-backed).
    pub async fn register(&self, route: MockRoute) -> Result<()> {
        self.registry.register(route).await
    }

    /// Convert a persisted recording into a scenario, one route per
    /// recorded entry. An existing scenario of that name has its routes
    /// replaced. Returns the route count.
    pub async fn generate_scenario_from_recording(
        &self,
        recording: &str,
        scenario: &str,
    ) -> Result<usize> {
        let entries = self.recorder.load(recording).await?;
        let defs = routes_from_recording(&entries);
        let count = defs.len();

        match self
            .scenarios
            .create(scenario, &format!("Generated from recording {:?}", recording))
            .await
        {
            Ok(()) => {}
            Err(MockError::ScenarioExists(_)) => {
                debug!(scenario, "Regenerating existing scenario")
            }
            Err(e) => return Err(e),
        }
        self.scenarios.set_routes(scenario, defs).await?;

        info!(recording, scenario, routes = count, "Scenario generated from recording");
        Ok(count)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn scenarios(&self) -> &ScenarioManager {
        &self.scenarios
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn total_matched(&self) -> u64 {
        self.requests_matched.load(Ordering::Relaxed)
    }

    pub fn total_unmatched(&self) -> u64 {
        self.requests_unmatched.load(Ordering::Relaxed)
    }
}

/// Snapshot a finished request/response pair for the recorder.
fn capture(req: &MockRequest, res: &MockResponse, delay_ms: u64) -> RecordedRequest {
    let body = res.body_bytes().map(|bytes| {
        res.body_json()
            .unwrap_or_else(|| serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()))
    });

    RecordedRequest {
        url: req.url.clone(),
        method: req.method.clone(),
        timestamp: Utc::now(),
        request: RequestSnapshot {
            params: req.params.clone(),
            query: req.query.clone(),
            headers: req.headers.clone(),
            body: req.body.to_value(),
        },
        response: ResponseSnapshot {
            status: res.status_code(),
            headers: res.headers().clone(),
            body,
            delay_ms: (delay_ms > 0).then_some(delay_ms),
        },
    }
}
