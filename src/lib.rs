//! Mocksim - a local HTTP simulation engine
//!
//! Mocksim sits inside a dev server as a middleware hook and answers
//! selected requests with synthetic data instead of a real backend.
//! It opens no sockets: the host hands each request in and writes the
//! produced response out.
//!
//! # Features
//!
//! - **Route Matching**: literal paths with `:param` segments or raw
//!   regexes, with optional method filters; first match wins
//! - **Declarative Route Files**: YAML/JSON files in a watched mock
//!   directory, hot-reloaded on change via an atomic snapshot swap
//! - **Native Handlers**: programmatically registered routes backed by
//!   async closures
//! - **Scenarios**: named, persisted route sets with exactly one active
//!   at a time
//! - **Recording**: capture answered requests and replay them later as a
//!   generated scenario
//! - **Data Templates**: randomized `user`/`product`/`article`/`list`/
//!   `error` payloads
//!
//! # Example Route File
//!
//! ```yaml
//! - url: /api/users/:id
//!   method: GET
//!   delay: 150
//!   body:
//!     type: template
//!     content:
//!       id: "{{params.id}}"
//!       name: "User {{params.id}}"
//!
//! - url: /api/users
//!   method: GET
//!   body:
//!     type: data_template
//!     name: user
//!     count: 10
//! ```
//!
//! # Embedding
//!
//! ```no_run
//! use mocksim::{EngineConfig, MockEngine, MockResponse, RawRequest};
//!
//! # async fn example() -> mocksim::Result<()> {
//! let engine = MockEngine::new(EngineConfig::default()).await?;
//! let _watcher = engine.watch();
//!
//! let raw = RawRequest::new("GET", "/api/users/7");
//! let mut res = MockResponse::new();
//! if engine.handle(&raw, &mut res).await {
//!     // write res.status_code(), res.headers(), res.body_bytes()
//! } else {
//!     // continue the host pipeline
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod datagen;
pub mod engine;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod recording;
pub mod registry;
pub mod request;
pub mod response;
pub mod route;
pub mod scenario;
pub mod template;
pub mod watcher;

pub use config::EngineConfig;
pub use engine::MockEngine;
pub use error::{MockError, Result};
pub use recording::{RecordedRequest, Recorder};
pub use request::{MockRequest, RawRequest};
pub use response::MockResponse;
pub use route::{BodySpec, Delay, FnHandler, Handler, MockRoute, RouteDef};
pub use scenario::{MockScenario, ScenarioManager, DEFAULT_SCENARIO};
