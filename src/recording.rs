//! Request recording and replay.
//!
//! While recording, every request the engine answers is mirrored into an
//! append-only buffer: the mock layer captures its own output, not a live
//! upstream call. Buffers persist verbatim under `recordings/<name>.json`
//! and can be turned into scenarios route-for-route.

use crate::error::{MockError, Result};
use crate::route::{BodySpec, Delay, RouteDef};
use crate::scenario::validate_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One captured request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub url: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
}

/// Request side of a captured pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RequestSnapshot {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub query: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Response side of a captured pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// JSON body when it parsed as JSON, a string value otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Delay that was applied before answering (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

/// Capture buffer with an Idle/Recording toggle.
pub struct Recorder {
    dir: PathBuf,
    recording: AtomicBool,
    buffer: RwLock<Vec<RecordedRequest>>,
}

impl Recorder {
    /// Create a recorder persisting under `dir` (the `recordings/`
    /// directory).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            recording: AtomicBool::new(false),
            buffer: RwLock::new(Vec::new()),
        }
    }

    /// Enter the Recording state.
    pub fn start(&self) {
        self.recording.store(true, Ordering::SeqCst);
        info!("Recording started");
    }

    /// Return to Idle. The buffer is kept for saving or inspection.
    pub fn stop(&self) {
        self.recording.store(false, Ordering::SeqCst);
        info!("Recording stopped");
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Append a captured pair. Ignored while Idle.
    pub async fn record(&self, entry: RecordedRequest) {
        if !self.is_recording() {
            return;
        }
        let mut buffer = self.buffer.write().await;
        debug!(url = %entry.url, method = %entry.method, "Captured request");
        buffer.push(entry);
    }

    /// Snapshot of the buffer contents.
    pub async fn entries(&self) -> Vec<RecordedRequest> {
        self.buffer.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.buffer.read().await.len()
    }

    /// Drop all buffered entries.
    pub async fn clear(&self) {
        self.buffer.write().await.clear();
    }

    /// Persist the buffer verbatim. The buffer is not cleared.
    pub async fn save(&self, name: &str) -> Result<usize> {
        validate_name(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let entries = self.buffer.read().await;
        let json = serde_json::to_string_pretty(&*entries)?;
        tokio::fs::write(self.file_path(name), json).await?;
        info!(name, entries = entries.len(), "Recording saved");
        Ok(entries.len())
    }

    /// Read a persisted recording back for inspection or conversion.
    pub async fn load(&self, name: &str) -> Result<Vec<RecordedRequest>> {
        let path = self.file_path(name);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MockError::RecordingNotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Names of persisted recordings, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

/// Map recorded entries 1:1 to static route definitions.
///
/// Each entry becomes a route answering with the captured status,
/// headers, body and delay. No back-reference to the recording remains.
pub fn routes_from_recording(entries: &[RecordedRequest]) -> Vec<RouteDef> {
    entries
        .iter()
        .map(|entry| {
            let path_only = entry.url.split('?').next().unwrap_or(&entry.url);
            RouteDef {
                method: Some(entry.method.clone()),
                delay: entry.response.delay_ms.map(Delay::Fixed),
                status: Some(entry.response.status),
                headers: entry.response.headers.clone(),
                body: entry
                    .response
                    .body
                    .clone()
                    .map(|content| BodySpec::Json { content }),
                ..RouteDef::new(path_only)
            }
        })
        .collect()
}
