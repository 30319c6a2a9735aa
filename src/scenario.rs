//! Named scenarios.
//!
//! A scenario is a named, switchable set of route definitions, persisted
//! one JSON file per scenario under `scenarios/`. Exactly one scenario is
//! active at a time; the active flag lives in memory only and resets to
//! the built-in `default` scenario on restart.

use crate::error::{MockError, Result};
use crate::route::{MockRoute, RouteDef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Name of the protected built-in scenario.
pub const DEFAULT_SCENARIO: &str = "default";

/// A named, persisted set of mock routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockScenario {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub routes: Vec<RouteDef>,

    /// Process-lifetime state, never persisted
    #[serde(skip)]
    pub active: bool,
}

impl MockScenario {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            routes: Vec::new(),
            active: false,
        }
    }
}

/// Owns the scenario map and the compiled routes of the active scenario.
///
/// Management operations (create/switch/delete) are expected from a
/// single administrative flow; they serialize on the internal lock.
pub struct ScenarioManager {
    dir: PathBuf,
    scenarios: RwLock<HashMap<String, MockScenario>>,
    active_routes: RwLock<Arc<Vec<MockRoute>>>,
}

impl ScenarioManager {
    /// Create a manager persisting under `dir` (the `scenarios/`
    /// directory). Call [`init`](Self::init) before use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scenarios: RwLock::new(HashMap::new()),
            active_routes: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Load persisted scenarios, ensure `default` exists, and activate it.
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut loaded = HashMap::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<MockScenario>(&content) {
                    Ok(scenario) => {
                        debug!(name = %scenario.name, routes = scenario.routes.len(), "Loaded scenario");
                        loaded.insert(scenario.name.clone(), scenario);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable scenario file")
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable scenario file")
                }
            }
        }

        if !loaded.contains_key(DEFAULT_SCENARIO) {
            let default = MockScenario::new(DEFAULT_SCENARIO, "Built-in default scenario");
            self.persist(&default).await?;
            loaded.insert(default.name.clone(), default);
        }

        for scenario in loaded.values_mut() {
            scenario.active = scenario.name == DEFAULT_SCENARIO;
        }

        info!(scenarios = loaded.len(), "Scenario manager initialized");
        *self.scenarios.write().await = loaded;
        self.rebuild_active_routes().await;
        Ok(())
    }

    /// Create a new (inactive, empty) scenario and persist it.
    pub async fn create(&self, name: &str, description: &str) -> Result<()> {
        validate_name(name)?;

        let mut scenarios = self.scenarios.write().await;
        if scenarios.contains_key(name) {
            return Err(MockError::ScenarioExists(name.to_string()));
        }

        let scenario = MockScenario::new(name, description);
        self.persist(&scenario).await?;
        scenarios.insert(name.to_string(), scenario);
        info!(name, "Scenario created");
        Ok(())
    }

    /// Activate `name`, deactivating every other scenario in one pass.
    pub async fn switch(&self, name: &str) -> Result<()> {
        {
            let mut scenarios = self.scenarios.write().await;
            if !scenarios.contains_key(name) {
                return Err(MockError::ScenarioNotFound(name.to_string()));
            }
            for scenario in scenarios.values_mut() {
                scenario.active = scenario.name == name;
            }
        }
        self.rebuild_active_routes().await;
        info!(name, "Scenario activated");
        Ok(())
    }

    /// Delete a scenario and its file. The `default` scenario is
    /// protected; deleting the active scenario falls back to `default`.
    pub async fn delete(&self, name: &str) -> Result<()> {
        if name == DEFAULT_SCENARIO {
            return Err(MockError::ScenarioProtected(name.to_string()));
        }

        let was_active = {
            let mut scenarios = self.scenarios.write().await;
            let scenario = scenarios
                .remove(name)
                .ok_or_else(|| MockError::ScenarioNotFound(name.to_string()))?;
            scenario.active
        };

        match tokio::fs::remove_file(self.file_path(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!(name, "Scenario deleted");
        if was_active {
            self.switch(DEFAULT_SCENARIO).await?;
        }
        Ok(())
    }

    /// Replace a scenario's routes and re-persist it.
    pub async fn set_routes(&self, name: &str, routes: Vec<RouteDef>) -> Result<()> {
        let (scenario, was_active) = {
            let mut scenarios = self.scenarios.write().await;
            let scenario = scenarios
                .get_mut(name)
                .ok_or_else(|| MockError::ScenarioNotFound(name.to_string()))?;
            scenario.routes = routes;
            (scenario.clone(), scenario.active)
        };

        self.persist(&scenario).await?;
        if was_active {
            self.rebuild_active_routes().await;
        }
        Ok(())
    }

    /// All scenarios, sorted by name.
    pub async fn list(&self) -> Vec<MockScenario> {
        let scenarios = self.scenarios.read().await;
        let mut list: Vec<MockScenario> = scenarios.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Name of the active scenario.
    pub async fn active(&self) -> String {
        let scenarios = self.scenarios.read().await;
        scenarios
            .values()
            .find(|s| s.active)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| DEFAULT_SCENARIO.to_string())
    }

    pub async fn get(&self, name: &str) -> Option<MockScenario> {
        self.scenarios.read().await.get(name).cloned()
    }

    /// Compiled routes of the active scenario; consulted before the
    /// directory-loaded routes during matching.
    pub async fn active_routes(&self) -> Arc<Vec<MockRoute>> {
        self.active_routes.read().await.clone()
    }

    async fn rebuild_active_routes(&self) {
        let defs: Vec<RouteDef> = {
            let scenarios = self.scenarios.read().await;
            scenarios
                .values()
                .find(|s| s.active)
                .map(|s| s.routes.clone())
                .unwrap_or_default()
        };

        let mut compiled = Vec::with_capacity(defs.len());
        for def in defs {
            match MockRoute::new(def) {
                Ok(route) => compiled.push(route),
                Err(e) => warn!(error = %e, "Skipping uncompilable scenario route"),
            }
        }

        *self.active_routes.write().await = Arc::new(compiled);
    }

    async fn persist(&self, scenario: &MockScenario) -> Result<()> {
        let json = serde_json::to_string_pretty(scenario)?;
        tokio::fs::write(self.file_path(&scenario.name), json).await?;
        Ok(())
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(MockError::InvalidName(name.to_string()))
    }
}
