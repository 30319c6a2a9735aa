//! Hot-reload watcher.
//!
//! Polls the mock directory on an interval and fingerprints the eligible
//! files (path, mtime, size). Any difference triggers a full reload and
//! an atomic registry swap. Polling keeps the engine free of
//! platform-specific file-event backends, and overlapping reloads are
//! harmless because every reload publishes a complete snapshot.

use crate::loader::DirLoader;
use crate::registry::RouteRegistry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Fingerprint = BTreeMap<PathBuf, (SystemTime, u64)>;

/// Handle to a running watcher task. Dropping the handle stops the
/// watcher.
pub struct WatchHandle {
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a polling watcher over `loader`'s directory, reloading
/// `registry` whenever the tree changes.
pub fn spawn_watcher(
    loader: Arc<DirLoader>,
    registry: Arc<RouteRegistry>,
    interval: Duration,
) -> WatchHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut last = fingerprint(&loader);
        info!(root = %loader.root().display(), interval_ms = interval.as_millis() as u64, "Watching mock directory");

        loop {
            ticker.tick().await;
            let current = fingerprint(&loader);
            if current != last {
                debug!(files = current.len(), "Mock directory changed");
                match registry.reload().await {
                    Ok(count) => info!(routes = count, "Routes reloaded"),
                    Err(e) => warn!(error = %e, "Reload after change failed"),
                }
                last = current;
            }
        }
    });

    WatchHandle { task }
}

fn fingerprint(loader: &DirLoader) -> Fingerprint {
    let mut map = Fingerprint::new();
    let files = match loader.scan_files() {
        Ok(files) => files,
        Err(e) => {
            debug!(error = %e, "Scan failed while fingerprinting");
            return map;
        }
    };

    for path in files {
        if let Ok(meta) = std::fs::metadata(&path) {
            let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            map.insert(path, (mtime, meta.len()));
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RouteSource;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_tracks_create_and_delete() {
        let tmp = TempDir::new().unwrap();
        let loader = DirLoader::new(tmp.path(), &[]).unwrap();

        let empty = fingerprint(&loader);
        assert!(empty.is_empty());

        let file = tmp.path().join("routes.yaml");
        fs::write(&file, "- url: /api/x").unwrap();
        let one = fingerprint(&loader);
        assert_eq!(one.len(), 1);
        assert_ne!(empty, one);

        fs::remove_file(&file).unwrap();
        assert_eq!(fingerprint(&loader), empty);
    }

    #[test]
    fn test_fingerprint_tracks_size_change() {
        let tmp = TempDir::new().unwrap();
        let loader = DirLoader::new(tmp.path(), &[]).unwrap();

        let file = tmp.path().join("routes.yaml");
        fs::write(&file, "- url: /api/x").unwrap();
        let before = fingerprint(&loader);

        fs::write(&file, "- url: /api/x\n- url: /api/longer").unwrap();
        assert_ne!(fingerprint(&loader), before);
    }

    #[tokio::test]
    async fn test_watcher_reloads_on_change() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("routes.yaml"), "- url: /api/v1").unwrap();

        let loader = Arc::new(DirLoader::new(tmp.path(), &[]).unwrap());
        let registry = Arc::new(RouteRegistry::new(Arc::new(
            DirLoader::new(tmp.path(), &[]).unwrap(),
        )));
        registry.reload().await.unwrap();
        assert_eq!(registry.snapshot().await.len(), 1);

        let handle = spawn_watcher(
            Arc::clone(&loader),
            Arc::clone(&registry),
            Duration::from_millis(50),
        );

        // Give the watcher a tick to settle, then change the tree
        tokio::time::sleep(Duration::from_millis(120)).await;
        fs::write(
            tmp.path().join("routes.yaml"),
            "- url: /api/v1\n- url: /api/v2",
        )
        .unwrap();

        let mut reloaded = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if registry.snapshot().await.len() == 2 {
                reloaded = true;
                break;
            }
        }
        handle.stop();
        assert!(reloaded, "watcher never picked up the change");
    }

    #[tokio::test]
    async fn test_stopped_watcher_goes_quiet() {
        let tmp = TempDir::new().unwrap();
        let loader = Arc::new(DirLoader::new(tmp.path(), &[]).unwrap());
        let registry = Arc::new(RouteRegistry::new(Arc::new(
            DirLoader::new(tmp.path(), &[]).unwrap(),
        )));

        let handle = spawn_watcher(
            Arc::clone(&loader),
            Arc::clone(&registry),
            Duration::from_millis(20),
        );
        handle.stop();
        tokio::time::sleep(Duration::from_millis(60)).await;

        fs::write(tmp.path().join("routes.yaml"), "- url: /api/x").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(registry.snapshot().await.is_empty());
    }

    #[test]
    fn test_loader_still_loads_while_fingerprinting() {
        // Fingerprinting and loading share the same eligibility rules
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("_hidden.yaml"), "- url: /api/hidden").unwrap();
        fs::write(tmp.path().join("seen.yaml"), "- url: /api/seen").unwrap();

        let loader = DirLoader::new(tmp.path(), &[]).unwrap();
        assert_eq!(fingerprint(&loader).len(), 1);
        assert_eq!(loader.load().unwrap().len(), 1);
    }
}
