//! Route-definition loading.
//!
//! [`RouteSource`] abstracts where route definitions come from; the
//! shipped implementation is [`DirLoader`], which scans a mock directory
//! for declarative `.yaml`/`.yml`/`.json` files. Each file holds either a
//! list of route definitions or a shorthand map of `"METHOD /path"` keys
//! to response bodies.
//!
//! A file that fails to parse or compile is logged and skipped; it never
//! aborts loading the rest of the directory.

use crate::error::{MockError, Result};
use crate::route::{BodySpec, MockRoute, RouteDef};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Subdirectories under the mock root reserved for persisted state.
const RESERVED_DIRS: [&str; 2] = ["scenarios", "recordings"];

const ROUTE_FILE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

const VERBS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// A pluggable source of compiled routes.
pub trait RouteSource: Send + Sync {
    fn load(&self) -> Result<Vec<MockRoute>>;
}

/// Loads route definitions from a directory tree.
pub struct DirLoader {
    root: PathBuf,
    ignore: GlobSet,
}

/// One route file: a full definition list, or the shorthand map form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RouteFileDoc {
    Routes(Vec<RouteDef>),
    Shorthand(serde_yaml::Mapping),
}

impl DirLoader {
    /// Create a loader over `root` with extra ignore globs.
    pub fn new(root: impl Into<PathBuf>, ignore_patterns: &[String]) -> Result<Self> {
        let root = root.into();
        let mut builder = GlobSetBuilder::new();
        for pattern in ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| MockError::Load {
                path: root.clone(),
                reason: format!("bad ignore pattern {:?}: {}", pattern, e),
            })?;
            builder.add(glob);
        }
        let ignore = builder.build().map_err(|e| MockError::Load {
            path: root.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { root, ignore })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect eligible route files, sorted lexicographically so load
    /// order (and therefore match precedence) is stable across platforms.
    pub fn scan_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if self.root.is_dir() {
            self.scan_dir(&self.root, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    fn scan_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            if path.is_dir() {
                let reserved =
                    dir == self.root && RESERVED_DIRS.iter().any(|r| *r == name.as_str());
                if !reserved && !name.starts_with('_') && !name.starts_with('.') {
                    self.scan_dir(&path, files)?;
                }
            } else if self.eligible(&path, &name) {
                files.push(path);
            }
        }
        Ok(())
    }

    fn eligible(&self, path: &Path, name: &str) -> bool {
        if name.starts_with('_') || name.starts_with('.') {
            return false;
        }
        let has_route_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| ROUTE_FILE_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if !has_route_ext {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !self.ignore.is_match(relative)
    }

    /// Parse a single route file into definitions.
    pub fn load_file(path: &Path) -> Result<Vec<RouteDef>> {
        let content = std::fs::read_to_string(path)?;
        let doc: RouteFileDoc = serde_yaml::from_str(&content).map_err(|e| MockError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        match doc {
            RouteFileDoc::Routes(defs) => Ok(defs),
            RouteFileDoc::Shorthand(mapping) => expand_shorthand(path, mapping),
        }
    }
}

impl RouteSource for DirLoader {
    fn load(&self) -> Result<Vec<MockRoute>> {
        let files = self.scan_files()?;
        let mut routes = Vec::new();
        let mut loaded_files = 0usize;

        for path in &files {
            let result = Self::load_file(path).and_then(|defs| {
                defs.into_iter()
                    .map(|def| {
                        MockRoute::new(def).map_err(|e| MockError::Load {
                            path: path.clone(),
                            reason: e.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            });

            match result {
                Ok(file_routes) => {
                    debug!(path = %path.display(), routes = file_routes.len(), "Loaded mock file");
                    loaded_files += 1;
                    routes.extend(file_routes);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unloadable mock file");
                }
            }
        }

        info!(
            files = loaded_files,
            skipped = files.len() - loaded_files,
            routes = routes.len(),
            "Mock directory loaded"
        );
        Ok(routes)
    }
}

/// Expand the shorthand map form: `"METHOD /path": <body value>`.
///
/// The method defaults to GET when the key has no verb prefix.
fn expand_shorthand(path: &Path, mapping: serde_yaml::Mapping) -> Result<Vec<RouteDef>> {
    let mut defs = Vec::new();

    for (key, value) in mapping {
        let key = key.as_str().ok_or_else(|| MockError::Load {
            path: path.to_path_buf(),
            reason: "shorthand keys must be strings".to_string(),
        })?;

        let (method, url) = parse_shorthand_key(key);
        if url.is_empty() {
            return Err(MockError::Load {
                path: path.to_path_buf(),
                reason: format!("shorthand key {:?} has no path", key),
            });
        }

        let content = serde_json::to_value(&value).map_err(|e| MockError::Load {
            path: path.to_path_buf(),
            reason: format!("shorthand value for {:?}: {}", key, e),
        })?;

        defs.push(RouteDef {
            body: Some(BodySpec::Json { content }),
            method: Some(method),
            ..RouteDef::new(url)
        });
    }

    Ok(defs)
}

fn parse_shorthand_key(key: &str) -> (String, String) {
    if let Some((head, rest)) = key.trim().split_once(char::is_whitespace) {
        let verb = head.to_uppercase();
        if VERBS.contains(&verb.as_str()) {
            return (verb, rest.trim().to_string());
        }
    }
    ("GET".to_string(), key.trim().to_string())
}

/// Static list of routes, mainly for tests and embedding.
pub struct StaticSource {
    defs: Vec<RouteDef>,
}

impl StaticSource {
    pub fn new(defs: Vec<RouteDef>) -> Self {
        Self { defs }
    }
}

impl RouteSource for StaticSource {
    fn load(&self) -> Result<Vec<MockRoute>> {
        self.defs.iter().cloned().map(MockRoute::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn url_list(routes: &[MockRoute]) -> Vec<String> {
        routes.iter().map(|r| r.def().url.clone()).collect()
    }

    #[test]
    fn test_load_list_form() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "users.yaml",
            r#"
- url: /api/users
  method: GET
  body:
    type: json
    content: []
- url: /api/users/:id
  method: GET
  body:
    type: template
    content:
      id: "{{params.id}}"
"#,
        );

        let loader = DirLoader::new(tmp.path(), &[]).unwrap();
        let routes = loader.load().unwrap();
        assert_eq!(url_list(&routes), vec!["/api/users", "/api/users/:id"]);
    }

    #[test]
    fn test_load_shorthand_form() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "quick.yaml",
            r#"
"GET /api/ping":
  pong: true
"POST /api/echo":
  ok: true
"/api/defaulted":
  method_defaulted: true
"#,
        );

        let loader = DirLoader::new(tmp.path(), &[]).unwrap();
        let routes = loader.load().unwrap();
        assert_eq!(routes.len(), 3);

        let methods: Vec<Option<String>> =
            routes.iter().map(|r| r.def().method.clone()).collect();
        assert!(methods.contains(&Some("POST".to_string())));

        let defaulted = routes
            .iter()
            .find(|r| r.def().url == "/api/defaulted")
            .unwrap();
        assert_eq!(defaulted.def().method.as_deref(), Some("GET"));
    }

    #[test]
    fn test_underscore_files_excluded() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "_shared.yaml", "- url: /api/hidden");
        write(tmp.path(), "visible.yaml", "- url: /api/visible");
        write(tmp.path(), "_drafts/inner.yaml", "- url: /api/draft");

        let loader = DirLoader::new(tmp.path(), &[]).unwrap();
        let routes = loader.load().unwrap();
        assert_eq!(url_list(&routes), vec!["/api/visible"]);
    }

    #[test]
    fn test_reserved_dirs_excluded() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "routes.yaml", "- url: /api/a");
        write(tmp.path(), "scenarios/demo.json", r#"{"name":"demo"}"#);
        write(tmp.path(), "recordings/run.json", "[]");

        let loader = DirLoader::new(tmp.path(), &[]).unwrap();
        let routes = loader.load().unwrap();
        assert_eq!(url_list(&routes), vec!["/api/a"]);
    }

    #[test]
    fn test_bad_file_skipped_others_load() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a_good.yaml", "- url: /api/good");
        write(tmp.path(), "b_broken.yaml", "url: [not: valid, routes");
        write(tmp.path(), "c_bad_regex.yaml", "- url: '(unclosed'\n  regex: true");
        write(tmp.path(), "d_also_good.yaml", "- url: /api/also");

        let loader = DirLoader::new(tmp.path(), &[]).unwrap();
        let routes = loader.load().unwrap();
        assert_eq!(url_list(&routes), vec!["/api/good", "/api/also"]);
    }

    #[test]
    fn test_recursive_scan_sorted() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.yaml", "- url: /api/b");
        write(tmp.path(), "a/nested.yaml", "- url: /api/a-nested");
        write(tmp.path(), "a.yaml", "- url: /api/a");

        let loader = DirLoader::new(tmp.path(), &[]).unwrap();
        let routes = loader.load().unwrap();
        assert_eq!(
            url_list(&routes),
            vec!["/api/a-nested", "/api/a", "/api/b"]
        );
    }

    #[test]
    fn test_ignore_globs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "keep.yaml", "- url: /api/keep");
        write(tmp.path(), "skip.draft.yaml", "- url: /api/skip");

        let loader = DirLoader::new(tmp.path(), &["*.draft.yaml".to_string()]).unwrap();
        let routes = loader.load().unwrap();
        assert_eq!(url_list(&routes), vec!["/api/keep"]);
    }

    #[test]
    fn test_missing_root_loads_empty() {
        let loader = DirLoader::new("/nonexistent/mock/dir", &[]).unwrap();
        assert!(loader.load().unwrap().is_empty());
    }

    #[test]
    fn test_json_route_file() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "routes.json",
            r#"[{"url": "/api/from-json", "method": "GET"}]"#,
        );

        let loader = DirLoader::new(tmp.path(), &[]).unwrap();
        let routes = loader.load().unwrap();
        assert_eq!(url_list(&routes), vec!["/api/from-json"]);
    }

    #[test]
    fn test_parse_shorthand_key() {
        assert_eq!(
            parse_shorthand_key("POST /api/users"),
            ("POST".to_string(), "/api/users".to_string())
        );
        assert_eq!(
            parse_shorthand_key("/api/users"),
            ("GET".to_string(), "/api/users".to_string())
        );
        assert_eq!(
            parse_shorthand_key("get /api/users"),
            ("GET".to_string(), "/api/users".to_string())
        );
    }

    #[test]
    fn test_static_source() {
        let source = StaticSource::new(vec![RouteDef::new("/api/x")]);
        assert_eq!(source.load().unwrap().len(), 1);
    }
}
