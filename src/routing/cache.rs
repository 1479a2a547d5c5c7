//! Persisted route table.
//!
//! The cache is a JSON snapshot of every route, in table order, stored as
//! `routes.json` in the cache directory. Matchers are recompiled on load.
//! A snapshot that cannot be read or parsed counts as no cache.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::routing::table::{CallDescriptor, RouteTable};
use crate::verb::Verb;

pub const CACHE_FILE: &str = "routes.json";

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    routes: Vec<CachedRoute>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedRoute {
    verb: Verb,
    pattern: String,
    call: CallDescriptor,
}

/// Route cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct RouteCache {
    dir: PathBuf,
}

impl RouteCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE)
    }

    /// Load the cached table, if a valid one exists.
    pub fn load(&self) -> Option<RouteTable> {
        let path = self.path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No route cache found");
            return None;
        }
        match self.read(&path) {
            Ok(table) => {
                tracing::info!(path = %path.display(), routes = table.len(), "Loaded route cache");
                Some(table)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable route cache");
                None
            }
        }
    }

    fn read(&self, path: &Path) -> Result<RouteTable, ConfigError> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot =
            serde_json::from_reader(reader).map_err(ConfigError::CacheDecode)?;
        let mut table = RouteTable::new();
        for route in snapshot.routes {
            table.insert(route.verb, route.pattern, Arc::new(route.call))?;
        }
        Ok(table)
    }

    /// Persist `table`, replacing any previous snapshot.
    pub fn save(&self, table: &RouteTable) -> Result<(), ConfigError> {
        let snapshot = Snapshot {
            routes: table
                .entries()
                .map(|(verb, entry)| CachedRoute {
                    verb,
                    pattern: entry.pattern.clone(),
                    call: CallDescriptor::clone(&entry.call),
                })
                .collect(),
        };
        let encoded = serde_json::to_vec_pretty(&snapshot)?;

        let cache_write = |source: std::io::Error| ConfigError::CacheWrite {
            dir: self.dir.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(cache_write)?;
        let file = File::create(self.path()).map_err(cache_write)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&encoded).map_err(cache_write)?;
        writer.flush().map_err(cache_write)?;

        tracing::info!(path = %self.path().display(), routes = table.len(), "Saved route cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::table::tests::call;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("docrest-cache-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_round_trip() {
        let dir = temp_dir();
        let cache = RouteCache::new(&dir);

        let mut table = RouteTable::new();
        table.insert(Verb::Get, "users/{id}", call("get", &["id"])).unwrap();
        table.insert(Verb::Get, "users/active", call("getActive", &[])).unwrap();
        table.insert(Verb::Post, "users", call("post", &[])).unwrap();
        cache.save(&table).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(loaded, table);
        assert_eq!(loaded.patterns(Verb::Get), vec!["users/{id}", "users/active"]);
        assert_eq!(loaded.find(Verb::Get, "users/active").unwrap().call.method_name, "get");

        std::fs::remove_dir_all(&dir).unwrap_or_default();
    }

    #[test]
    fn test_missing_and_corrupt_cache() {
        let dir = temp_dir();
        let cache = RouteCache::new(&dir);
        assert!(cache.load().is_none());

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(cache.path(), b"{ not json").unwrap();
        assert!(cache.load().is_none());

        let err = cache.read(&cache.path()).unwrap_err();
        assert!(matches!(err, ConfigError::CacheDecode(_)));
        assert!(err.to_string().starts_with("route cache cannot be parsed"));

        std::fs::remove_dir_all(&dir).unwrap_or_default();
    }

    #[test]
    fn test_unwritable_directory() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("file");
        std::fs::write(&blocker, b"").unwrap();

        let err = RouteCache::new(blocker.join("nested"))
            .save(&RouteTable::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::CacheWrite { .. }));

        std::fs::remove_dir_all(&dir).unwrap_or_default();
    }
}
