//! The lock service: transactional persistence of the declared package set.
//!
//! The lock file is YAML, schema version 2. Writes go through a sibling
//! temp file, fsync and rename, so observers never see a half-written
//! file. Read-modify-write sequences are serialized by an in-process
//! mutex; cross-process writers are not coordinated, but readers always
//! observe some committed snapshot thanks to the atomic rename.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Current lock file schema version.
pub const LOCK_VERSION: u32 = 2;

/// File name of the lock file inside the plonk directory.
pub const LOCK_FILE: &str = "plonk.lock";

/// One declared resource.
///
/// Unknown keys survive a read-write round-trip through the flattened
/// `extra` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub manager: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub installed_at: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_yaml::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ResourceEntry {
    pub fn package(manager: &str, name: &str, version: Option<String>) -> Self {
        Self {
            kind: "package".to_string(),
            manager: manager.to_string(),
            name: name.to_string(),
            version,
            installed_at: now_rfc3339(),
            metadata: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.manager.clone(), self.name.clone())
    }
}

/// The declared state, as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_version() -> u32 {
    LOCK_VERSION
}

impl LockFile {
    pub fn new() -> Self {
        Self {
            version: LOCK_VERSION,
            resources: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn find(&self, manager: &str, name: &str) -> Option<&ResourceEntry> {
        self.resources
            .iter()
            .find(|entry| entry.manager == manager && entry.name == name)
    }

    /// Package entries grouped by manager, names sorted within each group.
    pub fn by_manager(&self) -> BTreeMap<String, Vec<&ResourceEntry>> {
        let mut groups: BTreeMap<String, Vec<&ResourceEntry>> = BTreeMap::new();
        for entry in &self.resources {
            groups.entry(entry.manager.clone()).or_default().push(entry);
        }
        for entries in groups.values_mut() {
            entries.sort_by(|a, b| a.name.cmp(&b.name));
        }
        groups
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Exclusive owner of the lock file; all mutation goes through it.
pub struct LockService {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LockService {
    pub fn new(plonk_dir: &Path) -> Self {
        Self {
            path: plonk_dir.join(LOCK_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current snapshot. A missing file is an empty lock.
    pub fn read(&self) -> CoreResult<LockFile> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LockFile::new());
            }
            Err(source) => {
                return Err(CoreError::LockRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_yaml::from_str(&raw).map_err(|source| CoreError::LockParse {
            path: self.path.clone(),
            source,
        })
    }

    /// Atomically replaces the lock file.
    ///
    /// # Errors
    ///
    /// * [`CoreError::DuplicateLockEntry`] when two entries share a
    ///   `(manager, name)` key.
    /// * [`CoreError::LockWrite`] when serialization or the write fails.
    pub fn write(&self, lock: &LockFile) -> CoreResult<()> {
        let mut seen = std::collections::HashSet::new();
        for entry in &lock.resources {
            if !seen.insert(entry.key()) {
                return Err(CoreError::DuplicateLockEntry {
                    manager: entry.manager.clone(),
                    name: entry.name.clone(),
                });
            }
        }

        let raw = serde_yaml::to_string(lock).map_err(|source| CoreError::LockWrite {
            path: self.path.clone(),
            source: Box::new(source),
        })?;
        plonk_utils::fs::atomic_write(&self.path, raw.as_bytes(), 0o644).map_err(|source| {
            CoreError::LockWrite {
                path: self.path.clone(),
                source: Box::new(source),
            }
        })?;
        debug!(path = %self.path.display(), resources = lock.resources.len(), "lock file written");
        Ok(())
    }

    /// Records a package, stamping `installed_at` with the current time.
    /// An existing entry for the same key is replaced, which is how
    /// upgrades refresh the version and timestamp.
    pub fn add_package(
        &self,
        manager: &str,
        name: &str,
        version: Option<String>,
        metadata: BTreeMap<String, serde_yaml::Value>,
    ) -> CoreResult<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut lock = self.read()?;

        let mut entry = ResourceEntry::package(manager, name, version);
        entry.metadata = metadata;

        if let Some(existing) = lock
            .resources
            .iter_mut()
            .find(|existing| existing.manager == manager && existing.name == name)
        {
            entry.extra = std::mem::take(&mut existing.extra);
            *existing = entry;
        } else {
            lock.resources.push(entry);
        }
        self.write(&lock)
    }

    /// Removes a package entry. Removing an absent key is a no-op.
    pub fn remove_package(&self, manager: &str, name: &str) -> CoreResult<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut lock = self.read()?;
        let before = lock.resources.len();
        lock.resources
            .retain(|entry| !(entry.manager == manager && entry.name == name));
        if lock.resources.len() == before {
            return Ok(());
        }
        self.write(&lock)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_read_missing_file_is_empty_lock() {
        let dir = tempdir().unwrap();
        let service = LockService::new(dir.path());
        let lock = service.read().unwrap();
        assert_eq!(lock.version, LOCK_VERSION);
        assert!(lock.resources.is_empty());
    }

    #[test]
    fn test_add_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let service = LockService::new(dir.path());
        service
            .add_package("brew", "jq", Some("1.7.1".into()), BTreeMap::new())
            .unwrap();

        let lock = service.read().unwrap();
        assert_eq!(lock.resources.len(), 1);
        let entry = lock.find("brew", "jq").unwrap();
        assert_eq!(entry.kind, "package");
        assert_eq!(entry.version.as_deref(), Some("1.7.1"));
        assert!(!entry.installed_at.is_empty());
    }

    #[test]
    fn test_add_same_key_replaces_entry() {
        let dir = tempdir().unwrap();
        let service = LockService::new(dir.path());
        service
            .add_package("brew", "jq", Some("1.0".into()), BTreeMap::new())
            .unwrap();
        let first = service.read().unwrap().find("brew", "jq").unwrap().clone();

        service
            .add_package("brew", "jq", Some("2.0".into()), BTreeMap::new())
            .unwrap();
        let lock = service.read().unwrap();
        assert_eq!(lock.resources.len(), 1);
        let second = lock.find("brew", "jq").unwrap();
        assert_eq!(second.version.as_deref(), Some("2.0"));
        assert!(second.installed_at >= first.installed_at);
    }

    #[test]
    fn test_remove_package() {
        let dir = tempdir().unwrap();
        let service = LockService::new(dir.path());
        service
            .add_package("brew", "jq", None, BTreeMap::new())
            .unwrap();
        service.remove_package("brew", "jq").unwrap();
        assert!(service.read().unwrap().resources.is_empty());

        // absent key is a no-op
        service.remove_package("brew", "jq").unwrap();
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(LOCK_FILE),
            "version: 2\nfuture_field: kept\nresources:\n- type: package\n  manager: brew\n  name: jq\n  installed_at: '2024-01-01T00:00:00Z'\n  pinned: true\n",
        )
        .unwrap();

        let service = LockService::new(dir.path());
        let lock = service.read().unwrap();
        assert_eq!(
            lock.extra.get("future_field"),
            Some(&serde_yaml::Value::String("kept".into()))
        );
        let entry = lock.find("brew", "jq").unwrap();
        assert_eq!(
            entry.extra.get("pinned"),
            Some(&serde_yaml::Value::Bool(true))
        );

        service.write(&lock).unwrap();
        let reread = service.read().unwrap();
        assert_eq!(reread, lock);
    }

    #[test]
    fn test_write_rejects_duplicate_keys() {
        let dir = tempdir().unwrap();
        let service = LockService::new(dir.path());
        let mut lock = LockFile::new();
        lock.resources
            .push(ResourceEntry::package("brew", "jq", None));
        lock.resources
            .push(ResourceEntry::package("brew", "jq", None));
        assert!(matches!(
            service.write(&lock).unwrap_err(),
            CoreError::DuplicateLockEntry { .. }
        ));
    }

    #[test]
    fn test_scoped_package_name_round_trips() {
        let dir = tempdir().unwrap();
        let service = LockService::new(dir.path());
        service
            .add_package("npm", "@scope/pkg", Some("1.0.0".into()), BTreeMap::new())
            .unwrap();
        let lock = service.read().unwrap();
        assert!(lock.find("npm", "@scope/pkg").is_some());
    }

    #[test]
    fn test_by_manager_groups_sorted() {
        let dir = tempdir().unwrap();
        let service = LockService::new(dir.path());
        service
            .add_package("npm", "prettier", None, BTreeMap::new())
            .unwrap();
        service
            .add_package("brew", "wget", None, BTreeMap::new())
            .unwrap();
        service
            .add_package("brew", "jq", None, BTreeMap::new())
            .unwrap();

        let lock = service.read().unwrap();
        let groups = lock.by_manager();
        let managers: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(managers, vec!["brew", "npm"]);
        let brew_names: Vec<_> = groups["brew"].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(brew_names, vec!["jq", "wget"]);
    }
}
