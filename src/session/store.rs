// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::errors::SessionStoreError;

/// Where an identity value lives and who else gets to see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityScope {
    /// Bound to this client context only. Used to resume the same session
    /// when reconnecting; a duplicated client never sees it.
    Context,
    /// Copied into duplicated clients so they can find the workflow the
    /// original was working on, without taking over its session.
    Inherited,
}

/// Backing storage for [`SessionIdentity`](crate::session::SessionIdentity).
pub trait IdentityStore: Send + Sync + Debug {
    fn load(&self, scope: IdentityScope) -> Option<String>;

    fn save(&self, scope: IdentityScope, id: &str) -> Result<(), SessionStoreError>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    values: RwLock<HashMap<IdentityScope, String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, scope: IdentityScope, id: impl Into<String>) -> Self {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(scope, id.into());
        self
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self, scope: IdentityScope) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&scope)
            .cloned()
    }

    fn save(&self, scope: IdentityScope, id: &str) -> Result<(), SessionStoreError> {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(scope, id.to_string());
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inherited: Option<String>,
}

impl StoredIdentity {
    fn slot(&mut self, scope: IdentityScope) -> &mut Option<String> {
        match scope {
            IdentityScope::Context => &mut self.context,
            IdentityScope::Inherited => &mut self.inherited,
        }
    }
}

/// JSON file store, so a restarted client resumes its previous session.
///
/// A missing file reads as empty. A corrupt file also reads as empty and is
/// overwritten on the next save.
#[derive(Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredIdentity, SessionStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredIdentity::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self, scope: IdentityScope) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        let mut stored = self.read().ok()?;
        stored.slot(scope).take()
    }

    fn save(&self, scope: IdentityScope, id: &str) -> Result<(), SessionStoreError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut stored = self.read().unwrap_or_default();
        *stored.slot(scope) = Some(id.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_keeps_scopes_apart() {
        let store = MemoryIdentityStore::new().with_value(IdentityScope::Inherited, "abc");
        assert_eq!(store.load(IdentityScope::Inherited).as_deref(), Some("abc"));
        assert_eq!(store.load(IdentityScope::Context), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");

        let store = FileIdentityStore::new(&path);
        store.save(IdentityScope::Context, "sid-1").unwrap();
        store.save(IdentityScope::Inherited, "sid-1").unwrap();

        let reopened = FileIdentityStore::new(&path);
        assert_eq!(reopened.load(IdentityScope::Context).as_deref(), Some("sid-1"));
        assert_eq!(reopened.load(IdentityScope::Inherited).as_deref(), Some("sid-1"));
    }

    #[test]
    fn missing_or_corrupt_file_reads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileIdentityStore::new(&path);
        assert_eq!(store.load(IdentityScope::Context), None);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(store.load(IdentityScope::Context), None);
        store.save(IdentityScope::Context, "fresh").unwrap();
        assert_eq!(store.load(IdentityScope::Context).as_deref(), Some("fresh"));
    }
}
