//! Persisted selections, so repeated CLI runs keep the same application selected.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::model::Selection;

const STORE_DIR: &str = ".appmanifest";
const STORE_FILE: &str = "selections.json";

/// Serializable snapshot of the last selection per manifest path.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub manifests: BTreeMap<String, Selection>,
}

/// Reads and writes the selection snapshot under `.appmanifest/`.
#[derive(Debug, Clone)]
pub struct SelectionStore {
    root: PathBuf,
    path: PathBuf,
    snapshot: SelectionSnapshot,
}

impl SelectionStore {
    /// Create an empty store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = root.join(STORE_DIR).join(STORE_FILE);
        Self {
            root,
            path,
            snapshot: SelectionSnapshot::default(),
        }
    }

    /// Open the store, reading any previously saved snapshot.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(root);
        if store.path.exists() {
            let data = fs::read_to_string(&store.path).with_context(|| {
                format!("failed to read selection store at {}", store.path.display())
            })?;
            store.snapshot = serde_json::from_str(&data)
                .with_context(|| format!("invalid selection data in {}", store.path.display()))?;
        }
        Ok(store)
    }

    /// Location of the persisted store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, manifest: &Path) -> Option<&Selection> {
        self.snapshot.manifests.get(&key(manifest))
    }

    pub fn set(&mut self, manifest: &Path, selection: Selection) {
        self.snapshot.manifests.insert(key(manifest), selection);
    }

    pub fn remove(&mut self, manifest: &Path) -> Option<Selection> {
        self.snapshot.manifests.remove(&key(manifest))
    }

    /// Persist the snapshot, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create store directory {}", dir.display()))?;

        let data = serde_json::to_string_pretty(&self.snapshot)
            .context("failed to serialize selection snapshot")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write selection store to {}", self.path.display()))?;
        Ok(())
    }
}

fn key(manifest: &Path) -> String {
    manifest
        .canonicalize()
        .unwrap_or_else(|_| manifest.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_selections_through_disk() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let manifest = temp.path().join("manifest.yml");
        fs::write(&manifest, "name: demo\n")?;

        let mut store = SelectionStore::open(temp.path())?;
        assert!(store.get(&manifest).is_none());
        store.set(
            &manifest,
            Selection {
                name: "demo".into(),
                start: 0,
            },
        );
        store.save()?;

        let reopened = SelectionStore::open(temp.path())?;
        assert_eq!(reopened.get(&manifest).map(|s| s.name.as_str()), Some("demo"));
        assert!(reopened.path().ends_with(".appmanifest/selections.json"));
        Ok(())
    }

    #[test]
    fn corrupt_store_is_an_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::create_dir_all(temp.path().join(STORE_DIR))?;
        fs::write(temp.path().join(STORE_DIR).join(STORE_FILE), "not json")?;
        assert!(SelectionStore::open(temp.path()).is_err());
        Ok(())
    }
}
