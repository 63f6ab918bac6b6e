//! Workspace persistence
//!
//! The workspace (definition table plus dumps) is persisted as a single JSON
//! record per store name: `{data_dir}/{store_name}.json`. Loading a store that
//! does not exist yet yields an empty workspace.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::compare::{compare, ComparisonRow};
use crate::definition::DefinitionTable;
use crate::dump::{DumpId, DumpStore};

/// Store name used when none is configured
pub const DEFAULT_STORE_NAME: &str = "register-dump-storage";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid store name: {0:?}")]
    InvalidName(String),
}

/// Definitions and dumps, the complete application state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Version of the record format
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub definitions: DefinitionTable,
    #[serde(default)]
    pub dumps: DumpStore,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            definitions: DefinitionTable::new(),
            dumps: DumpStore::new(),
        }
    }

    /// Compare the selected dumps against this workspace's definitions
    pub fn compare(&self, selected: &HashSet<DumpId>, diff_only: bool) -> Vec<ComparisonRow> {
        compare(
            self.definitions.as_slice(),
            self.dumps.as_slice(),
            selected,
            diff_only,
        )
    }
}

/// Keyed JSON record store rooted at a directory
#[derive(Debug, Clone)]
pub struct RecordStore {
    /// Directory holding the records
    pub base_dir: PathBuf,
    /// Key naming the record file
    pub name: String,
}

impl RecordStore {
    /// Open a store, creating its directory if needed
    pub fn open(base_dir: PathBuf, name: &str) -> Result<Self, StoreError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            name: name.to_string(),
        })
    }

    /// Path of the record file
    pub fn path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.json", self.name))
    }

    /// Load the workspace, or an empty one if nothing was saved yet
    pub fn load(&self) -> Result<Workspace, StoreError> {
        let path = self.path();
        if !path.exists() {
            debug!(path = %path.display(), "No saved workspace, starting empty");
            return Ok(Workspace::new());
        }
        let workspace = read_workspace(&path)?;
        info!(
            path = %path.display(),
            definitions = workspace.definitions.len(),
            dumps = workspace.dumps.len(),
            "Loaded workspace"
        );
        Ok(workspace)
    }

    /// Write the workspace, replacing any previous record
    pub fn save(&self, workspace: &Workspace) -> Result<(), StoreError> {
        let path = self.path();
        let content = serde_json::to_string_pretty(workspace)?;

        // Readers never see a partially written record
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), "Saved workspace");
        Ok(())
    }
}

fn read_workspace(path: &Path) -> Result<Workspace, StoreError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
