//! Application state management
//!
//! `AppState` owns the workspace. Every mutation is applied to a copy,
//! persisted, and only then swapped in, so the in-memory workspace never runs
//! ahead of the saved record. Comparisons run against the workspace under a
//! read lock, which gives each call a consistent snapshot.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regscope_core::compare::active_dumps;
use regscope_core::{
    check_generate_count, generate, is_valid_address, ComparisonRow, ComparisonSummary,
    DefinitionError, Dump, DumpError, DumpId, RecordStore, RegisterDefinition, StoreError,
    Workspace,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::config::Config;

#[derive(Error, Debug)]
pub enum StateError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Dump(#[from] DumpError),
    #[error("Failed to persist workspace: {0}")]
    Store(#[from] StoreError),
}

/// Change notifications for connected clients
#[derive(Debug, Clone)]
pub enum StoreEvent {
    DefinitionsChanged { count: usize },
    DumpAdded(DumpSummary),
    DumpUpdated(DumpSummary),
    DumpRemoved(DumpId),
}

/// Dump metadata without its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpSummary {
    pub id: DumpId,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// Number of distinct register keys
    pub registers: usize,
}

impl From<&Dump> for DumpSummary {
    fn from(dump: &Dump) -> Self {
        Self {
            id: dump.id.clone(),
            name: dump.name.clone(),
            timestamp: dump.timestamp,
            registers: dump.register_count(),
        }
    }
}

/// How generated definitions are merged into the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateMode {
    #[default]
    Replace,
    Append,
}

/// A dump column in a comparison, in display order
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonColumn {
    pub id: DumpId,
    pub name: String,
}

/// Comparison rows together with their column headers
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub columns: Vec<ComparisonColumn>,
    pub rows: Vec<ComparisonRow>,
    pub summary: ComparisonSummary,
}

/// Shared application state
pub struct AppState {
    /// Definitions and dumps
    pub workspace: Arc<RwLock<Workspace>>,
    /// Persistence for the workspace
    pub store: RecordStore,
    /// Configuration
    pub config: Config,
    /// Event broadcast for WebSocket clients
    pub events: broadcast::Sender<StoreEvent>,
}

impl AppState {
    /// Create new application state, loading the persisted workspace
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let store = RecordStore::open(PathBuf::from(&config.store.data_dir), &config.store.name)
            .with_context(|| format!("Failed to open store in {}", config.store.data_dir))?;
        let workspace = store
            .load()
            .with_context(|| format!("Failed to load {}", store.path().display()))?;

        info!(
            store = %store.name,
            definitions = workspace.definitions.len(),
            dumps = workspace.dumps.len(),
            "Workspace ready"
        );

        let (events, _) = broadcast::channel(config.daemon.event_capacity.max(1));

        Ok(Arc::new(Self {
            workspace: Arc::new(RwLock::new(workspace)),
            store,
            config,
            events,
        }))
    }

    /// Apply `change` to a copy of the workspace, persist it, then commit
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Workspace) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let mut workspace = self.workspace.write().await;
        let mut next = workspace.clone();
        let out = change(&mut next)?;
        if self.config.store.autosave {
            self.store.save(&next)?;
        }
        *workspace = next;
        Ok(out)
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Write the current workspace regardless of the autosave setting
    pub async fn save(&self) -> Result<(), StateError> {
        let workspace = self.workspace.read().await;
        self.store.save(&workspace)?;
        info!(path = %self.store.path().display(), "Saved workspace");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Definitions

    pub async fn definitions(&self) -> Vec<RegisterDefinition> {
        self.workspace.read().await.definitions.as_slice().to_vec()
    }

    pub async fn add_definition(
        &self,
        address: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<RegisterDefinition, StateError> {
        let definition = RegisterDefinition::new(address, name, description)?;
        if !is_valid_address(&definition.address) {
            warn!(address = %definition.address, "Definition address is not plain hex");
        }
        let count = self
            .mutate(|ws| {
                ws.definitions.add(definition.clone());
                Ok(ws.definitions.len())
            })
            .await?;

        info!(address = %definition.address, name = %definition.name, "Added definition");
        self.notify(StoreEvent::DefinitionsChanged { count });
        Ok(definition)
    }

    pub async fn update_definition(
        &self,
        index: usize,
        address: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<RegisterDefinition, StateError> {
        let definition = RegisterDefinition::new(address, name, description)?;
        let count = self
            .mutate(|ws| {
                ws.definitions.update(index, definition.clone())?;
                Ok(ws.definitions.len())
            })
            .await?;

        info!(index, address = %definition.address, "Updated definition");
        self.notify(StoreEvent::DefinitionsChanged { count });
        Ok(definition)
    }

    pub async fn remove_definition(&self, index: usize) -> Result<RegisterDefinition, StateError> {
        let (removed, count) = self
            .mutate(|ws| {
                let removed = ws.definitions.remove(index)?;
                Ok((removed, ws.definitions.len()))
            })
            .await?;

        info!(index, address = %removed.address, "Removed definition");
        self.notify(StoreEvent::DefinitionsChanged { count });
        Ok(removed)
    }

    /// Replace the whole definition table
    pub async fn replace_definitions(
        &self,
        definitions: Vec<RegisterDefinition>,
    ) -> Result<usize, StateError> {
        let count = self
            .mutate(|ws| {
                ws.definitions.replace_all(definitions);
                Ok(ws.definitions.len())
            })
            .await?;

        info!(count, "Replaced definition table");
        self.notify(StoreEvent::DefinitionsChanged { count });
        Ok(count)
    }

    /// Generate sequential definitions; returns the resulting table
    pub async fn generate_definitions(
        &self,
        start: &str,
        count: usize,
        stride: u64,
        mode: GenerateMode,
    ) -> Result<Vec<RegisterDefinition>, StateError> {
        check_generate_count(count, self.config.daemon.max_generate_count)?;
        let generated = generate(start, count, stride);
        let table = self
            .mutate(|ws| {
                match mode {
                    GenerateMode::Replace => ws.definitions.replace_all(generated),
                    GenerateMode::Append => ws.definitions.extend(generated),
                }
                Ok(ws.definitions.as_slice().to_vec())
            })
            .await?;

        info!(start, count, stride, mode = ?mode, "Generated definitions");
        self.notify(StoreEvent::DefinitionsChanged { count: table.len() });
        Ok(table)
    }

    // ------------------------------------------------------------------
    // Dumps

    pub async fn dumps(&self) -> Vec<DumpSummary> {
        self.workspace
            .read()
            .await
            .dumps
            .iter()
            .map(DumpSummary::from)
            .collect()
    }

    pub async fn get_dump(&self, id: &DumpId) -> Option<Dump> {
        self.workspace.read().await.dumps.get(id).cloned()
    }

    /// Parse and store a new dump
    pub async fn add_dump(&self, name: &str, content: &str) -> Result<DumpSummary, StateError> {
        let dump = Dump::create(name, content)?;
        let summary = DumpSummary::from(&dump);
        self.mutate(|ws| {
            ws.dumps.add(dump);
            Ok(())
        })
        .await?;

        info!(dump = %summary.id, name = %summary.name, registers = summary.registers, "Stored dump");
        self.notify(StoreEvent::DumpAdded(summary.clone()));
        Ok(summary)
    }

    /// Replace a dump's name and content
    pub async fn update_dump(
        &self,
        id: &DumpId,
        name: &str,
        content: &str,
    ) -> Result<DumpSummary, StateError> {
        let summary = self
            .mutate(|ws| Ok(DumpSummary::from(ws.dumps.update(id, name, content)?)))
            .await?;

        info!(dump = %id, registers = summary.registers, "Updated dump");
        self.notify(StoreEvent::DumpUpdated(summary.clone()));
        Ok(summary)
    }

    pub async fn remove_dump(&self, id: &DumpId) -> Result<DumpSummary, StateError> {
        let summary = self
            .mutate(|ws| {
                ws.dumps
                    .remove(id)
                    .map(|d| DumpSummary::from(&d))
                    .ok_or_else(|| DumpError::NotFound(id.clone()).into())
            })
            .await?;

        info!(dump = %id, "Removed dump");
        self.notify(StoreEvent::DumpRemoved(id.clone()));
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Comparison

    /// Compare the selected dumps; unknown ids are ignored
    pub async fn compare(&self, selected: &[DumpId], diff_only: bool) -> ComparisonReport {
        let selected: HashSet<DumpId> = selected.iter().cloned().collect();
        let workspace = self.workspace.read().await;

        let columns = active_dumps(workspace.dumps.as_slice(), &selected)
            .into_iter()
            .map(|d| ComparisonColumn {
                id: d.id.clone(),
                name: d.name.clone(),
            })
            .collect();
        let rows = workspace.compare(&selected, diff_only);
        let summary = ComparisonSummary::from_rows(&rows);

        debug!(
            dumps = selected.len(),
            rows = summary.rows,
            mismatches = summary.mismatches,
            diff_only,
            "Compared dumps"
        );

        ComparisonReport {
            columns,
            rows,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use regscope_core::CellValue;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            store: StoreConfig {
                data_dir: dir.path().display().to_string(),
                ..StoreConfig::default()
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_dump_lifecycle_persists() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();

        let summary = state.add_dump("Working", "0x10 1\n0x14 2").await.unwrap();
        assert_eq!(summary.registers, 2);

        // A fresh state sees the saved dump
        let reloaded = AppState::new(test_config(&dir)).await.unwrap();
        assert_eq!(reloaded.dumps().await, vec![summary.clone()]);

        state.remove_dump(&summary.id).await.unwrap();
        assert!(state.dumps().await.is_empty());
        assert!(matches!(
            state.remove_dump(&summary.id).await,
            Err(StateError::Dump(DumpError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_rejected_dump_is_not_stored() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();

        let err = state.add_dump("Broken", "nothing useful").await.unwrap_err();
        assert_eq!(err.to_string(), "No valid registers found.");
        assert!(state.dumps().await.is_empty());
        assert!(!state.store.path().exists());
    }

    #[tokio::test]
    async fn test_definition_changes_broadcast() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();
        let mut rx = state.subscribe();

        state.add_definition("10", "CTRL", None).await.unwrap();
        assert!(matches!(
            rx.recv().await.unwrap(),
            StoreEvent::DefinitionsChanged { count: 1 }
        ));

        let table = state
            .generate_definitions("0x100", 2, 4, GenerateMode::Append)
            .await
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table[0].address, "0x10");
        assert_eq!(table[2].address, "0x104");

        let table = state
            .generate_definitions("0x0", 1, 4, GenerateMode::Replace)
            .await
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].name, "REG_0");
    }

    #[tokio::test]
    async fn test_definition_index_errors_leave_state() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();
        state.add_definition("0x10", "CTRL", None).await.unwrap();

        assert!(matches!(
            state.remove_definition(5).await,
            Err(StateError::Definition(DefinitionError::IndexOutOfRange { .. }))
        ));
        assert!(state.update_definition(0, "0x20", "", None).await.is_err());
        assert_eq!(state.definitions().await[0].name, "CTRL");
    }

    #[tokio::test]
    async fn test_compare_report() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();
        state.add_definition("0x10", "CTRL", Some("Control")).await.unwrap();
        let a = state.add_dump("a", "0x10 1\n0x20 5").await.unwrap();
        let b = state.add_dump("b", "0X10 2").await.unwrap();

        // Selection order does not change column order
        let report = state
            .compare(&[b.id.clone(), a.id.clone(), DumpId::from("unknown")], false)
            .await;
        let names: Vec<_> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(report.summary, ComparisonSummary { rows: 2, mismatches: 1 });
        assert_eq!(
            report.rows[0].values,
            vec![CellValue::Present("1".into()), CellValue::Present("2".into())]
        );

        let report = state.compare(&[], false).await;
        assert!(report.rows.is_empty());
        assert!(report.columns.is_empty());
    }
}
