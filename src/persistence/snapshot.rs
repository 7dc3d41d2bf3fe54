//! JSON snapshots of a flow run's task states

use crate::core::{Flow, State, TaskId};
use crate::execution::FlowState;
use crate::persistence::SnapshotError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Saved outcome of a run, enough to carry its task states into the next one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub flow_name: String,
    pub saved_at: DateTime<Utc>,

    /// The flow state at the end of the run
    pub state: State,

    /// Task states keyed by task name; task ids do not survive a restart
    pub task_states: BTreeMap<String, State>,
}

impl RunSnapshot {
    /// Snapshot the task states a run returned
    pub fn capture(flow: &Flow, result: &FlowState) -> Self {
        let task_states = result
            .data
            .iter()
            .filter_map(|(id, state)| flow.task(*id).map(|t| (t.name.clone(), state.clone())))
            .collect();

        Self {
            run_id: result.run_id,
            flow_name: flow.name.clone(),
            saved_at: Utc::now(),
            state: result.state.clone(),
            task_states,
        }
    }

    /// Map saved states back onto `flow`'s task ids
    pub fn task_states_for(&self, flow: &Flow) -> Result<HashMap<TaskId, State>, SnapshotError> {
        if self.flow_name != flow.name {
            return Err(SnapshotError::FlowMismatch {
                expected: flow.name.clone(),
                found: self.flow_name.clone(),
            });
        }

        self.task_states
            .iter()
            .map(|(name, state)| {
                flow.task_by_name(name)
                    .map(|task| (task.id(), state.clone()))
                    .ok_or_else(|| SnapshotError::UnknownTask(name.clone()))
            })
            .collect()
    }

    /// Default location for a flow's snapshot
    pub fn default_path(flow_name: &str) -> Result<PathBuf, SnapshotError> {
        let data_dir = dirs::data_local_dir().ok_or(SnapshotError::NoDataDir)?;
        Ok(data_dir
            .join("taskflow")
            .join("runs")
            .join(format!("{}.json", flow_name)))
    }

    /// Write the snapshot as JSON, creating parent directories
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let io_error = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await.map_err(io_error)?;

        info!("Saved run snapshot to {}", path.display());
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let snapshot: Self = serde_json::from_str(&content)?;
        debug!(
            "Loaded snapshot of {} with {} task states",
            snapshot.flow_name,
            snapshot.task_states.len()
        );
        Ok(snapshot)
    }
}
