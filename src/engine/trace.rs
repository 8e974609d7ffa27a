//! Plan traces attached to execution reports.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

/// One finished task within a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub task: String,
    pub status: TaskStatus,
    pub elapsed: Duration,
}

/// Snapshot of everything a plan has run so far, in completion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub plan_id: u64,
    pub plan_name: String,
    pub entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn contains(&self, task: &str) -> bool {
        self.entries.iter().any(|entry| entry.task == task)
    }

    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.entries
            .iter()
            .find(|entry| entry.task == task)
            .map(|entry| entry.status)
    }
}
