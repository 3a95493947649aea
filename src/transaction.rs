//! Append-and-finalize audit log for execution runs.
//!
//! One log per execution call, JSON on disk. The log is created up front
//! with status `in_progress`, collects every attempted operation, and is
//! finalized and atomically persisted exactly once at the end of the run,
//! whatever way the run ended.

use crate::executor::{ExecutionSummary, OperationResult};
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionLog {
    pub version: String,

    /// Unique id for this execution run (UUID v4).
    pub execution_id: String,

    /// The plan file this run executed.
    pub plan_file: PathBuf,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    pub status: TransactionStatus,

    /// Execution mode the run used (`dry_run`, `interactive` or `batch`).
    pub mode: String,

    pub options: TransactionOptions,

    pub operations: Vec<LoggedOperation>,

    pub summary: Option<LoggedSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    InProgress,
    Completed,
    Failed,
    Aborted,
}

/// Options snapshot, recorded so the log is self-describing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionOptions {
    pub dry_run: bool,
    pub backup_dir: Option<PathBuf>,
    pub use_recycle_bin: bool,
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedOperation {
    pub path: String,
    pub action: String,
    pub status: String,
    pub size_freed: Option<u64>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggedSummary {
    pub total_operations: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub space_freed: u64,
    pub duration_seconds: f64,
}

/// Builds and persists one [`TransactionLog`].
pub struct TransactionLogger {
    log_path: PathBuf,
    log: TransactionLog,
}

impl TransactionLogger {
    pub fn new(
        plan_file: &Path,
        log_path: PathBuf,
        mode: &str,
        options: TransactionOptions,
    ) -> Self {
        let log = TransactionLog {
            version: env!("CARGO_PKG_VERSION").to_string(),
            execution_id: Uuid::new_v4().to_string(),
            plan_file: plan_file.to_path_buf(),
            started_at: Utc::now(),
            completed_at: None,
            status: TransactionStatus::InProgress,
            mode: mode.to_string(),
            options,
            operations: Vec::new(),
            summary: None,
        };

        Self { log_path, log }
    }

    pub fn execution_id(&self) -> &str {
        &self.log.execution_id
    }

    /// Append one attempted operation, whatever its outcome.
    pub fn log_operation(&mut self, operation: &OperationResult) {
        self.log.operations.push(LoggedOperation {
            path: operation.path.to_string_lossy().to_string(),
            action: operation.action.as_str().to_string(),
            status: operation.status.as_str().to_string(),
            size_freed: operation.size_freed,
            error: operation.error.clone(),
            timestamp: operation.timestamp.into(),
        });
    }

    /// Seal the log with its final status and summary, then persist it.
    pub fn finalize(
        &mut self,
        status: TransactionStatus,
        summary: &ExecutionSummary,
    ) -> std::io::Result<()> {
        self.log.completed_at = Some(Utc::now());
        self.log.status = status;
        self.log.summary = Some(LoggedSummary {
            total_operations: summary.total_operations,
            successful: summary.successful,
            failed: summary.failed,
            skipped: summary.skipped,
            space_freed: summary.space_freed,
            duration_seconds: summary.duration.as_secs_f64(),
        });

        self.write()
    }

    /// Persist the current state atomically.
    pub fn write(&self) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.log).map_err(std::io::Error::other)?;
        utils::write_atomic(&self.log_path, &json)
    }

    /// Read a previously written log back.
    pub fn read(path: &Path) -> std::io::Result<TransactionLog> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
