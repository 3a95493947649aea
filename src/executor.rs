//! Executes the `delete` entries of a verified plan.
//!
//! Everything destructive funnels through here, so the rules are strict:
//! only `Delete` entries are candidates, the candidate set must be free of
//! duplicate paths before anything runs, and every attempted operation is
//! appended to the transaction log, which is finalized and persisted no
//! matter how the run ends.

use crate::plan::{CleanupAction, CleanupEntry, CleanupPlan};
use crate::progress::ScanProgress;
use crate::transaction::{TransactionLogger, TransactionStatus};
use crate::trash_ops;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid execution options: {0}")]
    InvalidOptions(String),

    #[error("plan has duplicate delete paths: {0}")]
    DuplicatePaths(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

/// How the executor treats the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Evaluate everything, mutate nothing.
    DryRun,
    /// Ask the supplied prompt before each deletion.
    Interactive,
    /// Delete without prompting.
    Batch,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::DryRun => "dry_run",
            ExecutionMode::Interactive => "interactive",
            ExecutionMode::Batch => "batch",
        }
    }
}

/// Execution configuration.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub mode: ExecutionMode,

    /// Move entries here (preserving relative paths) instead of deleting.
    pub backup_dir: Option<PathBuf>,

    /// Send entries to the platform trash instead of deleting.
    pub use_recycle_bin: bool,

    /// Stop after a failure: immediately when sequential, between batches
    /// when parallel.
    pub fail_fast: bool,

    pub parallel: bool,

    /// Entries per parallel batch.
    pub batch_size: usize,

    /// Worker threads for parallel execution (0 = one per core).
    pub thread_count: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::DryRun,
            backup_dir: None,
            use_recycle_bin: false,
            fail_fast: false,
            parallel: false,
            batch_size: 100,
            thread_count: 0,
        }
    }
}

impl ExecOptions {
    /// Reject bad combinations before any filesystem access happens.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.batch_size == 0 {
            return Err(ExecError::InvalidOptions(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.parallel && self.mode == ExecutionMode::Interactive {
            return Err(ExecError::InvalidOptions(
                "interactive mode cannot run in parallel".to_string(),
            ));
        }
        Ok(())
    }
}

/// Answer from the interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    Accept,
    Decline,
    Abort,
}

/// Interactive confirmation is a capability the caller supplies. The CLI
/// hands in a stdin reader; a GUI would hand in a channel; tests hand in
/// closures.
pub type PromptFn = Box<dyn FnMut(&CleanupEntry) -> std::io::Result<PromptResponse> + Send>;

/// What was done to one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationAction {
    Delete,
    MoveToBackup,
    MoveToRecycleBin,
    Skip,
}

impl OperationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationAction::Delete => "delete",
            OperationAction::MoveToBackup => "move_to_backup",
            OperationAction::MoveToRecycleBin => "move_to_recycle_bin",
            OperationAction::Skip => "skip",
        }
    }
}

/// How one operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Success,
    Failed,
    Skipped,
    DryRun,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "success",
            OperationStatus::Failed => "failed",
            OperationStatus::Skipped => "skipped",
            OperationStatus::DryRun => "dry_run",
        }
    }
}

/// Record of one attempted operation.
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub path: PathBuf,
    pub action: OperationAction,
    pub status: OperationStatus,
    pub size_freed: Option<u64>,
    pub error: Option<String>,
    pub timestamp: SystemTime,
}

#[derive(Debug)]
pub struct ExecutionSummary {
    pub total_operations: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub space_freed: u64,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct ExecutionResult {
    pub operations: Vec<OperationResult>,
    pub summary: ExecutionSummary,

    /// True when the run stopped on user abort or cancellation.
    pub aborted: bool,
}

/// Executes cleanup plans.
pub struct Executor {
    options: ExecOptions,
    progress: Arc<ScanProgress>,
    prompt: Option<PromptFn>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Executor {
    pub fn new(options: ExecOptions) -> Self {
        Self {
            options,
            progress: Arc::new(ScanProgress::new()),
            prompt: None,
            cancel: None,
        }
    }

    /// Supply the interactive confirmation capability. Required when the
    /// mode is [`ExecutionMode::Interactive`].
    pub fn with_prompt(mut self, prompt: PromptFn) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Cooperative cancellation flag, checked between entries and between
    /// batches. Completed deletions cannot be undone, so this is the
    /// finest granularity on offer.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn progress(&self) -> Arc<ScanProgress> {
        Arc::clone(&self.progress)
    }

    /// Execute the plan's `Delete` entries, logging every attempt.
    ///
    /// The transaction log is finalized and persisted on every path out of
    /// this function except option validation failures, which happen
    /// before the run starts.
    pub fn execute(
        &mut self,
        plan: &CleanupPlan,
        logger: &mut TransactionLogger,
    ) -> Result<ExecutionResult, ExecError> {
        self.options.validate()?;

        let candidates: Vec<&CleanupEntry> = plan
            .entries
            .iter()
            .filter(|e| e.action == CleanupAction::Delete)
            .collect();

        // No duplicate paths means no two workers can ever touch the same
        // node, which is what lets batches run without per-path locks.
        let mut seen = HashSet::new();
        for entry in &candidates {
            if !seen.insert(entry.path.as_str()) {
                return Err(ExecError::DuplicatePaths(entry.path.clone()));
            }
        }

        if self.options.mode == ExecutionMode::Interactive && self.prompt.is_none() {
            return Err(ExecError::InvalidOptions(
                "interactive mode requires a prompt callback".to_string(),
            ));
        }

        self.progress.set_total(candidates.len() as u64);
        let started = Instant::now();

        let (operations, aborted, failed_fast) = if self.options.parallel {
            self.run_parallel(plan, &candidates, logger)?
        } else {
            self.run_sequential(plan, &candidates, logger)
        };

        let summary = compute_summary(&operations, started.elapsed());
        let status = if aborted {
            TransactionStatus::Aborted
        } else if failed_fast {
            TransactionStatus::Failed
        } else {
            TransactionStatus::Completed
        };
        logger.finalize(status, &summary)?;

        Ok(ExecutionResult {
            operations,
            summary,
            aborted,
        })
    }

    fn run_sequential(
        &mut self,
        plan: &CleanupPlan,
        candidates: &[&CleanupEntry],
        logger: &mut TransactionLogger,
    ) -> (Vec<OperationResult>, bool, bool) {
        let mut operations = Vec::new();
        let mut aborted = false;
        let mut failed_fast = false;

        for entry in candidates {
            if self.is_cancelled() {
                aborted = true;
                break;
            }

            let full_path = plan.base_path.join(&entry.path);

            if self.options.mode == ExecutionMode::Interactive {
                let prompt = self.prompt.as_mut().expect("checked in execute");
                match prompt(entry) {
                    Ok(PromptResponse::Accept) => {}
                    Ok(PromptResponse::Decline) => {
                        let op = OperationResult {
                            path: full_path,
                            action: OperationAction::Skip,
                            status: OperationStatus::Skipped,
                            size_freed: None,
                            error: None,
                            timestamp: SystemTime::now(),
                        };
                        logger.log_operation(&op);
                        operations.push(op);
                        self.progress.increment();
                        continue;
                    }
                    // An explicit abort and a dead prompt channel both mean
                    // nobody is approving deletions anymore.
                    Ok(PromptResponse::Abort) | Err(_) => {
                        aborted = true;
                        break;
                    }
                }
            }

            let op = perform(&self.options, &full_path, entry);
            self.progress.increment();
            logger.log_operation(&op);
            let failed = op.status == OperationStatus::Failed;
            operations.push(op);

            if failed && self.options.fail_fast {
                failed_fast = true;
                break;
            }
        }

        (operations, aborted, failed_fast)
    }

    fn run_parallel(
        &self,
        plan: &CleanupPlan,
        candidates: &[&CleanupEntry],
        logger: &mut TransactionLogger,
    ) -> Result<(Vec<OperationResult>, bool, bool), ExecError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.thread_count)
            .build()
            .map_err(|e| ExecError::Pool(e.to_string()))?;

        let mut operations = Vec::new();
        let mut aborted = false;
        let mut failed_fast = false;

        for batch in candidates.chunks(self.options.batch_size) {
            if self.is_cancelled() {
                aborted = true;
                break;
            }

            let options = &self.options;
            let progress = Arc::clone(&self.progress);
            let base_path = &plan.base_path;

            let batch_ops: Vec<OperationResult> = pool.install(|| {
                batch
                    .par_iter()
                    .map(|entry| {
                        let op = perform(options, &base_path.join(&entry.path), entry);
                        progress.increment();
                        op
                    })
                    .collect()
            });

            for op in &batch_ops {
                logger.log_operation(op);
            }
            let batch_failed = batch_ops
                .iter()
                .any(|o| o.status == OperationStatus::Failed);
            operations.extend(batch_ops);

            // fail_fast is evaluated between batches only; work already in
            // flight inside a batch is allowed to finish.
            if batch_failed && self.options.fail_fast {
                failed_fast = true;
                break;
            }
        }

        Ok((operations, aborted, failed_fast))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// The mutation an accepted entry gets, from the configured disposal route.
fn planned_action(options: &ExecOptions) -> OperationAction {
    if options.use_recycle_bin {
        OperationAction::MoveToRecycleBin
    } else if options.backup_dir.is_some() {
        OperationAction::MoveToBackup
    } else {
        OperationAction::Delete
    }
}

fn perform(options: &ExecOptions, path: &Path, entry: &CleanupEntry) -> OperationResult {
    let timestamp = SystemTime::now();
    let action = planned_action(options);

    if options.mode == ExecutionMode::DryRun {
        return OperationResult {
            path: path.to_path_buf(),
            action,
            status: OperationStatus::DryRun,
            size_freed: Some(entry.size),
            error: None,
            timestamp,
        };
    }

    let outcome = match action {
        OperationAction::Delete => delete_path(path),
        OperationAction::MoveToBackup => {
            // Checked by planned_action.
            move_to_backup(path, entry, options.backup_dir.as_ref().expect("backup dir set"))
        }
        OperationAction::MoveToRecycleBin => trash_ops::delete(path),
        OperationAction::Skip => Ok(()),
    };

    match outcome {
        Ok(()) => OperationResult {
            path: path.to_path_buf(),
            action,
            status: OperationStatus::Success,
            size_freed: Some(entry.size),
            error: None,
            timestamp,
        },
        Err(err) => OperationResult {
            path: path.to_path_buf(),
            action,
            status: OperationStatus::Failed,
            size_freed: None,
            error: Some(err.to_string()),
            timestamp,
        },
    }
}

fn delete_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Move `path` under `backup_dir`, recreating the entry's relative path so
/// a manual restore is a single move back.
fn move_to_backup(path: &Path, entry: &CleanupEntry, backup_dir: &Path) -> std::io::Result<()> {
    let dest = backup_dir.join(&entry.path);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::rename(path, &dest)
}

fn compute_summary(operations: &[OperationResult], duration: Duration) -> ExecutionSummary {
    let successful = operations
        .iter()
        .filter(|o| matches!(o.status, OperationStatus::Success | OperationStatus::DryRun))
        .count();
    let failed = operations
        .iter()
        .filter(|o| o.status == OperationStatus::Failed)
        .count();
    let skipped = operations
        .iter()
        .filter(|o| o.status == OperationStatus::Skipped)
        .count();
    let space_freed = operations.iter().filter_map(|o| o.size_freed).sum();

    ExecutionSummary {
        total_operations: operations.len(),
        successful,
        failed,
        skipped,
        space_freed,
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TransactionLogger, TransactionOptions};
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn plan_with(base: &Path, entries: Vec<CleanupEntry>) -> CleanupPlan {
        let mut plan = CleanupPlan::new(base.to_path_buf());
        plan.entries = entries;
        plan
    }

    fn delete_entry(rel: &str, size: u64) -> CleanupEntry {
        entry_with_action(rel, size, CleanupAction::Delete)
    }

    fn entry_with_action(rel: &str, size: u64, action: CleanupAction) -> CleanupEntry {
        CleanupEntry {
            path: rel.to_string(),
            size,
            modified: Utc::now().to_rfc3339(),
            action,
            rule_name: "build_artifact".to_string(),
            reason: "test".to_string(),
            file_id: None,
        }
    }

    fn logger_in(temp: &TempDir, options: &ExecOptions) -> TransactionLogger {
        TransactionLogger::new(
            &temp.path().join("plan.toml"),
            temp.path().join("log.json"),
            options.mode.as_str(),
            TransactionOptions {
                dry_run: options.mode == ExecutionMode::DryRun,
                backup_dir: options.backup_dir.clone(),
                use_recycle_bin: options.use_recycle_bin,
                fail_fast: options.fail_fast,
            },
        )
    }

    #[test]
    fn test_dry_run_mutates_nothing_but_logs() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("f.txt"), "content").unwrap();

        let plan = plan_with(temp.path(), vec![delete_entry("f.txt", 7)]);
        let options = ExecOptions::default();
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger).unwrap();

        assert!(temp.path().join("f.txt").exists());
        assert_eq!(result.operations[0].status, OperationStatus::DryRun);
        assert_eq!(result.summary.space_freed, 7);

        let log = TransactionLogger::read(&temp.path().join("log.json")).unwrap();
        assert_eq!(log.status, crate::transaction::TransactionStatus::Completed);
        assert_eq!(log.operations.len(), 1);
        assert_eq!(log.operations[0].status, "dry_run");
    }

    #[test]
    fn test_batch_deletes_files_and_directories() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("f.txt"), "content").unwrap();
        fs::create_dir(temp.path().join("target")).unwrap();
        fs::write(temp.path().join("target/artifact"), "bin").unwrap();

        let plan = plan_with(
            temp.path(),
            vec![delete_entry("f.txt", 7), delete_entry("target", 3)],
        );
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger).unwrap();

        assert_eq!(result.summary.successful, 2);
        assert!(!temp.path().join("f.txt").exists());
        assert!(!temp.path().join("target").exists());
    }

    #[test]
    fn test_keep_and_review_entries_are_untouched() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("keep.txt"), "k").unwrap();
        fs::write(temp.path().join("review.txt"), "r").unwrap();

        let plan = plan_with(
            temp.path(),
            vec![
                entry_with_action("keep.txt", 1, CleanupAction::Keep),
                entry_with_action("review.txt", 1, CleanupAction::Review),
            ],
        );
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger).unwrap();

        assert_eq!(result.summary.total_operations, 0);
        assert!(temp.path().join("keep.txt").exists());
        assert!(temp.path().join("review.txt").exists());
    }

    #[test]
    fn test_backup_preserves_relative_structure() {
        let temp = TempDir::new().unwrap();
        let backup = temp.path().join("backup");
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        fs::write(temp.path().join("a/b/f.txt"), "content").unwrap();

        let plan = plan_with(temp.path(), vec![delete_entry("a/b/f.txt", 7)]);
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            backup_dir: Some(backup.clone()),
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger).unwrap();

        assert_eq!(result.summary.successful, 1);
        assert_eq!(result.operations[0].action, OperationAction::MoveToBackup);
        assert!(!temp.path().join("a/b/f.txt").exists());
        let restored = backup.join("a/b/f.txt");
        assert!(restored.exists());
        assert_eq!(fs::metadata(&restored).unwrap().len(), 7);
    }

    #[test]
    fn test_fail_fast_stops_after_first_failure() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("second.txt"), "content").unwrap();

        let plan = plan_with(
            temp.path(),
            vec![
                delete_entry("missing.txt", 100),
                delete_entry("second.txt", 7),
            ],
        );
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            fail_fast: true,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger).unwrap();

        // Exactly one operation attempted, and the second file survived.
        assert_eq!(result.operations.len(), 1);
        assert_eq!(result.operations[0].status, OperationStatus::Failed);
        assert!(temp.path().join("second.txt").exists());

        let log = TransactionLogger::read(&temp.path().join("log.json")).unwrap();
        assert_eq!(log.status, crate::transaction::TransactionStatus::Failed);
        assert_eq!(log.operations.len(), 1);
    }

    #[test]
    fn test_continue_without_fail_fast() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("second.txt"), "content").unwrap();

        let plan = plan_with(
            temp.path(),
            vec![
                delete_entry("missing.txt", 100),
                delete_entry("second.txt", 7),
            ],
        );
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger).unwrap();

        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.successful, 1);
        assert!(!temp.path().join("second.txt").exists());
    }

    #[test]
    fn test_interactive_decline_and_abort() {
        let temp = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(temp.path().join(name), "content").unwrap();
        }

        let plan = plan_with(
            temp.path(),
            vec![
                delete_entry("a.txt", 7),
                delete_entry("b.txt", 7),
                delete_entry("c.txt", 7),
            ],
        );
        let options = ExecOptions {
            mode: ExecutionMode::Interactive,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let mut answers = vec![
            PromptResponse::Decline,
            PromptResponse::Accept,
            PromptResponse::Abort,
        ]
        .into_iter();
        let mut executor = Executor::new(options)
            .with_prompt(Box::new(move |_| Ok(answers.next().unwrap())));

        let result = executor.execute(&plan, &mut logger).unwrap();

        assert!(result.aborted);
        assert_eq!(result.summary.skipped, 1);
        assert_eq!(result.summary.successful, 1);
        assert!(temp.path().join("a.txt").exists()); // declined
        assert!(!temp.path().join("b.txt").exists()); // accepted
        assert!(temp.path().join("c.txt").exists()); // aborted before

        let log = TransactionLogger::read(&temp.path().join("log.json")).unwrap();
        assert_eq!(log.status, crate::transaction::TransactionStatus::Aborted);
    }

    #[test]
    fn test_interactive_requires_prompt() {
        let temp = TempDir::new().unwrap();
        let plan = plan_with(temp.path(), vec![delete_entry("x", 1)]);
        let options = ExecOptions {
            mode: ExecutionMode::Interactive,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger);
        assert!(matches!(result, Err(ExecError::InvalidOptions(_))));
    }

    #[test]
    fn test_parallel_interactive_rejected() {
        let temp = TempDir::new().unwrap();
        let plan = plan_with(temp.path(), vec![delete_entry("x", 1)]);
        let options = ExecOptions {
            mode: ExecutionMode::Interactive,
            parallel: true,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger);
        assert!(matches!(result, Err(ExecError::InvalidOptions(_))));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let options = ExecOptions {
            batch_size: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_duplicate_delete_paths_rejected() {
        let temp = TempDir::new().unwrap();
        let plan = plan_with(
            temp.path(),
            vec![delete_entry("same.txt", 1), delete_entry("same.txt", 1)],
        );
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger);
        assert!(matches!(result, Err(ExecError::DuplicatePaths(_))));
    }

    #[test]
    fn test_parallel_execution_deletes_everything() {
        let temp = TempDir::new().unwrap();
        let mut entries = Vec::new();
        for i in 0..20 {
            let name = format!("f{i}.txt");
            fs::write(temp.path().join(&name), "content").unwrap();
            entries.push(delete_entry(&name, 7));
        }

        let plan = plan_with(temp.path(), entries);
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            parallel: true,
            batch_size: 4,
            thread_count: 2,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger).unwrap();

        assert_eq!(result.summary.successful, 20);
        assert_eq!(result.summary.space_freed, 140);
        for i in 0..20 {
            assert!(!temp.path().join(format!("f{i}.txt")).exists());
        }
    }

    #[test]
    fn test_parallel_fail_fast_checks_between_batches() {
        let temp = TempDir::new().unwrap();
        // First batch contains a missing file; later batches must not run.
        let mut entries = vec![delete_entry("missing.txt", 1)];
        for i in 0..6 {
            let name = format!("f{i}.txt");
            fs::write(temp.path().join(&name), "content").unwrap();
            entries.push(delete_entry(&name, 7));
        }

        let plan = plan_with(temp.path(), entries);
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            parallel: true,
            fail_fast: true,
            batch_size: 3,
            thread_count: 2,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let result = Executor::new(options).execute(&plan, &mut logger).unwrap();

        // Only the first batch ran.
        assert_eq!(result.operations.len(), 3);
        assert!(result.summary.failed >= 1);
        assert!(temp.path().join("f3.txt").exists());
        assert!(temp.path().join("f5.txt").exists());
    }

    #[test]
    fn test_cancel_flag_stops_run() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("f.txt"), "content").unwrap();

        let plan = plan_with(temp.path(), vec![delete_entry("f.txt", 7)]);
        let options = ExecOptions {
            mode: ExecutionMode::Batch,
            ..Default::default()
        };
        let mut logger = logger_in(&temp, &options);

        let cancel = Arc::new(AtomicBool::new(true));
        let mut executor = Executor::new(options).with_cancel_flag(Arc::clone(&cancel));
        let result = executor.execute(&plan, &mut logger).unwrap();

        assert!(result.aborted);
        assert!(result.operations.is_empty());
        assert!(temp.path().join("f.txt").exists());
    }
}
