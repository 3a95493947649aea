//! Drift detection between a plan snapshot and the live filesystem.
//!
//! This is the only gate between an edited plan and destructive execution,
//! so every comparison errs toward reporting drift. A missing or changed
//! entry blocks execution; a permission problem is reported as a warning
//! and the entry is skipped.

use crate::plan::{CleanupAction, CleanupPlan};
use crate::utils;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Filesystem timestamp granularity allowance. FAT and some network
/// filesystems round mtimes to 2 seconds.
const MTIME_TOLERANCE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plan contains an invalid timestamp for {path}: {message}")]
    InvalidTimestamp { path: String, message: String },
}

/// Verification behavior switches.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub check_mtime: bool,
    pub check_size: bool,

    /// Stop at the first missing or drifted entry.
    pub fail_fast: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            check_mtime: true,
            check_size: true,
            fail_fast: false,
        }
    }
}

/// What kind of discrepancy was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriftType {
    SizeMismatch,
    ModificationTimeMismatch,
    /// The node at the path is not the one the plan recorded (replaced or
    /// renamed over since the scan).
    IdMismatch,
}

/// A single detected discrepancy.
#[derive(Debug, Clone, Serialize)]
pub struct DriftDetection {
    pub path: PathBuf,
    pub drift_type: DriftType,
    pub expected: String,
    pub actual: String,
}

/// Outcome of one verification pass. Never persisted; recomputed per call.
#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub total_entries: usize,
    pub verified: usize,
    pub drifted: Vec<DriftDetection>,
    pub missing: Vec<PathBuf>,
    pub permission_errors: Vec<PathBuf>,
}

impl VerificationResult {
    pub fn has_drift(&self) -> bool {
        !self.drifted.is_empty() || !self.missing.is_empty()
    }

    /// Permission errors are warnings only; drift and missing entries are
    /// blockers.
    pub fn is_safe_to_execute(&self) -> bool {
        !self.has_drift()
    }
}

/// Re-checks a plan against the current filesystem state.
pub struct Verifier {
    options: VerifyOptions,
}

impl Verifier {
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    /// Verify every entry whose action is not `Keep`.
    ///
    /// `Review` entries are included: they may be approved for deletion
    /// later, so their snapshots have to stay honest. Checks per entry run
    /// in order existence, identity, size, mtime; the first hit records a
    /// drift and moves on (or returns, under `fail_fast`).
    pub fn verify(&self, plan: &CleanupPlan) -> Result<VerificationResult, VerifyError> {
        let mut result = VerificationResult {
            total_entries: plan.entries.len(),
            verified: 0,
            drifted: Vec::new(),
            missing: Vec::new(),
            permission_errors: Vec::new(),
        };

        for entry in &plan.entries {
            if entry.action == CleanupAction::Keep {
                result.verified += 1;
                continue;
            }

            let full_path = plan.base_path.join(&entry.path);

            if !full_path.exists() {
                result.missing.push(full_path);
                if self.options.fail_fast {
                    return Ok(result);
                }
                continue;
            }

            let metadata = match std::fs::metadata(&full_path) {
                Ok(m) => m,
                Err(_) => {
                    result.permission_errors.push(full_path);
                    continue;
                }
            };

            if let (Some(expected_id), Some(actual_id)) =
                (entry.file_id, utils::stable_file_id(&metadata))
            {
                if expected_id != actual_id {
                    result.drifted.push(DriftDetection {
                        path: full_path,
                        drift_type: DriftType::IdMismatch,
                        expected: expected_id.to_string(),
                        actual: actual_id.to_string(),
                    });
                    if self.options.fail_fast {
                        return Ok(result);
                    }
                    continue;
                }
            }

            if self.options.check_size {
                let current_size = if metadata.is_dir() {
                    utils::dir_size(&full_path)
                } else {
                    metadata.len()
                };

                if current_size != entry.size {
                    result.drifted.push(DriftDetection {
                        path: full_path,
                        drift_type: DriftType::SizeMismatch,
                        expected: format!("{} bytes", entry.size),
                        actual: format!("{} bytes", current_size),
                    });
                    if self.options.fail_fast {
                        return Ok(result);
                    }
                    continue;
                }
            }

            if self.options.check_mtime {
                let current = metadata.modified()?;
                let expected = parse_snapshot_mtime(&entry.path, &entry.modified)?;

                if mtime_drifted(expected, current) {
                    result.drifted.push(DriftDetection {
                        path: full_path,
                        drift_type: DriftType::ModificationTimeMismatch,
                        expected: entry.modified.clone(),
                        actual: chrono::DateTime::<chrono::Utc>::from(current).to_rfc3339(),
                    });
                    if self.options.fail_fast {
                        return Ok(result);
                    }
                    continue;
                }
            }

            result.verified += 1;
        }

        Ok(result)
    }
}

fn parse_snapshot_mtime(path: &str, snapshot: &str) -> Result<SystemTime, VerifyError> {
    chrono::DateTime::parse_from_rfc3339(snapshot)
        .map(SystemTime::from)
        .map_err(|e| VerifyError::InvalidTimestamp {
            path: path.to_string(),
            message: e.to_string(),
        })
}

fn mtime_drifted(expected: SystemTime, actual: SystemTime) -> bool {
    let diff = match actual.duration_since(expected) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    diff > MTIME_TOLERANCE
}
