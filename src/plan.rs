//! Cleanup plan model and its TOML persistence.
//!
//! Plans are the unit of human review: they are written as TOML so an editor
//! pass over the `action` fields is all it takes to approve or veto entries.
//! Writes are atomic and loading rejects malformed documents outright.

use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed plan document: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize plan: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid plan: {0}")]
    Validation(String),
}

/// What to do with a plan entry. The single authoritative switch consulted
/// by both the verifier and the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupAction {
    Delete,
    Keep,
    Review,
}

/// One reviewable entry. `path` is always relative to the plan's base path
/// so the plan file can be moved or shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupEntry {
    pub path: String,

    pub size: u64,

    /// Modification time snapshot, RFC3339.
    pub modified: String,

    pub action: CleanupAction,

    pub rule_name: String,

    pub reason: String,

    /// Stable identity snapshot for rename detection, when the platform
    /// provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<u64>,
}

/// Aggregate statistics over a plan, computed on demand so entry edits can
/// never leave them stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanStats {
    pub total_entries: usize,
    pub delete_count: usize,
    pub review_count: usize,
    pub keep_count: usize,
    pub total_size: u64,
}

/// A persisted cleanup proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupPlan {
    /// Plan format version (crate version at generation time).
    pub version: String,

    pub created_at: DateTime<Utc>,

    /// Directory the scan ran over; all entry paths are relative to it.
    pub base_path: PathBuf,

    pub entries: Vec<CleanupEntry>,
}

impl CleanupPlan {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            base_path,
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, entry: CleanupEntry) {
        self.entries.push(entry);
    }

    /// Change the action of the entry at `path`. Returns false when no such
    /// entry exists.
    pub fn set_action(&mut self, path: &str, action: CleanupAction) -> bool {
        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(entry) => {
                entry.action = action;
                true
            }
            None => false,
        }
    }

    pub fn entry(&self, path: &str) -> Option<&CleanupEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn stats(&self) -> PlanStats {
        let mut stats = PlanStats {
            total_entries: self.entries.len(),
            delete_count: 0,
            review_count: 0,
            keep_count: 0,
            total_size: 0,
        };

        for entry in &self.entries {
            stats.total_size += entry.size;
            match entry.action {
                CleanupAction::Delete => stats.delete_count += 1,
                CleanupAction::Review => stats.review_count += 1,
                CleanupAction::Keep => stats.keep_count += 1,
            }
        }

        stats
    }

    /// Structural checks applied before writing and before execution.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.base_path.as_os_str().is_empty() {
            return Err(PlanError::Validation("base path is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.path.is_empty() {
                return Err(PlanError::Validation(
                    "entry with an empty path".to_string(),
                ));
            }
            if !seen.insert(entry.path.as_str()) {
                return Err(PlanError::Validation(format!(
                    "duplicate entry path: {}",
                    entry.path
                )));
            }
        }

        Ok(())
    }

    /// Validate and write the plan atomically as TOML.
    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        self.validate()?;
        let document = toml::to_string_pretty(self)?;
        utils::write_atomic(path, &document)?;
        Ok(())
    }

    /// Load a plan, rejecting malformed documents.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path)?;
        let plan: CleanupPlan = toml::from_str(&content)?;
        plan.validate()?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(path: &str, size: u64, action: CleanupAction) -> CleanupEntry {
        CleanupEntry {
            path: path.to_string(),
            size,
            modified: "2026-07-01T12:00:00+00:00".to_string(),
            action,
            rule_name: "build_artifact".to_string(),
            reason: "Common build artifact directory".to_string(),
            file_id: None,
        }
    }

    #[test]
    fn test_stats_counts_actions_and_bytes() {
        let mut plan = CleanupPlan::new(PathBuf::from("/scan"));
        plan.add_entry(entry("target", 1000, CleanupAction::Delete));
        plan.add_entry(entry("big.iso", 2000, CleanupAction::Review));
        plan.add_entry(entry("notes.txt", 500, CleanupAction::Keep));

        let stats = plan.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.delete_count, 1);
        assert_eq!(stats.review_count, 1);
        assert_eq!(stats.keep_count, 1);
        assert_eq!(stats.total_size, 3500);
    }

    #[test]
    fn test_set_action_recomputes_stats() {
        let mut plan = CleanupPlan::new(PathBuf::from("/scan"));
        plan.add_entry(entry("target", 1000, CleanupAction::Delete));

        assert!(plan.set_action("target", CleanupAction::Keep));
        assert_eq!(plan.stats().delete_count, 0);
        assert_eq!(plan.stats().keep_count, 1);

        assert!(!plan.set_action("missing", CleanupAction::Keep));
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.toml");

        let mut plan = CleanupPlan::new(PathBuf::from("/scan/röót"));
        plan.add_entry(CleanupEntry {
            file_id: Some(42),
            ..entry("tärget/ünicode", 0, CleanupAction::Delete)
        });
        plan.add_entry(entry("big.iso", u32::MAX as u64, CleanupAction::Review));

        plan.save(&path).unwrap();
        let loaded = CleanupPlan::load(&path).unwrap();

        assert_eq!(loaded.version, plan.version);
        assert_eq!(loaded.base_path, plan.base_path);
        assert_eq!(loaded.entries, plan.entries);
    }

    #[test]
    fn test_load_rejects_malformed_document() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.toml");
        std::fs::write(&path, "version = \"1.0\"\nentries = \"not a list\"").unwrap();

        assert!(matches!(CleanupPlan::load(&path), Err(PlanError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_bad_action_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.toml");
        std::fs::write(
            &path,
            r#"
version = "0.3.1"
created_at = "2026-07-01T12:00:00Z"
base_path = "/scan"

[[entries]]
path = "target"
size = 10
modified = "2026-07-01T12:00:00Z"
action = "obliterate"
rule_name = "build_artifact"
reason = "x"
"#,
        )
        .unwrap();

        assert!(matches!(CleanupPlan::load(&path), Err(PlanError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut plan = CleanupPlan::new(PathBuf::from("/scan"));
        plan.add_entry(entry("target", 10, CleanupAction::Delete));
        plan.add_entry(entry("target", 20, CleanupAction::Delete));

        assert!(matches!(plan.validate(), Err(PlanError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_base_path() {
        let plan = CleanupPlan::new(PathBuf::new());
        assert!(matches!(plan.validate(), Err(PlanError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_entry_path() {
        let mut plan = CleanupPlan::new(PathBuf::from("/scan"));
        plan.add_entry(entry("", 10, CleanupAction::Delete));

        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.toml");

        let mut plan = CleanupPlan::new(PathBuf::from("/scan"));
        plan.add_entry(entry("target", 10, CleanupAction::Delete));
        plan.save(&path).unwrap();

        assert!(path.exists());
        assert!(!temp.path().join("plan.toml.tmp").exists());
    }

    #[test]
    fn test_action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CleanupAction::Delete).unwrap(),
            "\"delete\""
        );
        assert_eq!(
            serde_json::to_string(&CleanupAction::Keep).unwrap(),
            "\"keep\""
        );
        assert_eq!(
            serde_json::to_string(&CleanupAction::Review).unwrap(),
            "\"review\""
        );
    }

    #[test]
    fn test_file_id_omitted_when_absent() {
        let mut plan = CleanupPlan::new(PathBuf::from("/scan"));
        plan.add_entry(entry("target", 10, CleanupAction::Delete));

        let document = toml::to_string_pretty(&plan).unwrap();
        assert!(!document.contains("file_id"));
    }
}
