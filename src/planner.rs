//! Turns detection results into a reviewable cleanup plan.

use crate::plan::{CleanupAction, CleanupEntry, CleanupPlan};
use crate::rules::DetectionResult;
use crate::scanner::EntryType;
use crate::utils;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Generates cleanup plans from detection results.
pub struct PlanGenerator {
    base_path: PathBuf,
}

impl PlanGenerator {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Build a plan from `detections`.
    ///
    /// Children of a directory already marked for deletion are dropped so a
    /// plan never lists both `target` and `target/debug`. Default actions
    /// come from the rule that flagged the entry; protected paths (the scan
    /// root, VCS roots, project roots) are forced to review no matter what
    /// the rule wanted. Entries come out sorted by size descending, which
    /// puts the biggest wins at the top of the file for the human pass.
    pub fn generate(&self, mut detections: Vec<DetectionResult>) -> CleanupPlan {
        let mut plan = CleanupPlan::new(self.base_path.clone());

        // Shortest paths first so parents are decided before children.
        detections.sort_by_key(|d| d.entry.path.as_os_str().len());

        let mut deleted_dirs: Vec<PathBuf> = Vec::new();

        for detection in detections {
            let under_deleted_dir = deleted_dirs
                .iter()
                .any(|dir| detection.entry.path.starts_with(dir) && detection.entry.path != *dir);
            if under_deleted_dir {
                continue;
            }

            let relative = relative_entry_path(&detection.entry.path, &self.base_path);

            let mut action = default_action_for_rule(&detection.rule_name);
            if relative == "." || utils::is_protected_path(&detection.entry.path) {
                action = CleanupAction::Review;
            }

            if detection.entry.entry_type == EntryType::Directory
                && action == CleanupAction::Delete
            {
                deleted_dirs.push(detection.entry.path.clone());
            }

            let modified = DateTime::<Utc>::from(detection.entry.modified).to_rfc3339();

            plan.add_entry(CleanupEntry {
                path: relative,
                size: detection.entry.size,
                modified,
                action,
                rule_name: detection.rule_name,
                reason: detection.reason,
                file_id: detection.entry.file_id,
            });
        }

        plan.entries.sort_by(|a, b| b.size.cmp(&a.size));
        plan
    }
}

/// Default action per rule: build artifacts regenerate, so they delete;
/// everything else is conservative and asks for review.
fn default_action_for_rule(rule_name: &str) -> CleanupAction {
    match rule_name {
        "build_artifact" => CleanupAction::Delete,
        _ => CleanupAction::Review,
    }
}

fn relative_entry_path(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let text = relative.to_string_lossy();
    if text.is_empty() {
        ".".to_string()
    } else {
        text.to_string()
    }
}
