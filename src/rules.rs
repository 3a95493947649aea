//! Detection rules and the engine that applies them.
//!
//! Rules deliberately avoid content-based heuristics. They match well-known
//! generated directory names and raw size only, which keeps false positives
//! off ordinary source trees.

use crate::scanner::{EntryType, FileEntry};

/// Directory names produced by build tools, safe to regenerate.
const DEFAULT_BUILD_ARTIFACTS: &[&str] = &[
    "target",
    "node_modules",
    "dist",
    "build",
    ".next",
    ".nuxt",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".gradle",
    ".parcel-cache",
    "bin",
    "obj",
    "coverage",
];

/// A rule that can flag an entry as a cleanup candidate.
pub trait DetectionRule: Send + Sync {
    /// Stable rule identifier, recorded in plans.
    fn name(&self) -> &str;

    fn should_flag(&self, entry: &FileEntry) -> bool;

    /// Human-readable explanation shown next to flagged entries.
    fn reason(&self) -> String;
}

/// An entry flagged by a rule. At most one per [`FileEntry`].
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub entry: FileEntry,
    pub rule_name: String,
    pub reason: String,
}

/// Flags entries at or above a size threshold.
pub struct SizeThresholdRule {
    pub threshold_bytes: u64,
}

impl DetectionRule for SizeThresholdRule {
    fn name(&self) -> &str {
        "large_file"
    }

    fn should_flag(&self, entry: &FileEntry) -> bool {
        entry.size >= self.threshold_bytes
    }

    fn reason(&self) -> String {
        format!(
            "Exceeds size threshold of {} MB",
            self.threshold_bytes / 1_048_576
        )
    }
}

/// Flags directories whose name exactly matches a known build artifact.
///
/// Matching is case sensitive and applies to directories only; a file that
/// happens to be named `target` is never flagged.
pub struct BuildArtifactRule {
    patterns: Vec<String>,
}

impl Default for BuildArtifactRule {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_BUILD_ARTIFACTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl BuildArtifactRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default patterns plus `extra` names from configuration.
    pub fn with_extra_patterns(extra: &[String]) -> Self {
        let mut rule = Self::default();
        for pattern in extra {
            if !rule.patterns.contains(pattern) {
                rule.patterns.push(pattern.clone());
            }
        }
        rule
    }
}

impl DetectionRule for BuildArtifactRule {
    fn name(&self) -> &str {
        "build_artifact"
    }

    fn should_flag(&self, entry: &FileEntry) -> bool {
        if entry.entry_type != EntryType::Directory {
            return false;
        }

        let dir_name = entry.path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        self.patterns.iter().any(|p| p == dir_name)
    }

    fn reason(&self) -> String {
        "Common build artifact directory".to_string()
    }
}

/// Applies an ordered list of rules; the first matching rule wins and an
/// entry is never flagged twice.
pub struct DetectionEngine {
    rules: Vec<Box<dyn DetectionRule>>,
}

impl DetectionEngine {
    /// Engine with the built-in rules.
    ///
    /// The build artifact rule runs first: a 2 GB `target/` is a build
    /// artifact, not a large file, and the first match is what names the
    /// default action downstream.
    pub fn new(size_threshold_bytes: u64) -> Self {
        Self {
            rules: vec![
                Box::new(BuildArtifactRule::default()),
                Box::new(SizeThresholdRule {
                    threshold_bytes: size_threshold_bytes,
                }),
            ],
        }
    }

    /// Engine with no rules; callers add their own in evaluation order.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn DetectionRule>) {
        self.rules.push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Flag entries, first matching rule wins.
    pub fn analyze(&self, entries: &[FileEntry]) -> Vec<DetectionResult> {
        let mut results = Vec::new();

        for entry in entries {
            for rule in &self.rules {
                if rule.should_flag(entry) {
                    results.push(DetectionResult {
                        entry: entry.clone(),
                        rule_name: rule.name().to_string(),
                        reason: rule.reason(),
                    });
                    break;
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn file(path: &str, size: u64) -> FileEntry {
        FileEntry {
            path: PathBuf::from(path),
            size,
            modified: SystemTime::now(),
            entry_type: EntryType::File,
            file_id: None,
        }
    }

    fn dir(path: &str) -> FileEntry {
        FileEntry {
            path: PathBuf::from(path),
            size: 0,
            modified: SystemTime::now(),
            entry_type: EntryType::Directory,
            file_id: None,
        }
    }

    #[test]
    fn test_size_rule_threshold_boundary() {
        let rule = SizeThresholdRule {
            threshold_bytes: 1_048_576,
        };

        assert!(!rule.should_flag(&file("small.txt", 1_048_575)));
        assert!(rule.should_flag(&file("exact.bin", 1_048_576)));
        assert!(rule.should_flag(&file("large.bin", 2_097_152)));
    }

    #[test]
    fn test_build_rule_flags_known_directories() {
        let rule = BuildArtifactRule::default();

        for name in ["target", "node_modules", "dist", "__pycache__"] {
            assert!(
                rule.should_flag(&dir(&format!("/project/{name}"))),
                "should flag {name}"
            );
        }
        assert!(!rule.should_flag(&dir("/project/src")));
    }

    #[test]
    fn test_build_rule_is_case_sensitive() {
        let rule = BuildArtifactRule::default();
        assert!(!rule.should_flag(&dir("/project/TARGET")));
        assert!(!rule.should_flag(&dir("/project/Node_Modules")));
    }

    #[test]
    fn test_build_rule_ignores_files() {
        let rule = BuildArtifactRule::default();
        assert!(!rule.should_flag(&file("/project/target", 4096)));
    }

    #[test]
    fn test_build_rule_extra_patterns() {
        let rule = BuildArtifactRule::with_extra_patterns(&[".turbo".to_string()]);

        assert!(rule.should_flag(&dir("/project/.turbo")));
        assert!(rule.should_flag(&dir("/project/target")));
    }

    #[test]
    fn test_engine_flags_each_entry_at_most_once() {
        let mut engine = DetectionEngine::empty();
        engine.add_rule(Box::new(SizeThresholdRule {
            threshold_bytes: 1000,
        }));
        engine.add_rule(Box::new(SizeThresholdRule { threshold_bytes: 10 }));

        let results = engine.analyze(&[file("big.bin", 5000)]);

        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_engine_first_rule_wins() {
        struct Always(&'static str);
        impl DetectionRule for Always {
            fn name(&self) -> &str {
                self.0
            }
            fn should_flag(&self, _: &FileEntry) -> bool {
                true
            }
            fn reason(&self) -> String {
                self.0.to_string()
            }
        }

        let mut engine = DetectionEngine::empty();
        engine.add_rule(Box::new(Always("first")));
        engine.add_rule(Box::new(Always("second")));

        let results = engine.analyze(&[file("x", 1)]);
        assert_eq!(results[0].rule_name, "first");
    }

    #[test]
    fn test_engine_skips_unflagged_entries() {
        let engine = DetectionEngine::new(100 * 1_048_576);

        let entries = vec![
            file("/p/src/main.rs", 10),
            dir("/p/target"),
            file("/p/huge.iso", 200 * 1_048_576),
        ];
        let results = engine.analyze(&entries);

        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .any(|r| r.rule_name == "build_artifact" && r.entry.path.ends_with("target")));
        assert!(results
            .iter()
            .any(|r| r.rule_name == "large_file" && r.entry.path.ends_with("huge.iso")));
    }

    #[test]
    fn test_empty_engine_flags_nothing() {
        let engine = DetectionEngine::empty();
        assert!(engine.analyze(&[dir("/p/target")]).is_empty());
    }
}
