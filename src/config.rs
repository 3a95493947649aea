//! Persistent configuration, stored as TOML in the platform config dir.
//!
//! Every field has a default so a partial file, or no file at all, still
//! produces a working configuration. CLI flags override on top.

use crate::executor::{ExecOptions, ExecutionMode};
use crate::scanner::ScanOptions;
use crate::verifier::VerifyOptions;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scanner: ScannerSection,
    pub rules: RulesSection,
    pub verifier: VerifierSection,
    pub executor: ExecutorSection,
    pub exclusions: Exclusions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    pub max_depth: Option<usize>,
    pub skip_hidden: bool,
    pub follow_symlinks: bool,
    pub thread_count: usize,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            max_depth: None,
            skip_hidden: true,
            follow_symlinks: false,
            thread_count: 0,
        }
    }
}

impl From<&ScannerSection> for ScanOptions {
    fn from(section: &ScannerSection) -> Self {
        Self {
            max_depth: section.max_depth,
            skip_hidden: section.skip_hidden,
            follow_symlinks: section.follow_symlinks,
            thread_count: section.thread_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// Threshold for the large file rule, in megabytes.
    pub size_threshold_mb: u64,

    pub detect_large_files: bool,

    pub detect_build_artifacts: bool,

    /// Extra directory names treated as build artifacts.
    pub custom_artifacts: Vec<String>,
}

impl Default for RulesSection {
    fn default() -> Self {
        Self {
            size_threshold_mb: 100,
            detect_large_files: true,
            detect_build_artifacts: true,
            custom_artifacts: Vec::new(),
        }
    }
}

impl RulesSection {
    pub fn size_threshold_bytes(&self) -> u64 {
        self.size_threshold_mb * 1_048_576
    }

    /// Build the detection engine this section describes, build artifact
    /// rule first.
    pub fn build_engine(&self) -> crate::rules::DetectionEngine {
        use crate::rules::{BuildArtifactRule, DetectionEngine, SizeThresholdRule};

        let mut engine = DetectionEngine::empty();
        if self.detect_build_artifacts {
            engine.add_rule(Box::new(BuildArtifactRule::with_extra_patterns(
                &self.custom_artifacts,
            )));
        }
        if self.detect_large_files {
            engine.add_rule(Box::new(SizeThresholdRule {
                threshold_bytes: self.size_threshold_bytes(),
            }));
        }
        engine
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierSection {
    pub check_mtime: bool,
    pub check_size: bool,
    pub fail_fast: bool,
}

impl Default for VerifierSection {
    fn default() -> Self {
        Self {
            check_mtime: true,
            check_size: true,
            fail_fast: false,
        }
    }
}

impl From<&VerifierSection> for VerifyOptions {
    fn from(section: &VerifierSection) -> Self {
        Self {
            check_mtime: section.check_mtime,
            check_size: section.check_size,
            fail_fast: section.fail_fast,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub parallel: bool,
    pub batch_size: usize,
    pub fail_fast: bool,
    pub use_recycle_bin: bool,
    pub backup_dir: Option<PathBuf>,
    pub thread_count: usize,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            parallel: false,
            batch_size: 100,
            fail_fast: false,
            use_recycle_bin: false,
            backup_dir: None,
            thread_count: 0,
        }
    }
}

impl ExecutorSection {
    pub fn to_exec_options(&self, mode: ExecutionMode) -> ExecOptions {
        ExecOptions {
            mode,
            backup_dir: self.backup_dir.clone(),
            use_recycle_bin: self.use_recycle_bin,
            fail_fast: self.fail_fast,
            parallel: self.parallel,
            batch_size: self.batch_size,
            thread_count: self.thread_count,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Exclusions {
    /// Glob patterns; matching paths are dropped from detections before a
    /// plan is generated.
    pub patterns: Vec<String>,
}

impl Exclusions {
    /// Compile the patterns. Invalid globs are a configuration error, not
    /// something to silently skip.
    pub fn matcher(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| ConfigError::Invalid(format!("bad exclusion glob {pattern:?}: {e}")))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

impl Config {
    /// Platform config file location, e.g. `~/.config/reclaim/config.toml`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("", "", "reclaim").ok_or_else(|| {
            ConfigError::Invalid("could not determine a config directory".to_string())
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location; missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let document = toml::to_string_pretty(self)?;
        crate::utils::write_atomic(path, &document)?;
        Ok(())
    }

    /// Range checks, applied before any filesystem access uses the values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.size_threshold_mb == 0 {
            return Err(ConfigError::Invalid(
                "size threshold must be at least 1 MB".to_string(),
            ));
        }
        if self.executor.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "executor batch size must be at least 1".to_string(),
            ));
        }
        self.exclusions.matcher()?;
        Ok(())
    }
}
