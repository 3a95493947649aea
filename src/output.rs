//! Human-readable reporting for scan, plan, verify and execute results.

use crate::executor::ExecutionResult;
use crate::plan::{CleanupAction, CleanupPlan};
use crate::scanner::ScanOutcome;
use crate::verifier::{DriftType, VerificationResult};
use bytesize::ByteSize;
use colored::Colorize;

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Only errors
    Quiet,
    /// Standard output
    Normal,
    /// All details including per-entry paths
    Verbose,
}

impl OutputMode {
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            OutputMode::Quiet
        } else if verbose > 0 {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }
}

pub fn print_scan_summary(outcome: &ScanOutcome, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    println!(
        "Scanned {} entries: {} files, {}",
        outcome.entries.len().to_string().cyan(),
        outcome.total_files.to_string().cyan(),
        ByteSize(outcome.total_size).to_string().green()
    );

    if !outcome.errors.is_empty() {
        eprintln!(
            "{} {} entries could not be read",
            "[WARNING]".yellow(),
            outcome.errors.len()
        );
        if mode == OutputMode::Verbose {
            for error in &outcome.errors {
                eprintln!("  {error}");
            }
        }
    }
}

pub fn print_plan_summary(plan: &CleanupPlan, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    let stats = plan.stats();
    println!(
        "Plan: {} entries ({} delete, {} review, {} keep), {} total",
        stats.total_entries.to_string().cyan(),
        stats.delete_count.to_string().red(),
        stats.review_count.to_string().yellow(),
        stats.keep_count.to_string().green(),
        ByteSize(stats.total_size).to_string().green()
    );

    let shown = match mode {
        OutputMode::Verbose => plan.entries.len(),
        _ => 10.min(plan.entries.len()),
    };

    for entry in plan.entries.iter().take(shown) {
        let action = match entry.action {
            CleanupAction::Delete => "delete".red(),
            CleanupAction::Review => "review".yellow(),
            CleanupAction::Keep => "keep".green(),
        };
        println!(
            "  {:>10}  {}  {}  ({})",
            ByteSize(entry.size).to_string(),
            action,
            entry.path,
            entry.reason
        );
    }
    if shown < plan.entries.len() {
        println!("  ... and {} more (use -v to see all)", plan.entries.len() - shown);
    }
}

/// Render the verification outcome as a report suitable for a terminal or
/// a file next to the plan.
pub fn render_drift_report(result: &VerificationResult) -> String {
    let mut report = String::new();

    report.push_str("# Plan Verification Report\n\n");
    report.push_str(&format!("Total entries: {}\n", result.total_entries));
    report.push_str(&format!("Verified: {}\n", result.verified));
    report.push_str(&format!("Drifted: {}\n", result.drifted.len()));
    report.push_str(&format!("Missing: {}\n", result.missing.len()));
    report.push_str(&format!(
        "Permission errors: {}\n\n",
        result.permission_errors.len()
    ));

    if result.is_safe_to_execute() {
        report.push_str("[OK] Safe to execute\n\n");
    } else {
        report.push_str("[WARNING] Drift detected, not safe to execute\n\n");
    }

    if !result.missing.is_empty() {
        report.push_str("## Missing\n\n");
        report.push_str("Planned entries that no longer exist:\n\n");
        for path in &result.missing {
            report.push_str(&format!("- {}\n", path.display()));
        }
        report.push('\n');
    }

    if !result.drifted.is_empty() {
        report.push_str("## Drifted\n\n");
        report.push_str("Entries that changed since the plan was created:\n\n");
        for drift in &result.drifted {
            let kind = match drift.drift_type {
                DriftType::SizeMismatch => "size mismatch",
                DriftType::ModificationTimeMismatch => "modification time mismatch",
                DriftType::IdMismatch => "file identity mismatch",
            };
            report.push_str(&format!("- {} ({})\n", drift.path.display(), kind));
            report.push_str(&format!("  expected: {}\n", drift.expected));
            report.push_str(&format!("  actual:   {}\n", drift.actual));
        }
        report.push('\n');
    }

    if !result.permission_errors.is_empty() {
        report.push_str("## Permission warnings\n\n");
        report.push_str("Could not be verified; warnings only, not blockers:\n\n");
        for path in &result.permission_errors {
            report.push_str(&format!("- {}\n", path.display()));
        }
        report.push('\n');
    }

    if !result.is_safe_to_execute() {
        report.push_str("## Next steps\n\n");
        report.push_str("Re-scan to generate a fresh plan, or review the drifted\n");
        report.push_str("entries and update the plan file by hand.\n");
    }

    report
}

pub fn print_verification(result: &VerificationResult, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    if result.is_safe_to_execute() {
        println!(
            "{} {} of {} entries verified, no drift",
            "[OK]".green(),
            result.verified,
            result.total_entries
        );
    } else {
        println!(
            "{} {} drifted, {} missing out of {} entries",
            "[WARNING]".yellow(),
            result.drifted.len(),
            result.missing.len(),
            result.total_entries
        );
    }

    if mode == OutputMode::Verbose {
        print!("{}", render_drift_report(result));
    }
}

pub fn print_execution_summary(result: &ExecutionResult, dry_run: bool, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }

    let summary = &result.summary;
    let freed = ByteSize(summary.space_freed).to_string();

    if dry_run {
        println!(
            "[DRY RUN] {} operations evaluated, {} would be freed",
            summary.total_operations.to_string().cyan(),
            freed.green()
        );
    } else if result.aborted {
        println!(
            "{} aborted after {} operations ({} freed, {} failed, {} skipped)",
            "[WARNING]".yellow(),
            summary.total_operations,
            freed.green(),
            summary.failed,
            summary.skipped
        );
    } else if summary.failed > 0 {
        println!(
            "{} {} done, {} failed, {} skipped, {} freed",
            "[WARNING]".yellow(),
            summary.successful,
            summary.failed.to_string().red(),
            summary.skipped,
            freed.green()
        );
    } else {
        println!(
            "{} {} operations completed, {} freed",
            "[OK]".green(),
            summary.successful,
            freed.green()
        );
    }
}
