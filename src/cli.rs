//! Command line interface: argument definitions and command dispatch.
//!
//! The CLI is a thin consumer of the library pipeline. Destructive commands
//! verify the plan against the live filesystem first and refuse to run on
//! drift unless explicitly told otherwise.

use crate::config::Config;
use crate::executor::{ExecOptions, ExecutionMode, Executor, PromptResponse};
use crate::output::{self, OutputMode};
use crate::plan::{CleanupEntry, CleanupPlan};
use crate::planner::PlanGenerator;
use crate::progress;
use crate::scanner::{ScanOptions, Scanner};
use crate::transaction::{TransactionLogger, TransactionOptions};
use crate::utils;
use crate::verifier::{Verifier, VerifyOptions};
use anyhow::{bail, Context, Result};
use bytesize::ByteSize;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "reclaim")]
#[command(version)]
#[command(about = "Plan-based disk cleanup with drift checking and an audit trail")]
#[command(
    long_about = "Reclaim separates finding junk from deleting it. `plan` scans a tree \
    and writes a reviewable TOML plan; after you edit the plan's actions, `verify` \
    confirms nothing changed underneath it, and `execute` performs the approved \
    deletions while writing a transaction log.\n\n\
    Examples:\n  \
    reclaim plan ~/projects -o cleanup-plan.toml\n  \
    reclaim verify cleanup-plan.toml\n  \
    reclaim execute cleanup-plan.toml --dry-run\n  \
    reclaim execute cleanup-plan.toml -y --backup-dir ~/cleanup-backup"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity (-v for per-entry detail)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a directory tree and report what is there
    Scan {
        /// Root directory to scan
        path: PathBuf,

        /// Maximum directory depth below the root
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Do not prune dot-prefixed entries
        #[arg(long)]
        include_hidden: bool,

        /// Follow symbolic links (off by default, cycles are on you)
        #[arg(long)]
        follow_symlinks: bool,

        /// Worker threads (0 = one per core)
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
    },

    /// Scan, classify, and write a cleanup plan for review
    Plan {
        /// Root directory to scan
        path: PathBuf,

        /// Where to write the plan
        #[arg(short = 'o', long, default_value = "cleanup-plan.toml", value_name = "FILE")]
        output: PathBuf,

        /// Large file threshold (e.g. 500MB, 2GB)
        #[arg(long, value_name = "SIZE")]
        threshold: Option<String>,

        /// Maximum directory depth below the root
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Do not prune dot-prefixed entries
        #[arg(long)]
        include_hidden: bool,

        /// Worker threads (0 = one per core)
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
    },

    /// Print statistics for an existing plan
    Stats {
        /// Plan file
        plan: PathBuf,
    },

    /// Check a plan against the current filesystem state
    Verify {
        /// Plan file
        plan: PathBuf,

        /// Stop at the first drifted or missing entry
        #[arg(long)]
        fail_fast: bool,

        /// Skip modification time comparison
        #[arg(long)]
        no_mtime: bool,

        /// Skip size comparison
        #[arg(long)]
        no_size: bool,

        /// Also write the full report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Execute a plan's delete entries
    Execute {
        /// Plan file
        plan: PathBuf,

        /// Evaluate everything, delete nothing
        #[arg(long)]
        dry_run: bool,

        /// Confirm each deletion on the terminal
        #[arg(short = 'i', long, conflicts_with = "yes")]
        interactive: bool,

        /// Run unattended
        #[arg(short = 'y', long)]
        yes: bool,

        /// Move entries here instead of deleting them
        #[arg(long, value_name = "DIR")]
        backup_dir: Option<PathBuf>,

        /// Send entries to the platform trash instead of deleting them
        #[arg(long)]
        recycle_bin: bool,

        /// Stop after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Delete in parallel batches
        #[arg(long)]
        parallel: bool,

        /// Entries per parallel batch
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,

        /// Skip the pre-execution drift check (not recommended)
        #[arg(long)]
        skip_verify: bool,

        /// Where to write the transaction log
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let mode = OutputMode::from_flags(self.quiet, self.verbose);
        let config = Config::load().context("failed to load configuration")?;

        match self.command {
            Commands::Scan {
                path,
                max_depth,
                include_hidden,
                follow_symlinks,
                threads,
            } => cmd_scan(
                &config,
                &path,
                max_depth,
                include_hidden,
                follow_symlinks,
                threads,
                mode,
            ),
            Commands::Plan {
                path,
                output,
                threshold,
                max_depth,
                include_hidden,
                threads,
            } => cmd_plan(
                &config,
                &path,
                &output,
                threshold,
                max_depth,
                include_hidden,
                threads,
                mode,
            ),
            Commands::Stats { plan } => cmd_stats(&plan),
            Commands::Verify {
                plan,
                fail_fast,
                no_mtime,
                no_size,
                report,
            } => cmd_verify(&config, &plan, fail_fast, no_mtime, no_size, report, mode),
            Commands::Execute {
                plan,
                dry_run,
                interactive,
                yes,
                backup_dir,
                recycle_bin,
                fail_fast,
                parallel,
                batch_size,
                skip_verify,
                log,
            } => cmd_execute(
                &config,
                &plan,
                ExecuteFlags {
                    dry_run,
                    interactive,
                    yes,
                    backup_dir,
                    recycle_bin,
                    fail_fast,
                    parallel,
                    batch_size,
                    skip_verify,
                    log,
                },
                mode,
            ),
        }
    }
}

fn scan_options(
    config: &Config,
    max_depth: Option<usize>,
    include_hidden: bool,
    follow_symlinks: bool,
    threads: Option<usize>,
) -> ScanOptions {
    let mut options = ScanOptions::from(&config.scanner);
    if let Some(depth) = max_depth {
        options.max_depth = Some(depth);
    }
    if include_hidden {
        options.skip_hidden = false;
    }
    if follow_symlinks {
        options.follow_symlinks = true;
    }
    if let Some(n) = threads {
        options.thread_count = n;
    }
    options
}

fn cmd_scan(
    config: &Config,
    path: &Path,
    max_depth: Option<usize>,
    include_hidden: bool,
    follow_symlinks: bool,
    threads: Option<usize>,
    mode: OutputMode,
) -> Result<()> {
    let options = scan_options(config, max_depth, include_hidden, follow_symlinks, threads);
    let scanner = Scanner::new(options)?;

    let spinner = (mode != OutputMode::Quiet).then(|| progress::create_spinner("Scanning..."));
    let outcome = scanner.scan(path)?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    output::print_scan_summary(&outcome, mode);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_plan(
    config: &Config,
    path: &Path,
    output_path: &Path,
    threshold: Option<String>,
    max_depth: Option<usize>,
    include_hidden: bool,
    threads: Option<usize>,
    mode: OutputMode,
) -> Result<()> {
    let base_path = path
        .canonicalize()
        .with_context(|| format!("cannot resolve scan root: {}", path.display()))?;

    let mut rules = config.rules.clone();
    if let Some(text) = threshold {
        let bytes = text
            .parse::<ByteSize>()
            .map_err(|e| anyhow::anyhow!("invalid threshold {text:?}: {e}"))?
            .as_u64();
        rules.size_threshold_mb = (bytes / 1_048_576).max(1);
    }

    let options = scan_options(config, max_depth, include_hidden, false, threads);
    let scanner = Scanner::new(options)?;

    let spinner = (mode != OutputMode::Quiet).then(|| progress::create_spinner("Scanning..."));
    let outcome = scanner.scan(&base_path)?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    output::print_scan_summary(&outcome, mode);

    let engine = rules.build_engine();
    let mut detections = engine.analyze(&outcome.entries);

    let matcher = config.exclusions.matcher()?;
    if !config.exclusions.patterns.is_empty() {
        detections.retain(|d| !matcher.is_match(&d.entry.path));
    }

    let plan = PlanGenerator::new(base_path).generate(detections);
    plan.save(output_path)
        .with_context(|| format!("failed to write plan to {}", output_path.display()))?;

    output::print_plan_summary(&plan, mode);
    if mode != OutputMode::Quiet {
        println!(
            "Plan written to {}. Review it, adjust the action fields, then run `reclaim verify`.",
            output_path.display().to_string().cyan()
        );
    }
    Ok(())
}

fn cmd_stats(plan_path: &Path) -> Result<()> {
    let plan = CleanupPlan::load(plan_path)
        .with_context(|| format!("failed to load plan {}", plan_path.display()))?;
    let stats = plan.stats();

    println!("Plan:           {}", plan_path.display());
    println!("Created:        {}", plan.created_at.to_rfc3339());
    println!("Base path:      {}", plan.base_path.display());
    println!("Total entries:  {}", stats.total_entries);
    println!("  delete:       {}", stats.delete_count);
    println!("  review:       {}", stats.review_count);
    println!("  keep:         {}", stats.keep_count);
    println!("Total size:     {}", ByteSize(stats.total_size));
    Ok(())
}

fn cmd_verify(
    config: &Config,
    plan_path: &Path,
    fail_fast: bool,
    no_mtime: bool,
    no_size: bool,
    report: Option<PathBuf>,
    mode: OutputMode,
) -> Result<()> {
    let plan = CleanupPlan::load(plan_path)
        .with_context(|| format!("failed to load plan {}", plan_path.display()))?;

    let mut options = VerifyOptions::from(&config.verifier);
    if fail_fast {
        options.fail_fast = true;
    }
    if no_mtime {
        options.check_mtime = false;
    }
    if no_size {
        options.check_size = false;
    }

    let result = Verifier::new(options).verify(&plan)?;
    output::print_verification(&result, mode);

    if let Some(report_path) = report {
        utils::write_atomic(&report_path, &output::render_drift_report(&result))
            .with_context(|| format!("failed to write report to {}", report_path.display()))?;
        if mode != OutputMode::Quiet {
            println!("Report written to {}", report_path.display());
        }
    }

    if !result.is_safe_to_execute() {
        bail!("plan is not safe to execute: drift detected");
    }
    Ok(())
}

struct ExecuteFlags {
    dry_run: bool,
    interactive: bool,
    yes: bool,
    backup_dir: Option<PathBuf>,
    recycle_bin: bool,
    fail_fast: bool,
    parallel: bool,
    batch_size: Option<usize>,
    skip_verify: bool,
    log: Option<PathBuf>,
}

fn cmd_execute(
    config: &Config,
    plan_path: &Path,
    flags: ExecuteFlags,
    mode: OutputMode,
) -> Result<()> {
    let plan = CleanupPlan::load(plan_path)
        .with_context(|| format!("failed to load plan {}", plan_path.display()))?;

    // The drift check is the only gate between an edited plan and real
    // deletions. Skipping it is a deliberate, flagged decision.
    if flags.skip_verify {
        if mode != OutputMode::Quiet {
            eprintln!(
                "{} skipping verification at your request",
                "[WARNING]".yellow()
            );
        }
    } else {
        let result = Verifier::new(VerifyOptions::from(&config.verifier)).verify(&plan)?;
        output::print_verification(&result, mode);
        if !result.is_safe_to_execute() {
            bail!(
                "plan is not safe to execute: drift detected; re-scan to generate \
                 a fresh plan, or pass --skip-verify to override"
            );
        }
    }

    let exec_mode = if flags.dry_run {
        ExecutionMode::DryRun
    } else if flags.interactive {
        ExecutionMode::Interactive
    } else if flags.yes {
        ExecutionMode::Batch
    } else {
        if mode != OutputMode::Quiet {
            println!("No mode selected; defaulting to a dry run. Pass -y to delete.");
        }
        ExecutionMode::DryRun
    };

    let mut options = config.executor.to_exec_options(exec_mode);
    if let Some(dir) = flags.backup_dir {
        options.backup_dir = Some(dir);
    }
    if flags.recycle_bin {
        options.use_recycle_bin = true;
    }
    if flags.fail_fast {
        options.fail_fast = true;
    }
    if flags.parallel {
        options.parallel = true;
    }
    if let Some(n) = flags.batch_size {
        options.batch_size = n;
    }

    let log_path = flags
        .log
        .unwrap_or_else(|| default_log_path(plan_path));
    let mut logger = TransactionLogger::new(
        plan_path,
        log_path.clone(),
        options.mode.as_str(),
        TransactionOptions {
            dry_run: options.mode == ExecutionMode::DryRun,
            backup_dir: options.backup_dir.clone(),
            use_recycle_bin: options.use_recycle_bin,
            fail_fast: options.fail_fast,
        },
    );

    let mut executor = Executor::new(options.clone());
    if options.mode == ExecutionMode::Interactive {
        executor = executor.with_prompt(Box::new(stdin_prompt));
    }

    let result = executor.execute(&plan, &mut logger)?;

    output::print_execution_summary(&result, options.mode == ExecutionMode::DryRun, mode);
    if mode != OutputMode::Quiet {
        println!("Transaction log: {}", log_path.display());
    }
    Ok(())
}

/// `cleanup-plan.toml` gets its log next to it as `cleanup-plan.log.json`.
fn default_log_path(plan_path: &Path) -> PathBuf {
    plan_path.with_extension("log.json")
}

/// Terminal prompt for interactive execution. Declines on unrecognized
/// input; a closed stdin reads as abort, since nobody is left to approve.
fn stdin_prompt(entry: &CleanupEntry) -> io::Result<PromptResponse> {
    println!();
    println!("  path:   {}", entry.path);
    println!("  size:   {}", ByteSize(entry.size));
    println!("  reason: {}", entry.reason);
    print!("Delete this entry? [y]es / [n]o / [a]bort: ");
    io::stdout().flush()?;

    let mut input = String::new();
    let bytes_read = io::stdin().lock().read_line(&mut input)?;
    if bytes_read == 0 {
        return Ok(PromptResponse::Abort);
    }

    Ok(match input.trim().to_lowercase().as_str() {
        "y" | "yes" => PromptResponse::Accept,
        "a" | "abort" | "q" | "quit" => PromptResponse::Abort,
        _ => PromptResponse::Decline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_log_path_sits_next_to_plan() {
        assert_eq!(
            default_log_path(Path::new("/tmp/cleanup-plan.toml")),
            PathBuf::from("/tmp/cleanup-plan.log.json")
        );
    }

    #[test]
    fn test_parse_execute_flags() {
        let cli = Cli::parse_from([
            "reclaim",
            "execute",
            "plan.toml",
            "-y",
            "--parallel",
            "--batch-size",
            "10",
        ]);
        match cli.command {
            Commands::Execute {
                yes,
                parallel,
                batch_size,
                dry_run,
                ..
            } => {
                assert!(yes);
                assert!(parallel);
                assert_eq!(batch_size, Some(10));
                assert!(!dry_run);
            }
            _ => panic!("expected execute command"),
        }
    }

    #[test]
    fn test_interactive_conflicts_with_yes() {
        let result = Cli::try_parse_from(["reclaim", "execute", "plan.toml", "-i", "-y"]);
        assert!(result.is_err());
    }
}
