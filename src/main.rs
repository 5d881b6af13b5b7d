use anyhow::Result;
use cap_patcher::report::DEFAULT_REPORT_FILE;
use cap_patcher::{load_from_path, run, DiscoveryConfig, FileDiff, Profile, Report, RunConfig};
use cap_patcher::{RunError, RunSummary};
use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cap-patcher")]
#[command(about = "Override hard-coded capability values in a native source tree", long_about = None)]
#[command(version)]
struct Cli {
    /// Root of the source tree to patch
    root: PathBuf,

    /// Profile: base, extended or full (unknown names fall back to base)
    #[arg(short, long, default_value = "extended")]
    profile: String,

    /// Leave vendor/device identity fields untouched
    #[arg(long, visible_alias = "no-gpu")]
    no_identity: bool,

    /// Dry run - report what would change without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Verbose diagnostic logging
    #[arg(short, long)]
    verbose: bool,

    /// Write a JSON report of the run
    #[arg(long)]
    report: bool,

    /// Report destination (implies --report)
    #[arg(long, value_name = "FILE")]
    report_path: Option<PathBuf>,

    /// TOML file overriding discovery settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cmd_apply(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

/// Returns whether the run finished without errors.
fn cmd_apply(cli: Cli) -> Result<bool> {
    let discovery = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => DiscoveryConfig::default(),
    };

    let profile = Profile::resolve(&cli.profile);
    if Profile::from_name(&cli.profile).is_none() {
        tracing::warn!("unknown profile `{}`, using {}", cli.profile, profile);
    }

    let config = RunConfig::new(profile)
        .identity_override(!cli.no_identity)
        .dry_run(cli.dry_run)
        .capture_diffs(cli.diff)
        .discovery(discovery);

    let summary = match run(&cli.root, &config) {
        Ok(summary) => summary,
        Err(RunError::RootNotFound(path)) => {
            eprintln!(
                "{} {}",
                "Source root not found:".red(),
                path.display()
            );
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    print_summary(&summary);

    if cli.diff {
        for diff in &summary.diffs {
            display_diff(diff);
        }
    }

    if cli.report || cli.report_path.is_some() {
        let path = cli
            .report_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_FILE));
        Report::from_summary(&summary).write_to(&path)?;
        println!("Report: {}", path.display());
    }

    Ok(summary.is_success())
}

fn print_summary(summary: &RunSummary) {
    println!("Root: {}", summary.root.display());
    println!("Target: {}", summary.target.display());
    println!("Profile: {}", summary.profile);
    println!(
        "Identity override: {}",
        if summary.identity_override { "on" } else { "off" }
    );
    if summary.dry_run {
        println!("{}", "[DRY RUN - no files will be modified]".cyan());
    }
    println!();

    for record in &summary.files {
        let rules: Vec<String> = record
            .changes
            .iter()
            .map(|c| format!("{}x{}", c.rule_id, c.match_count))
            .collect();
        println!(
            "{} {}: {}",
            "✓".green(),
            record.full_path.display(),
            rules.join(", ")
        );
    }

    let stats = &summary.stats;
    for error in &stats.errors {
        eprintln!("{} {}", "✗".red(), error);
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} capability files", summary.capability_files.len());
    println!("  {} source files", summary.source_files);
    println!("  {} applied", format!("{}", stats.applied).green());
    println!("  {} skipped", format!("{}", stats.skipped).cyan());
    println!("  {} failed", format!("{}", stats.failed).red());
    println!("  {} errors", format!("{}", stats.errors.len()).red());
}

fn display_diff(diff: &FileDiff) {
    println!(
        "\n{}",
        format!("--- {} (original)", diff.path.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", diff.path.display()).dimmed());

    let text_diff = TextDiff::from_lines(&diff.before, &diff.after);

    for op in text_diff.ops() {
        for change in text_diff.iter_changes(op) {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => continue,
            };
            print!("{}", line);
        }
    }
}
