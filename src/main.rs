use anyhow::{Context, Result};
use callchain_splicer::config::{
    load_from_path, RuleConfig, DEFAULT_SUCCESS_MESSAGE, DEFAULT_TARGET,
};
use callchain_splicer::driver::{run_with, RunOptions, RunReport};
use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "callchain-splicer")]
#[command(
    about = "Insert a fixed fragment after every anchor/landing call chain",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// File to rewrite, relative to the working directory
    /// (default: the rule file's target, then bridge1024.ts)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// TOML rule file (default: built-in compute budget rule)
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Dry run - show what would be changed without modifying the file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Insert the fragment even where it is already present
    #[arg(long)]
    allow_duplicates: bool,

    /// Report every match
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.rules {
        Some(path) => load_from_path(path)?,
        None => RuleConfig::builtin(),
    };

    let target = cli
        .file
        .clone()
        .or_else(|| config.meta.target.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET));

    let options = RunOptions::new(&target)
        .config(config)
        .dry_run(cli.dry_run)
        .allow_duplicates(cli.allow_duplicates);

    let report =
        run_with(&options).with_context(|| format!("failed to rewrite {}", target.display()))?;

    if cli.dry_run {
        println!("{}", "[DRY RUN - no files written]".cyan());
    }

    if cli.verbose {
        print_rule_reports(&report);
    }

    if cli.diff && !report.is_unchanged() {
        display_diff(&report.path, &report.original, &report.rewritten);
    }

    if cli.rules.is_some() {
        println!(
            "Applied {} rule(s) to {}",
            report.rules.len(),
            report.path.display()
        );
    } else {
        println!("{}", DEFAULT_SUCCESS_MESSAGE);
    }

    Ok(())
}

fn print_rule_reports(report: &RunReport) {
    for rule in &report.rules {
        if rule.matches.is_empty() {
            println!("{} {}: No matches", "⊘".cyan(), rule.id);
            continue;
        }

        println!(
            "{} {}: {} inserted, {} already applied",
            "✓".green(),
            rule.id,
            rule.applied,
            rule.already_applied
        );
        for (m, line) in rule.matches.iter().zip(&rule.lines) {
            println!(
                "  {}",
                format!("line {} bytes [{}, {})", line, m.start, m.end).dimmed()
            );
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} inserted", format!("{}", report.total_applied()).green());
    println!(
        "  {} already applied",
        format!("{}", report.total_already_applied()).yellow()
    );
}

/// Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            println!("{}", "...".dimmed());
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let line = match change.tag() {
                    ChangeTag::Delete => format!("-{}", change).red(),
                    ChangeTag::Insert => format!("+{}", change).green(),
                    ChangeTag::Equal => format!(" {}", change).normal(),
                };
                print!("{}", line);
                if change.missing_newline() {
                    println!();
                }
            }
        }
    }
}
