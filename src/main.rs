use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use file_surgery::batch::{load_batch, run_batch, BatchReport};
use file_surgery::config;
use file_surgery::operation::OperationType;
use file_surgery::snapshot::Snapshot;
use file_surgery::surgery::{OperationResult, Surgeon, SurgeryOptions};
use similar::{ChangeTag, TextDiff};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "file-surgery")]
#[command(about = "Pattern-based file edits with automatic backup and rollback", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file [default: $FILE_SURGERY_CONFIG, then ~/.file-surgery/config.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backup directory (overrides config and FILE_SURGERY_BACKUP_DIR)
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Show unified diff of changes
    #[arg(short, long, global = true)]
    diff: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a file
    Create {
        file: PathBuf,
        /// Content, or `-` for stdin
        content: String,
        /// Replace the file if it exists
        #[arg(long)]
        overwrite: bool,
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Replace a pattern
    Replace {
        file: PathBuf,
        pattern: String,
        /// Replacement, or `-` for stdin
        content: String,
        #[command(flatten)]
        matching: MatchArgs,
        /// Replace every occurrence
        #[arg(long)]
        all: bool,
        /// Upper bound for --all
        #[arg(long, requires = "all")]
        max: Option<usize>,
    },

    /// Insert lines before the line holding a pattern
    Before {
        file: PathBuf,
        pattern: String,
        content: String,
        #[command(flatten)]
        matching: MatchArgs,
    },

    /// Insert lines after the last line of a match
    After {
        file: PathBuf,
        pattern: String,
        content: String,
        #[command(flatten)]
        matching: MatchArgs,
    },

    /// Append lines to the end of a file
    Append {
        file: PathBuf,
        content: String,
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Run operations from a JSON or TOML batch file
    Batch { file: PathBuf },

    /// Inspect and manage backups
    Backups {
        #[command(subcommand)]
        command: BackupCommands,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List backups, newest first
    List {
        /// Glob over the original file name
        pattern: Option<String>,
    },

    /// Prune backups
    Cleanup {
        /// Glob over the original file name
        #[arg(long)]
        pattern: Option<String>,
        /// Remove backups older than this many days
        #[arg(long)]
        max_age_days: Option<u64>,
        /// Keep at most this many backups per file
        #[arg(long)]
        max_count: Option<usize>,
        /// Keep total backup size under this many bytes
        #[arg(long)]
        max_bytes: Option<u64>,
    },

    /// Restore the newest backup of a file
    Restore {
        file: PathBuf,
        /// Only consider backups taken by this operation
        #[arg(long)]
        operation: Option<OperationType>,
        /// Do not back up the current state first
        #[arg(long)]
        no_snapshot: bool,
    },
}

#[derive(Args)]
struct MatchArgs {
    #[arg(short = 'i', long)]
    ignore_case: bool,
    #[arg(short = 'w', long)]
    whole_word: bool,
    /// Treat the pattern as a regular expression
    #[arg(short, long)]
    regex: bool,
    /// Ignore whitespace differences
    #[arg(short, long)]
    flexible: bool,
    /// Match across line breaks
    #[arg(short, long)]
    multiline: bool,
    /// ast-grep pattern (e.g. `fn $NAME() { $$$BODY }`)
    #[arg(short, long)]
    structural: bool,
    /// 1-based occurrence to act on
    #[arg(short, long)]
    occurrence: Option<usize>,
    /// Language for structural matching and validation
    #[arg(short, long)]
    language: Option<String>,
    #[arg(short = 'n', long)]
    dry_run: bool,
}

impl MatchArgs {
    fn apply(self, mut options: SurgeryOptions) -> SurgeryOptions {
        if self.ignore_case {
            options.matching.case_sensitive = false;
        }
        options.matching.whole_word = self.whole_word;
        options.matching.regex = self.regex;
        options.matching.flexible = self.flexible;
        options.matching.multiline = self.multiline;
        options.matching.structural = self.structural;
        options.occurrence = self.occurrence;
        options.language = self.language;
        options.dry_run = self.dry_run;
        options
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = config::resolve(cli.config.as_deref())?;
    if let Some(dir) = &cli.backup_dir {
        config = config.with_backup_dir(dir);
    }
    let surgeon = Surgeon::new(config);
    let output = Output {
        json: cli.json,
        diff: cli.diff,
    };

    match cli.command {
        Commands::Create {
            file,
            content,
            overwrite,
            dry_run,
        } => {
            let mut options = surgeon.default_options();
            options.overwrite = overwrite;
            options.dry_run = dry_run;
            let result = surgeon.create(&file, &read_content(&content)?, &options);
            output.finish(&result)
        }
        Commands::Replace {
            file,
            pattern,
            content,
            matching,
            all,
            max,
        } => {
            let mut options = matching.apply(surgeon.default_options());
            options.replace_all = all;
            options.max_replacements = max;
            let result = surgeon.replace(&file, &pattern, &read_content(&content)?, &options);
            output.finish(&result)
        }
        Commands::Before {
            file,
            pattern,
            content,
            matching,
        } => {
            let options = matching.apply(surgeon.default_options());
            let result = surgeon.insert_before(&file, &pattern, &read_content(&content)?, &options);
            output.finish(&result)
        }
        Commands::After {
            file,
            pattern,
            content,
            matching,
        } => {
            let options = matching.apply(surgeon.default_options());
            let result = surgeon.insert_after(&file, &pattern, &read_content(&content)?, &options);
            output.finish(&result)
        }
        Commands::Append {
            file,
            content,
            dry_run,
        } => {
            let mut options = surgeon.default_options();
            options.dry_run = dry_run;
            let result = surgeon.append(&file, &read_content(&content)?, &options);
            output.finish(&result)
        }
        Commands::Batch { file } => {
            let entries = load_batch(&file)?;
            let report = run_batch(&surgeon, entries);
            output.finish_batch(&report)
        }
        Commands::Backups { command } => cmd_backups(&surgeon, command, &output),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("file_surgery=info"),
        _ => EnvFilter::new("file_surgery=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `-` reads stdin; anything else is the literal content.
fn read_content(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read content from stdin")?;
    Ok(buf)
}

struct Output {
    json: bool,
    diff: bool,
}

impl Output {
    fn finish(&self, result: &OperationResult) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(result)?);
        } else {
            self.print_result(result);
        }
        if !result.success {
            std::process::exit(1);
        }
        Ok(())
    }

    fn finish_batch(&self, report: &BatchReport) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            for entry in &report.entries {
                match (&entry.result, &entry.error) {
                    (Some(result), _) => self.print_result(result),
                    (None, Some(error)) => {
                        eprintln!("{} entry {}: {}", "✗".red(), entry.index, error)
                    }
                    (None, None) => {}
                }
            }
            println!("\n{}", "Summary:".bold());
            println!("  {} succeeded", format!("{}", report.succeeded).green());
            println!("  {} failed", format!("{}", report.failed).red());
        }
        if !report.all_succeeded() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_result(&self, result: &OperationResult) {
        if result.success {
            println!("{} {}", "✓".green(), result.message);
        } else {
            eprintln!("{} {}", "✗".red(), result.message);
            if let Some(kind) = result.error_kind {
                eprintln!("  {}", format!("[{kind}] state: {}", result.state).dimmed());
            }
        }

        for warning in &result.warnings {
            println!("  {} {}", "warning:".yellow(), warning);
        }
        for suggestion in &result.suggestions {
            println!("  {} {}", "hint:".cyan(), suggestion);
        }
        if let Some(snapshot) = &result.snapshot {
            println!(
                "  {}",
                format!("backup: {}", snapshot.backup_path.display()).dimmed()
            );
        }

        if self.diff && result.success {
            if let (Some(before), Some(after)) = (&result.original, &result.content) {
                if before != after {
                    display_diff(&result.file, before, after);
                }
            }
        }
    }
}

/// Unified diff between original and modified content.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (modified)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        println!("{}", format!("{}", hunk.header()).cyan());
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{change}").red(),
                ChangeTag::Insert => format!("+{change}").green(),
                ChangeTag::Equal => format!(" {change}").normal(),
            };
            print!("{line}");
            if change.missing_newline() {
                println!();
            }
        }
    }
}

fn cmd_backups(surgeon: &Surgeon, command: BackupCommands, output: &Output) -> Result<()> {
    let manager = surgeon.snapshots();
    match command {
        BackupCommands::List { pattern } => {
            let snapshots = manager.list_snapshots(pattern.as_deref())?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&snapshots)?);
            } else if snapshots.is_empty() {
                println!("No backups in {}", manager.backup_dir().display());
            } else {
                for snapshot in &snapshots {
                    print_snapshot(snapshot);
                }
            }
        }
        BackupCommands::Cleanup {
            pattern,
            max_age_days,
            max_count,
            max_bytes,
        } => {
            let max_age = max_age_days.map(|d| Duration::from_secs(d * 24 * 60 * 60));
            let mut removed = manager.cleanup_old_snapshots(pattern.as_deref(), max_age, max_count)?;
            if let Some(max_bytes) = max_bytes {
                removed.extend(manager.cleanup_by_size(pattern.as_deref(), max_bytes)?);
            }
            if output.json {
                println!("{}", serde_json::to_string_pretty(&removed)?);
            } else {
                println!("Removed {} backup(s)", removed.len());
                for snapshot in &removed {
                    print_snapshot(snapshot);
                }
            }
        }
        BackupCommands::Restore {
            file,
            operation,
            no_snapshot,
        } => {
            let outcome = manager.restore_latest(&file, operation, !no_snapshot)?;
            if output.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "restored": outcome.restored,
                        "pre_restore": outcome.pre_restore,
                    })
                );
            } else {
                println!(
                    "{} restored {} from {}",
                    "✓".green(),
                    file.display(),
                    outcome.restored.id
                );
                if let Some(pre) = &outcome.pre_restore {
                    println!(
                        "  {}",
                        format!("previous state saved as {}", pre.id).dimmed()
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "{}  {:<12} {:>8} B  {}",
        snapshot.created_at.format("%Y-%m-%d %H:%M:%S"),
        snapshot.operation.to_string(),
        snapshot.size_bytes,
        snapshot.source_name
    );
}
