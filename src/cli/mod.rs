//! # CLI Module
//!
//! Command-line interface for the photo sieve.
//!
//! ## Usage
//! ```bash
//! # Sort a folder: copy to cache, deduplicate, split by size, clean up
//! photo-sieve filter ~/Pictures/inbox
//!
//! # Also re-encode into JPEG/PNG, with a 1 MB tier boundary
//! photo-sieve filter ~/Pictures/inbox --by-mode --quality-kb 1024
//!
//! # JSON report
//! photo-sieve filter ~/Pictures/inbox --output json
//!
//! # Directory utilities
//! photo-sieve merge ./a ./b --dst ./merged
//! photo-sieve extract ./merged --dst ./flat --target-dir all
//! photo-sieve delete ./merged
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_sieve::config::{
    default_extract_dir, default_merge_dir, default_workers, parse_quality_boundary, StageFlags,
    DEFAULT_QUALITY_BOUNDARY_KB,
};
use photo_sieve::core::report::{RunReport, StageDetails, StageReport};
use photo_sieve::error::Result;
use photo_sieve::service::{FilterRequest, Service};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// How often the progress bar polls the service
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Photo Sieve - sort, deduplicate and tidy folders of images
#[derive(Parser, Debug)]
#[command(name = "photo-sieve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, default_value = "pretty", global = true)]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the filter pipeline over a directory
    Filter {
        /// Directory holding the images to sort
        source: PathBuf,

        /// Working directory for intermediate files
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Output root
        #[arg(short, long)]
        dst: Option<PathBuf>,

        /// Worker threads per stage (defaults to the number of CPUs)
        #[arg(short, long)]
        workers: Option<String>,

        /// Tier boundary in KB; files at or above it count as high quality
        #[arg(short, long, default_value_t = DEFAULT_QUALITY_BOUNDARY_KB.to_string())]
        quality_kb: String,

        /// Re-encode into JPEG/PNG and keep the formats apart
        #[arg(long)]
        by_mode: bool,

        /// Skip the quality split and move files straight to the output
        #[arg(long)]
        no_quality: bool,

        /// Keep content-identical copies
        #[arg(long)]
        keep_duplicates: bool,

        /// Leave the cache directory as it is
        #[arg(long)]
        keep_cache: bool,
    },

    /// Merge two directory trees, renaming clashing files
    Merge {
        first: PathBuf,
        second: PathBuf,

        /// Destination directory
        #[arg(short, long)]
        dst: Option<PathBuf>,
    },

    /// Move every file of a tree into one directory
    Extract {
        source: PathBuf,

        /// Destination directory
        #[arg(short, long)]
        dst: Option<PathBuf>,

        /// Subdirectory of the destination to extract into
        #[arg(short, long)]
        target_dir: Option<String>,
    },

    /// Remove empty subdirectories (or all of them with --all)
    Delete {
        target: PathBuf,

        /// Remove every subdirectory with its contents, not just empty ones
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    photo_sieve::init_tracing(if cli.verbose { "debug" } else { "info" });

    let term = Term::stderr();
    let pretty = cli.output == OutputFormat::Pretty;
    let service = Service::new();

    match cli.command {
        Commands::Filter {
            source,
            cache,
            dst,
            workers,
            quality_kb,
            by_mode,
            no_quality,
            keep_duplicates,
            keep_cache,
        } => {
            let request = FilterRequest {
                source,
                cache_dir: cache,
                output_dir: dst,
                workers: workers.unwrap_or_else(|| default_workers().to_string()),
                quality_boundary_kb: Some(parse_quality_boundary(&quality_kb)?),
                flags: StageFlags {
                    by_mode,
                    by_quality: !no_quality,
                    clear_duplicate: !keep_duplicates,
                    clear_cache: !keep_cache,
                },
            };
            if pretty {
                print_header(&term);
            }
            let report = drive(&service, pretty, move |service| service.start_filter(request));
            match cli.output {
                OutputFormat::Pretty => print_run_report(&term, &report, cli.verbose),
                OutputFormat::Json => print_json(&report),
            }
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Merge { first, second, dst } => {
            let dst = dst.unwrap_or_else(default_merge_dir);
            let report = drive(&service, pretty, move |service| {
                service.start_merge(&first, &second, &dst)
            })?;
            match cli.output {
                OutputFormat::Pretty => {
                    term.write_line(&format!(
                        "{} merged {} files ({} renamed) in {:.2}s",
                        style("✓").green().bold(),
                        style(report.copied).cyan(),
                        style(report.renamed).yellow(),
                        report.cost_time.as_secs_f64()
                    ))
                    .ok();
                }
                OutputFormat::Json => print_json(&report),
            }
        }
        Commands::Extract {
            source,
            dst,
            target_dir,
        } => {
            let dst = dst.unwrap_or_else(default_extract_dir);
            let report = drive(&service, pretty, move |service| {
                service.start_extract(&source, &dst, target_dir.as_deref())
            })?;
            match cli.output {
                OutputFormat::Pretty => {
                    term.write_line(&format!(
                        "{} extracted {} files ({} renamed) in {:.2}s",
                        style("✓").green().bold(),
                        style(report.moved).cyan(),
                        style(report.renamed).yellow(),
                        report.cost_time.as_secs_f64()
                    ))
                    .ok();
                }
                OutputFormat::Json => print_json(&report),
            }
        }
        Commands::Delete { target, all } => {
            let report = service.start_delete(&target, !all)?;
            match cli.output {
                OutputFormat::Pretty => {
                    term.write_line(&format!(
                        "{} removed {} directories",
                        style("✓").green().bold(),
                        style(report.removed_dirs).cyan()
                    ))
                    .ok();
                }
                OutputFormat::Json => print_json(&report),
            }
        }
    }

    Ok(())
}

/// Run `job` on a background thread, polling the service's progress onto a
/// progress bar until it finishes
fn drive<T, F>(service: &Service, pretty: bool, job: F) -> T
where
    T: Send + 'static,
    F: FnOnce(Service) -> T + Send + 'static,
{
    let worker = service.clone();
    let handle = thread::spawn(move || job(worker));

    let progress = pretty.then(|| {
        let pb = ProgressBar::new(0);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("█▓░"));
        }
        pb
    });

    while !handle.is_finished() {
        if let Some(pb) = &progress {
            let snapshot = service.get_result();
            pb.set_length(snapshot.total_jobs as u64);
            pb.set_position(snapshot.processed as u64);
            pb.set_message(format!("{} {}", snapshot.current_task, snapshot.current_job));
        }
        thread::sleep(POLL_INTERVAL);
    }

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Photo Sieve").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn print_run_report(term: &Term, report: &RunReport, verbose: bool) {
    if let Some(error) = &report.error {
        term.write_line(&format!("{} {}", style("✗").red().bold(), style(error).red()))
            .ok();
        return;
    }

    for stage in &report.stages {
        term.write_line(&format!(
            "  {:<18} {:>5} files  {:>7.2}s  {}",
            style(stage.stage.label()).bold(),
            stage.processed,
            stage.cost_time.as_secs_f64(),
            describe(stage)
        ))
        .ok();
        if verbose {
            for failure in &stage.errors {
                term.write_line(&format!(
                    "      {} {}: {}",
                    style("!").yellow(),
                    failure.path.display(),
                    style(&failure.message).dim()
                ))
                .ok();
            }
        }
    }

    term.write_line("").ok();
    let mark = if report.cancelled {
        style("⏹").yellow().bold()
    } else {
        style("✓").green().bold()
    };
    term.write_line(&format!(
        "{} {} duplicates removed, {} reclaimed, {} errors in {:.2}s",
        mark,
        style(report.duplicates_removed()).cyan(),
        style(format_bytes(report.reclaimed_bytes())).yellow(),
        style(report.error_count()).red(),
        report.cost_time.as_secs_f64()
    ))
    .ok();
    if report.cancelled {
        term.write_line(&style("Run was cancelled; remaining files were left in place.").dim().to_string())
            .ok();
    }
}

fn describe(stage: &StageReport) -> String {
    let failures = if stage.failed > 0 {
        format!(" ({} failed)", stage.failed)
    } else {
        String::new()
    };
    let details = match &stage.details {
        StageDetails::None => String::new(),
        StageDetails::Formats { jpeg, png } => format!("{jpeg} jpeg, {png} png"),
        StageDetails::Dedup {
            removed_count,
            distinct_hashes,
        } => format!("{removed_count} removed, {distinct_hashes} distinct"),
        StageDetails::Tiers { high, low } => format!("{high} quality, {low} low"),
        StageDetails::Reclaim {
            removed_count,
            total_size,
        } => format!("{removed_count} files, {}", format_bytes(*total_size)),
        StageDetails::Transfer { files } => format!("{files} files"),
        StageDetails::Prune { removed_dirs } => format!("{removed_dirs} dirs"),
    };
    format!("{details}{failures}")
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to serialize report: {}", e),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
