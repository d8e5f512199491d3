//! # Repolens CLI
//!
//! The `repolens` binary analyzes a codebase with an LLM and writes a
//! structured report.
//!
//! ## Usage
//!
//! ```bash
//! repolens --config ./repolens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `repolens analyze` | Clone/update the repository, run the full analysis, write the report |
//! | `repolens scan` | List the files that would be analyzed |
//! | `repolens chunks` | Show the chunk plan without calling the LLM |
//!
//! API keys come from the environment: `GITHUB_TOKEN`, `OPENAI_API_KEY`, or
//! `ANTHROPIC_API_KEY`, matching the configured provider.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use repolens::config::{self, Config};
use repolens::cost::HeuristicTokenEstimator;
use repolens::models::SourceFile;
use repolens::progress::ProgressMode;
use repolens::{analyze, chunker, llm, repo, report, scan};

/// Repolens — analyze a codebase with an LLM and extract structured
/// knowledge.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `repolens.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "repolens",
    about = "Repolens — LLM-driven codebase analysis with token-budget chunking",
    version,
    long_about = "Repolens ingests a repository, packs its files into token-budgeted chunks, \
    analyzes each chunk with an LLM alongside a one-shot project overview and local complexity \
    metrics, and merges the results into a single structured report."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./repolens.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write the report.
    ///
    /// Clones or updates the repository, reads matching files, chunks them
    /// under the token budget, analyzes every chunk plus a project overview
    /// with the configured LLM provider, scores complexity, and writes a
    /// JSON report and a text summary to the output directory.
    Analyze {
        /// Skip cloning/updating the repository (use the existing local copy).
        #[arg(long)]
        skip_clone: bool,

        /// Custom report filename (default: analysis_<timestamp>.json).
        #[arg(long)]
        output_file: Option<String>,

        /// Progress output on stderr: `auto`, `off`, `human`, or `json`.
        #[arg(long, default_value = "auto")]
        progress: String,
    },

    /// List the files that would be analyzed.
    ///
    /// Applies the extension allow-list and excluded-directory list to the
    /// existing local copy and prints a per-extension summary.
    Scan,

    /// Show the chunk plan without calling the LLM.
    ///
    /// Chunks the current file set under the configured budget and prints
    /// one line per chunk with its file count, estimated tokens, and
    /// oversized flag. Useful for tuning the budget.
    Chunks,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Analyze {
            skip_clone,
            output_file,
            progress,
        } => {
            run_analyze(&cfg, skip_clone, output_file, &progress).await?;
        }
        Commands::Scan => {
            run_scan(&cfg)?;
        }
        Commands::Chunks => {
            run_chunks(&cfg)?;
        }
    }

    Ok(())
}

async fn run_analyze(
    cfg: &Config,
    skip_clone: bool,
    output_file: Option<String>,
    progress: &str,
) -> Result<()> {
    let progress_mode = parse_progress_mode(progress)?;
    let reporter = progress_mode.reporter();

    // Provider construction checks credentials up front, before any
    // repository work happens.
    let provider = llm::create_provider(&cfg.llm)?;

    if !skip_clone {
        repo::clone_or_update(&cfg.repository)?;
    }
    let repo_info = repo::repository_info(&cfg.repository);

    let files = read_files(cfg)?;

    let results =
        analyze::run_analysis(cfg, &files, repo_info, provider.as_ref(), reporter.as_ref()).await?;

    let generated_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let final_report = report::build_report(&results, &files, &generated_at);

    let json_path = report::save_report(&final_report, &cfg.output.dir, output_file)?;
    let summary_path = report::save_summary(&final_report, &cfg.output.dir)?;

    println!("analyze {}", cfg.repository.url);
    println!("  provider: {} ({})", provider.name(), provider.model());
    println!("  files analyzed: {}", final_report.statistics.total_files);
    println!("  chunks: {}", final_report.statistics.total_chunks);
    println!(
        "  classes identified: {}",
        final_report.detailed_analysis.total_classes_identified
    );
    if final_report.detailed_analysis.degraded_chunks > 0 {
        println!(
            "  degraded chunks: {}",
            final_report.detailed_analysis.degraded_chunks
        );
    }
    println!("  report: {}", json_path.display());
    println!("  summary: {}", summary_path.display());
    println!("ok");

    Ok(())
}

fn run_scan(cfg: &Config) -> Result<()> {
    let files = read_files(cfg)?;

    let mut by_extension: BTreeMap<&str, (usize, u64)> = BTreeMap::new();
    for file in &files {
        let entry = by_extension.entry(file.extension.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += file.size as u64;
    }

    println!("{:<16} {:>8} {:>12}", "EXTENSION", "FILES", "BYTES");
    for (ext, (count, bytes)) in &by_extension {
        let label = if ext.is_empty() { "(none)" } else { ext };
        println!("{:<16} {:>8} {:>12}", label, count, bytes);
    }
    println!();
    println!(
        "{} files, {} bytes total",
        files.len(),
        files.iter().map(|f| f.size as u64).sum::<u64>()
    );

    Ok(())
}

fn run_chunks(cfg: &Config) -> Result<()> {
    let files = read_files(cfg)?;

    let chunks = chunker::chunk_files(
        &files,
        cfg.chunking.max_tokens_per_chunk,
        &HeuristicTokenEstimator,
    );

    for chunk in &chunks {
        let marker = if chunk.oversized { " (oversized)" } else { "" };
        println!(
            "chunk {}: {} files, ~{} tokens{}",
            chunk.id,
            chunk.files.len(),
            chunk.token_count,
            marker
        );
    }
    println!();
    println!(
        "{} chunks for {} files (budget {} tokens)",
        chunks.len(),
        files.len(),
        cfg.chunking.max_tokens_per_chunk
    );

    Ok(())
}

fn read_files(cfg: &Config) -> Result<Vec<SourceFile>> {
    let files = scan::scan_repository(&cfg.repository.local_path, &cfg.files)?;
    if files.is_empty() {
        bail!(
            "No files matched under {} — check files.include_extensions",
            cfg.repository.local_path.display()
        );
    }
    Ok(files)
}

fn parse_progress_mode(value: &str) -> Result<ProgressMode> {
    match value {
        "auto" => Ok(ProgressMode::default_for_tty()),
        "off" => Ok(ProgressMode::Off),
        "human" => Ok(ProgressMode::Human),
        "json" => Ok(ProgressMode::Json),
        other => bail!("Unknown progress mode: '{}'. Must be auto, off, human, or json", other),
    }
}
