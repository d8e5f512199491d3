//! Analysis pipeline orchestration.
//!
//! Drives the three independent passes over the document set: the one-shot
//! project overview, the per-chunk LLM calls, and the per-file complexity
//! metrics. The pipeline collects outputs without interpreting them; merging
//! is the aggregator's job ([`crate::report`]).
//!
//! Chunk calls run sequentially, so the returned partials are index-aligned
//! with the chunk sequence by construction — `results[i]` always belongs to
//! `chunks[i]`. A chunk whose call fails or whose response does not parse
//! degrades to a raw partial for that chunk only; the run continues.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::chunker;
use crate::config::Config;
use crate::cost::HeuristicTokenEstimator;
use crate::llm::{extract_fenced_payload, LlmProvider};
use crate::metrics::MetricsAnalyzer;
use crate::models::{
    Chunk, ChunkAnalysis, ChunkPayload, FileAnalysis, FileMetrics, MethodSignature,
    ProjectOverview, RepoInfo, SourceFile,
};
use crate::progress::{AnalyzeEvent, ProgressReporter};

const OVERVIEW_SYSTEM_PROMPT: &str = "You are an expert software architect analyzing a codebase. \
Provide a high-level overview of the project: its purpose, architecture, and key technologies.";

const CHUNK_SYSTEM_PROMPT: &str = "You are an expert code analyzer. Analyze the provided code and \
extract structured information. Focus on key classes and their purposes, important methods with \
signatures and descriptions, notable standalone functions, and overall complexity. Return your \
analysis as structured JSON.";

/// Everything the aggregator needs, collected in one place.
pub struct AnalysisResults {
    pub overview: ProjectOverview,
    /// Provider name, recorded in the report metadata.
    pub provider_name: String,
    pub repo: RepoInfo,
    pub chunk_count: usize,
    pub chunk_analyses: Vec<ChunkAnalysis>,
    pub metrics: Vec<FileMetrics>,
    /// Method signatures per file path, in path order.
    pub signatures: BTreeMap<String, Vec<MethodSignature>>,
}

/// Run the full pipeline: overview, chunked analysis, metrics.
pub async fn run_analysis(
    config: &Config,
    files: &[SourceFile],
    repo: RepoInfo,
    provider: &dyn LlmProvider,
    progress: &dyn ProgressReporter,
) -> Result<AnalysisResults> {
    progress.report(AnalyzeEvent::Scanned {
        files: files.len(),
        total_bytes: files.iter().map(|f| f.size as u64).sum(),
    });

    let overview = run_overview(provider, files, &repo)
        .await
        .context("Project overview call failed")?;

    let chunks = chunker::chunk_files(
        files,
        config.chunking.max_tokens_per_chunk,
        &HeuristicTokenEstimator,
    );
    progress.report(AnalyzeEvent::Chunked {
        chunks: chunks.len(),
        oversized: chunks.iter().filter(|c| c.oversized).count(),
    });

    let chunk_count = chunks.len();
    let chunk_analyses = run_chunks(provider, &chunks, progress).await;

    let analyzer = MetricsAnalyzer::new()?;
    let metrics = run_metrics(&analyzer, files);
    progress.report(AnalyzeEvent::Scored {
        files: metrics.len(),
    });

    let signatures = extract_signatures(&analyzer, files);

    Ok(AnalysisResults {
        overview,
        provider_name: provider.name().to_string(),
        repo,
        chunk_count,
        chunk_analyses,
        metrics,
        signatures,
    })
}

/// One-shot overview call over the bounded project-structure artifact.
///
/// A provider failure here is fatal — there is no per-chunk slot to degrade
/// into. A malformed response is not: it falls back to an overview carrying
/// the raw text head and the parse error.
pub async fn run_overview(
    provider: &dyn LlmProvider,
    files: &[SourceFile],
    repo: &RepoInfo,
) -> Result<ProjectOverview> {
    let overview_text = chunker::build_overview_text(files);

    let user_prompt = format!(
        "Analyze this project overview:\n\nRepository: {}\n\n{}\n\n\
Respond with a JSON object with these fields:\n\
{{\n\
  \"project_name\": \"...\",\n\
  \"purpose\": \"what this project does\",\n\
  \"domain\": \"application domain\",\n\
  \"key_technologies\": [\"...\"],\n\
  \"architecture_style\": \"MVC, Microservices, Layered, ...\",\n\
  \"main_components\": [{{\"name\": \"...\", \"description\": \"...\"}}],\n\
  \"estimated_complexity\": \"low/medium/high\",\n\
  \"notable_features\": [\"...\"]\n\
}}",
        repo.url, overview_text
    );

    let response = provider.invoke(OVERVIEW_SYSTEM_PROMPT, &user_prompt).await?;

    let payload = extract_fenced_payload(&response);
    match serde_json::from_str::<ProjectOverview>(payload) {
        Ok(overview) => Ok(overview),
        Err(err) => {
            eprintln!("Warning: could not parse overview response: {}", err);
            Ok(ProjectOverview {
                project_name: "Unknown".to_string(),
                purpose: head(&response, 500),
                parse_error: Some(err.to_string()),
                ..Default::default()
            })
        }
    }
}

/// Wire shape of a per-chunk response. Only `files` matters; everything else
/// the model volunteers is ignored.
#[derive(Deserialize)]
struct ChunkResponsePayload {
    #[serde(default)]
    files: Vec<FileAnalysis>,
}

/// Analyze every chunk in sequence order, one call per chunk.
///
/// Never fails: each chunk ends up as either a structured or a raw partial,
/// and the output length always equals the input length.
pub async fn run_chunks(
    provider: &dyn LlmProvider,
    chunks: &[Chunk],
    progress: &dyn ProgressReporter,
) -> Vec<ChunkAnalysis> {
    let mut analyses = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let analysis = match analyze_chunk(provider, chunk, chunks.len()).await {
            Ok(payload) => ChunkAnalysis {
                chunk_id: chunk.id,
                payload,
            },
            Err(err) => {
                eprintln!("Warning: chunk {} analysis failed: {}", chunk.id, err);
                ChunkAnalysis {
                    chunk_id: chunk.id,
                    payload: ChunkPayload::Raw {
                        response: String::new(),
                        error: err.to_string(),
                    },
                }
            }
        };
        analyses.push(analysis);
        progress.report(AnalyzeEvent::AnalyzingChunks {
            n: analyses.len(),
            total: chunks.len(),
        });
    }

    // Alignment is the contract the aggregator depends on.
    assert_eq!(
        analyses.len(),
        chunks.len(),
        "partial results out of alignment with chunks"
    );

    analyses
}

async fn analyze_chunk(
    provider: &dyn LlmProvider,
    chunk: &Chunk,
    total_chunks: usize,
) -> Result<ChunkPayload> {
    let chunk_text = chunker::serialize_files(chunk.files.iter());

    let user_prompt = format!(
        "Analyze the following code (Chunk {}/{}):\n\n{}\n\n\
Respond with a JSON object of this shape:\n\
{{\n\
  \"files\": [\n\
    {{\n\
      \"path\": \"file/path\",\n\
      \"classes\": [\n\
        {{\n\
          \"name\": \"ClassName\",\n\
          \"purpose\": \"brief description\",\n\
          \"methods\": [{{\"name\": \"...\", \"signature\": \"...\", \"description\": \"...\", \"complexity\": \"low/medium/high\"}}],\n\
          \"relationships\": [\"depends on X\"]\n\
        }}\n\
      ],\n\
      \"key_functions\": [{{\"name\": \"...\", \"description\": \"...\"}}],\n\
      \"complexity_notes\": \"overall assessment\"\n\
    }}\n\
  ]\n\
}}\n\n\
Be concise but thorough. Focus on the most important elements.",
        chunk.id + 1,
        total_chunks,
        chunk_text
    );

    let response = provider.invoke(CHUNK_SYSTEM_PROMPT, &user_prompt).await?;

    let payload = extract_fenced_payload(&response);
    match serde_json::from_str::<ChunkResponsePayload>(payload) {
        Ok(parsed) => Ok(ChunkPayload::Structured(parsed.files)),
        Err(err) => {
            eprintln!(
                "Warning: could not parse response for chunk {}: {}",
                chunk.id, err
            );
            Ok(ChunkPayload::Raw {
                response,
                error: err.to_string(),
            })
        }
    }
}

/// Score complexity for every supported file. A failure for one file omits
/// that file's entry with a warning — metrics are best-effort, never fatal.
pub fn run_metrics(analyzer: &MetricsAnalyzer, files: &[SourceFile]) -> Vec<FileMetrics> {
    let mut all = Vec::new();

    for file in files {
        if !analyzer.supports(&file.extension) {
            continue;
        }
        match analyzer.score_file(file) {
            Ok(metrics) => all.push(metrics),
            Err(err) => {
                eprintln!("Warning: could not score {}: {}", file.path, err);
            }
        }
    }

    all
}

fn extract_signatures(
    analyzer: &MetricsAnalyzer,
    files: &[SourceFile],
) -> BTreeMap<String, Vec<MethodSignature>> {
    let mut by_file = BTreeMap::new();
    for file in files {
        let signatures = analyzer.extract_signatures(file);
        if !signatures.is_empty() {
            by_file.insert(file.path.clone(), signatures);
        }
    }
    by_file
}

/// First `limit` characters of a response, on a char boundary.
fn head(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
