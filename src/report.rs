//! Report aggregation and output.
//!
//! Merges the overview, the ordered per-chunk partials, and the per-file
//! metrics into one [`Report`], applying the ranking and capping policies
//! that bound its size. Aggregation is pure — the same inputs always produce
//! a byte-identical report — and content order follows chunk-sequence then
//! in-chunk order, never service response timing.
//!
//! Also writes the report to disk as pretty JSON plus a plain-text summary.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analyze::AnalysisResults;
use crate::models::{
    ComplexityLevel, FunctionInfo, MethodInfo, MethodSignature, ProjectOverview, RepoInfo,
    SourceFile,
};

/// Merged function list cap.
const MAX_KEY_FUNCTIONS: usize = 50;
/// Retained methods per class.
const MAX_METHODS_PER_CLASS: usize = 5;
/// Listed methods per file in the code-structure section.
const MAX_METHODS_PER_FILE: usize = 20;
/// High-complexity file list cap.
const MAX_HIGH_COMPLEXITY_FILES: usize = 20;
/// Retained functions per high-complexity file.
const MAX_COMPLEX_FUNCTIONS_PER_FILE: usize = 10;
/// A file is high complexity when its max score exceeds this.
const HIGH_COMPLEXITY_THRESHOLD: u32 = 10;
/// A function is worth listing when its score exceeds this.
const COMPLEX_FUNCTION_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub project_overview: OverviewSection,
    pub statistics: Statistics,
    pub code_structure: CodeStructure,
    pub complexity_analysis: ComplexityAnalysis,
    pub detailed_analysis: DetailedAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub analyzer_version: String,
    pub llm_provider: String,
    pub repository: RepoInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewSection {
    pub name: String,
    pub purpose: String,
    pub domain: String,
    pub architecture: String,
    pub key_technologies: Vec<String>,
    pub main_components: Vec<ComponentSummary>,
    pub estimated_complexity: String,
    pub notable_features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_files: usize,
    pub total_chunks: usize,
    pub total_lines: usize,
    pub total_size_bytes: u64,
    pub files_by_extension: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeStructure {
    pub total_files_with_methods: usize,
    pub files: Vec<FileMethods>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileMethods {
    pub path: String,
    pub method_count: usize,
    pub methods: Vec<MethodSignature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplexityAnalysis {
    pub summary: ComplexitySummary,
    pub high_complexity_files: Vec<HighComplexityFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplexitySummary {
    pub total_files_analyzed: usize,
    pub average_complexity: f64,
    pub high_complexity_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HighComplexityFile {
    pub path: String,
    pub max_complexity: u32,
    pub complexity_level: ComplexityLevel,
    pub complex_functions: Vec<ComplexFunction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplexFunction {
    pub name: String,
    pub complexity: u32,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedAnalysis {
    pub total_classes_identified: usize,
    pub total_key_functions_identified: usize,
    pub degraded_chunks: usize,
    pub classes: Vec<ClassSummary>,
    pub key_functions: Vec<KeyFunction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub file: String,
    pub purpose: String,
    pub method_count: usize,
    pub key_methods: Vec<MethodInfo>,
    pub relationships: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyFunction {
    pub name: String,
    pub file: String,
    pub description: String,
}

/// Build the final report from the collected pipeline outputs.
pub fn build_report(
    results: &AnalysisResults,
    files: &[SourceFile],
    generated_at: &str,
) -> Report {
    Report {
        metadata: ReportMetadata {
            generated_at: generated_at.to_string(),
            analyzer_version: env!("CARGO_PKG_VERSION").to_string(),
            llm_provider: results.provider_name.clone(),
            repository: results.repo.clone(),
        },
        project_overview: overview_section(&results.overview),
        statistics: statistics(files, results.chunk_count),
        code_structure: code_structure(&results.signatures),
        complexity_analysis: complexity_analysis(results),
        detailed_analysis: detailed_analysis(results),
    }
}

fn overview_section(overview: &ProjectOverview) -> OverviewSection {
    OverviewSection {
        name: or_unknown(&overview.project_name),
        purpose: overview.purpose.clone(),
        domain: overview.domain.clone(),
        architecture: overview.architecture_style.clone(),
        key_technologies: overview.key_technologies.clone(),
        main_components: overview
            .main_components
            .iter()
            .map(|c| ComponentSummary {
                name: c.name.clone(),
                description: c.description.clone(),
            })
            .collect(),
        estimated_complexity: overview.estimated_complexity.clone(),
        notable_features: overview.notable_features.clone(),
        parse_error: overview.parse_error.clone(),
    }
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value.to_string()
    }
}

fn statistics(files: &[SourceFile], total_chunks: usize) -> Statistics {
    let mut files_by_extension: BTreeMap<String, usize> = BTreeMap::new();
    for file in files {
        let ext = if file.extension.is_empty() {
            "no_extension".to_string()
        } else {
            file.extension.clone()
        };
        *files_by_extension.entry(ext).or_insert(0) += 1;
    }

    Statistics {
        total_files: files.len(),
        total_chunks,
        total_lines: files.iter().map(|f| f.line_count()).sum(),
        total_size_bytes: files.iter().map(|f| f.size as u64).sum(),
        files_by_extension,
    }
}

fn code_structure(signatures: &BTreeMap<String, Vec<MethodSignature>>) -> CodeStructure {
    let files: Vec<FileMethods> = signatures
        .iter()
        .map(|(path, methods)| FileMethods {
            path: path.clone(),
            method_count: methods.len(),
            methods: methods.iter().take(MAX_METHODS_PER_FILE).cloned().collect(),
        })
        .collect();

    CodeStructure {
        total_files_with_methods: files.len(),
        files,
    }
}

fn complexity_analysis(results: &AnalysisResults) -> ComplexityAnalysis {
    let scored = &results.metrics;

    // Average over per-file maxima, rounded to two decimals.
    let average_complexity = if scored.is_empty() {
        0.0
    } else {
        let sum: u32 = scored.iter().map(|m| m.max_complexity).sum();
        (sum as f64 / scored.len() as f64 * 100.0).round() / 100.0
    };

    // Qualifying files keep their input (path-sorted) order; the cap applies
    // after qualification so the count reflects all of them.
    let qualifying: Vec<_> = scored
        .iter()
        .filter(|m| m.max_complexity > HIGH_COMPLEXITY_THRESHOLD)
        .collect();
    let high_complexity_count = qualifying.len();

    let high_complexity_files = qualifying
        .into_iter()
        .take(MAX_HIGH_COMPLEXITY_FILES)
        .map(|m| HighComplexityFile {
            path: m.path.clone(),
            max_complexity: m.max_complexity,
            complexity_level: m.level,
            complex_functions: m
                .functions
                .iter()
                .filter(|f| f.complexity > COMPLEX_FUNCTION_THRESHOLD)
                .take(MAX_COMPLEX_FUNCTIONS_PER_FILE)
                .map(|f| ComplexFunction {
                    name: f.name.clone(),
                    complexity: f.complexity,
                    line: f.line,
                })
                .collect(),
        })
        .collect();

    ComplexityAnalysis {
        summary: ComplexitySummary {
            total_files_analyzed: scored.len(),
            average_complexity,
            high_complexity_count,
        },
        high_complexity_files,
    }
}

fn detailed_analysis(results: &AnalysisResults) -> DetailedAnalysis {
    let mut classes = Vec::new();
    let mut key_functions: Vec<KeyFunction> = Vec::new();
    let mut degraded_chunks = 0;

    // Flatten in chunk-sequence then in-chunk order; this, not response
    // timing, is what makes the caps deterministic.
    for analysis in &results.chunk_analyses {
        if !analysis.is_structured() {
            degraded_chunks += 1;
            continue;
        }
        for file_analysis in analysis.files() {
            for class in &file_analysis.classes {
                classes.push(class_summary(class, &file_analysis.path));
            }
            for function in &file_analysis.key_functions {
                key_functions.push(key_function(function, &file_analysis.path));
            }
        }
    }

    let total_classes_identified = classes.len();
    let total_key_functions_identified = key_functions.len();
    key_functions.truncate(MAX_KEY_FUNCTIONS);

    DetailedAnalysis {
        total_classes_identified,
        total_key_functions_identified,
        degraded_chunks,
        classes,
        key_functions,
    }
}

fn class_summary(class: &crate::models::ClassInfo, file_path: &str) -> ClassSummary {
    ClassSummary {
        name: class.name.clone(),
        file: file_path.to_string(),
        purpose: class.purpose.clone(),
        method_count: class.methods.len(),
        key_methods: class.methods.iter().take(MAX_METHODS_PER_CLASS).cloned().collect(),
        relationships: class.relationships.clone(),
    }
}

fn key_function(function: &FunctionInfo, file_path: &str) -> KeyFunction {
    KeyFunction {
        name: function.name.clone(),
        file: file_path.to_string(),
        description: function.description.clone(),
    }
}

// ---- output sink ----

/// Write the report as pretty JSON. Returns the written path.
pub fn save_report(report: &Report, output_dir: &Path, filename: Option<String>) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let filename = filename.unwrap_or_else(|| {
        format!(
            "analysis_{}.json",
            report.metadata.generated_at.replace([':', '-'], "").replace('T', "_")
        )
    });
    let path = output_dir.join(filename);

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

/// Write the human-readable summary. Returns the written path.
pub fn save_summary(report: &Report, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let filename = format!(
        "summary_{}.txt",
        report.metadata.generated_at.replace([':', '-'], "").replace('T', "_")
    );
    let path = output_dir.join(filename);

    std::fs::write(&path, render_summary(report))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

/// Render the plain-text digest of a report.
pub fn render_summary(report: &Report) -> String {
    let rule = "=".repeat(80);
    let mut out = String::new();

    out.push_str(&format!("{}\nCODEBASE ANALYSIS SUMMARY\n{}\n\n", rule, rule));

    let overview = &report.project_overview;
    out.push_str(&format!("Project: {}\n", overview.name));
    out.push_str(&format!("Purpose: {}\n", overview.purpose));
    out.push_str(&format!("Domain: {}\n", overview.domain));
    out.push_str(&format!("Architecture: {}\n", overview.architecture));
    out.push_str(&format!("Complexity: {}\n\n", overview.estimated_complexity));

    let stats = &report.statistics;
    out.push_str("Statistics:\n");
    out.push_str(&format!("  Total Files: {}\n", stats.total_files));
    out.push_str(&format!("  Total Chunks: {}\n", stats.total_chunks));
    out.push_str(&format!("  Total Lines: {}\n", stats.total_lines));
    out.push_str(&format!("  Total Size: {} bytes\n\n", stats.total_size_bytes));

    let complexity = &report.complexity_analysis.summary;
    out.push_str("Complexity Analysis:\n");
    out.push_str(&format!("  Files Analyzed: {}\n", complexity.total_files_analyzed));
    out.push_str(&format!("  Average Complexity: {}\n", complexity.average_complexity));
    out.push_str(&format!(
        "  High Complexity Files: {}\n\n",
        complexity.high_complexity_count
    ));

    let detailed = &report.detailed_analysis;
    out.push_str("Detailed Analysis:\n");
    out.push_str(&format!("  Classes Identified: {}\n", detailed.total_classes_identified));
    out.push_str(&format!(
        "  Key Functions: {}\n",
        detailed.total_key_functions_identified
    ));
    if detailed.degraded_chunks > 0 {
        out.push_str(&format!(
            "  Degraded Chunks: {}\n",
            detailed.degraded_chunks
        ));
    }
    out.push('\n');

    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("Analysis completed: {}\n", report.metadata.generated_at));
    out.push_str(&format!("{}\n", rule));

    out
}
