//! Core data models used throughout Repolens.
//!
//! These types represent the source files, chunks, and per-chunk analysis
//! results that flow through the chunking and analysis pipeline.

use serde::{Deserialize, Serialize};

/// A single source file read from the repository.
///
/// The `path` is relative to the repository root and unique within a run.
/// Content is immutable once read.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
    /// Filename suffix including the leading dot (e.g. `".java"`), or empty.
    pub extension: String,
    /// Size of the decoded content in bytes.
    pub size: usize,
}

impl SourceFile {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let size = content.len();
        Self {
            path: path.into(),
            content,
            extension: extension.into(),
            size,
        }
    }

    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }
}

/// An ordered group of source files whose serialized form fits the token
/// budget — except for a flagged oversized singleton, the one permitted
/// violation.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Sequence number, contiguous from 0.
    pub id: usize,
    pub files: Vec<SourceFile>,
    /// Estimated token cost of the serialized chunk.
    pub token_count: usize,
    /// True when this chunk is a single file whose own cost exceeds the budget.
    pub oversized: bool,
    /// SHA-256 of the serialized chunk text.
    pub hash: String,
}

impl Chunk {
    pub fn file_paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }
}

/// Result of the LLM analysis of one chunk, tied to that chunk's sequence
/// number. Either a well-formed structured payload or the raw response kept
/// for inspection when parsing failed.
#[derive(Debug, Clone)]
pub struct ChunkAnalysis {
    pub chunk_id: usize,
    pub payload: ChunkPayload,
}

#[derive(Debug, Clone)]
pub enum ChunkPayload {
    Structured(Vec<FileAnalysis>),
    Raw { response: String, error: String },
}

impl ChunkAnalysis {
    pub fn is_structured(&self) -> bool {
        matches!(self.payload, ChunkPayload::Structured(_))
    }

    /// Per-file entries, empty for raw fallbacks.
    pub fn files(&self) -> &[FileAnalysis] {
        match &self.payload {
            ChunkPayload::Structured(files) => files,
            ChunkPayload::Raw { .. } => &[],
        }
    }
}

// ---- structured LLM payloads ----
//
// The model output is free-form JSON; every field defaults so a partially
// conforming response still deserializes.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileAnalysis {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    #[serde(default)]
    pub key_functions: Vec<FunctionInfo>,
    #[serde(default)]
    pub complexity_notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
    #[serde(default)]
    pub relationships: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub complexity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// High-level project overview from the one-shot summarizer call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectOverview {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub key_technologies: Vec<String>,
    #[serde(default)]
    pub architecture_style: String,
    #[serde(default)]
    pub main_components: Vec<Component>,
    #[serde(default)]
    pub estimated_complexity: String,
    #[serde(default)]
    pub notable_features: Vec<String>,
    /// Set when the overview response could not be parsed as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// ---- complexity metrics ----

/// Coarse complexity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub fn from_score(score: u32) -> Self {
        if score <= 5 {
            ComplexityLevel::Low
        } else if score <= 10 {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::High
        }
    }
}

/// One scored function within a file's metrics.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredFunction {
    pub name: String,
    pub complexity: u32,
    pub line: usize,
    pub level: ComplexityLevel,
}

/// Per-file complexity metrics, independent of chunking.
#[derive(Debug, Clone, Serialize)]
pub struct FileMetrics {
    pub path: String,
    pub functions: Vec<ScoredFunction>,
    pub max_complexity: u32,
    pub level: ComplexityLevel,
}

/// A method signature extracted by pattern matching.
#[derive(Debug, Clone, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub signature: String,
    pub kind: String,
}

// ---- repository metadata ----

#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoInfo {
    pub url: String,
    pub local_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<CommitInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_level_thresholds() {
        assert_eq!(ComplexityLevel::from_score(0), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_score(5), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_score(6), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(10), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(11), ComplexityLevel::High);
    }

    #[test]
    fn lenient_file_analysis_deserialization() {
        let parsed: FileAnalysis = serde_json::from_str(r#"{"path": "src/App.java"}"#).unwrap();
        assert_eq!(parsed.path, "src/App.java");
        assert!(parsed.classes.is_empty());
        assert!(parsed.key_functions.is_empty());
    }

    #[test]
    fn raw_analysis_has_no_files() {
        let analysis = ChunkAnalysis {
            chunk_id: 3,
            payload: ChunkPayload::Raw {
                response: "not json".to_string(),
                error: "expected value".to_string(),
            },
        };
        assert!(!analysis.is_structured());
        assert!(analysis.files().is_empty());
    }
}
