//! Analysis progress reporting.
//!
//! Reports observable progress during `repolens analyze` so users see what
//! is being scanned, how many chunks remain, and when the report is being
//! assembled. Progress is emitted on **stderr** so stdout remains parseable
//! for scripts.

use std::io::Write;

/// A single progress event for an analysis run.
#[derive(Clone, Debug)]
pub enum AnalyzeEvent {
    /// File discovery finished.
    Scanned { files: usize, total_bytes: u64 },
    /// Chunk plan computed.
    Chunked { chunks: usize, oversized: usize },
    /// One chunk analysis call finished (n of total done).
    AnalyzingChunks { n: usize, total: usize },
    /// Complexity scoring finished.
    Scored { files: usize },
}

/// Reports analysis progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: AnalyzeEvent);
}

/// Human-friendly progress on stderr: "analyze  chunks  3 / 14".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: AnalyzeEvent) {
        let line = match &event {
            AnalyzeEvent::Scanned { files, total_bytes } => {
                format!(
                    "analyze  scanned  {} files ({} bytes)\n",
                    format_number(*files as u64),
                    format_number(*total_bytes)
                )
            }
            AnalyzeEvent::Chunked { chunks, oversized } => {
                if *oversized > 0 {
                    format!("analyze  planned  {} chunks ({} oversized)\n", chunks, oversized)
                } else {
                    format!("analyze  planned  {} chunks\n", chunks)
                }
            }
            AnalyzeEvent::AnalyzingChunks { n, total } => {
                format!("analyze  chunks  {} / {}\n", n, total)
            }
            AnalyzeEvent::Scored { files } => {
                format!("analyze  scored  {} files\n", files)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: AnalyzeEvent) {
        let obj = match &event {
            AnalyzeEvent::Scanned { files, total_bytes } => serde_json::json!({
                "event": "progress",
                "phase": "scanned",
                "files": files,
                "total_bytes": total_bytes
            }),
            AnalyzeEvent::Chunked { chunks, oversized } => serde_json::json!({
                "event": "progress",
                "phase": "chunked",
                "chunks": chunks,
                "oversized": oversized
            }),
            AnalyzeEvent::AnalyzingChunks { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "chunks",
                "n": n,
                "total": total
            }),
            AnalyzeEvent::Scored { files } => serde_json::json!({
                "event": "progress",
                "phase": "scored",
                "files": files
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: AnalyzeEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
