//! Per-file complexity metrics and signature extraction.
//!
//! Both are best-effort, pattern-matching passes — no language-aware
//! parsing. Function boundaries are approximated as "from this definition to
//! the next one", and the complexity score is one plus the number of
//! decision points in that span, a rough cyclomatic estimate. Good enough to
//! rank hotspots; not an exact analysis.

use anyhow::Result;
use regex::Regex;

use crate::models::{ComplexityLevel, FileMetrics, MethodSignature, ScoredFunction, SourceFile};

/// Extensions the scorer understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".py", ".java", ".rs"];

pub struct MetricsAnalyzer {
    python_def: Regex,
    python_branch: Regex,
    java_method: Regex,
    java_branch: Regex,
    rust_fn: Regex,
    rust_branch: Regex,
}

impl MetricsAnalyzer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            python_def: Regex::new(r"def\s+(\w+)\s*\([^\)]*\):")?,
            python_branch: Regex::new(r"\b(if|elif|for|while|except|and|or)\b")?,
            java_method: Regex::new(
                r"(public|private|protected|static|\s)+[\w<>\[\]]+\s+(\w+)\s*\([^\)]*\)\s*\{",
            )?,
            java_branch: Regex::new(r"\b(if|for|while|case|catch)\b|&&|\|\|")?,
            rust_fn: Regex::new(r"fn\s+(\w+)\s*[\(<]")?,
            rust_branch: Regex::new(r"\b(if|for|while|loop|match)\b|&&|\|\|")?,
        })
    }

    pub fn supports(&self, extension: &str) -> bool {
        SUPPORTED_EXTENSIONS.contains(&extension)
    }

    /// Score every function found in the file.
    ///
    /// The per-file contract is fallible so the pipeline can skip a file the
    /// analyzer chokes on without aborting the run.
    pub fn score_file(&self, file: &SourceFile) -> Result<FileMetrics> {
        let (def_pattern, branch_pattern, name_group) = match file.extension.as_str() {
            ".py" => (&self.python_def, &self.python_branch, 1),
            ".java" => (&self.java_method, &self.java_branch, 2),
            ".rs" => (&self.rust_fn, &self.rust_branch, 1),
            other => anyhow::bail!("Unsupported extension for metrics: '{}'", other),
        };

        // Function spans: from each definition to the next (or EOF).
        let starts: Vec<(usize, String)> = def_pattern
            .captures_iter(&file.content)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                let name = caps.get(name_group)?.as_str().to_string();
                Some((m.start(), name))
            })
            .collect();

        let mut functions = Vec::with_capacity(starts.len());
        let mut max_complexity = 0u32;

        for (i, (start, name)) in starts.iter().enumerate() {
            let end = starts
                .get(i + 1)
                .map(|(next, _)| *next)
                .unwrap_or(file.content.len());
            let body = &file.content[*start..end];

            let complexity = 1 + branch_pattern.find_iter(body).count() as u32;
            max_complexity = max_complexity.max(complexity);

            functions.push(ScoredFunction {
                name: name.clone(),
                complexity,
                line: line_of(&file.content, *start),
                level: ComplexityLevel::from_score(complexity),
            });
        }

        Ok(FileMetrics {
            path: file.path.clone(),
            functions,
            max_complexity,
            level: ComplexityLevel::from_score(max_complexity),
        })
    }

    /// Extract method signatures by pattern matching. Files in unsupported
    /// languages yield an empty list.
    pub fn extract_signatures(&self, file: &SourceFile) -> Vec<MethodSignature> {
        match file.extension.as_str() {
            ".java" => self
                .java_method
                .captures_iter(&file.content)
                .filter_map(|caps| {
                    let whole = caps.get(0)?.as_str();
                    let name = caps.get(2)?.as_str();
                    Some(MethodSignature {
                        name: name.to_string(),
                        signature: whole.trim().trim_end_matches('{').trim().to_string(),
                        kind: "java_method".to_string(),
                    })
                })
                .collect(),
            ".py" => self
                .python_def
                .captures_iter(&file.content)
                .filter_map(|caps| {
                    Some(MethodSignature {
                        name: caps.get(1)?.as_str().to_string(),
                        signature: caps.get(0)?.as_str().trim().to_string(),
                        kind: "python_function".to_string(),
                    })
                })
                .collect(),
            ".rs" => self
                .rust_fn
                .captures_iter(&file.content)
                .filter_map(|caps| {
                    let name = caps.get(1)?.as_str();
                    Some(MethodSignature {
                        name: name.to_string(),
                        signature: signature_line(&file.content, caps.get(0)?.start()),
                        kind: "rust_function".to_string(),
                    })
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// 1-based line number of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// The full source line containing `offset`, trimmed.
fn signature_line(text: &str, offset: usize) -> String {
    let start = text[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let end = text[offset..]
        .find('\n')
        .map(|p| offset + p)
        .unwrap_or(text.len());
    text[start..end].trim().trim_end_matches('{').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> MetricsAnalyzer {
        MetricsAnalyzer::new().unwrap()
    }

    #[test]
    fn scores_python_functions() {
        let content = "\
def simple(x):
    return x

def branchy(items):
    for item in items:
        if item and item > 0:
            while item:
                item -= 1
";
        let file = SourceFile::new("util.py", content, ".py");
        let metrics = analyzer().score_file(&file).unwrap();

        assert_eq!(metrics.functions.len(), 2);
        assert_eq!(metrics.functions[0].name, "simple");
        assert_eq!(metrics.functions[0].complexity, 1);
        assert_eq!(metrics.functions[0].line, 1);
        assert_eq!(metrics.functions[1].name, "branchy");
        // for + if + and + while → 1 + 4
        assert_eq!(metrics.functions[1].complexity, 5);
        assert_eq!(metrics.max_complexity, 5);
        assert_eq!(metrics.level, ComplexityLevel::Low);
    }

    #[test]
    fn java_signatures_are_extracted() {
        let content = "\
public class Store {
    public List<Item> findAll(String filter) {
        return items;
    }
    private void clear() {
    }
}
";
        let file = SourceFile::new("Store.java", content, ".java");
        let signatures = analyzer().extract_signatures(&file);

        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0].name, "findAll");
        assert!(signatures[0].signature.contains("List<Item> findAll(String filter)"));
        assert!(!signatures[0].signature.ends_with('{'));
        assert_eq!(signatures[1].name, "clear");
        assert_eq!(signatures[0].kind, "java_method");
    }

    #[test]
    fn rust_functions_are_found() {
        let content = "\
fn plain() {}

fn generic<T>(value: T) -> T {
    if true {
        value
    } else {
        value
    }
}
";
        let file = SourceFile::new("lib.rs", content, ".rs");
        let metrics = analyzer().score_file(&file).unwrap();
        assert_eq!(metrics.functions.len(), 2);
        assert_eq!(metrics.functions[1].name, "generic");

        let signatures = analyzer().extract_signatures(&file);
        assert_eq!(signatures[1].signature, "fn generic<T>(value: T) -> T");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = SourceFile::new("data.xml", "<root/>", ".xml");
        assert!(!analyzer().supports(".xml"));
        assert!(analyzer().score_file(&file).is_err());
        assert!(analyzer().extract_signatures(&file).is_empty());
    }

    #[test]
    fn empty_file_scores_zero() {
        let file = SourceFile::new("empty.py", "", ".py");
        let metrics = analyzer().score_file(&file).unwrap();
        assert!(metrics.functions.is_empty());
        assert_eq!(metrics.max_complexity, 0);
        assert_eq!(metrics.level, ComplexityLevel::Low);
    }
}
