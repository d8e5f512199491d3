//! Token-budget file chunker.
//!
//! Packs source files into [`Chunk`]s whose *serialized* representation stays
//! within a token budget. Cost is always measured over the serialized text of
//! the whole prospective chunk (headers included), not summed per file, since
//! framing overhead and the estimator need not be additive.
//!
//! Files are sorted by path before packing so chunk boundaries are identical
//! across runs regardless of discovery order. Packing is greedy and single
//! pass: a chunk is sealed as soon as the next file would not fit. The one
//! permitted budget violation is a single file whose own serialized cost
//! exceeds the budget; it becomes its own chunk with `oversized` set.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::cost::TokenEstimator;
use crate::models::{Chunk, SourceFile};

/// Names listed per extension in the overview artifact before eliding.
const OVERVIEW_FILES_PER_EXTENSION: usize = 50;

/// Serialize files into the text form submitted to the LLM.
///
/// Each file is framed with its path, extension, and line count, followed by
/// the full content and an 80-column rule.
pub fn serialize_files<'a>(files: impl IntoIterator<Item = &'a SourceFile>) -> String {
    let mut parts: Vec<String> = Vec::new();
    for file in files {
        parts.push(format!("=== File: {} ===", file.path));
        parts.push(format!("Extension: {}", file.extension));
        parts.push(format!("Lines: {}", file.line_count()));
        parts.push(format!("\nContent:\n{}\n", file.content));
        parts.push("=".repeat(80));
    }
    parts.join("\n")
}

/// Partition `files` into budget-respecting chunks.
///
/// Every input file lands in exactly one chunk, and concatenating the chunks
/// in sequence order yields the files sorted by path. Each chunk's serialized
/// cost is at most `max_tokens` unless it is a flagged oversized singleton.
pub fn chunk_files(
    files: &[SourceFile],
    max_tokens: usize,
    estimator: &dyn TokenEstimator,
) -> Vec<Chunk> {
    assert!(max_tokens > 0, "chunk token budget must be positive");

    let mut sorted: Vec<SourceFile> = files.to_vec();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut pending: Vec<SourceFile> = Vec::new();
    let mut pending_tokens = 0usize;

    for file in sorted {
        let candidate_text = serialize_files(pending.iter().chain(std::iter::once(&file)));
        let candidate_tokens = estimator.count(&candidate_text);

        if pending.is_empty() {
            if candidate_tokens > max_tokens {
                // The file alone blows the budget: emit it as a flagged
                // singleton and keep the buffer empty.
                chunks.push(make_chunk(chunks.len(), vec![file], candidate_tokens, true));
            } else {
                pending.push(file);
                pending_tokens = candidate_tokens;
            }
            continue;
        }

        if candidate_tokens > max_tokens {
            // Seal the buffer, then restart it with this file — unless the
            // file alone is already over budget, in which case it is sealed
            // immediately as an oversized singleton.
            let sealed = std::mem::take(&mut pending);
            chunks.push(make_chunk(chunks.len(), sealed, pending_tokens, false));

            let single_tokens = estimator.count(&serialize_files(std::iter::once(&file)));
            if single_tokens > max_tokens {
                chunks.push(make_chunk(chunks.len(), vec![file], single_tokens, true));
                pending_tokens = 0;
            } else {
                pending.push(file);
                pending_tokens = single_tokens;
            }
        } else {
            pending.push(file);
            pending_tokens = candidate_tokens;
        }
    }

    if !pending.is_empty() {
        chunks.push(make_chunk(chunks.len(), pending, pending_tokens, false));
    }

    // Structural invariants: a violation here is a chunker defect, not an
    // input problem, so fail loudly.
    let placed: usize = chunks.iter().map(|c| c.files.len()).sum();
    assert_eq!(
        placed,
        files.len(),
        "chunker lost or duplicated files: {} in, {} placed",
        files.len(),
        placed
    );
    for chunk in &chunks {
        assert!(!chunk.files.is_empty(), "chunk {} is empty", chunk.id);
        assert!(
            chunk.token_count <= max_tokens || (chunk.files.len() == 1 && chunk.oversized),
            "chunk {} exceeds budget without the oversized flag",
            chunk.id
        );
    }

    chunks
}

fn make_chunk(id: usize, files: Vec<SourceFile>, token_count: usize, oversized: bool) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(serialize_files(files.iter()).as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id,
        files,
        token_count,
        oversized,
        hash,
    }
}

/// Build the bounded project-structure artifact for the overview call.
///
/// Contains a per-extension file listing (at most
/// [`OVERVIEW_FILES_PER_EXTENSION`] names per extension, with an elision
/// line) and the content of any file whose path mentions a readme. This
/// artifact is exempt from the chunk budget; its inputs are counts and capped
/// listings, which keeps it small.
pub fn build_overview_text(files: &[SourceFile]) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.push("=== PROJECT STRUCTURE ===\n".to_string());

    let mut by_extension: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    let mut readme_content: Option<&str> = None;

    for file in files {
        let ext = if file.extension.is_empty() {
            "no_extension".to_string()
        } else {
            file.extension.clone()
        };
        by_extension.entry(ext).or_default().push(&file.path);

        if file.path.to_lowercase().contains("readme") {
            readme_content = Some(&file.content);
        }
    }

    for (ext, mut paths) in by_extension {
        paths.sort_unstable();
        parts.push(format!("\n{} files ({}):", ext, paths.len()));
        for path in paths.iter().take(OVERVIEW_FILES_PER_EXTENSION) {
            parts.push(format!("  - {}", path));
        }
        if paths.len() > OVERVIEW_FILES_PER_EXTENSION {
            parts.push(format!(
                "  ... and {} more",
                paths.len() - OVERVIEW_FILES_PER_EXTENSION
            ));
        }
    }

    if let Some(readme) = readme_content {
        parts.push("\n\n=== README CONTENT ===\n".to_string());
        parts.push(readme.to_string());
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::HeuristicTokenEstimator;

    /// Estimator driven by per-file costs: the cost of a serialized text is
    /// the sum of the costs of the files framed in it, plus a fixed overhead
    /// for each file after the first.
    struct PerFileCost {
        costs: Vec<(&'static str, usize)>,
        joint_overhead: usize,
    }

    impl TokenEstimator for PerFileCost {
        fn count(&self, text: &str) -> usize {
            let mut total = 0;
            let mut matched = 0;
            for (path, cost) in &self.costs {
                if text.contains(&format!("=== File: {} ===", path)) {
                    total += cost;
                    matched += 1;
                }
            }
            if matched > 1 {
                total += self.joint_overhead * (matched - 1);
            }
            total
        }
    }

    fn file(path: &str, content: &str) -> SourceFile {
        SourceFile::new(path, content, ".java")
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = chunk_files(&[], 100, &HeuristicTokenEstimator);
        assert!(chunks.is_empty());
    }

    #[test]
    fn packs_files_up_to_the_budget() {
        // Scenario: budget 100; X costs 40, Y costs 55, Z costs 95, with 5
        // extra per additional file in a chunk. X+Y serialize to exactly 100,
        // which is accepted; Z starts chunk 1.
        let estimator = PerFileCost {
            costs: vec![("x.java", 40), ("y.java", 55), ("z.java", 95)],
            joint_overhead: 5,
        };
        let files = vec![file("x.java", "x"), file("y.java", "y"), file("z.java", "z")];

        let chunks = chunk_files(&files, 100, &estimator);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].file_paths(), vec!["x.java", "y.java"]);
        assert_eq!(chunks[0].token_count, 100);
        assert!(!chunks[0].oversized);
        assert_eq!(chunks[1].file_paths(), vec!["z.java"]);
        assert_eq!(chunks[1].token_count, 95);
        assert!(!chunks[1].oversized);
    }

    #[test]
    fn oversized_file_becomes_flagged_singleton() {
        let estimator = PerFileCost {
            costs: vec![("huge.java", 500)],
            joint_overhead: 0,
        };
        let files = vec![file("huge.java", "big")];

        let chunks = chunk_files(&files, 100, &estimator);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].files.len(), 1);
        assert!(chunks[0].oversized);
        assert_eq!(chunks[0].token_count, 500);
    }

    #[test]
    fn oversized_file_after_sealed_chunk() {
        // a+b fill a chunk; c alone is over budget and must be sealed
        // immediately, leaving d to start a fresh chunk.
        let estimator = PerFileCost {
            costs: vec![("a.java", 60), ("b.java", 30), ("c.java", 300), ("d.java", 20)],
            joint_overhead: 5,
        };
        let files = vec![
            file("a.java", "a"),
            file("b.java", "b"),
            file("c.java", "c"),
            file("d.java", "d"),
        ];

        let chunks = chunk_files(&files, 100, &estimator);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].file_paths(), vec!["a.java", "b.java"]);
        assert!(chunks[1].oversized);
        assert_eq!(chunks[1].file_paths(), vec!["c.java"]);
        assert!(!chunks[2].oversized);
        assert_eq!(chunks[2].file_paths(), vec!["d.java"]);
    }

    #[test]
    fn exact_budget_is_not_oversized() {
        let estimator = PerFileCost {
            costs: vec![("a.java", 100)],
            joint_overhead: 0,
        };
        let chunks = chunk_files(&[file("a.java", "a")], 100, &estimator);
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].oversized);
    }

    #[test]
    fn chunk_ids_are_contiguous_from_zero() {
        let files: Vec<SourceFile> = (0..30)
            .map(|i| file(&format!("f{:02}.java", i), &"line\n".repeat(40)))
            .collect();
        let chunks = chunk_files(&files, 60, &HeuristicTokenEstimator);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, i);
        }
    }

    #[test]
    fn covers_every_file_exactly_once() {
        let files: Vec<SourceFile> = (0..25)
            .map(|i| file(&format!("m{:02}.java", i), &"x".repeat(i * 17 + 1)))
            .collect();
        let chunks = chunk_files(&files, 80, &HeuristicTokenEstimator);

        let mut seen: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.file_paths())
            .collect();
        assert_eq!(seen.len(), files.len());
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), files.len());
    }

    #[test]
    fn boundaries_independent_of_input_order() {
        let mut forward: Vec<SourceFile> = (0..12)
            .map(|i| file(&format!("p{}.java", i), &"content\n".repeat(i + 1)))
            .collect();
        let reversed: Vec<SourceFile> = forward.iter().rev().cloned().collect();
        forward.rotate_left(5);

        let a = chunk_files(&forward, 50, &HeuristicTokenEstimator);
        let b = chunk_files(&reversed, 50, &HeuristicTokenEstimator);

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.file_paths(), y.file_paths());
            assert_eq!(x.token_count, y.token_count);
            assert_eq!(x.hash, y.hash);
        }
    }

    #[test]
    fn serialization_frames_each_file() {
        let f = SourceFile::new("src/main.rs", "fn main() {}\n", ".rs");
        let text = serialize_files(std::iter::once(&f));
        assert!(text.contains("=== File: src/main.rs ==="));
        assert!(text.contains("Extension: .rs"));
        assert!(text.contains("Lines: 2"));
        assert!(text.contains("fn main() {}"));
        assert!(text.contains(&"=".repeat(80)));
    }

    #[test]
    fn overview_groups_by_extension_and_includes_readme() {
        let files = vec![
            SourceFile::new("README.md", "# My Project\nDoes things.", ".md"),
            SourceFile::new("src/a.java", "class A {}", ".java"),
            SourceFile::new("src/b.java", "class B {}", ".java"),
            SourceFile::new("Makefile", "all:", ""),
        ];
        let overview = build_overview_text(&files);
        assert!(overview.contains("=== PROJECT STRUCTURE ==="));
        assert!(overview.contains(".java files (2):"));
        assert!(overview.contains("  - src/a.java"));
        assert!(overview.contains("no_extension files (1):"));
        assert!(overview.contains("=== README CONTENT ==="));
        assert!(overview.contains("# My Project"));
    }

    #[test]
    fn overview_elides_long_listings() {
        let files: Vec<SourceFile> = (0..60)
            .map(|i| SourceFile::new(format!("src/f{:03}.java", i), "", ".java"))
            .collect();
        let overview = build_overview_text(&files);
        assert!(overview.contains(".java files (60):"));
        assert!(overview.contains("  ... and 10 more"));
    }
}
