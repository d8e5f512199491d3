//! Repository file discovery and reading.
//!
//! Walks the working copy, keeps files matching the extension allow-list
//! outside the excluded directories, and reads their contents. Unreadable
//! files are skipped with a warning rather than failing the run. Output is
//! sorted by relative path so downstream behavior never depends on walk
//! order.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::FilesConfig;
use crate::models::SourceFile;

pub fn scan_repository(root: &Path, files_config: &FilesConfig) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        bail!("Repository path does not exist: {}", root.display());
    }

    let exclude_set = build_exclude_set(&files_config.exclude_directories)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        let Some(extension) = matched_extension(&rel_str, &files_config.include_extensions) else {
            continue;
        };

        let content = match read_text(path) {
            Some(content) => content,
            None => {
                eprintln!("Warning: could not read {}, skipping", path.display());
                continue;
            }
        };

        files.push(SourceFile::new(rel_str, content, extension));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

/// First allow-list extension the path ends with, if any.
fn matched_extension(rel_path: &str, include_extensions: &[String]) -> Option<String> {
    include_extensions
        .iter()
        .find(|ext| rel_path.ends_with(ext.as_str()))
        .cloned()
}

/// Read file content as text. Invalid UTF-8 is decoded lossily — the
/// analysis is tolerant of a few replacement characters, and losing a whole
/// file to one stray byte is worse.
fn read_text(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => Some(String::from_utf8_lossy(err.as_bytes()).into_owned()),
    }
}

fn build_exclude_set(exclude_directories: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for dir in exclude_directories {
        builder.add(Glob::new(&format!("**/{}/**", dir))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesConfig;
    use std::fs;

    fn files_config() -> FilesConfig {
        FilesConfig {
            include_extensions: vec![".java".to_string(), ".md".to_string()],
            exclude_directories: vec![".git".to_string(), "target".to_string()],
        }
    }

    #[test]
    fn keeps_allow_listed_extensions_only() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("App.java"), "class App {}").unwrap();
        fs::write(tmp.path().join("README.md"), "# readme").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let files = scan_repository(tmp.path(), &files_config()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["App.java", "README.md"]);
    }

    #[test]
    fn skips_excluded_directories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::create_dir_all(tmp.path().join("target/classes")).unwrap();
        fs::write(tmp.path().join("src/Main.java"), "class Main {}").unwrap();
        fs::write(tmp.path().join("target/classes/Main.java"), "compiled").unwrap();

        let files = scan_repository(tmp.path(), &files_config()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/Main.java");
    }

    #[test]
    fn output_is_path_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("zeta.java"), "z").unwrap();
        fs::write(tmp.path().join("alpha.java"), "a").unwrap();
        fs::write(tmp.path().join("mid.java"), "m").unwrap();

        let files = scan_repository(tmp.path(), &files_config()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["alpha.java", "mid.java", "zeta.java"]);
    }

    #[test]
    fn records_extension_and_size() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("A.java"), "class A {}").unwrap();

        let files = scan_repository(tmp.path(), &files_config()).unwrap();
        assert_eq!(files[0].extension, ".java");
        assert_eq!(files[0].size, 10);
    }

    #[test]
    fn missing_root_is_an_error() {
        let result = scan_repository(Path::new("/nonexistent/repo"), &files_config());
        assert!(result.is_err());
    }
}
