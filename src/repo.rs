//! Repository cloning and metadata.
//!
//! Keeps a local working copy of the configured repository up to date by
//! shelling out to `git`, and collects the metadata (branch, last commit)
//! that ends up in the report. A failed pull is a warning, not a fatal
//! error — analysis proceeds on the existing copy.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

use crate::config::RepositoryConfig;
use crate::models::{CommitInfo, RepoInfo};

/// Clone the repository if the local copy does not exist, otherwise pull.
pub fn clone_or_update(config: &RepositoryConfig) -> Result<()> {
    let local = &config.local_path;

    if local.join(".git").exists() {
        if let Err(err) = git_pull(local) {
            eprintln!(
                "Warning: could not update {}: {} (using existing copy)",
                local.display(),
                err
            );
        }
        return Ok(());
    }

    if let Some(parent) = local.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    git_clone(&config.url, local)
}

/// Collect repository metadata for the report.
///
/// Best effort: when the local copy is missing or `git` fails, returns the
/// url/path alone so the report still carries provenance.
pub fn repository_info(config: &RepositoryConfig) -> RepoInfo {
    let mut info = RepoInfo {
        url: config.url.clone(),
        local_path: config.local_path.display().to_string(),
        branch: None,
        last_commit: None,
    };

    if !config.local_path.join(".git").exists() {
        return info;
    }

    match git_output(&config.local_path, &["rev-parse", "--abbrev-ref", "HEAD"]) {
        Ok(branch) => info.branch = Some(branch),
        Err(err) => eprintln!("Warning: could not read branch: {}", err),
    }

    // %H, author, ISO date, subject — one field per line.
    match git_output(&config.local_path, &["log", "-1", "--format=%H%n%an%n%aI%n%s"]) {
        Ok(out) => {
            let mut lines = out.lines();
            if let (Some(hash), Some(author), Some(date), Some(message)) =
                (lines.next(), lines.next(), lines.next(), lines.next())
            {
                info.last_commit = Some(CommitInfo {
                    hash: hash.chars().take(8).collect(),
                    author: author.to_string(),
                    date: date.to_string(),
                    message: message.to_string(),
                });
            }
        }
        Err(err) => eprintln!("Warning: could not read last commit: {}", err),
    }

    info
}

fn git_clone(url: &str, dest: &Path) -> Result<()> {
    let status = Command::new("git")
        .args(["clone", url])
        .arg(dest)
        .status()
        .context("Failed to run git (is it installed?)")?;

    if !status.success() {
        bail!("git clone of {} failed with {}", url, status);
    }
    Ok(())
}

fn git_pull(dir: &Path) -> Result<()> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["pull", "--ff-only"])
        .output()
        .context("Failed to run git (is it installed?)")?;

    if !output.status.success() {
        bail!("{}", String::from_utf8_lossy(&output.stderr).trim());
    }
    Ok(())
}

fn git_output(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .context("Failed to run git (is it installed?)")?;

    if !output.status.success() {
        bail!("{}", String::from_utf8_lossy(&output.stderr).trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn info_without_local_copy_keeps_provenance() {
        let config = RepositoryConfig {
            url: "https://github.com/example/project".to_string(),
            local_path: PathBuf::from("/nonexistent/repo"),
        };
        let info = repository_info(&config);
        assert_eq!(info.url, "https://github.com/example/project");
        assert!(info.branch.is_none());
        assert!(info.last_commit.is_none());
    }
}
