use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Supported LLM provider names, in the order shown in error messages.
pub const PROVIDERS: &[&str] = &["github", "openai", "anthropic"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositoryConfig {
    pub url: String,
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./data/repo")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens_per_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    6000
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider name: `github`, `openai`, or `anthropic`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override; each provider has a sensible default.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            max_output_tokens: default_max_output_tokens(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "github".to_string()
}
fn default_max_output_tokens() -> u32 {
    2000
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    #[serde(default = "default_include_extensions")]
    pub include_extensions: Vec<String>,
    #[serde(default = "default_exclude_directories")]
    pub exclude_directories: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include_extensions: default_include_extensions(),
            exclude_directories: default_exclude_directories(),
        }
    }
}

fn default_include_extensions() -> Vec<String> {
    vec![
        ".java".to_string(),
        ".xml".to_string(),
        ".properties".to_string(),
        ".md".to_string(),
    ]
}

fn default_exclude_directories() -> Vec<String> {
    vec![
        ".git".to_string(),
        "target".to_string(),
        "bin".to_string(),
        ".idea".to_string(),
        ".vscode".to_string(),
        "node_modules".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

/// Load and validate the configuration file.
///
/// Validation happens here, before any repository file is read — an invalid
/// configuration is a startup error, never a pipeline error.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens_per_chunk == 0 {
        anyhow::bail!("chunking.max_tokens_per_chunk must be > 0");
    }

    if !PROVIDERS.contains(&config.llm.provider.as_str()) {
        anyhow::bail!(
            "Unknown LLM provider: '{}'. Must be one of: {}",
            config.llm.provider,
            PROVIDERS.join(", ")
        );
    }

    if config.files.include_extensions.is_empty() {
        anyhow::bail!("files.include_extensions must not be empty");
    }
    for ext in &config.files.include_extensions {
        if !ext.starts_with('.') {
            anyhow::bail!("files.include_extensions entries must start with '.': '{}'", ext);
        }
    }

    if config.repository.url.trim().is_empty() {
        anyhow::bail!("repository.url must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load_from_str(content: &str) -> Result<Config> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_config(file.path())
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = load_from_str(
            r#"
[repository]
url = "https://github.com/example/project"
"#,
        )
        .unwrap();

        assert_eq!(config.chunking.max_tokens_per_chunk, 6000);
        assert_eq!(config.llm.provider, "github");
        assert_eq!(config.llm.max_output_tokens, 2000);
        assert!(config.files.include_extensions.contains(&".java".to_string()));
        assert!(config.files.exclude_directories.contains(&".git".to_string()));
        assert_eq!(config.output.dir, PathBuf::from("./output"));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = load_from_str(
            r#"
[repository]
url = "https://github.com/example/project"

[chunking]
max_tokens_per_chunk = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_tokens_per_chunk"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = load_from_str(
            r#"
[repository]
url = "https://github.com/example/project"

[llm]
provider = "cohere"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    fn extension_without_dot_is_rejected() {
        let err = load_from_str(
            r#"
[repository]
url = "https://github.com/example/project"

[files]
include_extensions = ["java"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("start with '.'"));
    }
}
