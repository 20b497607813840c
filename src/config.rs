//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pulse360.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Recommendation model settings.
    #[serde(default)]
    pub llm: LlmSettings,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "pulse360_report.md".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of categories listed in each of strengths and growth areas.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    crate::analysis::DEFAULT_TOP_N
}

/// Recommendation model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Default model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Chat endpoint base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on failure.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Proxy authentication token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            token: None,
        }
    }
}

fn default_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    90
}

fn default_retries() -> usize {
    3
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the respondent comments section.
    #[serde(default = "default_true")]
    pub include_comments: bool,

    /// Maximum comments rendered in the report.
    #[serde(default = "default_max_comments")]
    pub max_comments: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_comments: true,
            max_comments: default_max_comments(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_comments() -> usize {
    50
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".pulse360.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Model settings - always override since they have defaults in CLI
        self.llm.model = args.model.clone();
        self.llm.base_url = args.llm_url.clone();
        self.llm.temperature = args.temperature;

        // Timeout and token - only override if explicitly provided
        if let Some(timeout) = args.timeout {
            self.llm.timeout_seconds = timeout;
        }
        if let Some(ref token) = args.llm_token {
            self.llm.token = Some(token.clone());
        }

        // Aggregation settings - always override
        self.analysis.top_n = args.top_n;

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.model, "qwen2.5:14b");
        assert_eq!(config.analysis.top_n, 3);
        assert_eq!(config.general.output, "pulse360_report.md");
        assert!(config.report.include_comments);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "quarterly_report.md"
verbose = true

[analysis]
top_n = 5

[llm]
model = "llama3.2:latest"
temperature = 0.1

[report]
include_comments = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "quarterly_report.md");
        assert!(config.general.verbose);
        assert_eq!(config.analysis.top_n, 5);
        assert_eq!(config.llm.model, "llama3.2:latest");
        assert_eq!(config.llm.temperature, 0.1);
        assert_eq!(config.llm.retries, 3);
        assert!(!config.report.include_comments);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[llm]"));
        assert!(toml_str.contains("[report]"));
    }
}
