//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// pulse360 - 360-degree feedback analytics and reporting
///
/// Compute per-category averages, strengths and growth areas, rating
/// distributions, and score trends from an assessment dataset export.
/// Markdown/JSON reports. Built in Rust.
///
/// Examples:
///   pulse360 --data assessments.json
///   pulse360 --data assessments.json --user u-dana --cycle q1-2025
///   pulse360 --data assessments.json --user u-dana --trend --format json
///   pulse360 --data assessments.json --dry-run
///   pulse360 --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the assessment dataset export (JSON)
    ///
    /// Not required when using --init-config.
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub data: Option<PathBuf>,

    /// User id of the employee to report on
    ///
    /// Without --cycle, the most recently completed cycle is used.
    #[arg(short, long, value_name = "ID")]
    pub user: Option<String>,

    /// Cycle id to report on
    ///
    /// Combined with --user it pins the participation; alone it covers
    /// every participant of the cycle.
    #[arg(long, value_name = "ID")]
    pub cycle: Option<String>,

    /// Output file path for the report
    #[arg(
        short,
        long,
        default_value = "pulse360_report.md",
        value_name = "FILE"
    )]
    pub output: PathBuf,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Number of categories in each of strengths and growth areas
    #[arg(long, default_value = "3", value_name = "N")]
    pub top_n: usize,

    /// Include the score-over-cycles trend section (requires --user)
    #[arg(long)]
    pub trend: bool,

    /// Generate development recommendations with the configured model
    #[arg(long)]
    pub recommend: bool,

    /// Model to use for recommendations
    ///
    /// Can also be set via PULSE360_MODEL env var or .pulse360.toml config.
    #[arg(short, long, default_value = "qwen2.5:14b", env = "PULSE360_MODEL")]
    pub model: String,

    /// Chat endpoint base URL for recommendations
    #[arg(long, default_value = "http://localhost:11434", env = "PULSE360_LLM_URL")]
    pub llm_url: String,

    /// Proxy authentication token for the chat endpoint
    #[arg(long, value_name = "TOKEN", env = "PULSE360_LLM_TOKEN")]
    pub llm_token: Option<String>,

    /// Temperature for the recommendation model (0.0 - 1.0)
    #[arg(long, default_value = "0.2")]
    pub temperature: f32,

    /// Request timeout in seconds for the recommendation model
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Fail when the overall average is below this score
    ///
    /// Useful for tracking regressions in pipelines. Exit code 2 when the
    /// threshold is not met. Values: 1.0 - 5.0
    #[arg(long, value_name = "SCORE")]
    pub fail_below: Option<f64>,

    /// Dry run: load and validate the dataset without generating a report
    ///
    /// Prints the dataset totals and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .pulse360.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pulse360.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate dataset path
        if let Some(ref data) = self.data {
            if !data.exists() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
            if !data.is_file() {
                return Err(format!("Dataset path is not a file: {}", data.display()));
            }
        }

        // Trend charts need a subject to follow across cycles
        if self.trend && self.user.is_none() {
            return Err("--trend requires --user".to_string());
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        // Validate top-n
        if self.top_n == 0 {
            return Err("Top-n must be at least 1".to_string());
        }

        // Validate threshold range
        if let Some(threshold) = self.fail_below {
            if !(1.0..=5.0).contains(&threshold) {
                return Err("Fail-below threshold must be between 1.0 and 5.0".to_string());
            }
        }

        // Validate LLM endpoint URL (only needed with --recommend)
        if self.recommend
            && !self.llm_url.starts_with("http://")
            && !self.llm_url.starts_with("https://")
        {
            return Err("LLM URL must start with 'http://' or 'https://'".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data: None,
            user: None,
            cycle: None,
            output: PathBuf::from("report.md"),
            format: OutputFormat::Markdown,
            top_n: 3,
            trend: false,
            recommend: false,
            model: "qwen2.5:14b".to_string(),
            llm_url: "http://localhost:11434".to_string(),
            llm_token: None,
            temperature: 0.2,
            timeout: None,
            fail_below: None,
            dry_run: false,
            init_config: false,
            config: None,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_validation_trend_without_user() {
        let mut args = make_args();
        args.trend = true;
        assert!(args.validate().is_err());

        args.user = Some("u1".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_dataset() {
        let mut args = make_args();
        args.data = Some(PathBuf::from("/definitely/not/a/file.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_llm_url() {
        let mut args = make_args();
        args.recommend = true;
        args.llm_url = "localhost:11434".to_string();
        assert!(args.validate().is_err());

        // A bad URL without --recommend is never used, so it passes
        args.recommend = false;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_threshold_range() {
        let mut args = make_args();
        args.fail_below = Some(0.5);
        assert!(args.validate().is_err());

        args.fail_below = Some(3.5);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
