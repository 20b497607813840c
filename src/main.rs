//! pulse360 - 360-degree feedback analytics and reporting
//!
//! A CLI tool that reduces an assessment dataset export into per-category
//! and overall score statistics and renders Markdown/JSON reports,
//! optionally with LLM-generated development recommendations.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad dataset, config, I/O, LLM failure)
//!   2 - Overall average below the --fail-below threshold

mod analysis;
mod cli;
mod config;
mod dataset;
mod models;
mod recommend;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use dataset::{Dataset, Scope};
use indicatif::{ProgressBar, ProgressStyle};
use models::{CycleScore, Report, ReportMetadata, ReportScope};
use recommend::{LlmConfig, RecommendationClient, RecommendationInput};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("pulse360 v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Generate the report
    match run_report(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report generation failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .pulse360.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".pulse360.toml");

    if path.exists() {
        eprintln!("⚠️  .pulse360.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .pulse360.toml")?;

    println!("✅ Created .pulse360.toml with default settings.");
    println!("   Edit it to customize the model, report sections, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete reporting workflow. Returns exit code (0 or 2).
async fn run_report(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let data_path = args
        .data
        .clone()
        .context("Dataset path is required")?;

    // Step 1: Load and validate the dataset
    println!("📥 Loading dataset: {}", data_path.display());
    let dataset = Dataset::load(&data_path)?;
    dataset.validate()?;

    // Handle --dry-run: validate and summarize, then exit
    if args.dry_run {
        return handle_dry_run(&dataset);
    }

    // Step 2: Resolve the report scope
    let (rows, report_scope, subject, cycle_name) = resolve_scope(&dataset, &args)?;
    info!("Scope covers {} responses", rows.len());

    // Step 3: Run the aggregation engine
    println!("🧮 Aggregating {} responses...", rows.len());
    let summary = analysis::build_summary(&rows, config.analysis.top_n)?;

    let mut comments = if config.report.include_comments {
        analysis::collect_comments(&rows)
    } else {
        Vec::new()
    };
    comments.truncate(config.report.max_comments);

    // Step 4: Score trend across the user's completed cycles
    let trend = if args.trend {
        match args.user.as_deref() {
            Some(user_id) => compute_user_trend(&dataset, user_id)?,
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    // Step 5: Development recommendations
    let mut model_used = None;
    let recommendations = if args.recommend {
        let text = generate_recommendations(
            &config,
            &args,
            &dataset,
            &summary,
            &comments,
            subject.as_deref(),
            cycle_name.as_deref(),
        )
        .await?;
        model_used = Some(config.llm.model.clone());
        Some(text)
    } else {
        None
    };

    // Step 6: Assemble and save the report
    println!("\n📝 Generating report...");

    let respondent_count = rows
        .iter()
        .map(|r| r.respondent_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    let report_doc = Report {
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            dataset: data_path.display().to_string(),
            scope: report_scope,
            subject,
            cycle: cycle_name,
            respondents: respondent_count,
            model_used,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        summary,
        trend,
        comments,
        recommendations,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report_doc)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report_doc),
    };

    std::fs::write(&args.output, &output)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    // Print summary
    println!("\n📊 Report Summary:");
    if let Some(ref s) = report_doc.metadata.subject {
        println!("   Employee: {}", s);
    }
    if let Some(ref c) = report_doc.metadata.cycle {
        println!("   Cycle: {}", c);
    }
    println!(
        "   Overall average: {:.2} / 5",
        report_doc.summary.overall_average
    );
    println!(
        "   Categories: {} | Responses: {} | Respondents: {}",
        report_doc.summary.category_averages.len(),
        report_doc.summary.total_responses,
        report_doc.metadata.respondents
    );
    println!(
        "\n✅ Report saved to: {}",
        args.output.display()
    );

    // Check --fail-below threshold
    if let Some(threshold) = args.fail_below {
        let has_data = !report_doc.summary.category_averages.is_empty();
        if has_data && report_doc.summary.overall_average < threshold {
            eprintln!(
                "\n⛔ Overall average {:.2} is below the {:.2} threshold. Failing (exit code 2).",
                report_doc.summary.overall_average, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Select the responses a report covers and describe the scope.
fn resolve_scope(
    dataset: &Dataset,
    args: &Args,
) -> Result<(
    Vec<models::ResponseRow>,
    ReportScope,
    Option<String>,
    Option<String>,
)> {
    if let Some(ref user_id) = args.user {
        return match dataset.resolve_participant(user_id, args.cycle.as_deref())? {
            Some(participant) => {
                let rows = dataset.rows_in_scope(&Scope::Participant(participant.id.clone()))?;
                let cycle_name = dataset
                    .cycle(&participant.cycle_id)
                    .map(|c| c.name.clone());
                Ok((
                    rows,
                    ReportScope::Participant,
                    Some(participant.user_name.clone()),
                    cycle_name,
                ))
            }
            None => {
                // The user exists but was not assessed in the requested
                // cycle: an empty report, not an error.
                warn!(
                    "User {} has no participation in cycle {:?}",
                    user_id, args.cycle
                );
                let subject = dataset
                    .participants
                    .iter()
                    .find(|p| p.user_id == *user_id)
                    .map(|p| p.user_name.clone());
                let cycle_name = args
                    .cycle
                    .as_deref()
                    .and_then(|cid| dataset.cycle(cid))
                    .map(|c| c.name.clone());
                Ok((Vec::new(), ReportScope::Participant, subject, cycle_name))
            }
        };
    }

    if let Some(ref cycle_id) = args.cycle {
        let rows = dataset.rows_in_scope(&Scope::Cycle(cycle_id.clone()))?;
        let cycle_name = dataset.cycle(cycle_id).map(|c| c.name.clone());
        return Ok((rows, ReportScope::Cycle, None, cycle_name));
    }

    let rows = dataset.rows_in_scope(&Scope::Organization)?;
    Ok((rows, ReportScope::Organization, None, None))
}

/// Overall averages of the user's completed cycles, as chart points.
fn compute_user_trend(dataset: &Dataset, user_id: &str) -> Result<Vec<models::TrendPoint>> {
    let mut cycle_scores = Vec::new();

    for (participant, cycle) in dataset.completed_participations(user_id) {
        let rows = dataset.rows_in_scope(&Scope::Participant(participant.id.clone()))?;
        let categories = analysis::compute_category_averages(&rows)?;
        if categories.is_empty() {
            // Cycles with no rating data contribute no point
            continue;
        }
        cycle_scores.push(CycleScore {
            cycle_id: cycle.id.clone(),
            cycle_name: cycle.name.clone(),
            end_date: cycle.end_date,
            overall_average: analysis::compute_overall_average(&categories),
        });
    }

    debug!("Trend spans {} cycles", cycle_scores.len());
    Ok(analysis::compute_trend(&cycle_scores))
}

/// Call the recommendation model for the computed report.
async fn generate_recommendations(
    config: &Config,
    args: &Args,
    dataset: &Dataset,
    summary: &models::ScoreSummary,
    comments: &[models::CommentEntry],
    subject: Option<&str>,
    cycle_name: Option<&str>,
) -> Result<String> {
    let llm_config = LlmConfig {
        base_url: config.llm.base_url.clone(),
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        timeout_seconds: config.llm.timeout_seconds,
        retries: config.llm.retries,
        token: config.llm.token.clone(),
    };
    let client = RecommendationClient::new(llm_config)?;

    println!("\n🤖 Generating development recommendations...");
    println!("   Model: {}", client.model());
    println!("   Endpoint: {}", config.llm.base_url);

    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Waiting for the model...");
        Some(pb)
    };

    let courses = dataset.active_courses();
    let input = RecommendationInput {
        subject_name: subject.unwrap_or("The organization"),
        cycle_name: cycle_name.unwrap_or("all cycles"),
        overall_average: summary.overall_average,
        categories: &summary.category_averages,
        comments,
        courses: &courses,
    };

    let result = client.generate(&input).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    result
}

/// Handle --dry-run: print dataset totals and exit.
fn handle_dry_run(dataset: &Dataset) -> Result<i32> {
    println!("\n🔍 Dry run: dataset validated, no report generated.\n");

    let totals = dataset.totals();
    println!(
        "   Cycles: {} ({} active, {} completed)",
        totals.cycles, totals.active_cycles, totals.completed_cycles
    );
    println!("   Participants: {}", totals.participants);
    println!("   Respondents: {}", totals.respondents);
    println!(
        "   Categories: {} | Questions: {}",
        totals.categories, totals.questions
    );
    println!("   Responses: {}", totals.responses);

    println!("\n✅ Dry run complete. The dataset is consistent.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .pulse360.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
