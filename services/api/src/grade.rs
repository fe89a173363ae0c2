use card_grader::config::AppConfig;
use card_grader::error::AppError;
use card_grader::grading::{GradeResult, GradingConfig, GradingEngine};
use card_grader::telemetry;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Args, Debug, Default)]
pub(crate) struct GradeArgs {
    /// Assessment JSON file. Reads stdin when omitted or set to "-".
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// Record validator caps without applying them
    #[arg(long)]
    pub(crate) log_only: bool,
    /// Block every grade of 10
    #[arg(long)]
    pub(crate) statistical_hard_cap: bool,
    /// Pretty-print the JSON result
    #[arg(long)]
    pub(crate) pretty: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeOutput {
    pub(crate) graded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub(crate) result: GradeResult,
}

pub(crate) async fn run_grade(args: GradeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let raw = read_input(args.input.as_ref()).await?;
    let output = grade_document(&raw, apply_flags(config.grading, &args))?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(rendered.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

/// Command-line switches can only turn flags on; they never disable what the
/// environment enabled.
pub(crate) fn apply_flags(mut grading: GradingConfig, args: &GradeArgs) -> GradingConfig {
    grading.validator.log_only |= args.log_only;
    grading.validator.statistical_hard_cap |= args.statistical_hard_cap;
    grading
}

pub(crate) fn grade_document(raw: &str, grading: GradingConfig) -> Result<GradeOutput, AppError> {
    let document: Value = serde_json::from_str(raw)?;
    let engine = GradingEngine::new(grading);
    Ok(GradeOutput {
        graded_at: Utc::now(),
        result: engine.grade_json(document),
    })
}

async fn read_input(path: Option<&PathBuf>) -> Result<String, AppError> {
    match path {
        Some(path) if path.as_os_str() != "-" => Ok(tokio::fs::read_to_string(path).await?),
        _ => {
            let mut buffer = String::new();
            tokio::io::stdin().read_to_string(&mut buffer).await?;
            Ok(buffer)
        }
    }
}
