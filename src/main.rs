#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # codio-grader
//! ## Introduction
//!
//! Grades a student submission against `autograde_config.json`.
//!
//! Inside a Codio autograde job the grade and markdown feedback are sent to
//! Codio and, when configured, logged to Notion. Run anywhere else, the result
//! is printed as JSON on stdout with a table of per-criterion results on
//! stderr.

use std::{process::ExitCode, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use bpaf::*;
use codio_grader::{
    assignment::Assignment,
    config::{Settings, debug_enabled},
    constants::DEFAULT_CONFIG_PATH,
    delivery::{CodioClient, NotionLogger, student_email},
    grade::{CriterionResult, GradingReport},
    grade_submission,
    oracle::{OpenAiOracle, Oracle},
    submission::SubmissionCode,
};
use colored::Colorize;
use dotenvy::dotenv;
use serde::Serialize;
use tracing::{Level, error, info, metadata::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Command line options.
#[derive(Debug, Clone)]
struct Cli {
    /// Path to the assignment descriptor.
    config: String,
    /// Student e-mail override for Notion logging.
    email:  Option<String>,
    /// Primary oracle model override.
    model:  Option<String>,
    /// Include per-criterion results in local JSON output.
    json:   bool,
}

/// Parse the command line arguments and return the `Cli`
fn options() -> Cli {
    let config = short('c')
        .long("config")
        .help("Path to autograde_config.json")
        .argument::<String>("PATH")
        .fallback(DEFAULT_CONFIG_PATH.to_string())
        .display_fallback();

    let email = long("email")
        .help("Override the student e-mail used for Notion logging")
        .argument::<String>("EMAIL")
        .optional();

    let model = long("model")
        .help("Override the primary model (e.g. gpt-4o)")
        .argument::<String>("MODEL")
        .optional();

    let json = long("json")
        .help("Include per-criterion results in the local JSON output")
        .switch();

    construct!(Cli {
        config,
        email,
        model,
        json
    })
    .to_options()
    .descr("Run the Codio grader locally or inside Codio")
    .run()
}

/// The local-mode JSON summary.
#[derive(Debug, Serialize)]
struct LocalSummary<'a> {
    /// Percentage grade.
    grade:           u32,
    /// Markdown feedback transcript.
    feedback:        String,
    /// Whether every criterion earned full points.
    passed:          bool,
    /// Wall-clock grading time, rounded to centiseconds.
    elapsed_seconds: f64,
    /// Sum of awarded scores.
    total_score:     f64,
    /// Sum of point budgets.
    total_possible:  f64,
    /// Per-criterion results, with `--json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    results:         Option<&'a [CriterionResult]>,
}

/// Sends the grade to Codio, then logs it to Notion when configured.
///
/// Returns whether Codio accepted the grade; Notion failures are only
/// logged.
async fn deliver(
    settings: &Settings,
    opts: &Cli,
    assignment: &Assignment,
    grade: u32,
    feedback: &str,
) -> Result<bool> {
    let client = CodioClient::from_settings(&settings.codio)
        .context("Running inside Codio but CODIO_AUTOGRADE_V2_URL is not set")?;
    let accepted = client.send_grade(grade, feedback).await?;
    info!(grade, accepted, "grade sent to Codio");

    if let Some(notion) = &settings.notion {
        let email = student_email(opts.email.as_deref(), &settings.codio);
        let logged = NotionLogger::new(notion.clone())
            .log(
                &email,
                &assignment.assignment_title,
                grade,
                feedback,
                &assignment.grade_topic_id,
            )
            .await;
        if let Err(e) = logged {
            warn!("Notion log failed: {e:#}");
        }
    }

    Ok(accepted)
}

/// Prints the local-mode output.
fn print_local(report: &GradingReport, started: Instant, include_results: bool) -> Result<()> {
    let elapsed = started.elapsed().as_secs_f64();
    let summary = LocalSummary {
        grade: report.percentage(),
        feedback: report.to_markdown(),
        passed: report.passed(),
        elapsed_seconds: (elapsed * 100.0).round() / 100.0,
        total_score: report.total_score(),
        total_possible: report.total_possible(),
        results: include_results.then(|| report.results()),
    };

    eprintln!("{report}");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let verdict = if summary.passed {
        "PASSED".green().bold()
    } else {
        "NOT PASSED".red().bold()
    };
    eprintln!("{verdict} {}%", summary.grade);
    eprintln!("Elapsed time: {elapsed:.2} seconds");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let dotenv_result = dotenv();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let level = if debug_enabled() {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    if let Err(e) = dotenv_result
        && !e.not_found()
    {
        warn!("Could not load .env: {e}");
    }

    let opts = options();
    let settings = Settings::from_env();
    let in_codio = settings.codio.in_codio();
    let assignment = Assignment::load(&opts.config)?;
    let started = Instant::now();

    let code = match SubmissionCode::load(&assignment.files) {
        Ok(code) => code,
        Err(e) if in_codio => {
            error!("{e:#}");
            let accepted = deliver(&settings, &opts, &assignment, 0, &format!("{e:#}")).await?;
            return Ok(if accepted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Err(e) => return Err(e),
    };

    if !settings.openai.is_configured() {
        warn!("No OpenAI credentials found; AI-backed criteria will score zero");
    }
    let oracle: Arc<dyn Oracle> =
        Arc::new(OpenAiOracle::new(&settings.openai, opts.model.as_deref()));

    let report = grade_submission(&assignment, &code, oracle, &settings).await;

    if in_codio {
        let accepted = deliver(
            &settings,
            &opts,
            &assignment,
            report.percentage(),
            &report.to_markdown(),
        )
        .await?;
        if !accepted {
            error!("Codio rejected the grade");
            return Ok(ExitCode::FAILURE);
        }
    } else {
        print_local(&report, started, opts.json)?;
    }

    Ok(ExitCode::SUCCESS)
}
