//! # codio-grader
//!
//! An autograder for student Python and micro:bit submissions. An assignment
//! declares weighted criteria (syntax checks, output matching, AI review);
//! each is scored independently, clamped into its point budget, and reported
//! with feedback.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// The assignment descriptor and criterion configuration.
pub mod assignment;
/// Settings read from the environment.
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Grade submission and tracking-database logging.
pub mod delivery;
/// For all things related to grading
pub mod grade;
/// The completion oracle behind AI review and verdicts.
pub mod oracle;
/// Subprocess execution with a deadline.
pub mod process;
/// The student's code as one text.
pub mod submission;
/// Utility functions for convenience
pub mod util;

use std::sync::Arc;

use assignment::Assignment;
use config::Settings;
use grade::{GradingReport, ScoringEngine, VerdictGrader};
use oracle::Oracle;
use submission::SubmissionCode;
use tracing::info;

/// Grades `code` for `assignment`: with the scoring engine when criteria are
/// declared, otherwise with a yes/no verdict on the assignment prompt.
pub async fn grade_submission(
    assignment: &Assignment,
    code: &SubmissionCode,
    oracle: Arc<dyn Oracle>,
    settings: &Settings,
) -> GradingReport {
    match assignment.criteria() {
        Some(criteria) => {
            info!(count = criteria.len(), "grading with criteria");
            ScoringEngine::from_settings(oracle, settings)
                .evaluate(&criteria, code)
                .await
        }
        None => {
            info!("no criteria configured; grading with a verdict");
            VerdictGrader::new(oracle)
                .with_timeout(settings.oracle_timeout)
                .grade(&assignment.assignment_prompt, code)
                .await
        }
    }
}
