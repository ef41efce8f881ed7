#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Output comparison: run the submission once and compare what it prints.

use std::{collections::HashSet, ffi::OsString, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use similar::{ChangeTag, TextDiff};
use tracing::{debug, warn};

use super::{engine::CriterionStrategy, results::Evaluation};
use crate::{
    assignment::{Criterion, CriterionKind},
    constants::EXEC_TIMEOUT,
    process::{self, ProcessError},
    submission::SubmissionCode,
    util,
};

/// Similarity floor applied when the expected text appears verbatim in the
/// actual output. Tunable; not derived from anything principled.
pub const SUBSTRING_FLOOR: f64 = 0.8;

/// The three signals behind a partial-credit similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    /// `1 - |len(a) - len(e)| / max(len(a), len(e))`, 0 when both are empty.
    pub length_ratio: f64,
    /// Whether the expected text is a substring of the actual text.
    pub contains:     bool,
    /// Fraction of expected words that also appear in the actual output.
    pub word_overlap: Option<f64>,
}

impl Similarity {
    /// Measures how close `actual` is to `expected`.
    pub fn measure(actual: &str, expected: &str) -> Self {
        let actual_len = actual.chars().count();
        let expected_len = expected.chars().count();
        let longest = actual_len.max(expected_len);
        let length_ratio = if longest == 0 {
            0.0
        } else {
            1.0 - actual_len.abs_diff(expected_len) as f64 / longest as f64
        };

        let contains = !expected.is_empty() && actual.contains(expected);

        let expected_words: HashSet<&str> = expected.split_whitespace().collect();
        let actual_words: HashSet<&str> = actual.split_whitespace().collect();
        let word_overlap = if expected_words.is_empty() || actual_words.is_empty() {
            None
        } else {
            let common = expected_words.intersection(&actual_words).count();
            Some(common as f64 / expected_words.len() as f64)
        };

        Self {
            length_ratio,
            contains,
            word_overlap,
        }
    }

    /// The strongest signal, in `[0, 1]`.
    pub fn score(&self) -> f64 {
        let mut best = self.length_ratio;
        if self.contains {
            best = best.max(SUBSTRING_FLOOR);
        }
        if let Some(overlap) = self.word_overlap {
            best = best.max(overlap);
        }
        best.clamp(0.0, 1.0)
    }
}

/// Formats a diff between expected and actual output.
fn format_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut output = String::new();

    for change in diff.iter_all_changes() {
        let prefix = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        output.push_str(&format!("{} {}", prefix, change));
        if change.missing_newline() {
            output.push('\n');
        }
    }

    output
}

/// What happened when the submission was run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Exited successfully with this stdout.
    Finished(String),
    /// Exited unsuccessfully.
    Failed {
        /// Exit code, if the process was not killed by a signal.
        code:   Option<i32>,
        /// Captured stderr.
        stderr: String,
    },
    /// Killed after exceeding the deadline.
    TimedOut(Duration),
}

/// Runs submissions in a throwaway directory and compares their stdout.
#[derive(Debug, Clone)]
pub struct OutputComparator {
    /// Interpreter name or path; discovered on PATH when unset.
    interpreter: Option<String>,
    /// Hard wall-clock limit per run.
    timeout:     Duration,
    /// Parent directory for per-run scratch directories.
    scratch_dir: Option<PathBuf>,
}

impl Default for OutputComparator {
    fn default() -> Self {
        Self {
            interpreter: None,
            timeout:     EXEC_TIMEOUT,
            scratch_dir: None,
        }
    }
}

impl OutputComparator {
    /// Creates a comparator with the default 5 second limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `interpreter` instead of searching PATH.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    /// Overrides the execution time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates per-run scratch directories under `dir` instead of the
    /// system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Returns the execution time limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `code` as a standalone program with no stdin.
    ///
    /// The program is written into a fresh scratch directory which is
    /// removed when this returns, whatever the outcome.
    pub async fn run(&self, code: &str) -> Result<RunOutcome> {
        let interpreter = util::python_path(self.interpreter.as_deref())?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("grader-run-");
        let scratch = match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .context("Could not create a scratch directory for the submission")?;

        let script = scratch.path().join("submission.py");
        tokio::fs::write(&script, code)
            .await
            .with_context(|| format!("Could not write {}", script.display()))?;

        let env = [(OsString::from("PYTHONDONTWRITEBYTECODE"), OsString::from("1"))];
        let result = process::run_collect(
            &interpreter,
            &[script.clone().into_os_string()],
            Some(scratch.path()),
            &env,
            Some(self.timeout),
        )
        .await;

        let outcome = match result {
            Ok(collected) if collected.status.success() => {
                RunOutcome::Finished(collected.stdout_lossy())
            }
            Ok(collected) => RunOutcome::Failed {
                code:   collected.status.code(),
                stderr: collected.stderr_lossy(),
            },
            Err(ProcessError::TimedOut { limit }) => RunOutcome::TimedOut(limit),
            Err(e) => return Err(e).context("Could not run the submission"),
        };

        if let Err(e) = scratch.close() {
            warn!("failed to remove scratch directory: {e}");
        }
        Ok(outcome)
    }

    /// Runs `code` and scores its output against `expected`.
    pub async fn compare(
        &self,
        code: &str,
        expected: &str,
        partial_credit: bool,
        points: f64,
    ) -> Result<Evaluation> {
        let actual = match self.run(code).await? {
            RunOutcome::Finished(stdout) => stdout,
            RunOutcome::TimedOut(limit) => {
                return Ok(Evaluation::zero(format!(
                    "Execution timed out after {} seconds.",
                    limit.as_secs_f64()
                )));
            }
            RunOutcome::Failed { code, stderr } => {
                let status = code.map_or_else(|| "killed".to_string(), |c| format!("exit code {c}"));
                return Ok(Evaluation::zero(format!(
                    "Execution failed ({status}):\n{}",
                    stderr.trim()
                )));
            }
        };

        Ok(Self::score_output(actual.trim(), expected.trim(), partial_credit, points))
    }

    /// Scores already captured output; both sides are expected to be trimmed.
    pub fn score_output(
        actual: &str,
        expected: &str,
        partial_credit: bool,
        points: f64,
    ) -> Evaluation {
        if actual == expected {
            return Evaluation::new(points, "Output matches the expected output.");
        }

        let comparison = format!(
            "Expected: {expected:?}\nActual: {actual:?}\n\nDiff:\n{}",
            format_diff(expected, actual)
        );

        if !partial_credit {
            return Evaluation::zero(format!("Output does not match.\n{comparison}"));
        }

        let similarity = Similarity::measure(actual, expected);
        let ratio = similarity.score();
        debug!(?similarity, ratio, "partial credit");
        Evaluation::new(
            ratio * points,
            format!(
                "Output partially matches ({:.0}% similar).\n{comparison}",
                ratio * 100.0
            ),
        )
    }
}

#[async_trait]
impl CriterionStrategy for OutputComparator {
    async fn evaluate(&self, criterion: &Criterion, code: &SubmissionCode) -> Result<Evaluation> {
        let CriterionKind::OutputMatch {
            expected,
            partial_credit,
        } = criterion.kind()
        else {
            bail!("output comparator cannot evaluate `{}` criteria", criterion.kind().tag());
        };

        self.compare(code.as_str(), expected, *partial_credit, criterion.points())
            .await
    }
}
