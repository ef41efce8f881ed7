#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Syntax checks: compile the submission, then score a required-element
//! checklist proportionally.

use std::{ffi::OsString, time::Duration};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, warn};

use super::{
    engine::CriterionStrategy,
    parser::{Parser, SyntaxIssue},
    patterns::{MicrobitElement, PythonElement},
    results::Evaluation,
};
use crate::{
    assignment::{Criterion, CriterionKind, Language},
    constants::EXEC_TIMEOUT,
    process,
    submission::SubmissionCode,
    util,
};

/// Compiles the file named by `argv[1]` and, on failure, prints the error
/// class, line, column and message on separate lines before exiting with 1.
const COMPILE_SCRIPT: &str = "\
import sys
try:
    with open(sys.argv[1], encoding='utf-8') as f:
        compile(f.read(), '<submission>', 'exec')
except (SyntaxError, ValueError) as e:
    print(type(e).__name__, getattr(e, 'lineno', None) or 1, getattr(e, 'offset', None) or 1,
          getattr(e, 'msg', None) or e, sep='\\n')
    sys.exit(1)
";

/// Outcome of compiling a submission with the interpreter.
#[derive(Debug)]
enum Compiled {
    /// The interpreter accepted the source.
    Clean,
    /// The interpreter rejected the source.
    Failed(SyntaxIssue),
    /// No interpreter was available.
    Skipped,
}

/// Reads the report printed by [`COMPILE_SCRIPT`].
fn parse_compile_report(report: &str) -> Option<SyntaxIssue> {
    let mut lines = report.lines();
    let kind = lines.next()?.trim().to_string();
    let line = lines.next()?.trim().parse().ok()?;
    let column = lines.next()?.trim().parse().ok()?;
    let message = lines.map(str::trim).join(" ");

    Some(SyntaxIssue {
        kind,
        line,
        column,
        message,
    })
}

/// Score for `found` of `required` elements; full points when nothing is
/// required.
fn proportional(found: usize, required: usize, points: f64) -> f64 {
    if required == 0 {
        points
    } else {
        found as f64 / required as f64 * points
    }
}

/// Feedback naming what is missing, or confirming everything was found.
fn checklist_feedback(found: &[String], missing: &[String]) -> String {
    if missing.is_empty() {
        format!("All required elements found: {}.", found.join(", "))
    } else {
        format!(
            "Missing required elements: {}. Found {} of {}.",
            missing.join(", "),
            found.len(),
            found.len() + missing.len()
        )
    }
}

/// Checks Python and micro:bit sources for syntax and required elements.
#[derive(Debug, Clone)]
pub struct SyntaxChecker {
    /// Interpreter used to compile Python; discovered on PATH when unset.
    interpreter: Option<String>,
    /// Wall-clock limit for the compile step.
    timeout:     Duration,
}

impl Default for SyntaxChecker {
    fn default() -> Self {
        Self {
            interpreter: None,
            timeout:     EXEC_TIMEOUT,
        }
    }
}

impl SyntaxChecker {
    /// Creates a checker that compiles with the Python found on PATH.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `interpreter` instead of searching PATH.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    /// Overrides the compile time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Compiles `code` with the interpreter in a throwaway directory.
    async fn compile(&self, code: &str) -> Result<Compiled> {
        let interpreter = match util::python_path(self.interpreter.as_deref()) {
            Ok(interpreter) => interpreter,
            Err(e) => {
                warn!("{e:#}; falling back to the tree-sitter parse");
                return Ok(Compiled::Skipped);
            }
        };

        let scratch = tempfile::Builder::new()
            .prefix("grader-compile-")
            .tempdir()
            .context("Could not create a scratch directory for the compile check")?;
        let script = scratch.path().join("submission.py");
        tokio::fs::write(&script, code)
            .await
            .with_context(|| format!("Could not write {}", script.display()))?;

        let args = [
            OsString::from("-c"),
            OsString::from(COMPILE_SCRIPT),
            script.into_os_string(),
        ];
        let env = [(OsString::from("PYTHONDONTWRITEBYTECODE"), OsString::from("1"))];
        let collected = process::run_collect(
            &interpreter,
            &args,
            Some(scratch.path()),
            &env,
            Some(self.timeout),
        )
        .await
        .context("Could not compile the submission")?;

        if collected.status.success() {
            return Ok(Compiled::Clean);
        }
        match parse_compile_report(&collected.stdout_lossy()) {
            Some(issue) if collected.status.code() == Some(1) => Ok(Compiled::Failed(issue)),
            _ => bail!(
                "Python could not compile the submission: {}",
                collected.stderr_lossy().trim()
            ),
        }
    }

    /// Compiles `code` as Python and scores the `required` element names.
    ///
    /// A compile failure scores zero and skips the element checks. Without
    /// an interpreter the tree-sitter parse decides instead.
    pub async fn check_python(
        &self,
        code: &str,
        required: &[String],
        points: f64,
    ) -> Result<Evaluation> {
        let compiled = self.compile(code).await?;
        let parser = Parser::new(code)?;
        let issue = match compiled {
            Compiled::Clean => None,
            Compiled::Failed(issue) => Some(issue),
            Compiled::Skipped => parser.first_syntax_issue(),
        };
        if let Some(issue) = issue {
            debug!(%issue, "submission failed to compile");
            return Ok(Evaluation::zero(issue.to_string()));
        }

        if required.is_empty() {
            return Ok(Evaluation::new(
                points,
                "Code parsed successfully; no specific elements were required.",
            ));
        }

        let mut found = Vec::new();
        let mut missing = Vec::new();
        for name in required.iter().unique() {
            match name.parse::<PythonElement>() {
                Ok(element) => {
                    if element.is_present(&parser)? {
                        found.push(name.clone());
                    } else {
                        missing.push(name.clone());
                    }
                }
                Err(_) => missing.push(format!("{name} (unrecognised element)")),
            }
        }

        let score = proportional(found.len(), found.len() + missing.len(), points);
        Ok(Evaluation::new(score, checklist_feedback(&found, &missing)))
    }

    /// Scores `code` against the fixed micro:bit checklist.
    pub fn check_microbit(&self, code: &str, points: f64) -> Evaluation {
        let (found, missing): (Vec<String>, Vec<String>) = MicrobitElement::ALL
            .iter()
            .map(|element| (element.is_present(code), element.to_string()))
            .partition_map(|(present, name)| {
                if present {
                    itertools::Either::Left(name)
                } else {
                    itertools::Either::Right(name)
                }
            });

        let score = proportional(found.len(), MicrobitElement::ALL.len(), points);
        Evaluation::new(score, checklist_feedback(&found, &missing))
    }

    /// Scratch projects are not supported yet and always score zero.
    pub fn check_scratch(&self) -> Evaluation {
        Evaluation::zero("Scratch block checking is not implemented yet.")
    }
}

#[async_trait]
impl CriterionStrategy for SyntaxChecker {
    async fn evaluate(&self, criterion: &Criterion, code: &SubmissionCode) -> Result<Evaluation> {
        let CriterionKind::SyntaxCheck {
            language,
            required_elements,
        } = criterion.kind()
        else {
            bail!("syntax checker cannot evaluate `{}` criteria", criterion.kind().tag());
        };

        match language {
            Language::Python => {
                self.check_python(code.as_str(), required_elements, criterion.points())
                    .await
            }
            Language::Microbit => Ok(self.check_microbit(code.as_str(), criterion.points())),
            Language::Scratch => Ok(self.check_scratch()),
        }
    }
}
