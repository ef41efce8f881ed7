#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Verdict mode: used when an assignment declares no criteria. The oracle
//! answers yes or no, then a second call writes mentor feedback.

use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use super::results::{CriterionResult, Grade, GradingReport};
use crate::{
    constants::{
        HINT_PROMPT, MENTOR_FALLBACK, ORACLE_TIMEOUT, PRAISE_PROMPT, VERDICT_FAIL_GRADE,
        VERDICT_PASS_GRADE, VERDICT_PROMPT, VERDICT_REQUIREMENT,
    },
    oracle::{Oracle, OracleError},
    submission::SubmissionCode,
};

/// How the oracle answered the requirements question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Reply started with `y`.
    Pass,
    /// Reply started with `n`.
    Fail,
    /// Anything else; holds the lowercased reply.
    Unexpected(String),
}

impl Verdict {
    /// Classifies a reply by its first letter, ignoring case.
    pub fn parse(reply: &str) -> Self {
        let reply = reply.trim().to_lowercase();
        if reply.starts_with('y') {
            Self::Pass
        } else if reply.starts_with('n') {
            Self::Fail
        } else {
            Self::Unexpected(reply)
        }
    }

    /// Whether the submission passed.
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Grade out of 100.
    pub fn grade(&self) -> f64 {
        if self.passed() {
            VERDICT_PASS_GRADE
        } else {
            VERDICT_FAIL_GRADE
        }
    }
}

/// Grades a submission against the assignment prompt as a whole.
#[derive(Clone)]
pub struct VerdictGrader {
    /// Completion service.
    oracle:  Arc<dyn Oracle>,
    /// Deadline for each oracle call.
    timeout: Duration,
}

impl VerdictGrader {
    /// Creates a grader with the default oracle deadline.
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            timeout: ORACLE_TIMEOUT,
        }
    }

    /// Overrides the oracle deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One oracle call under the deadline.
    async fn ask(&self, system_prompt: &str, user_content: &str) -> Result<String, OracleError> {
        tokio::time::timeout(self.timeout, self.oracle.complete(system_prompt, user_content))
            .await
            .unwrap_or(Err(OracleError::TimedOut(self.timeout)))
    }

    /// Asks whether `code` meets `assignment_prompt` and reports the answer
    /// as a single criterion worth 100 points.
    pub async fn grade(&self, assignment_prompt: &str, code: &SubmissionCode) -> GradingReport {
        let question = format!(
            "## Assignment instructions\n{assignment_prompt}\n\n## Student submission\n{code}\n"
        );

        let (grade, feedback) = match self.ask(VERDICT_PROMPT, &question).await {
            Ok(reply) => {
                let verdict = Verdict::parse(&reply);
                info!(?verdict, "verdict received");
                (verdict.grade(), self.mentor_feedback(&verdict, code).await)
            }
            Err(e) => {
                warn!("verdict request failed: {e}");
                (0.0, format!("Autograder API error: {e}"))
            }
        };

        let mut report = GradingReport::new();
        report.push(
            CriterionResult::builder()
                .requirement(VERDICT_REQUIREMENT)
                .grade(Grade::clamped(grade, VERDICT_PASS_GRADE))
                .feedback(feedback)
                .build(),
        );
        report
    }

    /// Praise for a pass, a hint otherwise; an unexpected verdict gets a
    /// note quoting the reply.
    async fn mentor_feedback(&self, verdict: &Verdict, code: &SubmissionCode) -> String {
        let (prompt, content) = if verdict.passed() {
            (PRAISE_PROMPT, "")
        } else {
            (HINT_PROMPT, code.as_str())
        };

        let feedback = match self.ask(prompt, content).await {
            Ok(text) => text,
            Err(e) => {
                warn!("mentor feedback request failed: {e}");
                MENTOR_FALLBACK.to_string()
            }
        };

        match verdict {
            Verdict::Unexpected(reply) => format!(
                "{feedback}\n\nNote: The grader received an unexpected response: '{reply}'. \
                 Expected 'yes' or 'no'."
            ),
            _ => feedback,
        }
    }
}
