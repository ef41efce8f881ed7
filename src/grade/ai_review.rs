#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! AI review: ask the oracle for a rubric score and feedback.

use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use super::{engine::CriterionStrategy, results::Evaluation};
use crate::{
    assignment::{Criterion, CriterionKind},
    constants::ORACLE_TIMEOUT,
    oracle::{Oracle, OracleError},
    submission::SubmissionCode,
};

/// Leading integer or decimal.
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?").expect("leading-number pattern must compile"));

/// Splits a reply into its leading numeric score and the trimmed rest.
///
/// Returns `None` for the score when the reply does not start with a number;
/// the feedback is then the whole (trimmed) reply.
pub fn parse_leading_score(reply: &str) -> (Option<f64>, String) {
    let reply = reply.trim();
    match LEADING_NUMBER.find(reply) {
        Some(m) => match m.as_str().parse::<f64>() {
            Ok(score) => (Some(score), reply[m.end()..].trim().to_string()),
            Err(_) => (None, reply.to_string()),
        },
        None => (None, reply.to_string()),
    }
}

/// Sends the code and a rubric prompt to the oracle and parses the reply.
#[derive(Clone)]
pub struct AiReviewer {
    /// Completion service.
    oracle:  Arc<dyn Oracle>,
    /// Deadline for one oracle call.
    timeout: Duration,
}

impl std::fmt::Debug for AiReviewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiReviewer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AiReviewer {
    /// Creates a reviewer with the default oracle deadline.
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

    /// Reviews `code` under `system_prompt`.
    ///
    /// Oracle failures score zero and are described in the feedback; they
    /// are never returned as errors.
    pub async fn review(&self, system_prompt: &str, code: &str) -> Evaluation {
        let reply = match tokio::time::timeout(
            self.timeout,
            self.oracle.complete(system_prompt, code),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Self::failed(e),
            Err(_) => return Self::failed(OracleError::TimedOut(self.timeout)),
        };

        let (score, feedback) = parse_leading_score(&reply);
        match score {
            Some(score) => {
                debug!(score, "parsed AI review score");
                Evaluation::new(score, feedback)
            }
            None => {
                debug!("AI review reply had no leading score");
                Evaluation::zero(feedback)
            }
        }
    }

    /// Zero-credit evaluation describing an oracle failure.
    fn failed(error: OracleError) -> Evaluation {
        warn!("AI review failed: {error}");
        Evaluation::zero(format!("AI review failed: {error}"))
    }
}

#[async_trait]
impl CriterionStrategy for AiReviewer {
    async fn evaluate(&self, criterion: &Criterion, code: &SubmissionCode) -> Result<Evaluation> {
        let CriterionKind::AiReview { system_prompt } = criterion.kind() else {
            bail!("AI reviewer cannot evaluate `{}` criteria", criterion.kind().tag());
        };
        Ok(self.review(system_prompt, code.as_str()).await)
    }
}
