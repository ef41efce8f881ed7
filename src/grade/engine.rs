#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The scoring engine: evaluates criteria in order, isolates failures, and
//! clamps every score into its criterion's budget.

use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use tracing::{Instrument, error, info, info_span, warn};

use super::{
    ai_review::AiReviewer,
    output::OutputComparator,
    results::{CriterionResult, Evaluation, Grade, GradingReport},
    syntax::SyntaxChecker,
};
use crate::{
    assignment::{Criterion, CriterionKind},
    config::Settings,
    oracle::Oracle,
    submission::SubmissionCode,
};

/// One way of scoring a criterion.
///
/// Implementations may return any score; the engine clamps it into
/// `[0, criterion.points()]`. Errors cost the criterion its points and
/// nothing else.
#[async_trait]
pub trait CriterionStrategy: Send + Sync {
    /// Scores `code` against `criterion`.
    async fn evaluate(&self, criterion: &Criterion, code: &SubmissionCode) -> Result<Evaluation>;
}

/// Dispatches criteria to their strategies and aggregates the results.
pub struct ScoringEngine {
    /// Syntax family.
    syntax:    SyntaxChecker,
    /// Output comparison.
    output:    OutputComparator,
    /// AI review.
    ai_review: AiReviewer,
    /// Strategies for type tags without a built-in implementation.
    custom:    HashMap<String, Arc<dyn CriterionStrategy>>,
}

impl ScoringEngine {
    /// Creates an engine using `oracle` for AI review and default execution
    /// settings.
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            syntax:    SyntaxChecker::new(),
            output:    OutputComparator::default(),
            ai_review: AiReviewer::new(oracle),
            custom:    HashMap::new(),
        }
    }

    /// Creates an engine whose timeouts and interpreter come from `settings`.
    pub fn from_settings(oracle: Arc<dyn Oracle>, settings: &Settings) -> Self {
        let mut syntax = SyntaxChecker::new().with_timeout(settings.exec_timeout);
        let mut output = OutputComparator::new().with_timeout(settings.exec_timeout);
        if let Some(python) = &settings.python {
            syntax = syntax.with_interpreter(python.clone());
            output = output.with_interpreter(python.clone());
        }

        Self::new(Arc::clone(&oracle))
            .with_syntax_checker(syntax)
            .with_output_comparator(output)
            .with_ai_reviewer(AiReviewer::new(oracle).with_timeout(settings.oracle_timeout))
    }

    /// Replaces the syntax checker.
    pub fn with_syntax_checker(mut self, syntax: SyntaxChecker) -> Self {
        self.syntax = syntax;
        self
    }

    /// Replaces the output comparator.
    pub fn with_output_comparator(mut self, output: OutputComparator) -> Self {
        self.output = output;
        self
    }

    /// Replaces the AI reviewer.
    pub fn with_ai_reviewer(mut self, ai_review: AiReviewer) -> Self {
        self.ai_review = ai_review;
        self
    }

    /// Handles criteria whose `type` is `tag` with `strategy`.
    pub fn register(mut self, tag: impl Into<String>, strategy: Arc<dyn CriterionStrategy>) -> Self {
        self.custom.insert(tag.into(), strategy);
        self
    }

    /// Evaluates every criterion in declaration order.
    pub async fn evaluate(&self, criteria: &[Criterion], code: &SubmissionCode) -> GradingReport {
        let mut report = GradingReport::new();

        for (index, criterion) in criteria.iter().enumerate() {
            let span = info_span!("criterion", index, kind = %criterion.kind().tag());
            let result = self.evaluate_one(criterion, code).instrument(span).await;
            report.push(result);
        }

        info!(
            total = report.total_score(),
            possible = report.total_possible(),
            "grading finished"
        );
        report
    }

    /// Evaluates one criterion; never fails.
    async fn evaluate_one(&self, criterion: &Criterion, code: &SubmissionCode) -> CriterionResult {
        let evaluation = match self.strategy_for(criterion.kind()) {
            Ok(strategy) => {
                let attempt = AssertUnwindSafe(strategy.evaluate(criterion, code))
                    .catch_unwind()
                    .await;
                match attempt {
                    Ok(Ok(evaluation)) => evaluation,
                    Ok(Err(e)) => {
                        warn!("criterion failed: {e:#}");
                        Evaluation::zero(format!("Could not evaluate this criterion: {e:#}"))
                    }
                    Err(_) => {
                        error!("criterion strategy panicked");
                        Evaluation::zero("Could not evaluate this criterion: the grader crashed.")
                    }
                }
            }
            Err(evaluation) => evaluation,
        };

        let grade = Grade::clamped(evaluation.score, criterion.points());
        if grade.grade != evaluation.score {
            warn!(raw = evaluation.score, clamped = grade.grade, "score clamped into budget");
        }
        info!(score = grade.grade, points = grade.out_of, "criterion evaluated");

        CriterionResult::builder()
            .requirement(criterion.description())
            .grade(grade)
            .feedback(evaluation.feedback)
            .build()
    }

    /// Picks the strategy for `kind`, or the zero-credit result explaining why
    /// there is none.
    fn strategy_for(&self, kind: &CriterionKind) -> Result<&dyn CriterionStrategy, Evaluation> {
        match kind {
            CriterionKind::SyntaxCheck { .. } => Ok(&self.syntax),
            CriterionKind::OutputMatch { .. } => Ok(&self.output),
            CriterionKind::AiReview { .. } => Ok(&self.ai_review),
            CriterionKind::Other(tag) => match self.custom.get(tag) {
                Some(strategy) => Ok(strategy.as_ref()),
                None => Err(Evaluation::zero(format!("Unknown criterion type `{tag}`."))),
            },
            CriterionKind::Invalid(e) => {
                Err(Evaluation::zero(format!("Invalid criterion configuration: {e}.")))
            }
        }
    }
}
