#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scores, per-criterion results, and the aggregated grading report.

use std::fmt::{Display, Write as _};

use bon::Builder;
use serde::{Deserialize, Serialize};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

/// What a strategy reports before the engine clamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Raw score; may be out of range if the strategy misbehaves.
    pub score:    f64,
    /// Feedback for the student.
    pub feedback: String,
}

impl Evaluation {
    /// Creates an evaluation.
    pub fn new(score: f64, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }

    /// A zero score with the given feedback.
    pub fn zero(feedback: impl Into<String>) -> Self {
        Self::new(0.0, feedback)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// A struct representing a grade
pub struct Grade {
    /// The actual grade received
    pub grade:  f64,
    /// The maximum grade possible
    pub out_of: f64,
}

impl Grade {
    /// Creates a new grade -
    /// * `grade` - The actual grade received
    /// * `out_of` - The maximum grade possible
    pub fn new(grade: f64, out_of: f64) -> Self {
        Self { grade, out_of }
    }

    /// Creates a grade with `grade` forced into `[0, out_of]`.
    ///
    /// NaN is treated as zero.
    pub fn clamped(grade: f64, out_of: f64) -> Self {
        let out_of = if out_of.is_finite() { out_of.max(0.0) } else { 0.0 };
        let grade = if grade.is_nan() { 0.0 } else { grade.clamp(0.0, out_of) };
        Self { grade, out_of }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}/{:.2}", self.grade, self.out_of)
    }
}

#[derive(Tabled, Debug, Clone, Default, PartialEq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
/// The outcome of one criterion.
pub struct CriterionResult {
    #[tabled(rename = "Requirement")]
    /// * `requirement`: the criterion's description
    pub(crate) requirement: String,
    #[tabled(rename = "Grade")]
    /// * `grade`: score received out of the criterion's points
    #[builder(default)]
    pub(crate) grade:       Grade,
    #[tabled(rename = "Feedback")]
    /// * `feedback`: why the score was given
    pub(crate) feedback:    String,
}

impl CriterionResult {
    /// Returns the criterion description.
    pub fn requirement(&self) -> &str {
        &self.requirement
    }

    /// Returns the awarded score.
    pub fn score(&self) -> f64 {
        self.grade.grade
    }

    /// Returns the criterion's point budget.
    pub fn max_points(&self) -> f64 {
        self.grade.out_of
    }

    /// Returns the feedback text.
    pub fn feedback(&self) -> &str {
        &self.feedback
    }
}

/// The outcome of a whole grading run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingReport {
    /// Per-criterion results in declaration order.
    results:        Vec<CriterionResult>,
    /// Sum of awarded scores.
    total_score:    f64,
    /// Sum of point budgets.
    total_possible: f64,
}

impl GradingReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result and updates the totals.
    pub fn push(&mut self, result: CriterionResult) {
        self.total_score += result.score();
        self.total_possible += result.max_points();
        self.results.push(result);
    }

    /// Returns the per-criterion results.
    pub fn results(&self) -> &[CriterionResult] {
        &self.results
    }

    /// Returns the sum of all awarded scores.
    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    /// Returns the sum of all point budgets.
    pub fn total_possible(&self) -> f64 {
        self.total_possible
    }

    /// Total score as a whole-number percentage of the points available.
    pub fn percentage(&self) -> u32 {
        if self.total_possible <= 0.0 {
            return 0;
        }
        let pct = (self.total_score / self.total_possible * 100.0).round();
        pct.clamp(0.0, 100.0) as u32
    }

    /// Returns true when every criterion earned its full points.
    pub fn passed(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.score() >= r.max_points())
    }

    /// Renders the feedback transcript sent to the grading backend.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            let _ = writeln!(
                out,
                "### {} ({})\n\n{}\n",
                result.requirement,
                result.grade,
                result.feedback.trim()
            );
        }
        let _ = write!(
            out,
            "**Total: {:.2}/{:.2} ({}%)**",
            self.total_score,
            self.total_possible,
            self.percentage()
        );
        out
    }
}

impl Display for GradingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = Table::new(&self.results)
            .with(Panel::header("Grading Overview"))
            .with(Panel::footer(format!(
                "Total: {:.2}/{:.2} ({}%)",
                self.total_score,
                self.total_possible,
                self.percentage()
            )))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(40).keep_words(true)))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
            .to_string();
        f.write_str(&table)
    }
}
