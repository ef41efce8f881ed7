#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Criterion strategies, the scoring engine, and grading results.

/// AI review criteria and the leading-score parser.
pub mod ai_review;
/// The scoring engine and the strategy trait it dispatches through.
pub mod engine;
/// Output comparison and the similarity heuristic.
pub mod output;
/// Tree-sitter wrapper for Python sources.
pub mod parser;
/// Required-element matchers for Python and micro:bit code.
pub mod patterns;
/// Scores, per-criterion results, and reports.
pub mod results;
/// Syntax check criteria.
pub mod syntax;
/// Yes/no verdict grading for assignments without criteria.
pub mod verdict;

pub use ai_review::{AiReviewer, parse_leading_score};
pub use engine::{CriterionStrategy, ScoringEngine};
pub use output::{OutputComparator, RunOutcome, Similarity};
pub use parser::{Parser, SyntaxIssue};
pub use patterns::{MicrobitElement, PythonElement};
pub use results::{CriterionResult, Evaluation, Grade, GradingReport};
pub use syntax::SyntaxChecker;
pub use verdict::{Verdict, VerdictGrader};
