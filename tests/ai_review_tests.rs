//! Tests for AI review and verdict mode against a stub oracle.

mod common;

use std::time::Duration;

use codio_grader::{
    assignment::{Criterion, CriterionKind},
    grade::{AiReviewer, ScoringEngine, Verdict, VerdictGrader, parse_leading_score},
    oracle::{OracleError, model_chain},
    submission::SubmissionCode,
};
use common::StubOracle;

#[test]
fn leading_score_is_split_from_feedback() {
    assert_eq!(parse_leading_score("85 Great job!"), (Some(85.0), "Great job!".to_string()));
    assert_eq!(parse_leading_score("  7.5\n\nNice.  "), (Some(7.5), "Nice.".to_string()));
    assert_eq!(parse_leading_score("100"), (Some(100.0), String::new()));
    assert_eq!(parse_leading_score("Not sure"), (None, "Not sure".to_string()));
    assert_eq!(parse_leading_score("Score: 90"), (None, "Score: 90".to_string()));
}

#[tokio::test]
async fn review_uses_the_leading_number() {
    let oracle = StubOracle::replying("85 Great job!");
    let eval = AiReviewer::new(oracle.clone())
        .review("rubric", "print('hi')")
        .await;

    assert_eq!(eval.score, 85.0);
    assert_eq!(eval.feedback, "Great job!");
    assert_eq!(oracle.calls(), vec![("rubric".to_string(), "print('hi')".to_string())]);
}

#[tokio::test]
async fn review_without_a_number_scores_zero() {
    let eval = AiReviewer::new(StubOracle::replying("Not sure"))
        .review("rubric", "code")
        .await;

    assert_eq!(eval.score, 0.0);
    assert_eq!(eval.feedback, "Not sure");
}

#[tokio::test]
async fn oracle_failure_scores_zero_with_reason() {
    let eval = AiReviewer::new(StubOracle::failing(OracleError::NotConfigured))
        .review("rubric", "code")
        .await;

    assert_eq!(eval.score, 0.0);
    assert!(eval.feedback.starts_with("AI review failed"));
    assert!(eval.feedback.contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn slow_oracle_hits_the_review_deadline() {
    let eval = AiReviewer::new(StubOracle::slow("90 fine", Duration::from_secs(5)))
        .with_timeout(Duration::from_millis(50))
        .review("rubric", "code")
        .await;

    assert_eq!(eval.score, 0.0);
    assert!(eval.feedback.contains("did not answer"), "{}", eval.feedback);
}

#[tokio::test]
async fn over_budget_review_is_clamped_by_the_engine() {
    let criterion = Criterion::builder()
        .description("style")
        .points(10.0)
        .kind(CriterionKind::ai_review("rubric"))
        .build();

    let report = ScoringEngine::new(StubOracle::replying("85 Great job!"))
        .evaluate(&[criterion], &SubmissionCode::from_source("x = 1"))
        .await;

    assert_eq!(report.results()[0].score(), 10.0);
    assert_eq!(report.results()[0].feedback(), "Great job!");
}

#[test]
fn model_override_replaces_only_the_primary() {
    let default = model_chain(None);
    assert_eq!(default.len(), 3);

    let overridden = model_chain(Some("gpt-4o"));
    assert_eq!(overridden[0], "gpt-4o");
    assert_eq!(overridden[1..], default[1..]);

    assert_eq!(model_chain(Some("   ")), default);
}

#[test]
fn verdict_reads_the_first_letter() {
    assert_eq!(Verdict::parse("yes"), Verdict::Pass);
    assert_eq!(Verdict::parse("Yes."), Verdict::Pass);
    assert_eq!(Verdict::parse(" no"), Verdict::Fail);
    assert_eq!(Verdict::parse("Maybe"), Verdict::Unexpected("maybe".to_string()));
    assert_eq!(Verdict::Pass.grade(), 100.0);
    assert_eq!(Verdict::Fail.grade(), 50.0);
    assert_eq!(Verdict::Unexpected(String::new()).grade(), 50.0);
}

#[tokio::test]
async fn passing_verdict_asks_for_praise_without_code() {
    let oracle = StubOracle::scripted(vec![Ok("yes".into()), Ok("Brilliant work!".into())]);
    let code = SubmissionCode::from_source("print('hi')");

    let report = VerdictGrader::new(oracle.clone())
        .grade("Print a greeting.", &code)
        .await;

    assert_eq!(report.percentage(), 100);
    assert!(report.passed());
    assert_eq!(report.results()[0].feedback(), "Brilliant work!");

    let calls = oracle.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].1.contains("Print a greeting."));
    assert!(calls[0].1.contains("print('hi')"));
    assert_eq!(calls[1].1, "");
}

#[tokio::test]
async fn unexpected_verdict_fails_and_quotes_the_reply() {
    let oracle = StubOracle::scripted(vec![Ok("Perhaps".into()), Ok("Check your loop.".into())]);
    let code = SubmissionCode::from_source("while True: pass");

    let report = VerdictGrader::new(oracle.clone())
        .grade("Print a greeting.", &code)
        .await;

    assert_eq!(report.percentage(), 50);
    assert!(!report.passed());
    let feedback = report.results()[0].feedback();
    assert!(feedback.starts_with("Check your loop."));
    assert!(feedback.contains("'perhaps'"));
    assert_eq!(oracle.calls()[1].1, "while True: pass");
}

#[tokio::test]
async fn verdict_api_error_scores_zero() {
    let oracle = StubOracle::failing(OracleError::Exhausted {
        last: "Fallback API failed: 401".into(),
    });

    let report = VerdictGrader::new(oracle)
        .grade("anything", &SubmissionCode::from_source("x = 1"))
        .await;

    assert_eq!(report.percentage(), 0);
    assert!(report.results()[0].feedback().starts_with("Autograder API error"));
}

#[tokio::test]
async fn mentor_failure_falls_back_to_a_fixed_sentence() {
    let oracle = StubOracle::scripted(vec![
        Ok("no".into()),
        Err(OracleError::Other("rate limited".into())),
    ]);

    let report = VerdictGrader::new(oracle)
        .grade("anything", &SubmissionCode::from_source("x = 1"))
        .await;

    assert_eq!(report.percentage(), 50);
    assert_eq!(
        report.results()[0].feedback(),
        codio_grader::constants::MENTOR_FALLBACK
    );
}
