//! Tests for the scoring engine: dispatch, clamping, failure isolation.

mod common;

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use codio_grader::{
    assignment::{Criterion, CriterionKind, Language},
    grade::{CriterionStrategy, Evaluation, ScoringEngine},
    submission::SubmissionCode,
};
use common::StubOracle;
use serde_json::json;

/// Returns a fixed raw score, however unreasonable.
struct FixedScore(f64);

#[async_trait]
impl CriterionStrategy for FixedScore {
    async fn evaluate(&self, _: &Criterion, _: &SubmissionCode) -> Result<Evaluation> {
        Ok(Evaluation::new(self.0, "rogue"))
    }
}

struct Failing;

#[async_trait]
impl CriterionStrategy for Failing {
    async fn evaluate(&self, _: &Criterion, _: &SubmissionCode) -> Result<Evaluation> {
        bail!("strategy exploded")
    }
}

struct Panicking;

#[async_trait]
impl CriterionStrategy for Panicking {
    async fn evaluate(&self, _: &Criterion, _: &SubmissionCode) -> Result<Evaluation> {
        panic!("strategy panicked")
    }
}

fn custom(tag: &str, points: f64) -> Criterion {
    Criterion::from_value(&json!({ "type": tag, "description": tag, "points": points }))
}

fn engine() -> ScoringEngine {
    ScoringEngine::new(StubOracle::replying("0"))
}

#[tokio::test]
async fn clamps_rogue_scores_into_budget() {
    let engine = engine()
        .register("too_high", Arc::new(FixedScore(1_000.0)))
        .register("negative", Arc::new(FixedScore(-5.0)))
        .register("nan", Arc::new(FixedScore(f64::NAN)))
        .register("infinite", Arc::new(FixedScore(f64::INFINITY)));

    let criteria = vec![
        custom("too_high", 10.0),
        custom("negative", 10.0),
        custom("nan", 10.0),
        custom("infinite", 4.0),
    ];
    let report = engine
        .evaluate(&criteria, &SubmissionCode::from_source("print(1)"))
        .await;

    let scores: Vec<f64> = report.results().iter().map(|r| r.score()).collect();
    assert_eq!(scores, vec![10.0, 0.0, 0.0, 4.0]);
    for (result, criterion) in report.results().iter().zip(&criteria) {
        assert!(result.score() >= 0.0 && result.score() <= criterion.points());
    }
}

#[tokio::test]
async fn totals_are_sums_and_never_exceed_possible() {
    let engine = engine()
        .register("half", Arc::new(FixedScore(2.5)))
        .register("over", Arc::new(FixedScore(99.0)));

    let criteria = vec![custom("half", 5.0), custom("over", 3.0), custom("half", 10.0)];
    let report = engine
        .evaluate(&criteria, &SubmissionCode::from_source(""))
        .await;

    let sum: f64 = report.results().iter().map(|r| r.score()).sum();
    assert_eq!(report.total_score(), sum);
    assert_eq!(report.total_score(), 8.0);
    assert_eq!(report.total_possible(), 18.0);
    assert!(report.total_score() <= report.total_possible());
}

#[tokio::test]
async fn unknown_type_scores_zero_and_others_still_run() {
    let engine = engine().register("full", Arc::new(FixedScore(5.0)));
    let criteria = vec![
        custom("full", 5.0),
        custom("plagiarism_scan", 7.0),
        custom("full", 5.0),
    ];

    let report = engine
        .evaluate(&criteria, &SubmissionCode::from_source(""))
        .await;

    assert_eq!(report.results().len(), 3);
    let unknown = &report.results()[1];
    assert_eq!(unknown.score(), 0.0);
    assert_eq!(unknown.max_points(), 7.0);
    assert!(unknown.feedback().contains("plagiarism_scan"));
    assert_eq!(report.total_score(), 10.0);
}

#[tokio::test]
async fn failing_and_panicking_strategies_only_lose_their_own_points() {
    let engine = engine()
        .register("fails", Arc::new(Failing))
        .register("panics", Arc::new(Panicking))
        .register("full", Arc::new(FixedScore(3.0)));
    let criteria = vec![custom("fails", 4.0), custom("panics", 4.0), custom("full", 3.0)];

    let report = engine
        .evaluate(&criteria, &SubmissionCode::from_source(""))
        .await;

    assert_eq!(report.results()[0].score(), 0.0);
    assert!(report.results()[0].feedback().contains("strategy exploded"));
    assert_eq!(report.results()[1].score(), 0.0);
    assert!(!report.results()[1].feedback().is_empty());
    assert_eq!(report.results()[2].score(), 3.0);
}

#[tokio::test]
async fn invalid_configuration_is_zero_credit_not_fatal() {
    let criteria: Vec<Criterion> = [
        json!({ "type": "output_match", "description": "no expected", "points": 5 }),
        json!({ "type": "syntax_check", "description": "bad points", "points": -3 }),
        json!({ "description": "no type", "points": 2 }),
        json!("not even an object"),
        json!({ "type": "syntax_check", "description": "ok", "points": 1 }),
    ]
    .iter()
    .map(Criterion::from_value)
    .collect();

    let report = engine()
        .evaluate(&criteria, &SubmissionCode::from_source("x = 1\n"))
        .await;

    assert_eq!(report.results().len(), 5);
    for result in &report.results()[..4] {
        assert_eq!(result.score(), 0.0);
        assert!(
            result.feedback().starts_with("Invalid criterion configuration"),
            "{}",
            result.feedback()
        );
    }
    assert!(report.results()[0].feedback().contains("expected"));
    assert_eq!(report.results()[0].max_points(), 5.0);
    assert_eq!(report.results()[4].score(), 1.0);
}

#[tokio::test]
async fn results_follow_declaration_order() {
    let criteria = vec![
        Criterion::builder()
            .description("first")
            .points(1.0)
            .kind(CriterionKind::syntax_check(Language::Python, Vec::<String>::new()))
            .build(),
        Criterion::builder()
            .description("second")
            .points(2.0)
            .kind(CriterionKind::syntax_check(Language::Scratch, Vec::<String>::new()))
            .build(),
        Criterion::builder()
            .description("third")
            .points(3.0)
            .kind(CriterionKind::ai_review("grade it"))
            .build(),
    ];

    let report = engine()
        .evaluate(&criteria, &SubmissionCode::from_source("print('hi')\n"))
        .await;

    let names: Vec<&str> = report.results().iter().map(|r| r.requirement()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn evaluation_is_idempotent_with_a_deterministic_oracle() {
    let engine = ScoringEngine::new(StubOracle::replying("7 Solid loop usage."));
    let criteria: Vec<Criterion> = [
        json!({ "type": "python_syntax", "description": "loops", "points": 4,
                "required_elements": ["for_loop", "while_loop"] }),
        json!({ "type": "microbit_blocks", "description": "microbit", "points": 3 }),
        json!({ "type": "ai_review", "description": "review", "points": 10 }),
        json!({ "type": "mystery", "points": 1 }),
    ]
    .iter()
    .map(Criterion::from_value)
    .collect();
    let code = SubmissionCode::from_source("for i in range(3):\n    print(i)\n");

    let first = engine.evaluate(&criteria, &code).await;
    let second = engine.evaluate(&criteria, &code).await;

    assert_eq!(first, second);
    assert_eq!(first.results()[0].score(), 2.0);
    assert_eq!(first.results()[2].score(), 7.0);
}
