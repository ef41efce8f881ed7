//! Tests for grading report rendering and delivery payloads.

use chrono::{TimeZone, Utc};
use codio_grader::{
    config::CodioSettings,
    constants::{NOTION_NOTES_LIMIT, UNKNOWN_EMAIL},
    delivery::{notion::GradeEntry, student_email},
    grade::{CriterionResult, Grade, GradingReport},
};

fn result(requirement: &str, grade: f64, out_of: f64, feedback: &str) -> CriterionResult {
    CriterionResult::builder()
        .requirement(requirement)
        .grade(Grade::new(grade, out_of))
        .feedback(feedback)
        .build()
}

fn report(results: Vec<CriterionResult>) -> GradingReport {
    let mut report = GradingReport::new();
    for r in results {
        report.push(r);
    }
    report
}

#[test]
fn grade_clamping() {
    assert_eq!(Grade::clamped(12.0, 10.0), Grade::new(10.0, 10.0));
    assert_eq!(Grade::clamped(-1.0, 10.0), Grade::new(0.0, 10.0));
    assert_eq!(Grade::clamped(f64::NAN, 10.0), Grade::new(0.0, 10.0));
    assert_eq!(Grade::clamped(3.0, -2.0), Grade::new(0.0, 0.0));
    assert_eq!(Grade::new(2.5, 5.0).to_string(), "2.50/5.00");
}

#[test]
fn percentage_rounds_and_handles_empty_reports() {
    assert_eq!(GradingReport::new().percentage(), 0);

    let r = report(vec![result("a", 2.0, 3.0, ""), result("b", 0.0, 0.0, "")]);
    assert_eq!(r.percentage(), 67);

    let r = report(vec![result("a", 0.0, 0.0, "")]);
    assert_eq!(r.percentage(), 0);
}

#[test]
fn passed_means_every_criterion_is_full() {
    let r = report(vec![result("a", 5.0, 5.0, ""), result("b", 1.0, 1.0, "")]);
    assert!(r.passed());

    let r = report(vec![result("a", 5.0, 5.0, ""), result("b", 0.5, 1.0, "")]);
    assert!(!r.passed());
}

#[test]
fn markdown_transcript_lists_each_criterion_then_total() {
    let r = report(vec![
        result("Uses loops", 5.0, 10.0, "Missing required elements: while_loop.\n"),
        result("Greets", 5.0, 5.0, "Output matches the expected output."),
    ]);

    let md = r.to_markdown();
    assert!(md.starts_with("### Uses loops (5.00/10.00)\n\nMissing required elements: while_loop.\n"));
    assert!(md.contains("### Greets (5.00/5.00)\n\nOutput matches the expected output.\n"));
    assert!(md.ends_with("**Total: 10.00/15.00 (67%)**"));
    assert!(md.find("Uses loops") < md.find("Greets"));
}

#[test]
fn table_has_headers_and_total() {
    let r = report(vec![result("Uses loops", 5.0, 10.0, "ok")]);
    let table = r.to_string();

    assert!(table.contains("Grading Overview"));
    assert!(table.contains("Requirement"));
    assert!(table.contains("Uses loops"));
    assert!(table.contains("Total: 5.00/10.00 (50%)"));
}

#[test]
fn student_email_precedence() {
    let codio = CodioSettings {
        autograde_env: Some(r#"{ "student": { "email": "kid@school.org" } }"#.into()),
        grade_url:     None,
    };

    assert_eq!(student_email(Some("me@home.org"), &codio), "me@home.org");
    assert_eq!(student_email(Some("  "), &codio), "kid@school.org");
    assert_eq!(student_email(None, &codio), "kid@school.org");
    assert_eq!(student_email(None, &CodioSettings::default()), UNKNOWN_EMAIL);

    let broken = CodioSettings {
        autograde_env: Some("not json".into()),
        grade_url:     None,
    };
    assert!(broken.in_codio());
    assert_eq!(student_email(None, &broken), UNKNOWN_EMAIL);
}

#[test]
fn notion_page_carries_all_properties() {
    let long_feedback = "é".repeat(NOTION_NOTES_LIMIT + 50);
    let entry = GradeEntry {
        title:           "Loops",
        student_page_id: "student-1",
        score:           67,
        feedback:        &long_feedback,
        topic_id:        "topic-9",
        date:            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
    };

    let page = entry.to_page("grades-db");
    let props = &page["properties"];

    assert_eq!(page["parent"]["database_id"], "grades-db");
    assert_eq!(props["Name"]["title"][0]["text"]["content"], "Loops");
    assert_eq!(props["Student"]["relation"][0]["id"], "student-1");
    assert_eq!(props["Grade Topic"]["relation"][0]["id"], "topic-9");
    assert_eq!(props["Total"]["number"], 100);
    assert_eq!(props["Score"]["number"], 67);
    assert!(props["Date"]["date"]["start"]
        .as_str()
        .expect("date")
        .starts_with("2025-03-01T12:00:00"));

    let notes = props["Notes"]["rich_text"][0]["text"]["content"]
        .as_str()
        .expect("notes");
    assert_eq!(notes.chars().count(), NOTION_NOTES_LIMIT);
}
