//! Tests for reading assignment descriptors and student submissions.

use std::io::Write;

use codio_grader::{
    assignment::{Assignment, Criterion, CriterionError, CriterionKind, Language},
    constants::{DEFAULT_ASSIGNMENT_TITLE, DEFAULT_REVIEW_PROMPT},
    submission::SubmissionCode,
};
use serde_json::json;

#[test]
fn descriptor_defaults() {
    let assignment = Assignment::from_json(r#"{ "files": ["main.py"] }"#).expect("parse");

    assert_eq!(assignment.files, vec!["main.py".to_string()]);
    assert_eq!(assignment.assignment_title, DEFAULT_ASSIGNMENT_TITLE);
    assert_eq!(assignment.assignment_prompt, "");
    assert!(assignment.criteria().is_none());

    let empty = Assignment::from_json(r#"{ "files": [], "criteria": [] }"#).expect("parse");
    assert!(empty.criteria().is_none());
}

#[test]
fn criteria_keep_their_order_and_fields() {
    let assignment = Assignment::from_json(
        r#"{
            "files": ["main.py"],
            "assignment_title": "Loops",
            "grade_topic_id": "topic-1",
            "criteria": [
                { "type": "syntax_check", "description": "Uses loops", "points": 10,
                  "required_elements": ["for_loop", "while_loop", "for_loop"] },
                { "type": "output_match", "description": "Greets", "points": 5,
                  "expected": "Hello", "partial_credit": true },
                { "type": "ai_review", "points": 20 },
                { "type": "scratch_blocks", "description": "Blocks", "points": 1 }
            ]
        }"#,
    )
    .expect("parse");

    let criteria = assignment.criteria().expect("criteria");
    assert_eq!(criteria.len(), 4);

    assert_eq!(criteria[0].description(), "Uses loops");
    assert_eq!(
        criteria[0].kind(),
        &CriterionKind::syntax_check(Language::Python, ["for_loop", "while_loop"])
    );

    assert_eq!(criteria[1].points(), 5.0);
    assert_eq!(criteria[1].kind(), &CriterionKind::output_match("Hello", true));

    assert_eq!(criteria[2].description(), "ai_review");
    assert_eq!(criteria[2].kind(), &CriterionKind::ai_review(DEFAULT_REVIEW_PROMPT));

    assert_eq!(
        criteria[3].kind(),
        &CriterionKind::syntax_check(Language::Scratch, Vec::<String>::new())
    );
}

#[test]
fn type_aliases_and_languages() {
    let kind = |v: serde_json::Value| Criterion::from_value(&v).kind().clone();

    assert!(matches!(
        kind(json!({ "type": "python_syntax", "points": 1 })),
        CriterionKind::SyntaxCheck { language: Language::Python, .. }
    ));
    assert!(matches!(
        kind(json!({ "type": "microbit_blocks", "points": 1 })),
        CriterionKind::SyntaxCheck { language: Language::Microbit, .. }
    ));
    assert!(matches!(
        kind(json!({ "type": "syntax_check", "language": "microbit", "points": 1 })),
        CriterionKind::SyntaxCheck { language: Language::Microbit, .. }
    ));
    assert_eq!(
        kind(json!({ "type": "syntax_check", "language": "cobol", "points": 1 })),
        CriterionKind::Invalid(CriterionError::UnknownLanguage("cobol".into()))
    );
    assert_eq!(
        kind(json!({ "type": "flake8", "points": 1 })),
        CriterionKind::Other("flake8".into())
    );
}

#[test]
fn malformed_fields_become_invalid_kinds() {
    let read = |v: serde_json::Value| Criterion::from_value(&v);

    let c = read(json!({ "type": "ai_review" }));
    assert_eq!(c.points(), 0.0);
    assert_eq!(c.kind(), &CriterionKind::Invalid(CriterionError::MissingField("points")));

    let c = read(json!({ "type": "ai_review", "points": "ten" }));
    assert!(matches!(c.kind(), CriterionKind::Invalid(CriterionError::InvalidField { field: "points", .. })));

    let c = read(json!({ "type": "output_match", "points": 3, "expected": "x", "partial_credit": "yes" }));
    assert_eq!(c.points(), 3.0);
    assert!(matches!(
        c.kind(),
        CriterionKind::Invalid(CriterionError::InvalidField { field: "partial_credit", .. })
    ));

    let c = read(json!({ "type": "syntax_check", "points": 3, "required_elements": "for_loop" }));
    assert!(matches!(
        c.kind(),
        CriterionKind::Invalid(CriterionError::InvalidField { field: "required_elements", .. })
    ));

    let c = read(json!({ "id": "q1", "points": 2 }));
    assert_eq!(c.description(), "q1");
    assert_eq!(c.kind(), &CriterionKind::Invalid(CriterionError::MissingField("type")));
}

#[test]
fn submission_files_are_joined_with_headers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("main.py");
    let second = dir.path().join("helpers.py");
    std::fs::write(&first, "print('a')\n").expect("write");
    std::fs::write(&second, "def helper():\n    pass\n").expect("write");

    let code = SubmissionCode::load([&first, &second]).expect("load");

    let expected = format!(
        "# === {} ===\nprint('a')\n\n\n# === {} ===\ndef helper():\n    pass\n",
        first.display(),
        second.display()
    );
    assert_eq!(code.as_str(), expected);
    assert_eq!(code.files().len(), 2);
    assert!(!code.is_empty());
}

#[test]
fn missing_or_empty_submission_files_are_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let empty = dir.path().join("empty.py");
    std::fs::File::create(&empty)
        .and_then(|mut f| f.write_all(b""))
        .expect("create");

    let err = SubmissionCode::load([&empty]).expect_err("empty file");
    assert!(err.to_string().contains("Required file missing or empty"));

    let err = SubmissionCode::load([dir.path().join("nope.py")]).expect_err("missing file");
    assert!(err.to_string().contains("nope.py"));
}

#[test]
fn descriptor_loads_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("autograde_config.json");
    std::fs::write(&path, r#"{ "files": ["a.py"], "assignment_prompt": "Do it" }"#).expect("write");

    let assignment = Assignment::load(&path).expect("load");
    assert_eq!(assignment.assignment_prompt, "Do it");

    std::fs::write(&path, "{ not json").expect("write");
    assert!(Assignment::load(&path).is_err());
}
