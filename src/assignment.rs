#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The assignment descriptor (`autograde_config.json`) and its criteria.
//!
//! Criteria are kept as raw JSON until each one is parsed on its own, so a
//! malformed entry turns into a zero-credit [`CriterionKind::Invalid`]
//! instead of failing the whole descriptor.

use std::{fmt::Display, path::Path, str::FromStr};

use anyhow::{Context, Result};
use bon::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_ASSIGNMENT_TITLE, DEFAULT_REVIEW_PROMPT};

/// Configuration problems detected while reading a single criterion.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CriterionError {
    /// The criterion is not a JSON object.
    #[error("criterion must be a JSON object")]
    NotAnObject,
    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// A field is present but has the wrong shape.
    #[error("field `{field}` must be {expected}")]
    InvalidField {
        /// Offending field.
        field:    &'static str,
        /// Human readable description of the accepted shape.
        expected: &'static str,
    },
    /// The point budget is below zero or not a finite number.
    #[error("`points` must be a non-negative number, got {0}")]
    InvalidPoints(f64),
    /// The `language` of a syntax check is not one we know.
    #[error("unsupported syntax_check language `{0}`")]
    UnknownLanguage(String),
}

/// Source dialect handled by a syntax check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Plain Python.
    Python,
    /// MicroPython for the BBC micro:bit.
    Microbit,
    /// Scratch block projects.
    Scratch,
}

impl FromStr for Language {
    type Err = CriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "microbit" | "micro:bit" | "micropython" => Ok(Language::Microbit),
            "scratch" => Ok(Language::Scratch),
            other => Err(CriterionError::UnknownLanguage(other.to_string())),
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Microbit => write!(f, "microbit"),
            Language::Scratch => write!(f, "scratch"),
        }
    }
}

/// What a criterion asks for and the parameters of its strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionKind {
    /// Ask the oracle for a rubric score.
    AiReview {
        /// Rubric prompt sent as the system message.
        system_prompt: String,
    },
    /// Parse the code and look for required constructs.
    SyntaxCheck {
        /// Dialect to check.
        language:          Language,
        /// Ordered, de-duplicated element names.
        required_elements: Vec<String>,
    },
    /// Run the code and compare its stdout.
    OutputMatch {
        /// Expected stdout.
        expected:       String,
        /// Award similarity-based partial credit on mismatch.
        partial_credit: bool,
    },
    /// A type tag without a built-in strategy.
    Other(String),
    /// The criterion could not be read.
    Invalid(CriterionError),
}

impl CriterionKind {
    /// AI review with the given rubric prompt.
    pub fn ai_review(system_prompt: impl Into<String>) -> Self {
        CriterionKind::AiReview {
            system_prompt: system_prompt.into(),
        }
    }

    /// Syntax check for `language` requiring `elements`.
    pub fn syntax_check<I, S>(language: Language, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CriterionKind::SyntaxCheck {
            language,
            required_elements: elements.into_iter().map(Into::into).unique().collect(),
        }
    }

    /// Output comparison against `expected`.
    pub fn output_match(expected: impl Into<String>, partial_credit: bool) -> Self {
        CriterionKind::OutputMatch {
            expected: expected.into(),
            partial_credit,
        }
    }

    /// Short tag used in logs.
    pub fn tag(&self) -> String {
        match self {
            CriterionKind::AiReview { .. } => "ai_review".to_string(),
            CriterionKind::SyntaxCheck { language, .. } => format!("syntax_check({language})"),
            CriterionKind::OutputMatch { .. } => "output_match".to_string(),
            CriterionKind::Other(tag) => tag.clone(),
            CriterionKind::Invalid(_) => "invalid".to_string(),
        }
    }
}

/// One scored rubric item.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(on(String, into))]
pub struct Criterion {
    /// Human readable description shown in feedback.
    description: String,
    /// Maximum awardable points.
    points:      f64,
    /// Strategy and its parameters.
    kind:        CriterionKind,
}

impl Criterion {
    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the point budget.
    pub fn points(&self) -> f64 {
        self.points
    }

    /// Returns the kind.
    pub fn kind(&self) -> &CriterionKind {
        &self.kind
    }

    /// Reads one criterion from its JSON form.
    ///
    /// Never fails: configuration problems are captured as
    /// [`CriterionKind::Invalid`] with whatever description and points could
    /// be read.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self {
                description: "criterion".to_string(),
                points:      0.0,
                kind:        CriterionKind::Invalid(CriterionError::NotAnObject),
            };
        };

        let tag = obj.get("type").and_then(Value::as_str).map(str::trim);
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| obj.get("id").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| tag.unwrap_or("criterion").to_string());

        let points = match read_points(obj) {
            Ok(points) => points,
            Err(e) => {
                return Self {
                    description,
                    points: 0.0,
                    kind: CriterionKind::Invalid(e),
                };
            }
        };

        let kind = match tag {
            None => Err(CriterionError::MissingField("type")),
            Some(tag) => parse_kind(tag, obj),
        }
        .unwrap_or_else(CriterionKind::Invalid);

        Self {
            description,
            points,
            kind,
        }
    }
}

/// Reads and validates the `points` field.
fn read_points(obj: &Map<String, Value>) -> Result<f64, CriterionError> {
    let value = obj
        .get("points")
        .ok_or(CriterionError::MissingField("points"))?;
    let points = value.as_f64().ok_or(CriterionError::InvalidField {
        field:    "points",
        expected: "a number",
    })?;
    if !points.is_finite() || points < 0.0 {
        return Err(CriterionError::InvalidPoints(points));
    }
    Ok(points)
}

/// Reads an optional boolean field.
fn read_bool(
    obj: &Map<String, Value>,
    field: &'static str,
    default: bool,
) -> Result<bool, CriterionError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v.as_bool().ok_or(CriterionError::InvalidField {
            field,
            expected: "a boolean",
        }),
    }
}

/// Reads an optional string field.
fn read_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, CriterionError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or(CriterionError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

/// Reads the `required_elements` list.
fn read_elements(obj: &Map<String, Value>) -> Result<Vec<String>, CriterionError> {
    let invalid = CriterionError::InvalidField {
        field:    "required_elements",
        expected: "a list of element names",
    };
    match obj.get("required_elements") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned).ok_or(invalid.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map(|names| names.into_iter().unique().collect()),
        Some(_) => Err(invalid),
    }
}

/// Builds the kind for a type tag.
fn parse_kind(tag: &str, obj: &Map<String, Value>) -> Result<CriterionKind, CriterionError> {
    let syntax = |language: Language| -> Result<CriterionKind, CriterionError> {
        Ok(CriterionKind::SyntaxCheck {
            language,
            required_elements: read_elements(obj)?,
        })
    };

    match tag {
        "ai_review" => Ok(CriterionKind::AiReview {
            system_prompt: read_str(obj, "system_prompt")?
                .unwrap_or(DEFAULT_REVIEW_PROMPT)
                .to_string(),
        }),
        "syntax_check" => {
            let language = read_str(obj, "language")?
                .map(Language::from_str)
                .transpose()?
                .unwrap_or(Language::Python);
            syntax(language)
        }
        "python_syntax" => syntax(Language::Python),
        "microbit_blocks" => syntax(Language::Microbit),
        "scratch_blocks" => syntax(Language::Scratch),
        "output_match" => Ok(CriterionKind::OutputMatch {
            expected:       read_str(obj, "expected")?
                .ok_or(CriterionError::MissingField("expected"))?
                .to_string(),
            partial_credit: read_bool(obj, "partial_credit", false)?,
        }),
        other => Ok(CriterionKind::Other(other.to_string())),
    }
}

/// Deserialises a default assignment title.
fn default_title() -> String {
    DEFAULT_ASSIGNMENT_TITLE.to_string()
}

/// The assignment descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Student files to grade, in order.
    #[serde(default)]
    pub files:             Vec<String>,
    /// Assignment instructions given to the oracle in verdict mode.
    #[serde(default)]
    pub assignment_prompt: String,
    /// Title used when logging the grade.
    #[serde(default = "default_title")]
    pub assignment_title:  String,
    /// Tracking-database topic the grade belongs to.
    #[serde(default)]
    pub grade_topic_id:    String,
    /// Raw criteria; absent means verdict mode.
    #[serde(default)]
    criteria:              Option<Vec<Value>>,
}

impl Assignment {
    /// Reads and parses a descriptor file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read assignment config {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Could not parse assignment config {}", path.display()))
    }

    /// Parses a descriptor from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid assignment descriptor")
    }

    /// Returns the parsed criteria, or `None` when the descriptor has none.
    pub fn criteria(&self) -> Option<Vec<Criterion>> {
        self.criteria
            .as_ref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw.iter().map(Criterion::from_value).collect())
    }
}
