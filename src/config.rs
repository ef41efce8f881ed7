#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Settings read from the environment once at start-up.
//!
//! Nothing in the crate reads environment variables after
//! [`Settings::from_env`] returns; collaborators receive the pieces they need
//! when they are constructed.

use std::time::Duration;

use crate::constants::{DEFAULT_OPENAI_BASE, EXEC_TIMEOUT, ORACLE_TIMEOUT};

/// Returns the trimmed value of `key`, treating blank values as unset.
fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Parses an environment variable into a `Duration`, falling back to
/// `default` when parsing fails or the variable is missing.
fn read_timeout_secs(key: &str, default: Duration) -> Duration {
    non_empty_var(key)
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Returns true unless `DEBUG` is unset or one of `0`, `false`, `False`, or
/// empty.
pub fn debug_enabled() -> bool {
    !matches!(std::env::var("DEBUG").as_deref(), Err(_) | Ok("0" | "" | "false" | "False"))
}

/// Credentials for one OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiEndpoint {
    /// Base URL for the API.
    api_base: String,
    /// API key used to authenticate requests.
    api_key:  String,
}

impl OpenAiEndpoint {
    /// Creates an endpoint description.
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key:  api_key.into(),
        }
    }

    /// Returns the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for OpenAiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEndpoint")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// OpenAI credentials: a preferred direct endpoint and a fallback one.
#[derive(Clone, Debug, Default)]
pub struct OpenAiSettings {
    /// Endpoint tried first, if configured.
    pub direct:   Option<OpenAiEndpoint>,
    /// Endpoint tried after every model failed on the direct one.
    pub fallback: Option<OpenAiEndpoint>,
    /// Replacement for the first model of the chain.
    pub model:    Option<String>,
}

impl OpenAiSettings {
    /// Reads `CODIO_DIRECT_OPENAI_KEY`/`CODIO_DIRECT_OPENAI_BASE` and
    /// `OPENAI_API_KEY`/`OPENAI_BASE_URL`.
    fn from_env() -> Self {
        let direct = non_empty_var("CODIO_DIRECT_OPENAI_KEY").map(|key| {
            let base = non_empty_var("CODIO_DIRECT_OPENAI_BASE")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string());
            OpenAiEndpoint::new(base, key)
        });
        let fallback = non_empty_var("OPENAI_API_KEY").map(|key| {
            let base =
                non_empty_var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string());
            OpenAiEndpoint::new(base, key)
        });

        Self {
            direct,
            fallback,
            model: non_empty_var("OPENAI_MODEL"),
        }
    }

    /// Returns true when at least one endpoint is available.
    pub fn is_configured(&self) -> bool {
        self.direct.is_some() || self.fallback.is_some()
    }
}

/// Codio runtime information.
#[derive(Clone, Debug, Default)]
pub struct CodioSettings {
    /// Raw `CODIO_AUTOGRADE_ENV` JSON; present only inside Codio.
    pub autograde_env: Option<String>,
    /// Grade v2 submission endpoint.
    pub grade_url:     Option<String>,
}

impl CodioSettings {
    /// Reads `CODIO_AUTOGRADE_ENV` and `CODIO_AUTOGRADE_V2_URL`.
    fn from_env() -> Self {
        Self {
            autograde_env: non_empty_var("CODIO_AUTOGRADE_ENV"),
            grade_url:     non_empty_var("CODIO_AUTOGRADE_V2_URL"),
        }
    }

    /// Returns true when running inside a Codio autograde job.
    pub fn in_codio(&self) -> bool {
        self.autograde_env.is_some()
    }

    /// Student e-mail recorded by Codio, if any.
    pub fn student_email(&self) -> Option<String> {
        let env: serde_json::Value = serde_json::from_str(self.autograde_env.as_deref()?).ok()?;
        env.get("student")?
            .get("email")?
            .as_str()
            .map(str::to_owned)
    }
}

/// Notion credentials; logging happens only when all three are present.
#[derive(Clone)]
pub struct NotionSettings {
    /// Integration token.
    pub api_key:              String,
    /// Database receiving one page per grade.
    pub grades_database_id:   String,
    /// Database listing students and their e-mails.
    pub students_database_id: String,
}

impl NotionSettings {
    /// Reads `NOTION_API_KEY`, `NOTION_GRADES_DATABASE_ID` and
    /// `NOTION_STUDENTS_DATABASE_ID`.
    fn from_env() -> Option<Self> {
        Some(Self {
            api_key:              non_empty_var("NOTION_API_KEY")?,
            grades_database_id:   non_empty_var("NOTION_GRADES_DATABASE_ID")?,
            students_database_id: non_empty_var("NOTION_STUDENTS_DATABASE_ID")?,
        })
    }
}

impl std::fmt::Debug for NotionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionSettings")
            .field("grades_database_id", &self.grades_database_id)
            .field("students_database_id", &self.students_database_id)
            .finish_non_exhaustive()
    }
}

/// Everything the grader reads from its environment.
#[derive(Clone, Debug)]
pub struct Settings {
    /// OpenAI credentials.
    pub openai:         OpenAiSettings,
    /// Codio runtime information.
    pub codio:          CodioSettings,
    /// Notion credentials, if complete.
    pub notion:         Option<NotionSettings>,
    /// Limit for running submissions.
    pub exec_timeout:   Duration,
    /// Limit for a single AI review oracle call.
    pub oracle_timeout: Duration,
    /// Interpreter override for running submissions.
    pub python:         Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai:         OpenAiSettings::default(),
            codio:          CodioSettings::default(),
            notion:         None,
            exec_timeout:   EXEC_TIMEOUT,
            oracle_timeout: ORACLE_TIMEOUT,
            python:         None,
        }
    }
}

impl Settings {
    /// Builds the settings from the current process environment.
    pub fn from_env() -> Self {
        Self {
            openai:         OpenAiSettings::from_env(),
            codio:          CodioSettings::from_env(),
            notion:         NotionSettings::from_env(),
            exec_timeout:   read_timeout_secs("GRADER_EXEC_TIMEOUT_SECS", EXEC_TIMEOUT),
            oracle_timeout: read_timeout_secs("GRADER_ORACLE_TIMEOUT_SECS", ORACLE_TIMEOUT),
            python:         non_empty_var("GRADER_PYTHON"),
        }
    }
}
