#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Defaults, limits, and fixed strings used across the grader.

use std::time::Duration;

/// Default assignment descriptor looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "autograde_config.json";

/// Wall-clock limit for running a submission during output comparison.
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(5);

/// Wall-clock limit for a single oracle request made by AI review.
pub const ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause between attempts against the fallback OpenAI client.
pub const FALLBACK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Base URL used for the direct OpenAI client when none is configured.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Models tried in order; an override replaces only the first entry.
pub const MODEL_CHAIN: [&str; 3] = ["gpt-4.1-nano-2025-04-14", "gpt-4o-mini", "gpt-3.5-turbo"];

/// Title used when the assignment descriptor does not name one.
pub const DEFAULT_ASSIGNMENT_TITLE: &str = "Codio Assignment";

/// E-mail used for tracking when neither the CLI nor Codio supply one.
pub const UNKNOWN_EMAIL: &str = "unknown@nowhere";

/// Notion API version header value.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Notion API root.
pub const NOTION_API: &str = "https://api.notion.com/v1";

/// Notion rich-text properties reject long payloads, so notes are cut here.
pub const NOTION_NOTES_LIMIT: usize = 1900;

/// Points the tracking database records as the maximum for every grade.
pub const NOTION_TOTAL: u32 = 100;

/// Feedback format identifier understood by the Codio grade v2 endpoint.
pub const CODIO_FORMAT_MD: &str = "md";

/// System prompt used by AI review criteria that do not provide their own.
pub const DEFAULT_REVIEW_PROMPT: &str = "You are an auto-grader for middle-school programming \
                                         assignments. Start your reply with a numeric score from \
                                         0 to 100, then give one or two short, friendly sentences \
                                         of feedback.";

/// System prompt for the yes/no requirements verdict.
pub const VERDICT_PROMPT: &str = "You are an auto-grader for middle-school Python assignments.\n\
                                  Respond ONLY with \"yes\" or \"no\" (lowercase) when asked if \
                                  code\nmeets the assignment requirements; no extra text.";

/// Mentor prompt used after a passing verdict.
pub const PRAISE_PROMPT: &str = "You are a kind mentor. Give one upbeat sentence of praise.";

/// Mentor prompt used after a failing verdict.
pub const HINT_PROMPT: &str = "You are a kind mentor. In <=2 short sentences explain why the code \
                               might not run. Keep it friendly for an 11-yo.";

/// Grade awarded by verdict mode when the oracle says the code passes.
pub const VERDICT_PASS_GRADE: f64 = 100.0;

/// Grade awarded by verdict mode for any other answer.
pub const VERDICT_FAIL_GRADE: f64 = 50.0;

/// Criterion description used for the verdict-mode report.
pub const VERDICT_REQUIREMENT: &str = "Assignment requirements";

/// Mentor feedback used when the follow-up oracle call fails.
pub const MENTOR_FALLBACK: &str = "Thanks for your submission! Review the assignment instructions \
                                   and give it another try.";
