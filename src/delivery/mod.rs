#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Sending finished grades to the grading backend and the tracking database.

/// Codio grade v2 client.
pub mod codio;
/// Notion grade logging.
pub mod notion;

pub use codio::CodioClient;
pub use notion::NotionLogger;

use crate::{config::CodioSettings, constants::UNKNOWN_EMAIL};

/// Picks the student e-mail: the explicit override, then the one Codio
/// recorded, then a placeholder.
pub fn student_email(override_email: Option<&str>, codio: &CodioSettings) -> String {
    override_email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_owned)
        .or_else(|| codio.student_email())
        .unwrap_or_else(|| UNKNOWN_EMAIL.to_string())
}
