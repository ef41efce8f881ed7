#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Small helpers shared across the crate.

use std::{ffi::OsString, path::PathBuf};

use anyhow::{Context, Result};
use which::which;

/// Finds and returns the path to a Python interpreter.
///
/// * `preferred`: an explicit interpreter name or path; when set, no other
///   candidate is tried.
pub fn python_path(preferred: Option<&str>) -> Result<OsString> {
    if let Some(name) = preferred {
        return which(name)
            .map(PathBuf::into_os_string)
            .with_context(|| format!("Cannot find the configured Python interpreter ({name})"));
    }

    which("python3")
        .or_else(|_| which("python"))
        .map(PathBuf::into_os_string)
        .context("Cannot find a Python interpreter on path (python3 or python)")
}

/// Truncates `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
