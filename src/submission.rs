#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Assembly of the student's files into one gradable text blob.

use std::{fmt::Display, path::Path};

use anyhow::{Context, Result, bail};

/// The submitted source: one or more files, each preceded by a
/// `# === name ===` header, separated by blank lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionCode {
    /// File names in submission order.
    files: Vec<String>,
    /// Concatenated source text.
    text:  String,
}

impl SubmissionCode {
    /// Reads every file in `files`.
    ///
    /// A missing or zero-length file is an error.
    pub fn load<I, P>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut names = Vec::new();
        let mut parts = Vec::new();

        for file in files {
            let path = file.as_ref();
            let name = path.display().to_string();
            let empty = std::fs::metadata(path)
                .map(|m| m.len() == 0)
                .unwrap_or(true);
            if empty {
                bail!("Required file missing or empty: {name}");
            }

            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read submission file {name}"))?;
            parts.push(format!("# === {name} ===\n{contents}"));
            names.push(name);
        }

        Ok(Self {
            files: names,
            text:  parts.join("\n\n"),
        })
    }

    /// Wraps already assembled source text.
    pub fn from_source(text: impl Into<String>) -> Self {
        Self {
            files: Vec::new(),
            text:  text.into(),
        }
    }

    /// Returns the concatenated source.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the names of the files the submission was built from.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Returns true when there is no source text at all.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl Display for SubmissionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for SubmissionCode {
    fn from(value: &str) -> Self {
        Self::from_source(value)
    }
}
