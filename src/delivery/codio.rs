#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Posting grades back to Codio.

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, warn};

use crate::{config::CodioSettings, constants::CODIO_FORMAT_MD};

/// Posts grades to Codio's grade v2 endpoint.
#[derive(Debug, Clone)]
pub struct CodioClient {
    /// Shared HTTP client.
    http: Client,
    /// Endpoint from `CODIO_AUTOGRADE_V2_URL`.
    url:  String,
}

impl CodioClient {
    /// Creates a client posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url:  url.into(),
        }
    }

    /// Creates a client from the Codio settings, if an endpoint is known.
    pub fn from_settings(settings: &CodioSettings) -> Option<Self> {
        settings.grade_url.as_deref().map(Self::new)
    }

    /// Sends `grade` (0-100) with markdown `feedback`.
    ///
    /// Returns whether the backend acknowledged the grade with a 2xx status;
    /// transport failures are errors.
    pub async fn send_grade(&self, grade: u32, feedback: &str) -> Result<bool> {
        let grade = grade.to_string();
        let form = [
            ("grade", grade.as_str()),
            ("feedback", feedback),
            ("format", CODIO_FORMAT_MD),
        ];

        let response = self
            .http
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .context("Failed to reach the Codio grading endpoint")?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "grade accepted");
            Ok(true)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "grade rejected by Codio");
            Ok(false)
        }
    }
}
