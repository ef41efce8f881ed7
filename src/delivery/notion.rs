#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Records each grade as a page in a Notion database, linked to the
//! student's page in a second database.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{
    config::NotionSettings,
    constants::{NOTION_API, NOTION_NOTES_LIMIT, NOTION_TOTAL, NOTION_VERSION},
    util::truncate_chars,
};

/// One page of a database query.
#[derive(Debug, Deserialize)]
struct QueryPage {
    /// Matching pages.
    #[serde(default)]
    results:     Vec<StudentPage>,
    /// Whether another page follows.
    #[serde(default)]
    has_more:    bool,
    /// Cursor for the following page.
    next_cursor: Option<String>,
}

/// A row of the students database.
#[derive(Debug, Deserialize)]
struct StudentPage {
    /// Page id.
    id:         String,
    /// Raw page properties.
    #[serde(default)]
    properties: Value,
}

impl StudentPage {
    /// Whether the `Email` property equals `email`, ignoring case.
    fn has_email(&self, email: &str) -> bool {
        self.properties
            .get("Email")
            .and_then(|p| p.get("email"))
            .and_then(Value::as_str)
            .is_some_and(|e| e.eq_ignore_ascii_case(email))
    }
}

/// The fields written to a grades page.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeEntry<'a> {
    /// Assignment title, used as the page name.
    pub title:           &'a str,
    /// Student page id.
    pub student_page_id: &'a str,
    /// Score out of 100.
    pub score:           u32,
    /// Feedback; truncated to the notes limit.
    pub feedback:        &'a str,
    /// Grade topic page id.
    pub topic_id:        &'a str,
    /// Timestamp of the grade.
    pub date:            DateTime<Utc>,
}

impl GradeEntry<'_> {
    /// Builds the page-creation body for the grades database.
    pub fn to_page(&self, grades_database_id: &str) -> Value {
        json!({
            "parent": { "database_id": grades_database_id },
            "properties": {
                "Name":        { "title": [{ "text": { "content": self.title } }] },
                "Student":     { "relation": [{ "id": self.student_page_id }] },
                "Date":        { "date": { "start": self.date.to_rfc3339() } },
                "Total":       { "number": NOTION_TOTAL },
                "Score":       { "number": self.score },
                "Notes":       { "rich_text": [{ "text": {
                    "content": truncate_chars(self.feedback, NOTION_NOTES_LIMIT)
                } }] },
                "Grade Topic": { "relation": [{ "id": self.topic_id }] },
            }
        })
    }
}

/// Writes grades to Notion.
#[derive(Debug, Clone)]
pub struct NotionLogger {
    /// Shared HTTP client.
    http:     Client,
    /// Credentials and database ids.
    settings: NotionSettings,
}

impl NotionLogger {
    /// Creates a logger for the configured databases.
    pub fn new(settings: NotionSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
        }
    }

    /// Adds the authentication and version headers.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.settings.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Finds the students-database page whose `Email` matches `email`.
    async fn find_student(&self, email: &str) -> Result<Option<String>> {
        let url = format!(
            "{NOTION_API}/databases/{}/query",
            self.settings.students_database_id
        );
        let mut cursor: Option<String> = None;

        loop {
            let body = match &cursor {
                Some(cursor) => json!({ "start_cursor": cursor }),
                None => json!({}),
            };
            let page: QueryPage = self
                .authorized(self.http.post(&url))
                .json(&body)
                .send()
                .await
                .context("Failed to query the Notion students database")?
                .error_for_status()
                .context("Notion rejected the students query")?
                .json()
                .await
                .context("Could not parse the Notion students query response")?;

            if let Some(student) = page.results.iter().find(|p| p.has_email(email)) {
                return Ok(Some(student.id.clone()));
            }
            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => return Ok(None),
            }
        }
    }

    /// Creates a grades page for the student with `email`.
    ///
    /// Returns `Ok(false)` without writing anything when no student page
    /// matches.
    pub async fn log(
        &self,
        email: &str,
        title: &str,
        score: u32,
        feedback: &str,
        topic_id: &str,
    ) -> Result<bool> {
        let Some(student_page_id) = self.find_student(email).await? else {
            info!(email, "no Notion student page found; skipping log");
            return Ok(false);
        };
        debug!(%student_page_id, "found Notion student page");

        let entry = GradeEntry {
            title,
            student_page_id: &student_page_id,
            score,
            feedback,
            topic_id,
            date: Utc::now(),
        };

        self.authorized(self.http.post(format!("{NOTION_API}/pages")))
            .json(&entry.to_page(&self.settings.grades_database_id))
            .send()
            .await
            .context("Failed to create the Notion grade page")?
            .error_for_status()
            .context("Notion rejected the grade page")?;

        info!(email, score, "logged grade to Notion");
        Ok(true)
    }
}
