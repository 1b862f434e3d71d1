//! Scheduled job listing and triggering.
//!
//! Topic names are normalized (trimmed, upper-cased) and mapped to the
//! server labels through two tables. Listing and triggering deliberately
//! disagree: listing keeps notebook topics as they are and rejects unknown
//! topics, triggering folds both notebook kinds into `NOTEBOOK` and passes
//! unknown names through.

use std::fmt;
use std::str::FromStr;

use serde_json::{Value, json};
use thiserror::Error;

use crate::CoreError;
use crate::http;
use crate::session::Session;

/// Listing topics: accepted names and the label sent to the server.
const LIST_TOPICS: &[(&str, &str)] = &[
    ("DATA_QUALITY", "DSDQ"),
    ("DSDQ", "DSDQ"),
    ("PYTHON_NOTEBOOK", "PYTHON_NOTEBOOK"),
    ("SQL_NOTEBOOK", "SQL_NOTEBOOK"),
];

/// Trigger topics: names rewritten before sending. Others pass through.
const TRIGGER_TOPICS: &[(&str, &str)] = &[
    ("PYTHON_NOTEBOOK", "NOTEBOOK"),
    ("SQL_NOTEBOOK", "NOTEBOOK"),
    ("DATA_QUALITY", "DSDQ"),
];

/// Page size requested from the list endpoint.
const LIST_PAGE_SIZE: u32 = 1000;

/// Server label for listing, or `None` if the topic is not listable.
#[must_use]
pub fn list_topic(topic_name: &str) -> Option<&'static str> {
    lookup(LIST_TOPICS, &normalize(topic_name))
}

/// Server label for triggering. Unknown names are only normalized.
#[must_use]
pub fn trigger_topic(job_type: &str) -> String {
    let normalized = normalize(job_type);
    lookup(TRIGGER_TOPICS, &normalized).map_or(normalized, str::to_string)
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, label)| *label)
}

/// Kind of schedulable job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    /// Data-quality check.
    DataQuality,
    /// Python notebook.
    PythonNotebook,
    /// SQL notebook.
    SqlNotebook,
}

impl JobType {
    /// Every job type.
    pub const ALL: [Self; 3] = [Self::DataQuality, Self::PythonNotebook, Self::SqlNotebook];

    /// Name accepted by [`Scheduler::list_all`] and [`Scheduler::trigger_scheduler`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DataQuality => "DATA_QUALITY",
            Self::PythonNotebook => "PYTHON_NOTEBOOK",
            Self::SqlNotebook => "SQL_NOTEBOOK",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_lowercase())
    }
}

/// A job type name that matches no [`JobType`].
#[derive(Debug, Error)]
#[error("unknown job type '{0}' (expected python_notebook, sql_notebook or data_quality)")]
pub struct UnknownJobType(pub String);

impl FromStr for JobType {
    type Err = UnknownJobType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "DATA_QUALITY" | "DSDQ" => Ok(Self::DataQuality),
            "PYTHON_NOTEBOOK" => Ok(Self::PythonNotebook),
            "SQL_NOTEBOOK" => Ok(Self::SqlNotebook),
            _ => Err(UnknownJobType(s.to_string())),
        }
    }
}

/// Issues authenticated job requests for one [`Session`].
///
/// The token and user id are read from the session on every call, so
/// changes to the shared user state apply to later requests. Failures are
/// logged and returned as `None`; nothing here returns an error.
#[derive(Debug, Clone)]
pub struct Scheduler {
    session: Session,
}

impl Scheduler {
    /// Bind a scheduler to a session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// The session this scheduler uses.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// List scheduled jobs for a topic.
    ///
    /// Accepts `data_quality`, `python_notebook` or `sql_notebook` in any
    /// case. An invalid topic returns `None` without a request.
    pub async fn list_all(&self, topic_name: &str) -> Option<Vec<Value>> {
        let Some(topic) = list_topic(topic_name) else {
            log::error!(
                "Invalid topic selection '{}'. Please select from python_notebook, sql_notebook or data_quality.",
                topic_name.trim()
            );
            return None;
        };

        match self.fetch_jobs(topic).await {
            Ok(jobs) => Some(jobs),
            Err(e) => {
                log::error!("Error while calling list scheduler API: {e}");
                None
            }
        }
    }

    /// Trigger a scheduled job and return the server response.
    pub async fn trigger_scheduler(
        &self,
        job_name: &str,
        job_id: impl Into<Value>,
        job_type: &str,
    ) -> Option<Value> {
        let topic = trigger_topic(job_type);

        match self.send_trigger(job_name, job_id.into(), &topic).await {
            Ok(response) => Some(response),
            Err(e) => {
                log::error!("Error while triggering scheduler: {e}");
                None
            }
        }
    }

    async fn fetch_jobs(&self, topic: &str) -> Result<Vec<Value>, CoreError> {
        let state = self.session.user_state().snapshot();
        let access_token = state.access_token.ok_or_else(not_authenticated)?;

        let body = json!({
            "userId": state.user_id,
            "topic": topic,
            "searchBy": "",
            "sortBy": "",
            "ascending": true,
            "page": 0,
            "size": LIST_PAGE_SIZE,
            "statusFilter": [],
            "scheduledFrequencyFilter": [],
        });

        let url = self.session.endpoint_url(&self.session.endpoints().list);
        let mut data = http::post_json(
            self.session.http_client(),
            &url,
            Some(&access_token),
            &body,
            "list scheduler",
        )
        .await?;

        // absent content means no jobs; null or any other shape is an error
        match data.get_mut("content").map(Value::take) {
            None => Ok(Vec::new()),
            Some(Value::Array(jobs)) => Ok(jobs),
            Some(other) => Err(CoreError::Api(format!(
                "unexpected content in list response: {other}"
            ))),
        }
    }

    async fn send_trigger(
        &self,
        job_name: &str,
        job_id: Value,
        topic: &str,
    ) -> Result<Value, CoreError> {
        let state = self.session.user_state().snapshot();
        let access_token = state.access_token.ok_or_else(not_authenticated)?;

        let body = json!({
            "jobName": job_name,
            "jobId": job_id,
            "topic": topic,
            "userId": state.user_id,
        });

        let url = self.session.endpoint_url(&self.session.endpoints().trigger);
        http::post_json(
            self.session.http_client(),
            &url,
            Some(&access_token),
            &body,
            "trigger scheduler",
        )
        .await
    }
}

fn not_authenticated() -> CoreError {
    CoreError::Auth("session has no access token".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SharedUserState;

    #[test]
    fn list_topics_are_normalized_and_gated() {
        assert_eq!(list_topic("data_quality"), Some("DSDQ"));
        assert_eq!(list_topic("  Python_Notebook "), Some("PYTHON_NOTEBOOK"));
        assert_eq!(list_topic("sql_notebook"), Some("SQL_NOTEBOOK"));
        assert_eq!(list_topic("dsdq"), Some("DSDQ"));
        assert_eq!(list_topic("invalid_topic"), None);
        assert_eq!(list_topic("notebook"), None);
    }

    #[test]
    fn trigger_topics_fold_notebooks_and_pass_others_through() {
        assert_eq!(trigger_topic("python_notebook"), "NOTEBOOK");
        assert_eq!(trigger_topic(" SQL_NOTEBOOK"), "NOTEBOOK");
        assert_eq!(trigger_topic("data_quality"), "DSDQ");
        assert_eq!(trigger_topic("custom_kind "), "CUSTOM_KIND");
    }

    #[test]
    fn job_type_names_round_trip_through_both_tables() {
        for job_type in JobType::ALL {
            assert_eq!(job_type.to_string().parse::<JobType>().ok(), Some(job_type));
            assert!(list_topic(job_type.name()).is_some());
        }
        assert_eq!("dsdq".parse::<JobType>().ok(), Some(JobType::DataQuality));
        assert!("notebook".parse::<JobType>().is_err());
        assert_eq!(trigger_topic(JobType::SqlNotebook.name()), "NOTEBOOK");
    }

    #[tokio::test]
    async fn invalid_topic_returns_none() {
        let session = Session::new("http://127.0.0.1:9", SharedUserState::default());
        assert!(session.scheduler().list_all("invalid_topic").await.is_none());
    }

    #[tokio::test]
    async fn missing_token_returns_none() {
        let session = Session::new("http://127.0.0.1:9", SharedUserState::default());
        let scheduler = session.scheduler();
        assert!(scheduler.list_all("sql_notebook").await.is_none());
        assert!(
            scheduler
                .trigger_scheduler("nightly", 7, "python_notebook")
                .await
                .is_none()
        );
    }
}
