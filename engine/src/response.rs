//! Classification of raw API responses.
//!
//! The generation API is inconsistent: a submission may answer with results
//! right away or with a job identifier (under one of several field names), and
//! a status check may flag completion through `status`, through a populated
//! `data` array, or both. Everything that interprets those shapes lives here so
//! the job handler only deals with [`Submission`] and [`JobResponse`].

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Diagnostic payload excerpts never exceed this many characters
pub const SNAPSHOT_LEN: usize = 400;

/// Field names under which the API has been seen returning the job identifier
pub const JOB_ID_FIELDS: [&str; 3] = ["id", "deferred_id", "request_id"];

/// Status values after which a job will never produce results
pub const FAILURE_STATUSES: [&str; 3] = ["expired", "failed", "error"];

pub const DONE_STATUS: &str = "done";

/// Compact JSON rendering of `raw`, cut to [`SNAPSHOT_LEN`] characters
pub fn snapshot(raw: &Value) -> String {
    raw.to_string().chars().take(SNAPSHOT_LEN).collect()
}

/// One generated asset, either embedded or referenced by URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssetItem {
    #[serde(default, rename = "b64_json")]
    pub inline_data: Option<String>,
    #[serde(default, rename = "url")]
    pub remote_url: Option<String>,
}

impl AssetItem {
    pub fn inline(b64: impl Into<String>) -> Self {
        Self {
            inline_data: Some(b64.into()),
            remote_url: None,
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            inline_data: None,
            remote_url: Some(url.into()),
        }
    }

    pub fn inline_data(&self) -> Option<&str> {
        self.inline_data.as_deref().filter(|s| !s.is_empty())
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref().filter(|s| !s.is_empty())
    }
}

/// Identifier of a deferred job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    fn from_response(raw: &Value) -> Option<Self> {
        JOB_ID_FIELDS
            .iter()
            .filter_map(|field| raw.get(field).and_then(Value::as_str))
            .find(|id| !id.is_empty())
            .map(Self::new)
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A response that carries results, plus the payload it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    pub items: Vec<AssetItem>,
    pub raw: Value,
}

/// Outcome of a submission call
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Resolved(Completed),
    Deferred(JobHandle),
}

impl Submission {
    /// Results win over an identifier. A response with neither is a
    /// [`Error::Protocol`] error.
    pub fn classify(raw: Value) -> Result<Self> {
        let items = items(&raw)?;
        if !items.is_empty() {
            return Ok(Self::Resolved(Completed { items, raw }));
        }

        JobHandle::from_response(&raw)
            .map(Self::Deferred)
            .ok_or_else(|| Error::protocol(&raw))
    }
}

/// State of a deferred job as reported by a status check
#[derive(Debug, Clone, PartialEq)]
pub enum JobResponse {
    Resolved(Completed),
    Pending { status: String },
    Failed { status: String, raw: Value },
}

impl JobResponse {
    /// Items present or `status == "done"` both mean success, and success
    /// takes precedence over a failure status.
    pub fn classify(raw: Value) -> Result<Self> {
        let status = status(&raw);
        let items = items(&raw)?;

        if !items.is_empty() || status == DONE_STATUS {
            Ok(Self::Resolved(Completed { items, raw }))
        } else if FAILURE_STATUSES.contains(&status.as_str()) {
            Ok(Self::Failed { status, raw })
        } else {
            Ok(Self::Pending { status })
        }
    }
}

fn status(raw: &Value) -> String {
    raw.get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
}

fn items(raw: &Value) -> Result<Vec<AssetItem>> {
    match raw.get("data") {
        None | Some(Value::Null) => Ok(vec![]),
        Some(data @ Value::Array(_)) => {
            serde_json::from_value(data.clone()).map_err(|_| Error::protocol(raw))
        }
        Some(_) => Err(Error::protocol(raw)),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde_json::json;

    use super::*;

    #[test]
    fn submission_with_items_is_resolved_without_polling() {
        let raw: Value = serde_json::from_str(indoc! {r#"
            {
                "data": [
                    {"b64_json": "aGVsbG8=", "revised_prompt": "a cat"},
                    {"url": "https://cdn.example/2.png"}
                ]
            }
        "#})
        .unwrap();

        let Submission::Resolved(done) = Submission::classify(raw).unwrap() else {
            panic!("expected a synchronous result");
        };
        assert_eq!(
            done.items,
            vec![
                AssetItem::inline("aGVsbG8="),
                AssetItem::remote("https://cdn.example/2.png")
            ]
        );
    }

    #[test]
    fn submission_id_field_names() {
        for field in JOB_ID_FIELDS {
            let sub = Submission::classify(json!({ field: "job-7" })).unwrap();
            assert_eq!(sub, Submission::Deferred(JobHandle::new("job-7")));
        }
    }

    #[test]
    fn empty_id_falls_through_to_next_field() {
        let sub = Submission::classify(json!({"id": "", "deferred_id": "d-1"})).unwrap();
        assert_eq!(sub, Submission::Deferred(JobHandle::new("d-1")));
    }

    #[test]
    fn empty_data_with_id_is_deferred() {
        let sub = Submission::classify(json!({"id": "abc", "data": []})).unwrap();
        assert_eq!(sub, Submission::Deferred(JobHandle::new("abc")));
    }

    #[test]
    fn malformed_submission_snapshot_is_bounded() {
        let raw = json!({ "message": "x".repeat(2000) });
        let err = Submission::classify(raw).unwrap_err();
        let Error::Protocol { snapshot } = err else {
            panic!("expected a protocol error, got {err:?}");
        };
        assert_eq!(snapshot.chars().count(), SNAPSHOT_LEN);
        assert!(snapshot.starts_with(r#"{"message":"xxx"#));
    }

    #[test]
    fn non_array_data_is_a_protocol_error() {
        let err = Submission::classify(json!({"data": "oops"})).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn done_status_is_resolved_even_without_items() {
        let resp = JobResponse::classify(json!({"status": "DONE"})).unwrap();
        assert!(matches!(resp, JobResponse::Resolved(Completed { ref items, .. }) if items.is_empty()));
    }

    #[test]
    fn failure_statuses_are_case_insensitive() {
        for status in ["expired", "Failed", "ERROR"] {
            let resp = JobResponse::classify(json!({ "status": status })).unwrap();
            assert!(
                matches!(resp, JobResponse::Failed { status: ref s, .. } if *s == status.to_lowercase())
            );
        }
    }

    #[test]
    fn items_beat_failure_status() {
        let resp = JobResponse::classify(json!({
            "status": "failed",
            "data": [{"url": "https://cdn.example/v.mp4"}]
        }))
        .unwrap();
        assert!(matches!(resp, JobResponse::Resolved(_)));
    }

    #[test]
    fn unknown_or_missing_status_is_pending() {
        assert_eq!(
            JobResponse::classify(json!({"status": "Processing"})).unwrap(),
            JobResponse::Pending {
                status: "processing".into()
            }
        );
        assert_eq!(
            JobResponse::classify(json!({})).unwrap(),
            JobResponse::Pending {
                status: String::new()
            }
        );
    }

    #[test]
    fn blank_item_fields_count_as_absent() {
        let item = AssetItem {
            inline_data: Some(String::new()),
            remote_url: Some("https://x".into()),
        };
        assert_eq!(item.inline_data(), None);
        assert_eq!(item.remote_url(), Some("https://x"));
    }
}
