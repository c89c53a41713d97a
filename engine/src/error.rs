use serde_json::Value;
use thiserror::Error;

use crate::response::snapshot;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while submitting, polling and materializing a generation job
#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing API credential ({var} is unset or blank)")]
    CredentialMissing { var: &'static str },

    #[error("Remote API failed ({status_code}): {body}")]
    Remote { status_code: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response had neither a job id nor results, or a malformed `data` field
    #[error("Unexpected response shape: {snapshot}")]
    Protocol { snapshot: String },

    #[error("Job {status}: {snapshot}")]
    JobFailed {
        status: String,
        raw: Value,
        snapshot: String,
    },

    #[error("Timed out after {timeout_secs}s waiting for job {job_id}")]
    JobTimeout { job_id: String, timeout_secs: u64 },

    #[error("Result item {index} has neither inline data nor a URL")]
    DataIncomplete { index: usize },

    #[error("None of the returned result items could be written")]
    NoUsableItems,

    #[error("No results returned: {snapshot}")]
    NoResults { snapshot: String },

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Config(#[from] ron::error::SpannedError),
}

impl Error {
    pub fn protocol(raw: &Value) -> Self {
        Self::Protocol {
            snapshot: snapshot(raw),
        }
    }

    pub fn job_failed(status: impl Into<String>, raw: Value) -> Self {
        Self::JobFailed {
            status: status.into(),
            snapshot: snapshot(&raw),
            raw,
        }
    }

    pub fn no_results(raw: &Value) -> Self {
        Self::NoResults {
            snapshot: snapshot(raw),
        }
    }

    /// A status check answered 404: the job may not be indexed yet
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Remote {
                status_code: 404,
                ..
            }
        )
    }

    /// Process exit code for a front end: 2 for a missing credential, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CredentialMissing { .. } => 2,
            _ => 1,
        }
    }
}
