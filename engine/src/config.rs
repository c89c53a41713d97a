use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const API_KEY_VAR: &str = "XAI_API_KEY";
pub const CONFIG_FILE_NAME: &str = "imagine.ron";

const DEFAULT_POLL_INTERVAL_SECS: f64 = 2.0;
const MIN_POLL_INTERVAL_SECS: f64 = 0.25;
const MAX_POLL_INTERVAL_SECS: f64 = 300.0;

/// Endpoints, default models, timeouts and output locations.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    /// Submission endpoint; the job status endpoint is `<this>/<job id>`
    pub generations_path: String,
    pub image_model: String,
    pub video_model: String,
    pub user_agent: String,
    pub submit_timeout_secs: u64,
    pub poll_request_timeout_secs: u64,
    pub poll_interval_secs: f64,
    pub job_timeout_secs: u64,
    /// Replaces `~/Projects/tmp` as the preferred output directory
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://api.x.ai/v1".into(),
            generations_path: "/images/generations".into(),
            image_model: "grok-imagine-image-pro".into(),
            video_model: "grok-imagine-video".into(),
            user_agent: concat!("imagine/", env!("CARGO_PKG_VERSION")).into(),
            submit_timeout_secs: 300,
            poll_request_timeout_secs: 30,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            job_timeout_secs: 600,
            output_dir: None,
        }
    }
}

impl Config {
    pub fn generations_url(&self) -> String {
        format!("{}{}", self.api_base, self.generations_path)
    }

    pub fn job_status_url(&self, job_id: &str) -> String {
        format!("{}/{job_id}", self.generations_url())
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn poll_request_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_request_timeout_secs)
    }

    /// Pause between status checks, kept within 0.25s..=300s; NaN falls back
    /// to the default
    pub fn poll_interval(&self) -> Duration {
        let secs = if self.poll_interval_secs.is_nan() {
            DEFAULT_POLL_INTERVAL_SECS
        } else {
            self.poll_interval_secs
                .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS)
        };
        Duration::from_secs_f64(secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Reads a RON config file
    pub fn load(path: &Path) -> Result<Self> {
        let src = fs::read_to_string(path)?;
        Ok(ron::from_str(&src)?)
    }

    /// Loads the user's config file, falling back to defaults when there is none
    pub fn load_or_default() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_local_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Reads the API key from [`API_KEY_VAR`]; unset and blank are both missing
pub fn api_key_from_env() -> Result<String> {
    api_key_from(std::env::var(API_KEY_VAR).ok())
}

fn api_key_from(value: Option<String>) -> Result<String> {
    value
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(Error::CredentialMissing { var: API_KEY_VAR })
}
