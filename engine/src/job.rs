//! Submission and polling of generation jobs.
//!
//! ```text
//! Submitting ──(results in response)──────────────────────────> Resolved
//!     │
//!     └─(job id)──> AwaitingJob ──> Polling ──(done / items)────> Resolved
//!                                      │  ├──(expired/failed/error)> Failed
//!                                      │  └──(deadline)───────────> TimedOut
//!                                      └──(404 / pending) retried after the interval
//! ```

use std::time::Duration;

use log::{debug, info};
use serde_json::Value;
use tokio::time::{Instant, sleep};

use crate::{
    config::Config,
    error::{Error, Result},
    request::GenerationRequest,
    response::{Completed, JobHandle, JobResponse, Submission, snapshot},
    transport::{ApiCall, Transport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.job_timeout(),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

pub struct JobHandler<'a, T> {
    transport: &'a T,
    config: &'a Config,
    api_key: &'a str,
}

impl<'a, T: Transport> JobHandler<'a, T> {
    pub fn new(transport: &'a T, config: &'a Config, api_key: &'a str) -> Self {
        Self {
            transport,
            config,
            api_key,
        }
    }

    /// Sends the request and classifies the answer as a result or a job to poll
    pub async fn submit(&self, request: &GenerationRequest) -> Result<Submission> {
        let body = serde_json::to_value(request.body())?;
        let call = ApiCall::post(
            self.config.generations_url(),
            body,
            self.config.submit_timeout(),
        )
        .bearer_auth(self.api_key)
        .header("User-Agent", &self.config.user_agent);

        let raw = self.transport.send(call).await?;
        debug!("Submission response: {}", snapshot(&raw));

        let submission = Submission::classify(raw)?;
        if let Submission::Deferred(handle) = &submission {
            info!("Job submitted: {handle}");
        }
        Ok(submission)
    }

    /// Checks the job's status until it resolves, fails or runs out of time.
    ///
    /// A 404 from the status endpoint only means the job is not visible yet
    /// and is retried; every other transport error ends the poll.
    pub async fn poll(&self, handle: JobHandle, policy: PollPolicy) -> Result<Completed> {
        let url = self.config.job_status_url(handle.id());
        let started = Instant::now();
        // `None` when the timeout is too large to ever elapse
        let deadline = started.checked_add(policy.timeout);

        while deadline.is_none_or(|deadline| Instant::now() < deadline) {
            let call = ApiCall::get(&url, self.config.poll_request_timeout())
                .bearer_auth(self.api_key)
                .header("User-Agent", &self.config.user_agent);

            let raw: Value = match self.transport.send(call).await {
                Ok(raw) => raw,
                Err(e) if e.is_not_found() => {
                    debug!("Job {handle} not found yet");
                    sleep(policy.interval).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match JobResponse::classify(raw)? {
                JobResponse::Resolved(done) => {
                    info!(
                        "Job {handle} resolved after {:.0}s",
                        started.elapsed().as_secs_f64()
                    );
                    return Ok(done);
                }
                JobResponse::Failed { status, raw } => return Err(Error::job_failed(status, raw)),
                JobResponse::Pending { status } => {
                    info!(
                        "polling... {:.0}s elapsed, status={status}",
                        started.elapsed().as_secs_f64()
                    );
                    sleep(policy.interval).await;
                }
            }
        }

        Err(Error::JobTimeout {
            job_id: handle.id().to_string(),
            timeout_secs: policy.timeout.as_secs(),
        })
    }

    /// Submits and, for deferred jobs, polls to a terminal outcome
    pub async fn run(&self, request: &GenerationRequest, policy: PollPolicy) -> Result<Completed> {
        match self.submit(request).await? {
            Submission::Resolved(done) => Ok(done),
            Submission::Deferred(handle) => {
                info!("Polling job {handle}...");
                self.poll(handle, policy).await
            }
        }
    }
}
