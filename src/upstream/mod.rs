//! Bridge between one synchronous HTTP request and the upstream job queue.
//!
//! A job is submitted, then its status is checked on a fixed cadence until it
//! completes, fails, or the budget runs out. One deadline covers the submit,
//! every status check and the result fetch, and is kept under the host
//! platform's request ceiling.

mod extract;
mod job;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

use crate::config::UpstreamConfig;
use crate::constants::{RESULT_ERROR_EXCERPT_CHARS, SUBMIT_ERROR_EXCERPT_CHARS};
use crate::error::MemeError;

pub use extract::extract_result;
pub use job::{
    GeneratedImage, GenerationRequest, GenerationResult, JobStatus, UpstreamJob,
    mime_type_for_extension,
};

use extract::excerpt;
use job::SubmitPayload;

#[derive(Deserialize, Debug)]
struct StatusResponse {
    #[serde(default)]
    status: String,
}

/// Talks to the upstream queue on behalf of incoming requests.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    /// Client for the given upstream.
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// The config this client was built with.
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Submits the request and waits for the image. Submission, polling and
    /// the result fetch all share one deadline.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let deadline = Instant::now() + self.config.cadence.deadline;
        let job = self.submit_before(request, deadline).await?;
        self.poll_until(job, deadline).await
    }

    fn api_key(&self) -> Result<&str, MemeError> {
        self.config.api_key.as_deref().ok_or_else(|| {
            MemeError::Configuration(
                "FAL_API_KEY environment variable is not set. Add it to the server environment."
                    .to_string(),
            )
        })
    }

    /// Submits a generation job. Nothing is retried.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<UpstreamJob, MemeError> {
        self.submit_before(request, Instant::now() + self.config.cadence.deadline)
            .await
    }

    #[instrument(skip_all, fields(mime = %request.mime_type, bytes = request.image.len()))]
    async fn submit_before(
        &self,
        request: &GenerationRequest,
        deadline: Instant,
    ) -> Result<UpstreamJob, MemeError> {
        let api_key = self.api_key()?;
        let data_uri = request.data_uri();
        let body = SubmitPayload::new(&request.instruction, &data_uri);
        let remaining = time_left(deadline);
        if remaining.is_zero() {
            return Err(MemeError::UpstreamTimeout { attempts: 0 });
        }
        let timeout = self.config.cadence.submit_timeout.min(remaining);

        let response = self
            .client
            .post(self.config.submit_url())
            .header(AUTHORIZATION, format!("Key {api_key}"))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    MemeError::UpstreamSubmit(format!("fal.ai submit timed out after {timeout:?}"))
                } else {
                    MemeError::UpstreamSubmit(format!("Network error submitting to fal.ai: {err}"))
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| {
            MemeError::UpstreamSubmit(format!("Failed reading fal.ai submit response: {err}"))
        })?;

        if !matches!(status.as_u16(), 200 | 201) {
            return Err(MemeError::UpstreamSubmit(format!(
                "fal.ai rejected request [{}]: {}",
                status.as_u16(),
                excerpt(&text, SUBMIT_ERROR_EXCERPT_CHARS)
            )));
        }

        let data: Value = serde_json::from_str(&text).map_err(|err| {
            MemeError::UpstreamSubmit(format!(
                "fal.ai submit response wasn't JSON ({err}): {}",
                excerpt(&text, SUBMIT_ERROR_EXCERPT_CHARS)
            ))
        })?;

        let job = UpstreamJob::from_submission(data);
        match &job.request_id {
            Some(request_id) => info!("Submitted job {}", request_id),
            None => info!("Upstream answered synchronously"),
        }
        Ok(job)
    }

    /// Waits for a submitted job to finish and extracts its image.
    pub async fn poll(&self, job: UpstreamJob) -> GenerationResult {
        self.poll_until(job, Instant::now() + self.config.cadence.deadline)
            .await
    }

    #[instrument(skip_all, fields(request_id = ?job.request_id))]
    async fn poll_until(&self, mut job: UpstreamJob, deadline: Instant) -> GenerationResult {
        if job.status == JobStatus::Completed
            && let Some(payload) = job.payload.take()
        {
            return extract_result(&payload);
        }
        let Some(request_id) = job.request_id.clone() else {
            return Err(MemeError::ResultParse(
                "Upstream job has neither a request id nor a result".to_string(),
            ));
        };
        let api_key = self.api_key()?;
        let cadence = self.config.cadence;
        let started = Instant::now();
        let mut attempts = 0;

        while attempts < cadence.max_attempts {
            sleep(cadence.interval.min(time_left(deadline))).await;
            let remaining = time_left(deadline);
            if remaining.is_zero() {
                break;
            }
            attempts += 1;

            let timeout = cadence.status_timeout.min(remaining);
            match self.check_status(&request_id, api_key, timeout).await {
                Ok(JobStatus::Completed) => {
                    debug!("Job completed after {} status checks", attempts);
                    let remaining = time_left(deadline);
                    if remaining.is_zero() {
                        break;
                    }
                    let timeout = cadence.result_timeout.min(remaining);
                    let payload = self.fetch_result(&request_id, api_key, timeout).await?;
                    return extract_result(&payload);
                }
                Ok(JobStatus::Failed) => {
                    warn!("Job failed upstream after {} status checks", attempts);
                    return Err(MemeError::UpstreamJobFailed);
                }
                Ok(JobStatus::Pending) => {
                    debug!("Still waiting, attempt {}/{}", attempts, cadence.max_attempts);
                }
                Err(err) => debug!("Ignoring: {}", err),
            }
        }

        warn!(
            "Gave up after {} status checks in {:?}",
            attempts,
            started.elapsed()
        );
        Err(MemeError::UpstreamTimeout { attempts })
    }

    async fn check_status(
        &self,
        request_id: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<JobStatus, MemeError> {
        let response = self
            .client
            .get(self.config.status_url(request_id))
            .header(AUTHORIZATION, format!("Key {api_key}"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| MemeError::UpstreamPollTransient(err.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(MemeError::UpstreamPollTransient(format!(
                "status endpoint returned {}",
                response.status()
            )));
        }
        let body: StatusResponse = response
            .json()
            .await
            .map_err(|err| MemeError::UpstreamPollTransient(err.to_string()))?;
        Ok(JobStatus::from(body.status.as_str()))
    }

    async fn fetch_result(
        &self,
        request_id: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Value, MemeError> {
        let response = self
            .client
            .get(self.config.result_url(request_id))
            .header(AUTHORIZATION, format!("Key {api_key}"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| MemeError::ResultParse(format!("Failed to fetch fal.ai result: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MemeError::ResultParse(format!(
                "fal.ai result endpoint returned [{}]: {}",
                status.as_u16(),
                excerpt(&text, RESULT_ERROR_EXCERPT_CHARS)
            )));
        }
        response
            .json()
            .await
            .map_err(|err| MemeError::ResultParse(format!("fal.ai result wasn't JSON: {err}")))
    }
}

fn time_left(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
