//! Config handling

use std::path::PathBuf;
use std::time::Duration;

use tracing::log::LevelFilter;
use url::Url;

use crate::cli::{CliOptions, StorageMode};
use crate::constants::{
    LOCAL_UPLOAD_DIR, POLL_DEADLINE, POLL_INTERVAL, POLL_MAX_ATTEMPTS, RESULT_TIMEOUT,
    SERVERLESS_UPLOAD_DIR, STATUS_TIMEOUT, SUBMIT_TIMEOUT,
};

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// How often and for how long the bridge waits on a queued job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollCadence {
    /// Sleep before each status check
    pub interval: Duration,
    /// Status checks allowed before the job is declared timed out
    pub max_attempts: u32,
    /// Wall-clock budget for the whole polling phase
    pub deadline: Duration,
    /// Timeout for the submission POST
    pub submit_timeout: Duration,
    /// Timeout for each status GET
    pub status_timeout: Duration,
    /// Timeout for the result GET
    pub result_timeout: Duration,
}

impl Default for PollCadence {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: POLL_MAX_ATTEMPTS,
            deadline: POLL_DEADLINE,
            submit_timeout: SUBMIT_TIMEOUT,
            status_timeout: STATUS_TIMEOUT,
            result_timeout: RESULT_TIMEOUT,
        }
    }
}

/// Everything the bridge needs to talk to the upstream queue.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// API credential, `None` when unset
    pub api_key: Option<String>,
    /// Queue base URL, eg `https://queue.fal.run`
    pub base_url: Url,
    /// Model path, eg `fal-ai/flux-kontext-pro`
    pub model: String,
    /// Poll timing
    pub cadence: PollCadence,
}

impl UpstreamConfig {
    /// Builds a config, treating an empty or whitespace credential as unset.
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        model: &str,
        cadence: PollCadence,
    ) -> Result<Self, url::ParseError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        Ok(Self {
            api_key,
            base_url,
            model: model.trim_matches('/').to_string(),
            cadence,
        })
    }

    /// True when a credential is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// `POST` target for new jobs.
    pub fn submit_url(&self) -> String {
        format!("{}/{}", self.base(), self.model)
    }

    /// `GET` target for a job's status.
    pub fn status_url(&self, request_id: &str) -> String {
        format!("{}/{}/requests/{}/status", self.base(), self.model, request_id)
    }

    /// `GET` target for a job's result envelope.
    pub fn result_url(&self, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.base(), self.model, request_id)
    }

    fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

/// Runtime configuration for the web server, built once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Upstream bridge settings
    pub upstream: UpstreamConfig,
    /// Deployment target
    pub storage: StorageMode,
    /// Directory for staged uploads
    pub upload_dir: PathBuf,
    /// Directory for static pages
    pub static_dir: PathBuf,
    /// Body limit on the generate endpoint
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Resolves CLI/env options into a config.
    pub fn from_cli(cli: &CliOptions) -> Result<Self, url::ParseError> {
        let upstream = UpstreamConfig::new(
            cli.fal_api_key.clone(),
            &cli.upstream_url,
            &cli.model,
            PollCadence::default(),
        )?;
        let upload_dir = cli
            .upload_dir
            .clone()
            .unwrap_or_else(|| default_upload_dir(cli.storage));
        Ok(Self {
            upstream,
            storage: cli.storage,
            upload_dir,
            static_dir: cli.static_dir.clone(),
            max_upload_bytes: cli.max_upload_bytes,
        })
    }
}

/// Default staging directory for a deployment target.
pub fn default_upload_dir(mode: StorageMode) -> PathBuf {
    match mode {
        StorageMode::Local => PathBuf::from(LOCAL_UPLOAD_DIR),
        StorageMode::Serverless => PathBuf::from(SERVERLESS_UPLOAD_DIR),
    }
}
