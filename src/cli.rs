//! CLI parser
use clap::{Parser, ValueEnum};
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL, DEFAULT_UPSTREAM_URL};

/// Where the service is deployed, which decides where uploads are staged.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum StorageMode {
    /// Writable working directory, uploads go in `./uploads`
    #[default]
    Local,
    /// Read-only filesystem apart from `/tmp`
    Serverless,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Serverless => write!(f, "serverless"),
        }
    }
}

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "MEMEIFY_DEBUG")]
    /// Enable debug logging. Env: MEMEIFY_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "5000", env = "MEMEIFY_PORT")]
    /// http listener, defaults to `5000`.
    /// Env: MEMEIFY_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "MEMEIFY_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: MEMEIFY_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "FAL_API_KEY", hide_env_values = true)]
    /// fal.ai API key. The server starts without it, but every generation fails until it's set.
    /// Env: FAL_API_KEY
    pub fal_api_key: Option<String>,

    #[clap(long, default_value = DEFAULT_UPSTREAM_URL, env = "MEMEIFY_UPSTREAM_URL")]
    /// Base URL of the upstream job queue.
    /// Env: MEMEIFY_UPSTREAM_URL
    pub upstream_url: String,

    #[clap(long, default_value = DEFAULT_MODEL, env = "MEMEIFY_MODEL")]
    /// Model path on the upstream queue.
    /// Env: MEMEIFY_MODEL
    pub model: String,

    #[clap(long, value_enum, default_value_t = StorageMode::Local, env = "MEMEIFY_STORAGE")]
    /// Deployment target, picks the default upload directory.
    /// Env: MEMEIFY_STORAGE
    pub storage: StorageMode,

    #[clap(long, env = "MEMEIFY_UPLOAD_DIR")]
    /// Override the upload staging directory.
    /// Env: MEMEIFY_UPLOAD_DIR
    pub upload_dir: Option<PathBuf>,

    #[clap(long, default_value = "./static", env = "MEMEIFY_STATIC_DIR")]
    /// Directory holding `index.html`, `meme_generator.html` and other static assets.
    /// Env: MEMEIFY_STATIC_DIR
    pub static_dir: PathBuf,

    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "MEMEIFY_MAX_UPLOAD_BYTES")]
    /// Largest request body accepted by the generate endpoint.
    /// Env: MEMEIFY_MAX_UPLOAD_BYTES
    pub max_upload_bytes: usize,
}
