//! Meme-ify a local image without running the server.
//!
//!   memeify_file ./cat.png --intensity nuclear --note "add a crown"

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use memeify::config::{PollCadence, UpstreamConfig, setup_logging};
use memeify::constants::{DEFAULT_MODEL, DEFAULT_UPSTREAM_URL};
use memeify::prompt::Intensity;
use memeify::upstream::{GenerationRequest, UpstreamClient, mime_type_for_extension};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "memeify_file")]
#[command(about = "Send one image through the meme-ify pipeline and print the result URL")]
struct Args {
    /// Image to transform (png, jpg, jpeg, gif or webp)
    image: PathBuf,

    /// mild, full-send, nuclear or deep-fried
    #[arg(long)]
    intensity: Option<String>,

    /// Extra instruction appended to the prompt
    #[arg(long)]
    note: Option<String>,

    /// fal.ai API key
    #[arg(required = true, long, env = "FAL_API_KEY", hide_env_values = true)]
    fal_api_key: String,

    #[arg(long, default_value = DEFAULT_UPSTREAM_URL, env = "MEMEIFY_UPSTREAM_URL")]
    upstream_url: String,

    #[arg(long, default_value = DEFAULT_MODEL, env = "MEMEIFY_MODEL")]
    model: String,

    /// Print the prompt that was sent
    #[arg(long)]
    show_prompt: bool,

    #[arg(long)]
    debug: bool,
}

fn mime_type_for(path: &std::path::Path) -> Result<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_type_for_extension)
        .ok_or_else(|| anyhow!("Unsupported file type: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    let mime_type = mime_type_for(&args.image)?;
    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;

    let config = UpstreamConfig::new(
        Some(args.fal_api_key),
        &args.upstream_url,
        &args.model,
        PollCadence::default(),
    )
    .context("Invalid upstream URL")?;
    let client = UpstreamClient::new(config);

    let request = GenerationRequest::new(
        image,
        &mime_type,
        Intensity::from_form(args.intensity.as_deref()),
        args.note,
    );
    if args.show_prompt {
        eprintln!("Prompt: {}", request.instruction);
    }

    let generated = client.generate(&request).await?;
    println!("{}", generated.image_url);
    Ok(())
}
