//! Shared constants for the service and the upstream bridge
//!

use std::time::Duration;

/// Queue endpoint of the hosted image model.
pub const DEFAULT_UPSTREAM_URL: &str = "https://queue.fal.run";

/// Model path appended to the upstream URL.
pub const DEFAULT_MODEL: &str = "fal-ai/flux-kontext-pro";

/// Where uploads go when running with a writable working directory.
pub const LOCAL_UPLOAD_DIR: &str = "uploads";

/// Where uploads go on a read-only serverless filesystem; only `/tmp` is writable there.
pub const SERVERLESS_UPLOAD_DIR: &str = "/tmp/memeify_uploads";

/// Extensions we accept for uploaded images, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Largest multipart body we will read, 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Time between status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Status checks made before giving up.
pub const POLL_MAX_ATTEMPTS: u32 = 50;

/// Wall-clock budget for polling. Serverless hosts kill requests at 60s.
pub const POLL_DEADLINE: Duration = Duration::from_secs(55);

/// Timeout for the job submission POST.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for each status GET.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the final result GET.
pub const RESULT_TIMEOUT: Duration = Duration::from_secs(15);

/// How much of a rejected submission body ends up in the error message.
pub const SUBMIT_ERROR_EXCERPT_CHARS: usize = 300;

/// How much of a result envelope ends up in the error message.
pub const RESULT_ERROR_EXCERPT_CHARS: usize = 400;

/// Generation settings sent with every job.
pub const NUM_INFERENCE_STEPS: u32 = 28;
/// Guidance scale sent with every job.
pub const GUIDANCE_SCALE: f32 = 3.5;
/// Output format requested from the model.
pub const OUTPUT_FORMAT: &str = "jpeg";
