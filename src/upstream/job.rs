//! Request and job types passed through the bridge.

use base64::Engine;
use base64::engine::general_purpose;
use serde::Serialize;
use serde_json::Value;

use crate::constants::{ALLOWED_EXTENSIONS, GUIDANCE_SCALE, NUM_INFERENCE_STEPS, OUTPUT_FORMAT};
use crate::error::MemeError;
use crate::prompt::{Intensity, build_prompt};

/// One image to transform, built per incoming HTTP call.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    /// Raw image bytes
    pub image: Vec<u8>,
    /// eg `image/png`
    pub mime_type: String,
    /// Full instruction sent upstream, note included
    pub instruction: String,
    /// What the caller typed, if anything
    pub user_note: Option<String>,
}

impl GenerationRequest {
    /// Builds a request, composing the instruction from the intensity and note.
    pub fn new(
        image: Vec<u8>,
        mime_type: &str,
        intensity: Intensity,
        user_note: Option<String>,
    ) -> Self {
        let user_note = user_note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());
        let instruction = build_prompt(intensity, user_note.as_deref());
        Self {
            image,
            mime_type: mime_type.to_string(),
            instruction,
            user_note,
        }
    }

    /// The image as a `data:` URI.
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.image)
        )
    }
}

/// MIME type for an accepted image extension, `None` for anything else.
pub fn mime_type_for_extension(extension: &str) -> Option<String> {
    let extension = extension.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    Some(match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        other => format!("image/{other}"),
    })
}

/// Where an upstream job is at, as far as we know.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobStatus {
    /// Queued or running
    Pending,
    /// Finished, result available
    Completed,
    /// Upstream gave up
    Failed,
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        match value {
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            // IN_QUEUE, IN_PROGRESS, PENDING and anything new all mean "keep waiting"
            _ => Self::Pending,
        }
    }
}

/// A submitted job. Lives only as long as the request that created it.
#[derive(Clone, Debug)]
pub struct UpstreamJob {
    /// Queue id; `None` when upstream answered synchronously
    pub request_id: Option<String>,
    /// Last known status
    pub status: JobStatus,
    /// Result envelope, once completed
    pub payload: Option<Value>,
}

impl UpstreamJob {
    /// Interprets a submission response. No `request_id` means the body already is the result.
    pub fn from_submission(body: Value) -> Self {
        let request_id = body
            .get("request_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_owned);
        match request_id {
            Some(request_id) => Self {
                request_id: Some(request_id),
                status: JobStatus::Pending,
                payload: None,
            },
            None => Self {
                request_id: None,
                status: JobStatus::Completed,
                payload: Some(body),
            },
        }
    }
}

/// A finished transformation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GeneratedImage {
    /// Where upstream put the image
    pub image_url: String,
}

/// Either an image URL or the reason there isn't one.
pub type GenerationResult = Result<GeneratedImage, MemeError>;

/// Body for the submit POST.
#[derive(Serialize, Debug)]
pub(crate) struct SubmitPayload<'a> {
    prompt: &'a str,
    image_url: &'a str,
    num_inference_steps: u32,
    guidance_scale: f32,
    num_images: u8,
    enable_safety_checker: bool,
    output_format: &'a str,
}

impl<'a> SubmitPayload<'a> {
    pub(crate) fn new(prompt: &'a str, image_url: &'a str) -> Self {
        Self {
            prompt,
            image_url,
            num_inference_steps: NUM_INFERENCE_STEPS,
            guidance_scale: GUIDANCE_SCALE,
            num_images: 1,
            enable_safety_checker: true,
            output_format: OUTPUT_FORMAT,
        }
    }
}
