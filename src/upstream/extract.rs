//! Pulls the image URL out of a result envelope.
//!
//! The envelope is loosely specified: the image list is either top-level
//! `images` or `output.images`, and each entry is either a bare URL or an
//! object with a `url` field.

use serde_json::Value;

use super::job::{GeneratedImage, GenerationResult};
use crate::constants::RESULT_ERROR_EXCERPT_CHARS;
use crate::error::MemeError;

/// Extracts the first image URL from a result envelope.
pub fn extract_result(payload: &Value) -> GenerationResult {
    let images = payload
        .get("images")
        .and_then(Value::as_array)
        .filter(|images| !images.is_empty())
        .or_else(|| {
            payload
                .get("output")
                .and_then(|output| output.get("images"))
                .and_then(Value::as_array)
        });

    let url = images
        .and_then(|images| images.first())
        .and_then(|first| match first {
            Value::String(url) => Some(url.as_str()),
            Value::Object(image) => image.get("url").and_then(Value::as_str),
            _ => None,
        })
        .filter(|url| !url.is_empty());

    match url {
        Some(url) => Ok(GeneratedImage {
            image_url: url.to_string(),
        }),
        None => Err(MemeError::ResultParse(format!(
            "fal.ai returned no image. Raw response: {}",
            excerpt(&payload.to_string(), RESULT_ERROR_EXCERPT_CHARS)
        ))),
    }
}

/// The first `max_chars` characters of `text`.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
