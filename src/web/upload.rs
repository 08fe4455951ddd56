use uuid::Uuid;

use crate::error::MemeError;
use crate::upstream::mime_type_for_extension;

/// An upload that passed validation, with the name it'll be staged under.
#[derive(Clone, Debug)]
pub(crate) struct ValidatedUpload {
    pub(crate) stored_name: String,
    pub(crate) mime_type: String,
}

pub(crate) fn validate_upload(filename: &str, bytes: &[u8]) -> Result<ValidatedUpload, MemeError> {
    if filename.trim().is_empty() {
        return Err(MemeError::Validation("No file selected".to_string()));
    }
    let unsupported =
        || MemeError::Validation("Unsupported file type. Use PNG, JPG, GIF or WEBP.".to_string());
    let (_, extension) = filename.rsplit_once('.').ok_or_else(unsupported)?;
    let mime_type = mime_type_for_extension(extension).ok_or_else(unsupported)?;
    let extension = extension.to_ascii_lowercase();
    if bytes.is_empty() {
        return Err(MemeError::Validation("Uploaded file is empty".to_string()));
    }

    Ok(ValidatedUpload {
        stored_name: format!(
            "{}_{}",
            Uuid::new_v4().simple(),
            sanitize_filename(filename, &extension)
        ),
        mime_type,
    })
}

/// Strips directories and anything outside `[A-Za-z0-9._-]` from a client filename.
fn sanitize_filename(filename: &str, extension: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    let suffix = format!(".{extension}");
    if cleaned.len() > suffix.len() && cleaned.to_ascii_lowercase().ends_with(&suffix) {
        cleaned.to_string()
    } else {
        format!("upload{suffix}")
    }
}
