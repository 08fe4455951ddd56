use axum::extract::Multipart;
use tracing::instrument;

use super::prelude::*;
use super::upload::validate_upload;
use crate::prompt::Intensity;
use crate::storage::StoredUpload;
use crate::upstream::{GeneratedImage, GenerationRequest};

#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    image_url: String,
    prompt: String,
}

/// Form fields pulled out of the multipart body.
#[derive(Debug, Default)]
struct GenerateForm {
    image: Option<(String, Vec<u8>)>,
    note: Option<String>,
    intensity: Option<String>,
}

async fn read_form(multipart: &mut Multipart) -> Result<GenerateForm, MemeError> {
    let mut form = GenerateForm::default();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default();
        match field_name {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.image = Some((filename, bytes.to_vec()));
            }
            "note" => form.note = Some(field.text().await?),
            "intensity" => form.intensity = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

/// handles POST /api/generate
#[instrument(skip_all)]
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, MemeError> {
    let form = read_form(&mut multipart).await?;
    let (filename, bytes) = form
        .image
        .ok_or_else(|| MemeError::Validation("No 'image' field in request".to_string()))?;
    let upload = validate_upload(&filename, &bytes)?;
    let intensity = Intensity::from_form(form.intensity.as_deref());
    debug!(
        "Accepted {} ({} bytes) as {}",
        filename,
        bytes.len(),
        upload.stored_name
    );

    let staged = StoredUpload::stage(state.storage.clone(), &upload.stored_name, &bytes).await?;
    let result = transform(&state, &staged, &upload.mime_type, intensity, form.note).await;
    staged.release().await;

    let (image, prompt) = result?;
    info!("Generated {}", image.image_url);
    Ok(Json(GenerateResponse {
        image_url: image.image_url,
        prompt,
    }))
}

async fn transform(
    state: &AppState,
    staged: &StoredUpload,
    mime_type: &str,
    intensity: Intensity,
    note: Option<String>,
) -> Result<(GeneratedImage, String), MemeError> {
    let image = staged.read().await?;
    let request = GenerationRequest::new(image, mime_type, intensity, note);
    let generated = state.upstream.generate(&request).await?;
    Ok((generated, request.instruction))
}
