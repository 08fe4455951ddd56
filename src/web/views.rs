use super::prelude::*;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    fal_key_set: bool,
    model: String,
    storage: String,
    upload_dir: String,
}

/// handles GET /api/health
pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let upstream = state.upstream.config();
    Json(HealthResponse {
        status: "ok",
        fal_key_set: upstream.has_api_key(),
        model: upstream.model.clone(),
        storage: state.storage_mode.to_string(),
        upload_dir: state.storage.location().display().to_string(),
    })
}
