pub(crate) use crate::{error::MemeError, web::AppState};
pub(crate) use axum::Json;
pub(crate) use axum::extract::State;
pub(crate) use serde::Serialize;
pub(crate) use tracing::{debug, info};
