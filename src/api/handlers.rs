use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::RequestId;
use crate::models::{ThemeData, ThemeUpdate};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Get the active theme
pub async fn get_theme(State(state): State<AppState>) -> Json<ThemeData> {
    Json(state.current().await)
}

/// Generate a theme from an uploaded image and make it active
///
/// The request body is the raw image file.
pub async fn upload_theme_image(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> AppResult<Json<ThemeData>> {
    tracing::info!(
        request_id = %request_id,
        bytes = body.len(),
        "Generating theme from upload"
    );

    let theme = state.generate_from_image(body).await.map_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Theme generation failed");
        e
    })?;

    Ok(Json(theme))
}

/// Edit allow-listed fields of the active theme
pub async fn update_theme(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<ThemeUpdate>, JsonRejection>,
) -> AppResult<Json<ThemeData>> {
    let Json(update) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;

    tracing::info!(
        request_id = %request_id,
        palette_slots = update.palette.len(),
        "Updating theme"
    );

    let theme = state.apply_update(&update).await?;
    Ok(Json(theme))
}

/// Restore the default theme
pub async fn reset_theme(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Json<ThemeData> {
    tracing::info!(request_id = %request_id, "Resetting theme to default");
    Json(state.reset().await)
}

/// Active theme as a stylesheet of CSS custom properties
pub async fn theme_stylesheet(State(state): State<AppState>) -> impl IntoResponse {
    let css = state.current().await.to_stylesheet();
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css)
}
