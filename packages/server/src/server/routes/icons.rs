use axum::{
    extract::{Extension, Multipart},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::domains::icons::{encode_png, recolor};
use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Multipart field carrying the uploaded image.
pub const ICON_FIELD: &str = "icon";

/// Recolor one uploaded image and return it as PNG.
pub async fn process_icon_handler(
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(ICON_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::bad_request("No icon file provided"));
    };
    if file_name.is_empty() {
        return Err(ApiError::bad_request("No filename provided"));
    }

    debug!(file_name = %file_name, size = bytes.len(), "Processing uploaded icon");

    let palette = state.config.palette;
    let target_size = state.config.target_size;
    let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, String> {
        let image = recolor(&bytes, target_size, &palette).map_err(|e| e.to_string())?;
        encode_png(&image).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))?
    .map_err(|message| {
        warn!(file_name = %file_name, error = %message, "Could not process uploaded icon");
        ApiError::internal(message)
    })?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
