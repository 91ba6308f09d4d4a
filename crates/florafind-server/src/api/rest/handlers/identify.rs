//! Plant identification handler

use crate::api::rest::extract::ActiveUser;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::identify::{IdentifyError, ImageUpload};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

const IMAGES_FIELD: &str = "images";

struct RawImage {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Identify a plant from one or more photos
pub async fn identify_plant(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let mut multipart = multipart?;
    let limits = state.identify_limits;

    let mut raw = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(IMAGES_FIELD) {
            continue;
        }
        if raw.len() == limits.max_images {
            return Err(ApiError::BadRequest(format!(
                "Too many images. The maximum allowed is {}",
                limits.max_images
            )));
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        raw.push(RawImage {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    if raw.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one image must be provided".to_string(),
        ));
    }

    let images = raw
        .into_iter()
        .enumerate()
        .map(|(i, image)| {
            ImageUpload::validate(
                i + 1,
                image.file_name.as_deref(),
                image.content_type.as_deref(),
                image.data,
                limits.max_image_size,
            )
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(user_id = %user.id, images = images.len(), "Identifying plant");

    match state.identifier.identify(images).await {
        Ok(result) => Ok(Json(result).into_response()),
        Err(IdentifyError::NotFound) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "detail": IdentifyError::NotFound.to_string(),
                "results": [],
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!(error = %e, "Plant identification failed");
            Err(ApiError::BadGateway(e.to_string()))
        }
    }
}
