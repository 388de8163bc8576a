use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use wallmask_shared::{Ack, Mask, UpdatedMask};

use crate::error::ApiError;
use crate::logic::{parse_mask_id, parse_mask_patch, parse_model_query, parse_new_mask};
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(Ack { ok: true }).into_response(),
        Err(error) => {
            log::error!("Health check failed: {error}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Ack { ok: false })).into_response()
        }
    }
}

pub async fn list_masks_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Mask>>, ApiError> {
    let model_id = parse_model_query(params.get("modelId").map(String::as_str))
        .ok_or(ApiError::BadRequest("Invalid modelId"))?;
    Ok(Json(state.store.list(model_id).await?))
}

pub async fn create_mask_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Mask>), ApiError> {
    let new_mask = parse_new_mask(&body).map_err(ApiError::Validation)?;
    let mask = state.store.create(new_mask).await?;
    log::info!("Mask {} created ({:?}, {} points)", mask.id, mask.name, mask.points.len());
    Ok((StatusCode::CREATED, Json(mask)))
}

pub async fn update_mask_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<UpdatedMask>, ApiError> {
    let id = parse_mask_id(&id).ok_or(ApiError::BadRequest("Invalid id"))?;
    let patch = parse_mask_patch(&body).map_err(ApiError::Validation)?;
    let updated = state
        .store
        .update(id, patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated))
}

pub async fn delete_mask_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let id = parse_mask_id(&id).ok_or(ApiError::BadRequest("Invalid id"))?;
    if !state.store.delete(id).await? {
        return Err(ApiError::NotFound);
    }
    log::info!("Mask {id} deleted");
    Ok(Json(Ack { ok: true }))
}
