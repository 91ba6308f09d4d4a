//! Plant listing and plant note handlers

use super::gardens::owned_plant;
use super::{ListResponse, PageQuery};
use crate::api::rest::extract::{ApiJson, ApiQuery, CurrentUser};
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::{GardenStorage, NoteStorage, PlantStorage};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use florafind_types::validation::validate_note_text;
use florafind_types::{NoteId, Plant, PlantNote, User};
use serde::{Deserialize, Serialize};

const USER_PLANTS_DEFAULT_LIMIT: usize = 100;

/// A plant with the name of the garden it belongs to
#[derive(Debug, Serialize)]
pub struct PlantDetailResponse {
    #[serde(flatten)]
    pub plant: Plant,
    pub garden_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub text: String,
    pub color: Option<String>,
    pub observation_date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub text: Option<String>,
    pub color: Option<String>,
    pub observation_date: Option<DateTime<Utc>>,
}

// Note text problems are business-rule failures (400), not field validation
fn note_text(text: &str) -> ApiResult<String> {
    validate_note_text(text).map_err(|e| ApiError::BadRequest(e.message))
}

async fn owned_note(state: &AppState, user: &User, id: &str) -> ApiResult<PlantNote> {
    let not_found = || ApiError::NotFound("Note not found".to_string());
    let note_id: NoteId = id.parse().map_err(|_| not_found())?;
    let note = state
        .storage
        .get_note(&note_id)
        .await?
        .ok_or_else(not_found)?;

    match state.storage.get_plant(&note.plant_id).await? {
        Some(plant) if plant.user_id == user.id => Ok(note),
        _ => Err(not_found()),
    }
}

/// List all of the user's plants
pub async fn list_plants(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<ListResponse<Plant>>> {
    let total = state.storage.count_plants_for_user(&user.id).await?;
    let items = state
        .storage
        .list_plants_for_user(&user.id, query.page(USER_PLANTS_DEFAULT_LIMIT))
        .await?;

    Ok(Json(ListResponse { items, total }))
}

/// Get one plant with its garden name
pub async fn get_plant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(plant_id): Path<String>,
) -> ApiResult<Json<PlantDetailResponse>> {
    let plant = owned_plant(&state, &user, &plant_id).await?;
    let garden_name = state
        .storage
        .get_garden(&plant.garden_id)
        .await?
        .map(|g| g.name)
        .unwrap_or_default();

    Ok(Json(PlantDetailResponse { plant, garden_name }))
}

/// Add an observation note to a plant
pub async fn create_note(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(plant_id): Path<String>,
    ApiJson(request): ApiJson<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<PlantNote>)> {
    let plant = owned_plant(&state, &user, &plant_id).await?;
    let text = note_text(&request.text)?;

    let note = PlantNote::new(plant.id, text, request.color, request.observation_date);
    state.storage.insert_note(note.clone()).await?;

    tracing::info!(note_id = %note.id, plant_id = %plant.id, "Created note");

    Ok((StatusCode::CREATED, Json(note)))
}

/// Update a note
pub async fn update_note(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(note_id): Path<String>,
    ApiJson(request): ApiJson<UpdateNoteRequest>,
) -> ApiResult<Json<PlantNote>> {
    let mut note = owned_note(&state, &user, &note_id).await?;

    if let Some(text) = request.text {
        note.text = note_text(&text)?;
    }
    if let Some(color) = request.color {
        note.color = Some(color);
    }
    if let Some(observation_date) = request.observation_date {
        note.observation_date = observation_date;
    }
    note.updated_at = Utc::now();

    state.storage.update_note(note.clone()).await?;

    Ok(Json(note))
}

/// Notes of a plant, latest observation first
pub async fn list_notes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(plant_id): Path<String>,
) -> ApiResult<Json<Vec<PlantNote>>> {
    let plant = owned_plant(&state, &user, &plant_id).await?;
    let notes = state.storage.list_notes_for_plant(&plant.id).await?;
    Ok(Json(notes))
}
