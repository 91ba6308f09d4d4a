//! Garden handlers, including the plants that live in a garden

use super::{MessageResponse, PageQuery};
use crate::api::rest::extract::{ApiJson, ApiQuery, CurrentUser};
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::{GardenStorage, Page, PlantStorage};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use florafind_types::validation::{
    validate_garden_description, validate_garden_name, validate_plant_alias,
};
use florafind_types::{Garden, GardenId, Plant, PlantId, Taxonomy, User, ValidationError};
use serde::{Deserialize, Serialize};

const GARDEN_PLANTS_DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CreateGardenRequest {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGardenRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A garden together with its plants
#[derive(Debug, Serialize)]
pub struct GardenResponse {
    #[serde(flatten)]
    pub garden: Garden,
    pub plants: Vec<Plant>,
    pub plant_count: usize,
}

#[derive(Debug, Serialize)]
pub struct GardenListResponse {
    pub items: Vec<GardenResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct GardenUpdatedResponse {
    pub message: String,
    pub garden: Garden,
}

#[derive(Debug, Serialize)]
pub struct GardenPlantsResponse {
    pub items: Vec<Plant>,
    pub total: usize,
    pub garden_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlantRequest {
    pub alias: String,
    pub image_url: Option<String>,
    pub scientific_name_without_author: String,
    pub genus: String,
    pub family: String,
    #[serde(default)]
    pub common_names: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePlantRequest {
    pub alias: Option<String>,
    pub image_url: Option<String>,
    pub scientific_name_without_author: Option<String>,
    pub genus: Option<String>,
    pub family: Option<String>,
    pub common_names: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PlantUpdatedResponse {
    pub message: String,
    pub plant: Plant,
}

/// Load a garden owned by `user`; foreign and unknown gardens look the same
pub(super) async fn owned_garden(state: &AppState, user: &User, id: &str) -> ApiResult<Garden> {
    let not_found = || ApiError::NotFound("Garden not found".to_string());
    let garden_id: GardenId = id.parse().map_err(|_| not_found())?;

    match state.storage.get_garden(&garden_id).await? {
        Some(garden) if garden.user_id == user.id => Ok(garden),
        _ => Err(not_found()),
    }
}

/// Load a plant owned by `user`; foreign and unknown plants look the same
pub(super) async fn owned_plant(state: &AppState, user: &User, id: &str) -> ApiResult<Plant> {
    let not_found = || ApiError::NotFound("Plant not found".to_string());
    let plant_id: PlantId = id.parse().map_err(|_| not_found())?;

    match state.storage.get_plant(&plant_id).await? {
        Some(plant) if plant.user_id == user.id => Ok(plant),
        _ => Err(not_found()),
    }
}

fn required(field: &'static str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty").into());
    }
    Ok(trimmed.to_string())
}

async fn with_plants(state: &AppState, garden: Garden) -> ApiResult<GardenResponse> {
    let plants = state
        .storage
        .list_plants_for_garden(&garden.id, Page::new(0, usize::MAX))
        .await?;
    Ok(GardenResponse {
        plant_count: plants.len(),
        garden,
        plants,
    })
}

/// Create a garden
pub async fn create_garden(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<CreateGardenRequest>,
) -> ApiResult<(StatusCode, Json<GardenResponse>)> {
    let name = validate_garden_name(&request.name)?;
    if let Some(description) = &request.description {
        validate_garden_description(description)?;
    }

    if state
        .storage
        .get_garden_by_name(&user.id, &name)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest(
            "A garden with this name already exists".to_string(),
        ));
    }

    let garden = Garden::new(user.id, name, request.description, request.image_url);
    state.storage.insert_garden(garden.clone()).await?;

    tracing::info!(garden_id = %garden.id, user_id = %user.id, "Created garden");

    Ok((
        StatusCode::CREATED,
        Json(GardenResponse {
            garden,
            plants: Vec::new(),
            plant_count: 0,
        }),
    ))
}

/// List the user's gardens with their plants
pub async fn list_gardens(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<GardenListResponse>> {
    let gardens = state.storage.list_gardens(&user.id).await?;

    let mut items = Vec::with_capacity(gardens.len());
    for garden in gardens {
        items.push(with_plants(&state, garden).await?);
    }

    Ok(Json(GardenListResponse {
        total: items.len(),
        items,
    }))
}

/// Get one garden with its plants
pub async fn get_garden(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<GardenResponse>> {
    let garden = owned_garden(&state, &user, &id).await?;
    Ok(Json(with_plants(&state, garden).await?))
}

/// Update a garden; a blank name leaves the name unchanged
pub async fn update_garden(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateGardenRequest>,
) -> ApiResult<Json<GardenUpdatedResponse>> {
    let mut garden = owned_garden(&state, &user, &id).await?;

    if let Some(name) = request.name.filter(|n| !n.trim().is_empty()) {
        let name = validate_garden_name(&name)?;
        if name != garden.name {
            if let Some(existing) = state.storage.get_garden_by_name(&user.id, &name).await? {
                if existing.id != garden.id {
                    return Err(ApiError::BadRequest(
                        "A garden with this name already exists".to_string(),
                    ));
                }
            }
            garden.name = name;
        }
    }
    if let Some(description) = request.description {
        validate_garden_description(&description)?;
        garden.description = Some(description);
    }
    if let Some(image_url) = request.image_url {
        garden.image_url = Some(image_url);
    }
    garden.updated_at = Utc::now();

    state.storage.update_garden(garden.clone()).await?;

    tracing::info!(garden_id = %garden.id, "Updated garden");

    Ok(Json(GardenUpdatedResponse {
        message: format!("Garden '{}' updated successfully", garden.name),
        garden,
    }))
}

/// Delete a garden with its plants and notes
pub async fn delete_garden(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let garden = owned_garden(&state, &user, &id).await?;
    state.storage.delete_garden(&garden.id).await?;

    tracing::info!(garden_id = %garden.id, "Deleted garden");

    Ok(Json(MessageResponse::new(format!(
        "Garden '{}' deleted successfully",
        garden.name
    ))))
}

/// List the plants of a garden
pub async fn list_garden_plants(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<GardenPlantsResponse>> {
    let garden = owned_garden(&state, &user, &id).await?;
    let total = state.storage.count_plants_for_garden(&garden.id).await?;
    let items = state
        .storage
        .list_plants_for_garden(&garden.id, query.page(GARDEN_PLANTS_DEFAULT_LIMIT))
        .await?;

    let message = (total == 0)
        .then(|| "This garden has no plants yet. Add some plants!".to_string());

    Ok(Json(GardenPlantsResponse {
        items,
        total,
        garden_name: garden.name,
        message,
    }))
}

/// Add a plant to a garden
pub async fn add_plant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CreatePlantRequest>,
) -> ApiResult<(StatusCode, Json<Plant>)> {
    let garden = owned_garden(&state, &user, &id).await?;
    let alias = validate_plant_alias(&request.alias)?;
    let taxonomy = Taxonomy {
        scientific_name_without_author: required(
            "scientific_name_without_author",
            &request.scientific_name_without_author,
        )?,
        genus: required("genus", &request.genus)?,
        family: required("family", &request.family)?,
        common_names: request.common_names,
    };

    if state
        .storage
        .get_plant_by_alias(&user.id, &alias)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest(
            "A plant with this alias already exists".to_string(),
        ));
    }

    let plant = Plant::new(user.id, garden.id, alias, request.image_url, taxonomy);
    state.storage.insert_plant(plant.clone()).await?;

    tracing::info!(plant_id = %plant.id, garden_id = %garden.id, "Added plant");

    Ok((StatusCode::CREATED, Json(plant)))
}

/// Update a plant; a blank alias leaves the alias unchanged
pub async fn update_plant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(plant_id): Path<String>,
    ApiJson(request): ApiJson<UpdatePlantRequest>,
) -> ApiResult<Json<PlantUpdatedResponse>> {
    let mut plant = owned_plant(&state, &user, &plant_id).await?;

    if let Some(alias) = request.alias.filter(|a| !a.trim().is_empty()) {
        let alias = validate_plant_alias(&alias)?;
        if alias != plant.alias {
            if let Some(existing) = state.storage.get_plant_by_alias(&user.id, &alias).await? {
                if existing.id != plant.id {
                    return Err(ApiError::BadRequest(
                        "A plant with this alias already exists".to_string(),
                    ));
                }
            }
            plant.alias = alias;
        }
    }
    if let Some(image_url) = request.image_url {
        plant.image_url = Some(image_url);
    }
    if let Some(name) = request.scientific_name_without_author {
        plant.taxonomy.scientific_name_without_author =
            required("scientific_name_without_author", &name)?;
    }
    if let Some(genus) = request.genus {
        plant.taxonomy.genus = required("genus", &genus)?;
    }
    if let Some(family) = request.family {
        plant.taxonomy.family = required("family", &family)?;
    }
    if let Some(common_names) = request.common_names {
        plant.taxonomy.common_names = common_names;
    }
    plant.updated_at = Utc::now();

    state.storage.update_plant(plant.clone()).await?;

    tracing::info!(plant_id = %plant.id, "Updated plant");

    Ok(Json(PlantUpdatedResponse {
        message: format!("Plant '{}' updated successfully", plant.alias),
        plant,
    }))
}

/// Delete a plant with its notes
pub async fn delete_plant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(plant_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let plant = owned_plant(&state, &user, &plant_id).await?;
    state.storage.delete_plant(&plant.id).await?;

    tracing::info!(plant_id = %plant.id, "Deleted plant");

    Ok(Json(MessageResponse::new(format!(
        "Plant '{}' deleted successfully",
        plant.alias
    ))))
}
