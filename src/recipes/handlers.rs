use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateRecipeRequest, Pagination, RecipeEnvelope, RecipeResponse, UpdateRecipeRequest},
    repo_types::{NewRecipe, Recipe, RecipeChanges},
};
use crate::{
    auth::session::AuthUser,
    error::ApiError,
    scope::{scoped_filter, OwnerFilter, PublicFilter},
    state::AppState,
};

const NOT_FOUND: &str = "Recipe not found";

/// Published recipes; no session required.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe", get(list_published))
        .route("/recipe/:id", get(get_published))
}

/// The caller's own recipes. Mounted behind the session layer.
pub fn private_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe", post(create_recipe))
        .route("/recipe/mine", get(list_mine))
        .route("/recipe/mine/:id", get(get_mine))
        .route("/recipe/:id", put(update_recipe).delete(delete_recipe))
}

#[instrument(skip(state))]
pub async fn list_published(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let (limit, offset) = p.bounds();
    let recipes = state
        .recipes
        .find_public(PublicFilter::all(), limit, offset)
        .await?;
    Ok(Json(recipes))
}

#[instrument(skip(state))]
pub async fn get_published(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Recipe>, ApiError> {
    state
        .recipes
        .find_public(PublicFilter::one(id), 1, 0)
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.into()))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<RecipeEnvelope<CreateRecipeRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewRecipe::try_from(body.recipe)?;
    let recipe = state.recipes.create(user.id, new).await?;

    info!(recipe_id = %recipe.id, draft = recipe.draft, "recipe created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/recipe/mine/{}", recipe.id))],
        Json(RecipeResponse {
            message: "Recipe created".into(),
            recipe,
        }),
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let (limit, offset) = p.bounds();
    let recipes = state
        .recipes
        .find_owned(OwnerFilter::new(user.id), limit, offset)
        .await?;
    Ok(Json(recipes))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Recipe>, ApiError> {
    state
        .recipes
        .find_one(scoped_filter(id, user.id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.into()))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RecipeEnvelope<UpdateRecipeRequest>>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let changes = RecipeChanges::try_from(body.recipe)?;
    let Some(recipe) = state.recipes.update(scoped_filter(id, user.id), changes).await? else {
        warn!(recipe_id = %id, "update matched no owned recipe");
        return Err(ApiError::NotFound(NOT_FOUND.into()));
    };

    info!(recipe_id = %recipe.id, "recipe updated");
    Ok(Json(RecipeResponse {
        message: "Recipe updated".into(),
        recipe,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.recipes.delete(scoped_filter(id, user.id)).await? {
        warn!(recipe_id = %id, "delete matched no owned recipe");
        return Err(ApiError::NotFound(NOT_FOUND.into()));
    }

    info!(recipe_id = %id, "recipe deleted");
    Ok(Json(json!({ "message": "Recipe deleted" })))
}
