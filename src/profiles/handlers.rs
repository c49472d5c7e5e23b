use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::dto::{ProfileResponse, PublicProfileResponse, UpdateProfileRequest};
use crate::{
    auth::{repo_types::ProfileChanges, session::AuthUser, UserEnvelope},
    error::ApiError,
    recipes::dto::Pagination,
    scope::{OwnerFilter, PublicFilter},
    state::AppState,
    validate,
};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/user/:username", get(public_profile))
}

pub fn private_routes() -> Router<AppState> {
    Router::new().route(
        "/user/profile",
        get(get_profile).put(update_profile).delete(delete_account),
    )
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (limit, offset) = p.bounds();
    let recipes = state
        .recipes
        .find_owned(OwnerFilter::new(user.id), limit, offset)
        .await?;
    Ok(Json(ProfileResponse { user, recipes }))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(UserEnvelope { user: payload }): Json<UserEnvelope<UpdateProfileRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let changes = ProfileChanges {
        email: payload.email.as_deref().map(validate::email).transpose()?,
        first_name: validate::optional(payload.first_name, "First Name can not be empty")?,
        last_name: validate::optional(payload.last_name, "Last Name can not be empty")?,
        about_me: payload.about_me.map(validate::non_blank),
    };

    let Some(updated) = state.users.update_profile(user.id, changes).await? else {
        // The account vanished between session resolution and the update.
        warn!("profile update matched no user");
        return Err(ApiError::NotFound("User not found".into()));
    };

    info!("profile updated");
    Ok(Json(json!({ "message": "Profile updated", "user": updated })))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.users.delete(user.id).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(username = %user.username, "account deleted");
    Ok(Json(json!({ "message": "Account deleted" })))
}

#[instrument(skip(state))]
pub async fn public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(p): Query<Pagination>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let (limit, offset) = p.bounds();
    let recipes = state
        .recipes
        .find_public(PublicFilter::by_author(user.id), limit, offset)
        .await?;
    Ok(Json(PublicProfileResponse {
        user: user.into(),
        recipes,
    }))
}
