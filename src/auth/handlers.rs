use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, SignupRequest, UserEnvelope},
        password::{hash_password, verify_password},
        repo_types::NewUser,
    },
    error::ApiError,
    state::AppState,
    validate,
};

const BAD_CREDENTIALS: &str = "Incorrect username or password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(signup))
        .route("/user/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(UserEnvelope { user: payload }): Json<UserEnvelope<SignupRequest>>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = validate::username(&payload.username)?;
    let email = validate::email(&payload.email)?;
    let password = validate::password(&payload.password)?;
    let first_name = validate::required(&payload.first_name, "First Name can not be empty")?;
    let last_name = validate::required(&payload.last_name, "Last Name can not be empty")?;

    // Internal errors are logged once, when the response is rendered.
    let password_hash = hash_password(&password)?;

    // Uniqueness is left to the store so two racing signups cannot both win.
    let user = state
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
            first_name,
            last_name,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "create user failed");
            ApiError::from(e)
        })?;

    let session_token = state.tokens.issue_session(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User has signed up successfully!".into(),
            user,
            session_token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(UserEnvelope { user: payload }): Json<UserEnvelope<LoginRequest>>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = validate::required(&payload.username, "Username is required")?;
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }

    let Some(user) = state.users.find_by_username(&username).await? else {
        warn!(%username, "login unknown username");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let session_token = state.tokens.issue_session(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        message: "User has logged in successfully!".into(),
        user,
        session_token,
    }))
}
