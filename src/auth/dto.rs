use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request bodies nest the payload under `"user"`.
#[derive(Debug, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}

/// Request body for signup. Missing fields deserialize as empty and are
/// rejected by validation with a field-specific message.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after signup or login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
    pub session_token: String,
}
