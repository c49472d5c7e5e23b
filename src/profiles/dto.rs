use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::validate;
use crate::recipes::repo_types::Recipe;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(deserialize_with = "validate::clearable")]
    pub about_me: Option<Option<String>>,
}

/// The caller's own view: full account plus every recipe, drafts included.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub recipes: Vec<Recipe>,
}

/// What other people may see about a user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub about_me: Option<String>,
    pub profile_image_url: Option<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            about_me: u.about_me,
            profile_image_url: u.profile_image_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    pub user: PublicUser,
    pub recipes: Vec<Recipe>,
}
