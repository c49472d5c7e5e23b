use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::scope::OwnedResource;

/// Recipe row. `user_id` is the owning identity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipe_name: String,
    pub recipe_type: Option<String>,
    pub description: String,
    pub cooking_directions: String,
    pub servings: i32,
    pub prep_time: String,
    pub ingredients: Vec<String>,
    pub draft: bool,
    pub recipe_image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl OwnedResource for Recipe {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn is_draft(&self) -> bool {
        self.draft
    }
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub recipe_name: String,
    pub recipe_type: Option<String>,
    pub description: String,
    pub cooking_directions: String,
    pub servings: i32,
    pub prep_time: String,
    pub ingredients: Vec<String>,
    pub draft: bool,
}

/// Partial update; `None` leaves a column untouched. `recipe_type` may be
/// cleared with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub recipe_name: Option<String>,
    pub recipe_type: Option<Option<String>>,
    pub description: Option<String>,
    pub cooking_directions: Option<String>,
    pub servings: Option<i32>,
    pub prep_time: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub draft: Option<bool>,
}
