use serde::{Deserialize, Serialize};

use super::repo_types::{NewRecipe, Recipe, RecipeChanges};
use crate::{error::ApiError, validate};

pub const MAX_PAGE: i64 = 100;

/// Request bodies nest the payload under `"recipe"`.
#[derive(Debug, Deserialize)]
pub struct RecipeEnvelope<T> {
    pub recipe: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateRecipeRequest {
    pub recipe_name: String,
    pub recipe_type: Option<String>,
    pub description: String,
    pub cooking_directions: String,
    pub servings: Option<i32>,
    pub prep_time: String,
    pub ingredients: Vec<String>,
    pub draft: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateRecipeRequest {
    pub recipe_name: Option<String>,
    #[serde(deserialize_with = "validate::clearable")]
    pub recipe_type: Option<Option<String>>,
    pub description: Option<String>,
    pub cooking_directions: Option<String>,
    pub servings: Option<i32>,
    pub prep_time: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub draft: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub message: String,
    pub recipe: Recipe,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

impl Pagination {
    /// `(limit, offset)` clamped to sane bounds.
    pub fn bounds(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE), self.offset.max(0))
    }
}

fn servings(value: Option<i32>) -> Result<i32, ApiError> {
    match value {
        None => Err(ApiError::BadRequest("Servings can not be empty".into())),
        Some(n) if n < 1 => Err(ApiError::BadRequest("Servings must be at least 1".into())),
        Some(n) => Ok(n),
    }
}

fn ingredients(items: Vec<String>) -> Result<Vec<String>, ApiError> {
    let items: Vec<String> = items
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    if items.is_empty() {
        return Err(ApiError::BadRequest("Ingredients can not be empty".into()));
    }
    Ok(items)
}

impl TryFrom<CreateRecipeRequest> for NewRecipe {
    type Error = ApiError;

    fn try_from(r: CreateRecipeRequest) -> Result<Self, Self::Error> {
        Ok(NewRecipe {
            recipe_name: validate::required(&r.recipe_name, "Recipe Name can not be empty")?,
            recipe_type: validate::non_blank(r.recipe_type),
            description: validate::required(&r.description, "Recipe Description can not be empty")?,
            cooking_directions: validate::required(
                &r.cooking_directions,
                "Cooking Directions can not be empty",
            )?,
            servings: servings(r.servings)?,
            prep_time: validate::required(&r.prep_time, "Prep Time can not be empty")?,
            ingredients: ingredients(r.ingredients)?,
            // New recipes start as drafts unless published explicitly.
            draft: r.draft.unwrap_or(true),
        })
    }
}

impl TryFrom<UpdateRecipeRequest> for RecipeChanges {
    type Error = ApiError;

    fn try_from(r: UpdateRecipeRequest) -> Result<Self, Self::Error> {
        Ok(RecipeChanges {
            recipe_name: validate::optional(r.recipe_name, "Recipe Name can not be empty")?,
            recipe_type: r.recipe_type.map(validate::non_blank),
            description: validate::optional(r.description, "Recipe Description can not be empty")?,
            cooking_directions: validate::optional(
                r.cooking_directions,
                "Cooking Directions can not be empty",
            )?,
            servings: r.servings.map(|n| servings(Some(n))).transpose()?,
            prep_time: validate::optional(r.prep_time, "Prep Time can not be empty")?,
            ingredients: r.ingredients.map(ingredients).transpose()?,
            draft: r.draft,
        })
    }
}
