use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{NewRecipe, Recipe, RecipeChanges};
use crate::db::StoreResult;
use crate::scope::{OwnerFilter, PublicFilter, ScopedFilter};

const RECIPE_COLUMNS: &str = "id, user_id, recipe_name, recipe_type, description, \
                              cooking_directions, servings, prep_time, ingredients, draft, \
                              recipe_image_url, created_at, updated_at";

/// Persistence for recipes. Reads and writes are expressed through the
/// filters in [`crate::scope`]; there is no unscoped accessor.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn create(&self, owner_id: Uuid, new: NewRecipe) -> StoreResult<Recipe>;
    async fn find_one(&self, scope: ScopedFilter) -> StoreResult<Option<Recipe>>;
    async fn find_owned(&self, filter: OwnerFilter, limit: i64, offset: i64)
        -> StoreResult<Vec<Recipe>>;
    async fn find_public(&self, filter: PublicFilter, limit: i64, offset: i64)
        -> StoreResult<Vec<Recipe>>;
    async fn update(&self, scope: ScopedFilter, changes: RecipeChanges)
        -> StoreResult<Option<Recipe>>;
    async fn set_image(&self, scope: ScopedFilter, url: &str) -> StoreResult<bool>;
    async fn delete(&self, scope: ScopedFilter) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgRecipeStore {
    db: PgPool,
}

impl PgRecipeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn select() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes"))
}

fn page(qb: &mut QueryBuilder<'static, Postgres>, limit: i64, offset: i64) {
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn create(&self, owner_id: Uuid, new: NewRecipe) -> StoreResult<Recipe> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (user_id, recipe_name, recipe_type, description,
                                 cooking_directions, servings, prep_time, ingredients, draft)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(new.recipe_name)
        .bind(new.recipe_type)
        .bind(new.description)
        .bind(new.cooking_directions)
        .bind(new.servings)
        .bind(new.prep_time)
        .bind(new.ingredients)
        .bind(new.draft)
        .fetch_one(&self.db)
        .await?;
        Ok(recipe)
    }

    async fn find_one(&self, scope: ScopedFilter) -> StoreResult<Option<Recipe>> {
        let mut qb = select();
        scope.push_where(&mut qb);
        let recipe = qb
            .build_query_as::<Recipe>()
            .fetch_optional(&self.db)
            .await?;
        Ok(recipe)
    }

    async fn find_owned(
        &self,
        filter: OwnerFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Recipe>> {
        let mut qb = select();
        filter.push_where(&mut qb);
        page(&mut qb, limit, offset);
        let rows = qb.build_query_as::<Recipe>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn find_public(
        &self,
        filter: PublicFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Recipe>> {
        let mut qb = select();
        filter.push_where(&mut qb);
        page(&mut qb, limit, offset);
        let rows = qb.build_query_as::<Recipe>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn update(
        &self,
        scope: ScopedFilter,
        changes: RecipeChanges,
    ) -> StoreResult<Option<Recipe>> {
        let set_type = changes.recipe_type.is_some();
        let mut qb: QueryBuilder<'static, Postgres> =
            QueryBuilder::new("UPDATE recipes SET recipe_name = COALESCE(");
        qb.push_bind(changes.recipe_name)
            .push(", recipe_name), recipe_type = CASE WHEN ")
            .push_bind(set_type)
            .push(" THEN ")
            .push_bind(changes.recipe_type.flatten())
            .push(" ELSE recipe_type END, description = COALESCE(")
            .push_bind(changes.description)
            .push(", description), cooking_directions = COALESCE(")
            .push_bind(changes.cooking_directions)
            .push(", cooking_directions), servings = COALESCE(")
            .push_bind(changes.servings)
            .push(", servings), prep_time = COALESCE(")
            .push_bind(changes.prep_time)
            .push(", prep_time), ingredients = COALESCE(")
            .push_bind(changes.ingredients)
            .push(", ingredients), draft = COALESCE(")
            .push_bind(changes.draft)
            .push(", draft), updated_at = now()");
        scope.push_where(&mut qb);
        qb.push(format!(" RETURNING {RECIPE_COLUMNS}"));
        let recipe = qb
            .build_query_as::<Recipe>()
            .fetch_optional(&self.db)
            .await?;
        Ok(recipe)
    }

    async fn set_image(&self, scope: ScopedFilter, url: &str) -> StoreResult<bool> {
        let mut qb: QueryBuilder<'static, Postgres> =
            QueryBuilder::new("UPDATE recipes SET recipe_image_url = ");
        qb.push_bind(url.to_string()).push(", updated_at = now()");
        scope.push_where(&mut qb);
        let res = qb.build().execute(&self.db).await?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete(&self, scope: ScopedFilter) -> StoreResult<bool> {
        let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("DELETE FROM recipes");
        scope.push_where(&mut qb);
        let res = qb.build().execute(&self.db).await?;
        Ok(res.rows_affected() == 1)
    }
}
