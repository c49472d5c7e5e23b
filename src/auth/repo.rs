use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileChanges, User};
use crate::db::StoreResult;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
                            about_me, profile_image_url, created_at";

/// Persistence for identities. Uniqueness of username and email is enforced
/// by the store itself, so concurrent signups cannot both succeed.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new: NewUser) -> StoreResult<User>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<Option<User>>;
    async fn set_profile_image(&self, id: Uuid, url: &str) -> StoreResult<bool>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email      = COALESCE($2, email),
                   first_name = COALESCE($3, first_name),
                   last_name  = COALESCE($4, last_name),
                   about_me   = CASE WHEN $5 THEN $6 ELSE about_me END
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.about_me.is_some())
        .bind(changes.about_me.flatten())
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_profile_image(&self, id: Uuid, url: &str) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE users SET profile_image_url = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
