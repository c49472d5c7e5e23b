use std::sync::Arc;

use crate::auth::{
    repo::{PgUserStore, UserStore},
    token::TokenService,
};
use crate::config::AppConfig;
use crate::db;
use crate::media::{MediaHost, S3MediaHost};
use crate::recipes::repo::{PgRecipeStore, RecipeStore};

/// Everything a handler may touch. Cheap to clone; holds no mutable state of
/// its own.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub users: Arc<dyn UserStore>,
    pub recipes: Arc<dyn RecipeStore>,
    pub media: Arc<dyn MediaHost>,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_url).await?;
        if let Err(e) = db::migrate(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let media = Arc::new(S3MediaHost::new(&config.media).await?) as Arc<dyn MediaHost>;

        Ok(Self::from_parts(
            TokenService::from_config(&config.jwt),
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgRecipeStore::new(db)),
            media,
        ))
    }

    pub fn from_parts(
        tokens: TokenService,
        users: Arc<dyn UserStore>,
        recipes: Arc<dyn RecipeStore>,
        media: Arc<dyn MediaHost>,
    ) -> Self {
        Self {
            tokens,
            users,
            recipes,
            media,
        }
    }
}
