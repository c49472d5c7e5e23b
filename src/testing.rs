//! In-memory stores and helpers for driving the router in tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use bytes::Bytes;
use lazy_static::lazy_static;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{
        password::hash_password,
        repo::UserStore,
        repo_types::{NewUser, ProfileChanges, User},
        token::{HmacSigner, TokenService},
    },
    db::{StoreError, StoreResult},
    media::{public_url, MediaHost},
    recipes::{
        repo::RecipeStore,
        repo_types::{NewRecipe, Recipe, RecipeChanges},
    },
    scope::{OwnerFilter, PublicFilter, ScopedFilter},
    state::AppState,
};

pub const PASSWORD: &str = "correct-horse-battery";
pub const MEDIA_BASE: &str = "https://media.test";

lazy_static! {
    static ref PASSWORD_HASH: String = hash_password(PASSWORD).expect("hash test password");
}

#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<User>>,
    lookups: AtomicUsize,
}

impl MemoryUsers {
    /// Number of `find_by_id` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn taken(rows: &[User], except: Option<Uuid>, username: &str, email: &str) -> StoreResult<()> {
        for row in rows.iter().filter(|r| Some(r.id) != except) {
            if row.username == username {
                return Err(StoreError::UniqueViolation {
                    constraint: "users_username_key".into(),
                });
            }
            if row.email == email {
                return Err(StoreError::UniqueViolation {
                    constraint: "users_email_key".into(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn create(&self, new: NewUser) -> StoreResult<User> {
        let mut rows = self.rows.lock().unwrap();
        Self::taken(&rows, None, &new.username, &new.email)?;
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            about_me: None,
            profile_image_url: None,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<Option<User>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(idx) = rows.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            let username = rows[idx].username.clone();
            Self::taken(&rows, Some(id), &username, email)?;
        }
        let user = &mut rows[idx];
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(about_me) = changes.about_me {
            user.about_me = about_me;
        }
        Ok(Some(user.clone()))
    }

    async fn set_profile_image(&self, id: Uuid, url: &str) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.profile_image_url = Some(url.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryRecipes {
    rows: Mutex<Vec<Recipe>>,
}

fn newest_first(mut rows: Vec<Recipe>, limit: i64, offset: i64) -> Vec<Recipe> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl RecipeStore for MemoryRecipes {
    async fn create(&self, owner_id: Uuid, new: NewRecipe) -> StoreResult<Recipe> {
        let now = OffsetDateTime::now_utc();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: owner_id,
            recipe_name: new.recipe_name,
            recipe_type: new.recipe_type,
            description: new.description,
            cooking_directions: new.cooking_directions,
            servings: new.servings,
            prep_time: new.prep_time,
            ingredients: new.ingredients,
            draft: new.draft,
            recipe_image_url: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(recipe.clone());
        Ok(recipe)
    }

    async fn find_one(&self, scope: ScopedFilter) -> StoreResult<Option<Recipe>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| scope.matches(*r))
            .cloned())
    }

    async fn find_owned(
        &self,
        filter: OwnerFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Recipe>> {
        let rows = self.rows.lock().unwrap();
        let hits = rows.iter().filter(|r| filter.matches(*r)).cloned().collect();
        Ok(newest_first(hits, limit, offset))
    }

    async fn find_public(
        &self,
        filter: PublicFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Recipe>> {
        let rows = self.rows.lock().unwrap();
        let hits = rows.iter().filter(|r| filter.matches(*r)).cloned().collect();
        Ok(newest_first(hits, limit, offset))
    }

    async fn update(
        &self,
        scope: ScopedFilter,
        changes: RecipeChanges,
    ) -> StoreResult<Option<Recipe>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(r) = rows.iter_mut().find(|r| scope.matches(&**r)) else {
            return Ok(None);
        };
        if let Some(v) = changes.recipe_name {
            r.recipe_name = v;
        }
        if let Some(v) = changes.recipe_type {
            r.recipe_type = v;
        }
        if let Some(v) = changes.description {
            r.description = v;
        }
        if let Some(v) = changes.cooking_directions {
            r.cooking_directions = v;
        }
        if let Some(v) = changes.servings {
            r.servings = v;
        }
        if let Some(v) = changes.prep_time {
            r.prep_time = v;
        }
        if let Some(v) = changes.ingredients {
            r.ingredients = v;
        }
        if let Some(v) = changes.draft {
            r.draft = v;
        }
        r.updated_at = OffsetDateTime::now_utc();
        Ok(Some(r.clone()))
    }

    async fn set_image(&self, scope: ScopedFilter, url: &str) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| scope.matches(&**r)) {
            Some(r) => {
                r.recipe_image_url = Some(url.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, scope: ScopedFilter) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !scope.matches(r));
        Ok(rows.len() != before)
    }
}

/// Records uploaded keys instead of talking to a bucket.
#[derive(Default)]
pub struct FakeMedia {
    keys: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn uploaded(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaHost for FakeMedia {
    async fn upload(&self, key: &str, _body: Bytes, _content_type: &str) -> anyhow::Result<String> {
        self.keys.lock().unwrap().push(key.to_string());
        Ok(public_url(MEDIA_BASE, key))
    }
}

pub struct Harness {
    pub state: AppState,
    pub users: Arc<MemoryUsers>,
    pub recipes: Arc<MemoryRecipes>,
    pub media: Arc<FakeMedia>,
}

pub fn harness() -> Harness {
    let users = Arc::new(MemoryUsers::default());
    let recipes = Arc::new(MemoryRecipes::default());
    let media = Arc::new(FakeMedia::default());
    let signer = HmacSigner::new(b"test-secret", "test-issuer", "test-aud");
    let tokens = TokenService::new(Arc::new(signer), "test-issuer", "test-aud", Duration::hours(24));
    let state = AppState::from_parts(tokens, users.clone(), recipes.clone(), media.clone());
    Harness {
        state,
        users,
        recipes,
        media,
    }
}

pub fn state() -> AppState {
    harness().state
}

/// Inserts `username` with email `<username>@example.com` and [`PASSWORD`].
pub async fn seed_user(state: &AppState, username: &str) -> User {
    let mut first_name: Vec<char> = username.chars().collect();
    if let Some(c) = first_name.first_mut() {
        *c = c.to_ascii_uppercase();
    }
    state
        .users
        .create(NewUser {
            username: username.into(),
            email: format!("{}@example.com", username),
            password_hash: PASSWORD_HASH.clone(),
            first_name: first_name.into_iter().collect(),
            last_name: "Tester".into(),
        })
        .await
        .expect("seed user")
}

/// Seeds a user and returns a session token for it.
pub async fn login(state: &AppState, username: &str) -> (User, String) {
    let user = seed_user(state, username).await;
    let token = state.tokens.issue_session(user.id).expect("issue token");
    (user, token)
}

/// One request through the full router. Non-JSON bodies come back as a
/// JSON string.
pub async fn send(
    state: &AppState,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = build_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}
