use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::services::{is_image, upload_image, UploadItem, UploadTarget};
use crate::{
    auth::session::AuthUser,
    error::ApiError,
    scope::scoped_filter,
    state::AppState,
};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// `?type=user` or `?type=recipe&recipe=<id>`.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub recipe: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
}

/// POST /upload (multipart, field `image`)
#[instrument(skip(state, user, mp), fields(user_id = %user.id))]
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<UploadQuery>,
    mp: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let target = match q.kind.as_deref() {
        Some("user") => UploadTarget::Profile { user_id: user.id },
        Some("recipe") => {
            let raw = q.recipe.unwrap_or_default();
            let recipe_id = Uuid::parse_str(raw.trim()).map_err(|_| {
                ApiError::BadRequest(format!("&recipe={} must be the id of the recipe", raw))
            })?;
            // Refuse before touching the media host if the caller does not own it.
            state
                .recipes
                .find_one(scoped_filter(recipe_id, user.id))
                .await?
                .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
            UploadTarget::Recipe {
                user_id: user.id,
                recipe_id,
            }
        }
        _ => {
            return Err(ApiError::BadRequest(
                "type must be either user or recipe".into(),
            ))
        }
    };

    let image = read_image(mp).await?;
    let url = upload_image(&state, target, image).await?;

    let (stored, message) = match target {
        UploadTarget::Profile { user_id } => (
            state.users.set_profile_image(user_id, &url).await?,
            "Profile image upload success",
        ),
        UploadTarget::Recipe { user_id, recipe_id } => (
            state
                .recipes
                .set_image(scoped_filter(recipe_id, user_id), &url)
                .await?,
            "Recipe image upload success",
        ),
    };
    if !stored {
        warn!(?target, %url, "upload target disappeared before link");
        return Err(ApiError::NotFound("Upload target not found".into()));
    }

    info!(?target, %url, "image linked");
    Ok(Json(json!({ "message": message, "url": url })))
}

/// Extractor detail stays in the log; the client gets a fixed message.
fn multipart_error(e: MultipartError) -> ApiError {
    warn!(error = %e, status = %e.status(), "multipart body rejected");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("image must be at most 10 MB".into())
    } else {
        ApiError::BadRequest("invalid multipart body".into())
    }
}

async fn read_image(mut mp: Multipart) -> Result<UploadItem, ApiError> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if !is_image(&content_type) {
            return Err(ApiError::BadRequest("image must be an image file".into()));
        }
        let body = field
            .bytes()
            .await
            .map_err(multipart_error)?;
        if body.is_empty() {
            return Err(ApiError::BadRequest("image is empty".into()));
        }
        return Ok(UploadItem { body, content_type });
    }
    Err(ApiError::BadRequest("image is required".into()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState, testing};

    const BOUNDARY: &str = "recipeboxboundary";

    fn multipart(field: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"x\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_upload(state: &AppState, query: &str, token: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/upload{}", query))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let res = build_app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn new_recipe(state: &AppState, token: &str) -> String {
        let (_, body) = testing::send(
            state,
            Method::POST,
            "/api/v1/recipe",
            Some(token),
            Some(json!({ "recipe": {
                "recipeName": "Tart",
                "description": "d",
                "cookingDirections": "c",
                "servings": 8,
                "prepTime": "1 h",
                "ingredients": ["pears"],
            }})),
        )
        .await;
        body["recipe"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn profile_image_url_is_stored_on_user() {
        let h = testing::harness();
        let (user, token) = testing::login(&h.state, "julia").await;

        let (status, body) = post_upload(
            &h.state,
            "?type=user",
            &token,
            multipart("image", "image/png", b"\x89PNG data"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let url = body["url"].as_str().unwrap();

        let (_, profile) = testing::send(&h.state, Method::GET, "/api/v1/user/profile", Some(&token), None).await;
        assert_eq!(profile["user"]["profileImageUrl"], url);
        assert_eq!(h.media.uploaded(), vec![url.trim_start_matches("https://media.test/").to_string()]);
        assert!(url.contains(&user.id.to_string()));
    }

    #[tokio::test]
    async fn recipe_image_requires_ownership() {
        let h = testing::harness();
        let (_, alice) = testing::login(&h.state, "alice").await;
        let (_, bob) = testing::login(&h.state, "bob").await;
        let recipe_id = new_recipe(&h.state, &alice).await;
        let query = format!("?type=recipe&recipe={}", recipe_id);

        let (status, _) = post_upload(&h.state, &query, &bob, multipart("image", "image/jpeg", b"jpg")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(h.media.uploaded().is_empty());

        let (status, body) = post_upload(&h.state, &query, &alice, multipart("image", "image/jpeg", b"jpg")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Recipe image upload success");

        let (_, recipe) = testing::send(
            &h.state,
            Method::GET,
            &format!("/api/v1/recipe/mine/{}", recipe_id),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(recipe["recipeImageUrl"], body["url"]);
    }

    #[tokio::test]
    async fn bad_queries_and_bodies_are_rejected() {
        let state = testing::state();
        let (_, token) = testing::login(&state, "julia").await;

        let (status, body) = post_upload(&state, "?type=recipe&recipe=12", &token, multipart("image", "image/png", b"x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "&recipe=12 must be the id of the recipe");

        let (status, _) = post_upload(&state, "", &token, multipart("image", "image/png", b"x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_upload(&state, "?type=user", &token, multipart("image", "text/plain", b"x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_upload(&state, "?type=user", &token, multipart("avatar", "image/png", b"x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "image is required");
    }

    #[tokio::test]
    async fn oversized_image_is_refused() {
        let h = testing::harness();
        let (_, token) = testing::login(&h.state, "julia").await;
        let image = vec![0u8; super::MAX_IMAGE_BYTES + 1];

        let (status, body) =
            post_upload(&h.state, "?type=user", &token, multipart("image", "image/png", &image)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["message"], "image must be at most 10 MB");
        assert!(h.media.uploaded().is_empty());
    }

    #[tokio::test]
    async fn truncated_multipart_gets_fixed_message() {
        let state = testing::state();
        let (_, token) = testing::login(&state, "julia").await;
        let mut body = multipart("image", "image/png", b"x");
        body.truncate(body.len() - 10);

        let (status, body) = post_upload(&state, "?type=user", &token, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid multipart body");
    }
}
