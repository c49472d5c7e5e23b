use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::state::AppState;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Where an uploaded image ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Profile { user_id: Uuid },
    Recipe { user_id: Uuid, recipe_id: Uuid },
}

pub fn object_key(target: UploadTarget, object_id: Uuid, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    match target {
        UploadTarget::Profile { user_id } => format!("users/{}/{}.{}", user_id, object_id, ext),
        UploadTarget::Recipe { user_id, recipe_id } => {
            format!("recipes/{}/{}-{}.{}", user_id, recipe_id, object_id, ext)
        }
    }
}

/// Pushes the image to the media host and returns its URL.
pub async fn upload_image(
    st: &AppState,
    target: UploadTarget,
    image: UploadItem,
) -> anyhow::Result<String> {
    anyhow::ensure!(!image.body.is_empty(), "empty image");
    let key = object_key(target, Uuid::new_v4(), &image.content_type);
    st.media
        .upload(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("upload {}", key))
}

pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
