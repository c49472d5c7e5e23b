use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Path segments already taken by fixed routes under `/user/`.
pub const RESERVED_USERNAMES: [&str; 3] = ["profile", "signup", "login"];

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed value, or `BadRequest(message)` when blank.
pub fn required(value: &str, message: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(message.into()));
    }
    Ok(value.to_string())
}

/// Like [`required`], but `None` means "not supplied" and passes through.
pub fn optional(value: Option<String>, message: &str) -> Result<Option<String>, ApiError> {
    value.map(|v| required(&v, message)).transpose()
}

/// Usernames double as the `/user/:username` path segment, so they may not
/// shadow a fixed route or contain a path separator.
pub fn username(value: &str) -> Result<String, ApiError> {
    let value = required(value, "Username is required")?;
    if RESERVED_USERNAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(&value))
    {
        return Err(ApiError::BadRequest(format!(
            "Username \"{}\" is reserved",
            value
        )));
    }
    if value.contains('/') {
        return Err(ApiError::BadRequest("Username can not contain '/'".into()));
    }
    Ok(value)
}

/// For fields a patch may clear. Pair with `#[serde(default)]`: an absent key
/// stays `None`, an explicit `null` becomes `Some(None)`.
pub fn clearable<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(Some)
}

/// Trimmed text, with blank treated as no value.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn email(value: &str) -> Result<String, ApiError> {
    let value = required(value, "Email address is required")?.to_lowercase();
    if !is_valid_email(&value) {
        return Err(ApiError::BadRequest(
            "Must provide a proper email address".into(),
        ));
    }
    Ok(value)
}

pub fn password(value: &str) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(value.to_string())
}
