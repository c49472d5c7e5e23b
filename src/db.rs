use anyhow::Context;
use sqlx::{error::ErrorKind, postgres::PgPoolOptions, PgPool};
use tracing::warn;

/// Store failures, classified so handlers can tell a duplicate from a bad
/// field from an outage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub const INVALID_VALUE: &str = "Invalid value.";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let classified = e
            .as_database_error()
            .and_then(|db_err| classify(db_err.kind(), db_err.constraint()));
        classified.unwrap_or_else(|| StoreError::Other(anyhow::Error::new(e)))
    }
}

/// Constraint failures the caller can act on. Constraint names are logged,
/// never returned to clients.
fn classify(kind: ErrorKind, constraint: Option<&str>) -> Option<StoreError> {
    let constraint = constraint.unwrap_or_default().to_string();
    match kind {
        ErrorKind::UniqueViolation => Some(StoreError::UniqueViolation { constraint }),
        ErrorKind::CheckViolation | ErrorKind::ForeignKeyViolation => {
            warn!(%constraint, ?kind, "constraint rejected write");
            Some(StoreError::Validation(INVALID_VALUE.into()))
        }
        _ => None,
    }
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}
