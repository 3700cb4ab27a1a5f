#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("a migration with version `{0}` already exists")]
    VersionExists(String),

    #[error("a migration newer than `{0}` already exists; pass rollback to create an older one")]
    NotLatest(String),

    #[error("unknown status code {0}")]
    InvalidStatus(i32),

    #[error("unknown step op code {0}")]
    InvalidOp(i32),

    #[cfg(feature = "mysql")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),

    #[error("{0}")]
    Any(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
