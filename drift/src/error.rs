use drift_store::Status;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config: {0}")]
    Config(String),

    #[error("parse `{0}`")]
    Parse(#[from] drift_schema::ParseError),

    #[error("validation `{0}`")]
    Validation(#[from] drift_schema::ValidationError),

    #[error("store `{0}`")]
    Store(#[from] drift_store::StoreError),

    #[error("migration {mid} is {status}, not Approved; pass force to run it anyway")]
    NotApproved { mid: i64, status: Status },

    #[error("migration {0} is no longer the latest and has been depreciated")]
    Depreciated(i64),

    #[error("migration {0} is already in progress")]
    InProgress(i64),

    #[error("{0}")]
    State(String),

    #[error("step `{step}` failed: {output}")]
    Execution { step: String, output: String },

    #[error("statement is not an ALTER TABLE, cannot run through the online schema tool: `{0}`")]
    NotAlter(String),

    #[cfg(feature = "mysql")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),

    #[error("io `{0}`")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Any(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
