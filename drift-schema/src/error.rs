#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing table name in `{0}`")]
    MissingTableName(String),

    #[error("missing type after column name in `{0}`")]
    MissingType(String),

    #[error("malformed size `{0}`")]
    MalformedSize(String),

    #[error("unknown column type `{0}`")]
    UnknownType(String),

    #[error("missing or empty DEFAULT in `{0}`")]
    MissingDefault(String),

    #[error("PRIMARY KEY without parenthesised column list in `{0}`")]
    MalformedPrimaryKey(String),

    #[error("index `{0}` has an empty column list")]
    EmptyIndexColumns(String),

    #[error("index with empty name in `{0}`")]
    EmptyIndexName(String),

    #[error("io `{0}`")]
    Io(#[from] std::io::Error),

    #[error("yaml `{0}`")]
    Yaml(#[from] serde_yaml::Error),
}

/// One diagnostic per identity collision or empty PropertyID, collected over
/// a whole schema side before reporting.
#[derive(Debug, thiserror::Error)]
#[error("{label} schema failed identity validation with {count} error(s)")]
pub struct ValidationError {
    pub label: String,
    pub count: usize,
    pub issues: Vec<String>,
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;
