use serde::{Deserialize, Serialize};

/// An operational database known to the engine by a stable id; that id
/// scopes every metadata record and migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "mysql", derive(sqlx::FromRow))]
pub struct TargetDb {
    #[cfg_attr(feature = "mysql", sqlx(rename = "dbid"))]
    pub db_id: i64,
    pub project: String,
    pub name: String,
    #[cfg_attr(feature = "mysql", sqlx(rename = "env"))]
    pub environment: String,
}

impl TargetDb {
    pub fn new(
        project: impl Into<String>,
        name: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            db_id: 0,
            project: project.into(),
            name: name.into(),
            environment: environment.into(),
        }
    }
}
