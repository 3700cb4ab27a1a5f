use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Lifecycle state shared by migrations and their steps.
///
/// The i32 codes are what both engines persist; they must never be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "mysql", derive(sqlx::Type))]
#[repr(i32)]
pub enum Status {
    Unapproved = 0,
    Approved = 1,
    Depreciated = 2,
    InProgress = 3,
    Complete = 4,
    Failed = 5,
    Skipped = 6,
    Forced = 7,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unapproved => "Unapproved",
            Self::Approved => "Approved",
            Self::Depreciated => "Depreciated",
            Self::InProgress => "InProgress",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
            Self::Forced => "Forced",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for Status {
    type Error = StoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Unapproved),
            1 => Ok(Self::Approved),
            2 => Ok(Self::Depreciated),
            3 => Ok(Self::InProgress),
            4 => Ok(Self::Complete),
            5 => Ok(Self::Failed),
            6 => Ok(Self::Skipped),
            7 => Ok(Self::Forced),
            other => Err(StoreError::InvalidStatus(other)),
        }
    }
}

/// What a step does to its referenced property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "mysql", derive(sqlx::Type))]
#[repr(i32)]
pub enum StepOp {
    Add = 0,
    Del = 1,
    Mod = 2,
}

impl StepOp {
    /// Anything other than a pure Add can lose data or availability and is
    /// gated behind `allow_destructive`.
    pub fn is_destructive(&self) -> bool {
        !matches!(self, Self::Add)
    }
}

impl TryFrom<i32> for StepOp {
    type Error = StoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Add),
            1 => Ok(Self::Del),
            2 => Ok(Self::Mod),
            other => Err(StoreError::InvalidOp(other)),
        }
    }
}

/// One DDL operation within a migration, carrying both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "mysql", derive(sqlx::FromRow))]
pub struct Step {
    pub sid: i64,
    pub mid: i64,
    pub op: StepOp,
    /// Row id of the referenced metadata record.
    pub mdid: i64,
    /// Post-migration name of the property; the metadata mutation applied on
    /// success renames to this.
    pub name: String,
    pub forward: String,
    pub backward: String,
    pub output: String,
    pub status: Status,
}

impl Step {
    pub fn new(op: StepOp, mdid: i64, name: impl Into<String>) -> Self {
        Self {
            sid: 0,
            mid: 0,
            op,
            mdid,
            name: name.into(),
            forward: String::new(),
            backward: String::new(),
            output: String::new(),
            status: Status::Unapproved,
        }
    }

    pub fn forward(mut self, sql: impl Into<String>) -> Self {
        self.forward = sql.into();
        self
    }

    pub fn backward(mut self, sql: impl Into<String>) -> Self {
        self.backward = sql.into();
        self
    }
}

/// A versioned, approved, executable set of DDL steps with their inverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "mysql", derive(sqlx::FromRow))]
pub struct Migration {
    pub mid: i64,
    #[cfg_attr(feature = "mysql", sqlx(rename = "db"))]
    pub db_id: i64,
    pub project: String,
    pub version: String,
    #[cfg_attr(feature = "mysql", sqlx(rename = "version_timestamp"))]
    pub version_ts: DateTime<Utc>,
    #[cfg_attr(feature = "mysql", sqlx(rename = "version_description"))]
    pub description: String,
    pub status: Status,
    #[cfg_attr(feature = "mysql", sqlx(rename = "timestamp"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "mysql", sqlx(skip))]
    pub steps: Vec<Step>,
}

impl Migration {
    pub fn new(
        db_id: i64,
        project: impl Into<String>,
        version: impl Into<String>,
        version_ts: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            mid: 0,
            db_id,
            project: project.into(),
            version: version.into(),
            version_ts,
            description: description.into(),
            status: Status::Unapproved,
            created_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_stable() {
        for (code, status) in [
            (0, Status::Unapproved),
            (1, Status::Approved),
            (2, Status::Depreciated),
            (3, Status::InProgress),
            (4, Status::Complete),
            (5, Status::Failed),
            (6, Status::Skipped),
            (7, Status::Forced),
        ] {
            assert_eq!(Status::try_from(code).unwrap(), status);
            assert_eq!(status as i32, code);
        }

        assert!(Status::try_from(8).is_err());
    }

    #[test]
    fn only_add_is_non_destructive() {
        assert!(!StepOp::Add.is_destructive());
        assert!(StepOp::Del.is_destructive());
        assert!(StepOp::Mod.is_destructive());
    }
}
