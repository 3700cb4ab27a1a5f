use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Closed vocabulary of MySQL scalar column types.
///
/// Parsing is case-insensitive; emission always uses the lowercase keyword so
/// generated DDL matches what `SHOW CREATE TABLE` prints back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    BigInt,
    MediumInt,
    SmallInt,
    TinyInt,
    Float,
    Double,
    Decimal,
    Char,
    VarChar,
    Text,
    TinyText,
    MediumText,
    LongText,
    Binary,
    VarBinary,
    Blob,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Date,
    DateTime,
    Timestamp,
    Time,
    Year,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::MediumInt => "mediumint",
            Self::SmallInt => "smallint",
            Self::TinyInt => "tinyint",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Char => "char",
            Self::VarChar => "varchar",
            Self::Text => "text",
            Self::TinyText => "tinytext",
            Self::MediumText => "mediumtext",
            Self::LongText => "longtext",
            Self::Binary => "binary",
            Self::VarBinary => "varbinary",
            Self::Blob => "blob",
            Self::TinyBlob => "tinyblob",
            Self::MediumBlob => "mediumblob",
            Self::LongBlob => "longblob",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Time => "time",
            Self::Year => "year",
        }
    }

    /// How many parenthesised size arguments the type accepts at most.
    pub fn max_size_args(&self) -> usize {
        match self {
            Self::Decimal | Self::Float | Self::Double => 2,
            Self::Date | Self::Year => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_ascii_lowercase().as_str() {
            "int" | "integer" => Self::Int,
            "bigint" => Self::BigInt,
            "mediumint" => Self::MediumInt,
            "smallint" => Self::SmallInt,
            "tinyint" => Self::TinyInt,
            "float" => Self::Float,
            "double" => Self::Double,
            "decimal" | "numeric" => Self::Decimal,
            "char" => Self::Char,
            "varchar" => Self::VarChar,
            "text" => Self::Text,
            "tinytext" => Self::TinyText,
            "mediumtext" => Self::MediumText,
            "longtext" => Self::LongText,
            "binary" => Self::Binary,
            "varbinary" => Self::VarBinary,
            "blob" => Self::Blob,
            "tinyblob" => Self::TinyBlob,
            "mediumblob" => Self::MediumBlob,
            "longblob" => Self::LongBlob,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "timestamp" => Self::Timestamp,
            "time" => Self::Time,
            "year" => Self::Year,
            _ => return Err(ParseError::UnknownType(s.to_owned())),
        };

        Ok(ty)
    }
}
