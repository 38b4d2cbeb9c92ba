#![forbid(unsafe_code)]

use super::ident::{ColumnName, IdentifierError};

/// Storage class of a column, named after SQLite's type affinities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
}

impl ColumnType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" | "serial" => Some(Self::Integer),
            "real" | "float" | "double" => Some(Self::Real),
            "text" | "string" | "varchar" => Some(Self::Text),
            "blob" | "bytes" => Some(Self::Blob),
            "numeric" | "decimal" => Some(Self::Numeric),
            _ => None,
        }
    }

    /// Affinity of a declared column type, following the rules SQLite applies
    /// when a table is created (first matching rule wins).
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.contains("BLOB") || upper.trim().is_empty() {
            Self::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Numeric
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: ColumnName,
    pub ty: ColumnType,
    pub not_null: bool,
}

impl ColumnDef {
    pub fn new(name: ColumnName, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            not_null: false,
        }
    }

    pub fn try_new(name: &str, ty: ColumnType) -> Result<Self, IdentifierError> {
        Ok(Self::new(ColumnName::try_new(name)?, ty))
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// Column metadata as reported by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    /// 1-based position within the primary key, 0 when not part of it.
    pub primary_key_position: u32,
}
