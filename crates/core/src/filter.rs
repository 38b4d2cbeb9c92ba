#![forbid(unsafe_code)]

use super::ident::{ColumnName, IdentifierError};
use super::value::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }

    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "=" | "==" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::LtEq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::GtEq),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub column: ColumnName,
    pub op: CompareOp,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterError {
    InvalidColumn(IdentifierError),
    OrderingAgainstNull { column: String },
}

impl FilterError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidColumn(err) => err.message(),
            Self::OrderingAgainstNull { .. } => "ordering comparison against NULL is never true",
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidColumn(err) => write!(f, "invalid filter column: {err}"),
            Self::OrderingAgainstNull { column } => write!(f, "{} ({column})", self.message()),
        }
    }
}

impl std::error::Error for FilterError {}

/// A conjunction of column comparisons. An empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn and(mut self, column: ColumnName, op: CompareOp, value: impl Into<Value>) -> Self {
        self.push(Condition {
            column,
            op,
            value: value.into(),
        });
        self
    }

    pub fn equals(self, column: ColumnName, value: impl Into<Value>) -> Self {
        self.and(column, CompareOp::Eq, value)
    }

    pub fn try_and(
        self,
        column: &str,
        op: CompareOp,
        value: impl Into<Value>,
    ) -> Result<Self, FilterError> {
        let column = ColumnName::try_new(column).map_err(FilterError::InvalidColumn)?;
        Ok(self.and(column, op, value))
    }

    pub fn try_equals(self, column: &str, value: impl Into<Value>) -> Result<Self, FilterError> {
        self.try_and(column, CompareOp::Eq, value)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for condition in &self.conditions {
            if condition.op.is_ordering() && condition.value.is_null() {
                return Err(FilterError::OrderingAgainstNull {
                    column: condition.column.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}
