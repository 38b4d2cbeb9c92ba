#![forbid(unsafe_code)]

use super::filter::{CompareOp, Condition, Filter};
use super::ident::{ColumnName, IdentifierError};
use super::value::Value;
use std::fmt;

/// Column -> value payload, kept in insertion order. Setting a column that is
/// already present (ignoring ASCII case) replaces its value in place and keeps
/// the first spelling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(ColumnName, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_from_pairs<I, K, V>(pairs: I) -> Result<Self, IdentifierError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut out = Self::new();
        for (column, value) in pairs {
            out.set(ColumnName::try_new(column)?, value);
        }
        Ok(out)
    }

    pub fn set(&mut self, column: ColumnName, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| name.matches(&column)) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn try_set(&mut self, column: &str, value: impl Into<Value>) -> Result<(), IdentifierError> {
        self.set(ColumnName::try_new(column)?, value);
        Ok(())
    }

    pub fn with(mut self, column: ColumnName, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &ColumnName) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name.matches(column))
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &ColumnName) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnName, &Value)> {
        self.entries.iter().map(|(name, value)| (name, value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnName> {
        self.entries.iter().map(|(name, _)| name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }
}

impl FromIterator<(ColumnName, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (ColumnName, Value)>>(iter: T) -> Self {
        let mut out = Self::new();
        for (column, value) in iter {
            out.set(column, value);
        }
        out
    }
}

/// The columns whose combined values identify one logical record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinKey {
    columns: Vec<ColumnName>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinKeyError {
    Empty,
    InvalidColumn(IdentifierError),
    MissingFromValues { column: String },
}

impl JoinKeyError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "join key must name at least one column",
            Self::InvalidColumn(err) => err.message(),
            Self::MissingFromValues { .. } => "join key column is missing from the value map",
        }
    }
}

impl fmt::Display for JoinKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidColumn(err) => write!(f, "invalid join key column: {err}"),
            Self::MissingFromValues { column } => write!(f, "{} ({column})", self.message()),
            Self::Empty => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for JoinKeyError {}

impl JoinKey {
    pub fn try_new(columns: impl IntoIterator<Item = ColumnName>) -> Result<Self, JoinKeyError> {
        let mut out: Vec<ColumnName> = Vec::new();
        for column in columns {
            if !out.iter().any(|seen| seen.matches(&column)) {
                out.push(column);
            }
        }
        if out.is_empty() {
            return Err(JoinKeyError::Empty);
        }
        Ok(Self { columns: out })
    }

    pub fn try_from_names<I, S>(names: I) -> Result<Self, JoinKeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = names
            .into_iter()
            .map(|name| ColumnName::try_new(name).map_err(JoinKeyError::InvalidColumn))
            .collect::<Result<Vec<_>, _>>()?;
        Self::try_new(columns)
    }

    /// Parses a comma separated list such as `"name, year"`.
    pub fn parse(value: &str) -> Result<Self, JoinKeyError> {
        Self::try_from_names(
            value
                .split(',')
                .map(str::trim)
                .filter(|segment| !segment.is_empty()),
        )
    }

    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Conjunctive equality filter over the key, using the values currently
    /// present in `values`.
    pub fn equality_filter(&self, values: &ValueMap) -> Result<Filter, JoinKeyError> {
        let mut filter = Filter::new();
        for column in &self.columns {
            let Some(value) = values.get(column) else {
                return Err(JoinKeyError::MissingFromValues {
                    column: column.as_str().to_string(),
                });
            };
            filter.push(Condition {
                column: column.clone(),
                op: CompareOp::Eq,
                value: value.clone(),
            });
        }
        Ok(filter)
    }
}

/// One stored record, values in table column order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}
