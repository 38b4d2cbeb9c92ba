#![forbid(unsafe_code)]

use super::record::Row;

#[derive(Clone, Debug, PartialEq)]
pub enum UpsertOutcome {
    /// No row matched the join key; one row was inserted.
    Inserted { row_id: i64 },
    /// Exactly one row matched and was overwritten. `previous` is its content
    /// before the write.
    Updated { previous: Row },
    /// Two or more rows matched; nothing was written.
    Ambiguous(Vec<Row>),
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted { .. } => "inserted",
            Self::Updated { .. } => "updated",
            Self::Ambiguous(_) => "ambiguous",
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }

    pub fn mutated(&self) -> bool {
        !self.is_ambiguous()
    }
}

/// Which row of a duplicate group survives `remove_duplicates`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupPolicy {
    /// The earliest inserted row (lowest rowid).
    KeepFirst,
    /// The most recently inserted row (highest rowid).
    KeepLast,
}

impl DedupPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeepFirst => "keep_first",
            Self::KeepLast => "keep_last",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" | "keep_first" | "keep-first" | "oldest" => Some(Self::KeepFirst),
            "last" | "keep_last" | "keep-last" | "newest" => Some(Self::KeepLast),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub duplicate_groups: usize,
    pub rows_removed: usize,
}
