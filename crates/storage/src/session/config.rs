#![forbid(unsafe_code)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the database lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Memory,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(":memory:"),
        }
    }
}

/// Settings used by [`Session::connect`](crate::Session::connect).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub location: Location,

    /// Create the database file when it does not exist yet.
    pub create_if_missing: bool,

    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,

    /// Wall-clock budget for one call (a single statement, or one full
    /// reconcile cycle). `None` disables the check.
    pub statement_timeout: Option<Duration>,

    pub foreign_keys: bool,
}

impl SessionConfig {
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(Location::File(path.as_ref().to_path_buf()))
    }

    #[must_use]
    pub fn memory() -> Self {
        Self::new(Location::Memory)
    }

    #[must_use]
    pub fn new(location: Location) -> Self {
        Self {
            location,
            create_if_missing: true,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            statement_timeout: None,
            foreign_keys: true,
        }
    }

    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, value: Duration) -> Self {
        self.busy_timeout = value;
        self
    }

    #[must_use]
    pub fn statement_timeout(mut self, value: Option<Duration>) -> Self {
        self.statement_timeout = value;
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, value: bool) -> Self {
        self.foreign_keys = value;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::memory()
    }
}
