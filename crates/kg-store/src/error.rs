use std::fmt;

/// Which class of integrity rule rejected a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique => f.write_str("unique"),
            Self::ForeignKey => f.write_str("foreign key"),
            Self::Check => f.write_str("check"),
        }
    }
}

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An integrity constraint rejected the write.
    #[error("{kind} constraint violated: {constraint}")]
    Constraint {
        kind: ConstraintKind,
        constraint: String,
    },

    /// Could not obtain a connection from the pool.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Any other failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding in-memory state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    pub fn constraint(kind: ConstraintKind, name: &str) -> Self {
        Self::Constraint {
            kind,
            constraint: name.to_string(),
        }
    }

    /// The `(kind, name)` of the violated constraint, if this is one.
    pub fn violated_constraint(&self) -> Option<(ConstraintKind, &str)> {
        match self {
            Self::Constraint { kind, constraint } => Some((*kind, constraint.as_str())),
            _ => None,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
