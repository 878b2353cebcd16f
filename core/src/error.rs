use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Placement rejected: {reason}")]
    Placement { reason: String },

    #[error("Save schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: u32, found: i64 },

    #[error(
        "Duplicate content id in {category}: {id} first={} duplicate={}",
        .first.display(),
        .duplicate.display()
    )]
    DuplicateDefinition {
        category: String,
        id: String,
        first: PathBuf,
        duplicate: PathBuf,
    },

    #[error("Unknown {kind}: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("No save file found at {}", .0.display())]
    SaveMissing(PathBuf),

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn placement(reason: impl Into<String>) -> Self {
        Self::Placement { reason: reason.into() }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

pub type SimResult<T> = Result<T, SimError>;
