use std::io;
use std::path::PathBuf;

use crate::io::lock::LockError;

/// Error type for every store operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not a lister store: no lister.toml found")]
    NotAStore,
    #[error("a list named '{0}' already exists")]
    TemplateExists(String),
    #[error("template not found: {0}")]
    TemplateNotFound(String),
    #[error("template '{name}' is invalid: {reason}")]
    TemplateInvalid { name: String, reason: String },
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("record not found: {}", .0.display())]
    RecordNotFound(PathBuf),
    #[error("record {} is corrupt: {reason}", .path.display())]
    RecordCorrupt { path: PathBuf, reason: String },
    #[error("primary field '{0}' is empty")]
    PrimaryFieldEmpty(String),
    #[error("invalid value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },
    #[error("no records to work with")]
    EmptyInput,
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("no creation timestamp in file name '{0}'")]
    TimestampParse(String),
    #[error("could not delete {}: {source}", .path.display())]
    DeletionFailed { path: PathBuf, source: io::Error },
    #[error("could not export to {}: {source}", .path.display())]
    ExportFailed { path: PathBuf, source: io::Error },
    #[error("{} exists in both inbox and archive (or at the destination)", .path.display())]
    MoveConflict { path: PathBuf },
    #[error("load cancelled")]
    LoadCancelled,
    #[error("could not {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not parse lister.toml: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("could not edit lister.toml: {0}")]
    ConfigEdit(#[from] toml_edit::TomlError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Wrap an I/O error with the operation and path it came from.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
