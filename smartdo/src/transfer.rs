//! Backup export and import.
//!
//! A backup is the same JSON array the store holds. Import replaces the list
//! wholesale, so it either yields a complete list or an error.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use smartdo_proto::codec::{CodecError, decode_records, encode_list};
use smartdo_proto::task::Task;

use crate::tasks::ordering::{OrderRepair, repair_orders};

/// Errors from reading a backup.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The document is not JSON.
    #[error("backup is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    /// The document is JSON but not a list.
    #[error("expected a list of tasks, found {0}")]
    Format(&'static str),
    /// An element of the list is not a task.
    #[error("entry {index} is not a valid task: {source}")]
    InvalidTask {
        /// Position of the offending entry.
        index: usize,
        /// Why it failed.
        #[source]
        source: serde_json::Error,
    },
}

impl From<CodecError> for ImportError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidJson(e) | CodecError::Serialization(e) => Self::Parse(e),
            CodecError::NotAList(kind) => Self::Format(kind),
            CodecError::InvalidTask { index, source } => Self::InvalidTask { index, source },
        }
    }
}

/// Errors from writing a backup.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The list could not be encoded.
    #[error(transparent)]
    Encode(#[from] CodecError),
    /// The file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// File name of the backup taken on `today`.
#[must_use]
pub fn backup_file_name(today: NaiveDate) -> String {
    format!("smartdo_backup_{}.json", today.format("%Y-%m-%d"))
}

/// Serializes the list as a backup document.
///
/// # Errors
///
/// Returns [`CodecError`] if a task cannot be serialized.
pub fn export_document(tasks: &[Task]) -> Result<String, CodecError> {
    encode_list(tasks)
}

/// Writes a backup into `dir` and returns its path.
///
/// # Errors
///
/// Returns [`ExportError`] if encoding or writing fails.
pub fn export_to_dir(tasks: &[Task], dir: &Path, today: NaiveDate) -> Result<PathBuf, ExportError> {
    let document = export_document(tasks)?;
    let path = dir.join(backup_file_name(today));
    fs::write(&path, document).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), tasks = tasks.len(), "exported backup");
    Ok(path)
}

/// Reads a backup document.
///
/// Tasks without an `order` get `index * GAP`.
///
/// # Errors
///
/// Returns [`ImportError::Parse`] for text that is not JSON,
/// [`ImportError::Format`] when the top level is not a list, and
/// [`ImportError::InvalidTask`] for an element that is not a task.
pub fn import_document(text: &str) -> Result<Vec<Task>, ImportError> {
    let (tasks, repaired) = repair_orders(decode_records(text)?, OrderRepair::Import);
    tracing::info!(tasks = tasks.len(), repaired, "read backup");
    Ok(tasks)
}

/// Reads a backup file; see [`import_document`].
///
/// # Errors
///
/// Returns [`ImportError::Read`] if the file cannot be read, otherwise as
/// [`import_document`].
pub fn import_from_path(path: &Path) -> Result<Vec<Task>, ImportError> {
    let text = fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    import_document(&text)
}
